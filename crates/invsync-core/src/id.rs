//! Provider identifier handling.
//!
//! Providers are free to change the casing of an identifier between two calls
//! (`/subscriptions/ABC/resourceGroups/rg1` vs `/subscriptions/abc/resourcegroups/RG1`),
//! so every id that enters the inventory goes through [`normalize_id`].

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Lowercases and trims an identifier.
pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Generates an opaque random token (cycle tokens, generated local ids).
pub fn generate_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A provider-assigned identifier, stored in normalized form.
///
/// Equality and hashing operate on the normalized value, which makes
/// `"VM-001"` and `"vm-001"` the same resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Builds an id from a raw provider value.
    ///
    /// Empty (or whitespace-only) values are rejected.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CoreError> {
        let normalized = normalize_id(raw.as_ref());
        if normalized.is_empty() {
            return Err(CoreError::invalid_id("identifier must not be empty"));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ResourceId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        ResourceId::new(raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_case_insensitive_equality() {
        let remote = ResourceId::new("VM-001").unwrap();
        let local = ResourceId::new("vm-001").unwrap();
        assert_eq!(remote, local);

        let mut set = HashSet::new();
        set.insert(remote);
        assert!(set.contains(&local));
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(ResourceId::new("   ").is_err());
        assert!(ResourceId::new("").is_err());
    }

    #[test]
    fn test_deserialize_normalizes() {
        let id: ResourceId = serde_json::from_str("\" /Subs/ABC/VM1 \"").unwrap();
        assert_eq!(id.as_str(), "/subs/abc/vm1");
    }
}
