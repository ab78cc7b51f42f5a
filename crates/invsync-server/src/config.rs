use std::time::Duration;

use invsync_db_memory::{DEFAULT_MAX_QUERY_IDS, StoreBackend, StoreConfig, StoreOptions};
use invsync_engine::{EngineConfig, ScheduleTarget};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// JSON file backing the provider collaborators
    #[serde(default)]
    pub fixture: FixtureConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.engine
            .validate()
            .map_err(|e| format!("engine config error: {e}"))?;
        if self.store.max_query_ids == 0 {
            return Err("store.max_query_ids must be > 0".into());
        }
        if self.scheduler.interval_secs == 0 {
            return Err("scheduler.interval_secs must be > 0".into());
        }
        for target in &self.scheduler.targets {
            if target.adapter.trim().is_empty() {
                return Err("scheduler.targets[].adapter must not be empty".into());
            }
            if target.scope.tenant.trim().is_empty() || target.scope.endpoint.trim().is_empty() {
                return Err("scheduler.targets[].scope needs a tenant and an endpoint".into());
            }
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "default_max_query_ids")]
    pub max_query_ids: usize,
}

fn default_max_query_ids() -> usize {
    DEFAULT_MAX_QUERY_IDS
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            max_query_ids: DEFAULT_MAX_QUERY_IDS,
        }
    }
}

impl StoreSettings {
    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            backend: self.backend,
            options: StoreOptions {
                max_query_ids: self.max_query_ids,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub targets: Vec<ScheduleTarget>,
}

fn default_interval_secs() -> u64 {
    300
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            targets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FixtureConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    /// Default configuration file, looked up in the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "invsync.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., INVSYNC__ENGINE__MATCH_BATCH_SIZE=25
        builder = builder.add_source(
            Environment::with_prefix("INVSYNC")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<AppConfig, String> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }

    /// Renders `config` as TOML, e.g. to bootstrap a configuration file.
    pub fn render_toml(config: &AppConfig) -> Result<String, String> {
        toml::to_string_pretty(config).map_err(|e| format!("config render error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.interval(), Duration::from_secs(300));
        assert_eq!(cfg.store.to_store_config().options.max_query_ids, 100);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "verbose".to_string();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));

        let mut cfg = AppConfig::default();
        cfg.engine.match_batch_size = 0;
        assert!(cfg.validate().unwrap_err().starts_with("engine config error"));

        let mut cfg = AppConfig::default();
        cfg.scheduler.interval_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = loader::render_toml(&AppConfig::default()).unwrap();
        assert!(rendered.contains("[engine]"));
        assert!(rendered.contains("match_batch_size = 50"));
    }
}
