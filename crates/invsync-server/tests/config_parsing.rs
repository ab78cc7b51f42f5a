use std::{env, fs};

use invsync_engine::DeletionPolicy;
use invsync_server::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("invsync.toml");

    let toml_content = r#"
[engine]
match_batch_size = 20
enrichment_concurrency = 4
deletion_policy_default = "retire"

[store]
backend = "in-memory"
max_query_ids = 40

[scheduler]
interval_secs = 60

[[scheduler.targets]]
adapter = "virtual-machines"
scope = { tenant = "acme", endpoint = "sub-1" }

[[scheduler.targets]]
adapter = "disks"
scope = { tenant = "acme", endpoint = "sub-1" }
deletion_policy = "delete"

[fixture]
path = "fixtures/acme.json"

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.engine.match_batch_size, 20);
    assert_eq!(cfg.engine.sweep_page_size, 50);
    assert_eq!(cfg.engine.deletion_policy_default, DeletionPolicy::Retire);
    assert_eq!(cfg.store.max_query_ids, 40);
    assert_eq!(cfg.scheduler.interval_secs, 60);
    assert_eq!(cfg.scheduler.targets.len(), 2);
    assert_eq!(cfg.scheduler.targets[0].scope.tenant, "acme");
    assert_eq!(cfg.scheduler.targets[0].deletion_policy, None);
    assert_eq!(
        cfg.scheduler.targets[1].deletion_policy,
        Some(DeletionPolicy::Delete)
    );
    assert_eq!(cfg.fixture.path.as_deref(), Some("fixtures/acme.json"));
    assert_eq!(cfg.logging.level, "debug");

    // 2) Env override should win over file
    unsafe {
        env::set_var("INVSYNC__ENGINE__MATCH_BATCH_SIZE", "7");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.engine.match_batch_size, 7);
    unsafe {
        env::remove_var("INVSYNC__ENGINE__MATCH_BATCH_SIZE");
    }

    // 3) Invalid values are rejected
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[engine]
sweep_page_size = 0
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("sweep_page_size must be > 0"));

    // 4) A missing file falls back to defaults
    let missing = dir.path().join("absent.toml");
    let defaults = load_config(missing.to_str()).expect("defaults should be valid");
    assert_eq!(defaults.scheduler.interval_secs, 300);
    assert!(defaults.scheduler.targets.is_empty());
}
