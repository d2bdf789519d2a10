use concord::conflict::{ConflictKind, StrategyKind};
use concord::{AppConfig, CoordError, Coordinator};
use std::fs;

#[test]
fn load_from_directory_layers_default_toml() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("default.toml"),
        r#"
        [coordinator]
        decision_timeout_ms = 2000
        action_timeout_ms = 5000
        resolved_history_limit = 10

        [coordinator.strategy_overrides]
        social = ["democratic"]

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = AppConfig::load_from(dir.path()).expect("config should load");
    assert_eq!(config.coordinator.decision_timeout_ms, 2000);
    assert_eq!(config.coordinator.action_timeout_ms, 5000);
    assert_eq!(config.coordinator.conflict_threshold, 0.3);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.coordinator.strategy_overrides[&ConflictKind::Social],
        vec![StrategyKind::Democratic]
    );

    let coordinator = Coordinator::new(config.coordinator).unwrap();
    assert_eq!(coordinator.resolved_conflicts().capacity(), 10);
}

#[test]
fn missing_directory_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load_from(dir.path().join("absent")).unwrap();

    assert_eq!(config.coordinator.decision_timeout_ms, 10_000);
    assert_eq!(config.coordinator.action_timeout_ms, 30_000);
    assert_eq!(config.logging.level, "info");
    assert!(!config.logging.json);
}

#[test]
fn invalid_file_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("default.toml"),
        "[coordinator]\nsynergy_threshold = 1.2\n",
    )
    .unwrap();

    let err = AppConfig::load_from(dir.path()).unwrap_err();
    assert!(matches!(err, CoordError::InvalidConfig(_)), "got {err}");
}

#[test]
fn override_table_drives_candidates() {
    let config = AppConfig::from_toml_str(
        r#"
        [coordinator.strategy_overrides]
        location = ["sequential", "compromise"]
        "#,
    )
    .unwrap();

    assert_eq!(
        config.coordinator.strategy_overrides[&ConflictKind::Location],
        vec![StrategyKind::Sequential, StrategyKind::Compromise]
    );
}

#[test]
fn environment_overrides_file_values() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("default.toml"),
        "[coordinator]\nround_history_limit = 3\n",
    )
    .unwrap();

    // no other test in this binary reads round_history_limit
    std::env::set_var("CONCORD__COORDINATOR__ROUND_HISTORY_LIMIT", "7");
    let loaded = AppConfig::load_from(dir.path());
    std::env::remove_var("CONCORD__COORDINATOR__ROUND_HISTORY_LIMIT");

    let config = loaded.unwrap();
    assert_eq!(config.coordinator.round_history_limit, 7);
    let coordinator = Coordinator::new(config.coordinator).unwrap();
    assert_eq!(coordinator.round_history().capacity(), 7);
}
