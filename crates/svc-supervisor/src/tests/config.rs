use crate::{CONFIG_FILENAME, CONFIG_VERSION, ReadinessMode, SupervisorConfig, SupervisorError};

use googletest::assert_that;
use googletest::prelude::{anything, contains_substring, eq, err, ok};
use tempfile::TempDir;

// =========================================================================
// Defaults
// =========================================================================

#[test]
fn given_default_config_when_validated_then_passes() {
    let config = SupervisorConfig::default();

    assert_that!(config.validate(), ok(anything()));
    assert_that!(config.version, eq(CONFIG_VERSION));
    assert_that!(config.network.host.as_str(), eq("127.0.0.1"));
    assert_that!(config.network.preferred_port, eq(8000));
    assert_that!(config.readiness.mode, eq(ReadinessMode::Markers));
}

#[test]
fn given_default_config_when_base_url_then_includes_api_prefix() {
    let config = SupervisorConfig::default();

    let url = config.base_url(8123);

    assert_that!(url.as_str(), eq("http://127.0.0.1:8123/api"));
}

#[test]
fn given_empty_api_prefix_when_base_url_then_ends_with_slash() {
    let mut config = SupervisorConfig::default();
    config.backend.api_prefix = "/".into();

    let url = config.base_url(9000);

    assert_that!(url.as_str(), eq("http://127.0.0.1:9000/"));
}

// =========================================================================
// Load / Save
// =========================================================================

#[test]
fn given_empty_dir_when_load_or_create_then_default_file_written() {
    // Given
    let temp = TempDir::new().unwrap();

    // When
    let config = SupervisorConfig::load_or_create(temp.path()).unwrap();

    // Then
    assert!(temp.path().join(CONFIG_FILENAME).exists());
    assert_that!(config.network.preferred_port, eq(8000));
}

#[test]
fn given_saved_config_when_loaded_then_values_round_trip() {
    // Given
    let temp = TempDir::new().unwrap();
    let mut config = SupervisorConfig::default();
    config.network.preferred_port = 9100;
    config.readiness.mode = ReadinessMode::Combined;
    config.backend.program = "uvicorn".into();
    config.save(temp.path()).unwrap();

    // When
    let loaded = SupervisorConfig::load_or_create(temp.path()).unwrap();

    // Then
    assert_that!(loaded.network.preferred_port, eq(9100));
    assert_that!(loaded.readiness.mode, eq(ReadinessMode::Combined));
    assert_that!(loaded.backend.program.as_str(), eq("uvicorn"));
}

#[test]
fn given_partial_toml_when_loaded_then_missing_fields_defaulted() {
    // Given
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILENAME);
    std::fs::write(
        &path,
        r#"
version = 1

[network]
preferred_port = 8500

[readiness]
mode = "probe"
"#,
    )
    .unwrap();

    // When
    let config = SupervisorConfig::load(&path).unwrap();

    // Then
    assert_that!(config.network.preferred_port, eq(8500));
    assert_that!(config.network.max_port_attempts, eq(100));
    assert_that!(config.readiness.mode, eq(ReadinessMode::Probe));
    assert_that!(config.readiness.grace_period_ms, eq(3000));
    assert_that!(config.shutdown.grace_secs, eq(5));
}

#[test]
fn given_version_zero_file_when_load_or_create_then_migrated_and_rewritten() {
    // Given
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILENAME);
    std::fs::write(&path, "version = 0\n").unwrap();

    // When
    let config = SupervisorConfig::load_or_create(temp.path()).unwrap();

    // Then
    assert_that!(config.version, eq(CONFIG_VERSION));
    let content = std::fs::read_to_string(&path).unwrap();
    assert_that!(content, contains_substring("version = 1"));
}

#[test]
fn given_malformed_toml_when_loaded_then_config_invalid() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(CONFIG_FILENAME);
    std::fs::write(&path, "[network\npreferred_port = ").unwrap();

    let result = SupervisorConfig::load(&path);

    assert!(matches!(result, Err(SupervisorError::ConfigInvalid { .. })));
}

// =========================================================================
// Validation
// =========================================================================

#[test]
fn given_privileged_port_when_validated_then_rejected() {
    let mut config = SupervisorConfig::default();
    config.network.preferred_port = 80;

    let result = config.validate();

    assert_that!(result, err(anything()));
    let err_msg = result.unwrap_err().to_string();
    assert_that!(err_msg, contains_substring("1024"));
}

#[test]
fn given_non_loopback_host_when_validated_then_rejected() {
    let mut config = SupervisorConfig::default();
    config.network.host = "0.0.0.0".into();

    assert_that!(config.validate(), err(anything()));
}

#[test]
fn given_zero_port_attempts_when_validated_then_rejected() {
    let mut config = SupervisorConfig::default();
    config.network.max_port_attempts = 0;

    assert_that!(config.validate(), err(anything()));
}

#[test]
fn given_blank_program_when_validated_then_rejected() {
    let mut config = SupervisorConfig::default();
    config.backend.program = "   ".into();

    assert_that!(config.validate(), err(anything()));
}

#[test]
fn given_no_markers_in_markers_mode_when_validated_then_rejected() {
    let mut config = SupervisorConfig::default();
    config.readiness.ready_markers.clear();

    assert_that!(config.validate(), err(anything()));
}

#[test]
fn given_no_markers_in_probe_mode_when_validated_then_passes() {
    let mut config = SupervisorConfig::default();
    config.readiness.mode = ReadinessMode::Probe;
    config.readiness.ready_markers.clear();

    assert_that!(config.validate(), ok(anything()));
}

#[test]
fn given_zero_probe_budget_in_combined_mode_when_validated_then_rejected() {
    let mut config = SupervisorConfig::default();
    config.readiness.mode = ReadinessMode::Combined;
    config.readiness.probe_budget = 0;

    assert_that!(config.validate(), err(anything()));
}
