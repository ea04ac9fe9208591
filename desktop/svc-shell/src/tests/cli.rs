use crate::cli::Cli;
use crate::load_config;
use crate::logging::{current_log_path, default_directives};

use svc_supervisor::CONFIG_FILENAME;

use std::path::PathBuf;

use clap::Parser;

#[test]
fn test_cli_defaults() {
    let cli = Cli::try_parse_from(["svc-shell"]).unwrap();

    assert_eq!(cli.data_dir, PathBuf::from(".svc-shell"));
    assert!(cli.config.is_none());
    assert!(!cli.json);
    assert_eq!(cli.preferred_port, None);
}

#[test]
fn test_cli_all_flags() {
    let cli = Cli::try_parse_from([
        "svc-shell",
        "--data-dir",
        "/tmp/shell",
        "--config",
        "/etc/shell/config.toml",
        "--json",
        "--preferred-port",
        "9001",
    ])
    .unwrap();

    assert_eq!(cli.data_dir, PathBuf::from("/tmp/shell"));
    assert_eq!(cli.config, Some(PathBuf::from("/etc/shell/config.toml")));
    assert!(cli.json);
    assert_eq!(cli.preferred_port, Some(9001));
}

#[test]
fn test_load_config_creates_default_in_data_dir() {
    let temp = tempfile::TempDir::new().unwrap();
    let cli = Cli::try_parse_from(["svc-shell", "--data-dir", temp.path().to_str().unwrap()])
        .unwrap();

    let (config, base_dir) = load_config(&cli).unwrap();

    assert!(temp.path().join(CONFIG_FILENAME).exists());
    assert_eq!(base_dir, temp.path());
    assert_eq!(config.network.preferred_port, 8000);
}

#[test]
fn test_load_config_applies_port_override() {
    let temp = tempfile::TempDir::new().unwrap();
    let cli = Cli::try_parse_from([
        "svc-shell",
        "--data-dir",
        temp.path().to_str().unwrap(),
        "--preferred-port",
        "9100",
    ])
    .unwrap();

    let (config, _) = load_config(&cli).unwrap();

    assert_eq!(config.network.preferred_port, 9100);
}

#[test]
fn test_load_config_rejects_privileged_port_override() {
    let temp = tempfile::TempDir::new().unwrap();
    let cli = Cli::try_parse_from([
        "svc-shell",
        "--data-dir",
        temp.path().to_str().unwrap(),
        "--preferred-port",
        "80",
    ])
    .unwrap();

    assert!(load_config(&cli).is_err());
}

#[test]
fn test_load_config_explicit_path_uses_its_directory_as_base() {
    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("custom.toml");
    std::fs::write(&path, "[backend]\nprogram = \"uvicorn\"\n").unwrap();
    let cli = Cli::try_parse_from(["svc-shell", "--config", path.to_str().unwrap()]).unwrap();

    let (config, base_dir) = load_config(&cli).unwrap();

    assert_eq!(config.backend.program, "uvicorn");
    assert_eq!(base_dir, temp.path());
}

#[test]
fn test_default_log_directives_keep_supervisor_at_debug() {
    assert_eq!(default_directives("warn"), "warn,svc_supervisor=debug");
}

#[test]
fn test_current_log_path_uses_shell_prefix() {
    let path = current_log_path(&PathBuf::from("logs"));

    let name = path.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("svc-shell."));
    assert!(name.ends_with(".log"));
}
