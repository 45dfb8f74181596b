//! CLI integration tests.
//!
//! These tests verify argument parsing and configuration loading.

use std::ffi::OsString;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

use zfs_exec::cli::{parse_args_from, Args};
use zfs_exec::config::{Config, ConfigError};

fn args(args: &[&str]) -> Vec<OsString> {
    std::iter::once("zfs-exec")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect()
}

fn config_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

// ============================================================================
// CLI Argument Tests
// ============================================================================

#[test]
fn test_cli_defaults() {
    let result = parse_args_from(args(&["zfs", "list"])).unwrap();

    assert_eq!(result.command, vec!["zfs", "list"]);
    assert!(result.timeout.is_none());
    assert!(result.config.is_none());
    assert!(result.log_level.is_none());
    assert!(!result.tabular);
}

#[test]
fn test_cli_full_options() {
    let result = parse_args_from(args(&[
        "-t",
        "120",
        "-c",
        "/etc/zfs-exec.json",
        "-l",
        "debug",
        "--tabular",
        "--",
        "zfs",
        "get",
        "-H",
        "-o",
        "value",
        "compression",
        "tank",
    ]))
    .unwrap();

    assert_eq!(result.timeout, Some(120));
    assert_eq!(
        result.config.unwrap().to_str().unwrap(),
        "/etc/zfs-exec.json"
    );
    assert_eq!(result.log_level, Some("debug".to_string()));
    assert!(result.tabular);
    assert_eq!(result.command.len(), 7);
    assert_eq!(result.command[0], "zfs");
}

#[test]
fn test_cli_requires_command() {
    assert!(parse_args_from(args(&[])).is_err());
    assert!(parse_args_from(args(&["--tabular"])).is_err());
}

#[test]
fn test_cli_invalid_timeout() {
    let result = parse_args_from(args(&["-t", "-5", "zfs"]));
    assert!(result.is_err());
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn test_config_full_file() {
    let file = config_file(
        r#"{
            "runner": {
                "timeout_secs": 600,
                "poll_interval_ms": 50,
                "drain_timeout_ms": 250,
                "input_chunk_size": 4096
            },
            "logging": { "level": "warn" }
        }"#,
    );

    let config = Config::from_file(file.path()).unwrap();
    let options = config.to_runner_options().unwrap();

    assert_eq!(options.default_timeout, Some(Duration::from_secs(600)));
    assert_eq!(options.poll_interval, Duration::from_millis(50));
    assert_eq!(options.drain_timeout, Duration::from_millis(250));
    assert_eq!(options.input_chunk_size, 4096);
    assert_eq!(config.log_filter(), "warn");
}

#[test]
fn test_config_unknown_keys_ignored() {
    let file = config_file(r#"{ "server": { "port": 3000 }, "runner": {} }"#);
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_invalid_values() {
    let file = config_file(r#"{ "runner": { "input_chunk_size": 0 } }"#);
    let config = Config::from_file(file.path()).unwrap();
    assert!(matches!(
        config.to_runner_options(),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn test_args_override_file() {
    let file = config_file(r#"{ "runner": { "timeout_secs": 600 }, "logging": { "level": "warn" } }"#);
    let cli = parse_args_from(args(&[
        "-c",
        file.path().to_str().unwrap(),
        "-t",
        "5",
        "zpool",
        "list",
    ]))
    .unwrap();

    let mut config = Config::from_file(cli.config.as_deref().unwrap()).unwrap();
    config.apply_args(&cli);

    assert_eq!(config.runner.timeout_secs, Some(5));
    assert_eq!(config.log_filter(), "warn");
}

// Every environment assertion lives here so no other test sees the variables.
#[test]
fn test_load_priority_chain() {
    let file = config_file(r#"{ "runner": { "timeout_secs": 600 } }"#);

    std::env::set_var("ZFS_EXEC_TIMEOUT", "60");
    std::env::set_var("ZFS_EXEC_LOG_LEVEL", "trace");

    let cli = Args {
        config: Some(file.path().to_path_buf()),
        command: vec!["zfs".into()],
        ..Args::default()
    };
    let config = Config::load(&cli).unwrap();
    assert_eq!(config.runner.timeout_secs, Some(60));
    assert_eq!(config.log_filter(), "trace");

    let cli = Args {
        timeout: Some(1),
        ..cli
    };
    let config = Config::load(&cli).unwrap();
    assert_eq!(config.runner.timeout_secs, Some(1));

    std::env::set_var("ZFS_EXEC_TIMEOUT", "never");
    assert!(matches!(
        Config::load(&cli),
        Err(ConfigError::InvalidTimeout(_))
    ));

    std::env::remove_var("ZFS_EXEC_TIMEOUT");
    std::env::remove_var("ZFS_EXEC_LOG_LEVEL");
}
