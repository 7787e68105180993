// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones winning:
//! 1. TOML file
//! 2. Environment variables
//! 3. CLI arguments

use crate::{validate_config, ConfigError, ConfigResult, NbSerialConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

pub const CONFIG_FILE_NAME: &str = "nbserial.toml";
pub const CONFIG_PATH_ENV: &str = "NBSERIAL_CONFIG_PATH";

/// Find the configuration file
///
/// Search order:
/// 1. `NBSERIAL_CONFIG_PATH` environment variable
/// 2. `./nbserial.toml`
/// 3. Up to five parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        for ancestor in cwd.ancestors().skip(1).take(5) {
            search_paths.push(ancestor.join(CONFIG_FILE_NAME));
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");
    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load and validate configuration
///
/// # Arguments
///
/// * `config_path` - Config file to read. If `None`, [`find_config_file`] is used.
/// * `cli_args` - Optional CLI overrides keyed like `reader.read_timeout_ms`
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<NbSerialConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    debug!(path = %config_file.display(), "loading configuration");

    let content = fs::read_to_string(&config_file)?;
    let mut config: NbSerialConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    validate_config(&config)?;
    Ok(config)
}

/// Field paths paired with the environment variable that overrides each one
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("reader.read_timeout_ms", "NBSERIAL_READ_TIMEOUT_MS"),
    ("reader.max_read_size", "NBSERIAL_MAX_READ_SIZE"),
    ("reader.max_read_buffered", "NBSERIAL_MAX_READ_BUFFERED"),
    ("reader.poll_interval_ms", "NBSERIAL_POLL_INTERVAL_MS"),
    ("reader.backoff_start_ns", "NBSERIAL_BACKOFF_START_NS"),
    ("reader.backoff_max_ms", "NBSERIAL_BACKOFF_MAX_MS"),
    ("reader.label", "NBSERIAL_LABEL"),
    ("logging.level", "NBSERIAL_LOG_LEVEL"),
];

/// Apply environment variable overrides
///
/// Supported variables:
/// - `NBSERIAL_READ_TIMEOUT_MS` -> `reader.read_timeout_ms`
/// - `NBSERIAL_MAX_READ_SIZE` -> `reader.max_read_size`
/// - `NBSERIAL_MAX_READ_BUFFERED` -> `reader.max_read_buffered`
/// - `NBSERIAL_POLL_INTERVAL_MS` -> `reader.poll_interval_ms`
/// - `NBSERIAL_BACKOFF_START_NS` -> `reader.backoff_start_ns`
/// - `NBSERIAL_BACKOFF_MAX_MS` -> `reader.backoff_max_ms`
/// - `NBSERIAL_LABEL` -> `reader.label`
/// - `NBSERIAL_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut NbSerialConfig) {
    for (field, var) in ENV_OVERRIDES {
        if let Ok(value) = env::var(var) {
            apply_field(config, field, &value);
        }
    }
}

/// Apply CLI argument overrides
///
/// # Arguments
///
/// * `cli_args` - e.g. `{"reader.read_timeout_ms": "500", "logging.level": "debug"}`
pub fn apply_cli_overrides(config: &mut NbSerialConfig, cli_args: &HashMap<String, String>) {
    for (field, value) in cli_args {
        apply_field(config, field, value);
    }
}

fn apply_field(config: &mut NbSerialConfig, field: &str, value: &str) {
    let reader = &mut config.reader;
    match field {
        "reader.read_timeout_ms" => set_parsed(&mut reader.read_timeout_ms, field, value),
        "reader.max_read_size" => set_parsed(&mut reader.max_read_size, field, value),
        "reader.max_read_buffered" => set_parsed(&mut reader.max_read_buffered, field, value),
        "reader.poll_interval_ms" => set_parsed(&mut reader.poll_interval_ms, field, value),
        "reader.backoff_start_ns" => set_parsed(&mut reader.backoff_start_ns, field, value),
        "reader.backoff_max_ms" => set_parsed(&mut reader.backoff_max_ms, field, value),
        "reader.label" => reader.label = Some(value.to_string()),
        "logging.level" => config.logging.level = value.to_string(),
        _ => warn!(field, "ignoring unknown override"),
    }
}

fn set_parsed<T: FromStr>(slot: &mut T, field: &str, value: &str) {
    match value.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(field, value, "ignoring unparsable override"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        File::create(&config_path).unwrap();

        env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var(CONFIG_PATH_ENV, "/definitely/not/here/nbserial.toml");
        let result = find_config_file();
        env::remove_var(CONFIG_PATH_ENV);

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[reader]").unwrap();
        writeln!(file, "read_timeout_ms = 150").unwrap();
        writeln!(file, "max_read_buffered = 0").unwrap();
        writeln!(file, "[logging]").unwrap();
        writeln!(file, "level = \"debug\"").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.reader.read_timeout_ms, 150);
        assert_eq!(config.reader.max_read_buffered, 0);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[reader\nread_timeout_ms = ").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = NbSerialConfig::default();

        env::set_var("NBSERIAL_READ_TIMEOUT_MS", "750");
        env::set_var("NBSERIAL_LABEL", "ttyUSB3");
        env::set_var("NBSERIAL_MAX_READ_SIZE", "not-a-number");

        apply_environment_overrides(&mut config);

        env::remove_var("NBSERIAL_READ_TIMEOUT_MS");
        env::remove_var("NBSERIAL_LABEL");
        env::remove_var("NBSERIAL_MAX_READ_SIZE");

        assert_eq!(config.reader.read_timeout_ms, 750);
        assert_eq!(config.reader.label.as_deref(), Some("ttyUSB3"));
        // Unparsable values leave the field untouched
        assert_eq!(config.reader.max_read_size, 1024);
    }

    #[test]
    fn test_environment_and_cli_accept_same_fields() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut from_env = NbSerialConfig::default();
        env::set_var("NBSERIAL_BACKOFF_START_NS", "2500");
        env::set_var("NBSERIAL_BACKOFF_MAX_MS", "40");
        apply_environment_overrides(&mut from_env);
        env::remove_var("NBSERIAL_BACKOFF_START_NS");
        env::remove_var("NBSERIAL_BACKOFF_MAX_MS");

        let mut from_cli = NbSerialConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("reader.backoff_start_ns".to_string(), "2500".to_string());
        cli_args.insert("reader.backoff_max_ms".to_string(), "40".to_string());
        apply_cli_overrides(&mut from_cli, &cli_args);

        assert_eq!(from_env.reader.backoff_start_ns, 2500);
        assert_eq!(from_env, from_cli);

        // Every environment variable maps to a field the CLI tier also accepts
        for (field, _) in ENV_OVERRIDES {
            let mut config = NbSerialConfig::default();
            let mut cli_args = HashMap::new();
            cli_args.insert(field.to_string(), "7".to_string());
            apply_cli_overrides(&mut config, &cli_args);
            assert_ne!(config, NbSerialConfig::default(), "{} not applied", field);
        }
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = NbSerialConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("reader.poll_interval_ms".to_string(), "5".to_string());
        cli_args.insert("logging.level".to_string(), "trace".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.reader.poll_interval_ms, 5);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[reader]").unwrap();
        writeln!(file, "read_timeout_ms = 100").unwrap();
        writeln!(file, "max_read_size = 64").unwrap();

        env::set_var("NBSERIAL_READ_TIMEOUT_MS", "200");
        env::set_var("NBSERIAL_MAX_READ_SIZE", "128");

        let mut cli_args = HashMap::new();
        cli_args.insert("reader.read_timeout_ms".to_string(), "300".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("NBSERIAL_READ_TIMEOUT_MS");
        env::remove_var("NBSERIAL_MAX_READ_SIZE");

        // CLI wins for the timeout, env wins for the read size
        assert_eq!(config.reader.read_timeout_ms, 300);
        assert_eq!(config.reader.max_read_size, 128);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[reader]\npoll_interval_ms = 0\n").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
