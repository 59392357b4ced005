//! Layered, typed configuration (C8): defaults, overridden by a TOML file,
//! overridden again by CLI flags.
//!
//! This replaces the original's `configparser`/INI reader with a typed
//! `serde` struct; each field's `#[serde(default = ...)]` plays the role of
//! `ConfigurationReader::get(section, key, default=...)`'s fallback chain,
//! but is checked by the compiler instead of resolved string-by-string at
//! call sites.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, TestError};

fn default_server_port() -> u16 {
    6789
}

fn default_true() -> bool {
    true
}

fn default_case_timeout() -> u64 {
    120
}

fn default_core_path() -> Option<PathBuf> {
    None
}

/// System-under-test process configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub observer_path: PathBuf,
    pub db_data_dir: PathBuf,
    pub db_config: PathBuf,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_true")]
    pub use_unix_socket: bool,
    #[serde(default)]
    pub unix_socket_name: String,
    #[serde(default = "default_core_path")]
    pub core_path: Option<PathBuf>,
    #[serde(default)]
    pub clean_data_dir_on_start: bool,
}

impl ServerConfig {
    pub fn unix_socket_path(&self) -> PathBuf {
        if self.unix_socket_name.is_empty() {
            self.db_data_dir.join("miniob.sock")
        } else {
            PathBuf::from(&self.unix_socket_name)
        }
    }
}

/// Reference ("oracle") engine connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

/// Top-level harness configuration, assembled from defaults, an optional
/// TOML file, and CLI overrides (see [`crate::cli::HarnessCli`]).
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    pub test_case_dir: PathBuf,
    pub server: ServerConfig,
    pub oracle: Option<OracleConfig>,
    #[serde(default = "default_case_timeout")]
    pub case_timeout_seconds: u64,
    #[serde(default)]
    pub test_user: Option<String>,
}

impl HarnessConfig {
    pub fn case_timeout(&self) -> Duration {
        Duration::from_secs(self.case_timeout_seconds)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(TestError::Io)?;
        toml::from_str(&text).map_err(|e| TestError::Config {
            message: format!("failed to parse {}: {e}", path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml_and_applies_defaults() {
        let text = r#"
            test_case_dir = "./tests/cases"

            [server]
            observer_path = "/usr/bin/observer"
            db_data_dir = "/tmp/miniob"
            db_config = "/tmp/miniob/miniob.ini"
        "#;
        let config: HarnessConfig = toml::from_str(text).unwrap();
        assert_eq!(config.server.server_port, 6789);
        assert!(config.server.use_unix_socket);
        assert_eq!(config.case_timeout_seconds, 120);
        assert!(config.oracle.is_none());
        assert_eq!(config.case_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let text = r#"
            test_case_dir = "./tests/cases"
            case_timeout_seconds = 30

            [server]
            observer_path = "/usr/bin/observer"
            db_data_dir = "/tmp/miniob"
            db_config = "/tmp/miniob/miniob.ini"
            server_port = 9999
            use_unix_socket = false

            [oracle]
            host = "127.0.0.1"
            port = 3306
            user = "root"
            password = ""
            database = "miniob_test_harness"
        "#;
        let config: HarnessConfig = toml::from_str(text).unwrap();
        assert_eq!(config.server.server_port, 9999);
        assert!(!config.server.use_unix_socket);
        assert_eq!(config.case_timeout_seconds, 30);
        assert!(config.oracle.is_some());
    }

    #[test]
    fn unix_socket_path_defaults_to_data_dir_when_name_is_unset() {
        let server = ServerConfig {
            observer_path: PathBuf::from("/usr/bin/observer"),
            db_data_dir: PathBuf::from("/tmp/miniob"),
            db_config: PathBuf::from("/tmp/miniob/miniob.ini"),
            server_port: 6789,
            use_unix_socket: true,
            unix_socket_name: String::new(),
            core_path: None,
            clean_data_dir_on_start: false,
        };
        assert_eq!(server.unix_socket_path(), PathBuf::from("/tmp/miniob/miniob.sock"));
    }
}
