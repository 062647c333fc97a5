//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Linux: ~/.config/cliap2/config.toml
//! - macOS: ~/Library/Application Support/cliap2/config.toml
//! - Windows: %APPDATA%\cliap2\config.toml
//!
//! Values here are start-up defaults only; CLI flags always override them
//! (§4.I). A `--config <file>` flag points at an arbitrary path instead of
//! the OS-standard one.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default log level 0-5 when `--loglevel` is not given.
    pub log_level: u8,
    /// Default comma-separated log domains when `--logdomains` is not given.
    pub log_domains: String,
    pub default_name: String,
    pub default_address: String,
    pub default_port: u16,
    pub default_volume: u8,
    /// Paths used by `--testrun`.
    pub testrun_audio_pipe: PathBuf,
    pub testrun_command_pipe: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: 2,
            log_domains: String::new(),
            default_name: "cliap2".to_string(),
            default_address: "0.0.0.0".to_string(),
            default_port: 7000,
            default_volume: 75,
            testrun_audio_pipe: PathBuf::from("/tmp/testrun.pipe"),
            testrun_command_pipe: PathBuf::from("/tmp/testrun.pipe.metadata"),
        }
    }
}

/// Get the config directory path.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cliap2"))
}

/// Get the default config file path.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from `path`, or the OS-standard path if `path` is
/// `None`. Returns the compiled-in default if no file exists or it fails
/// to parse; a parse failure is logged, not fatal, since the CLI flags
/// that matter most can still override individual fields.
pub fn load(path: Option<&std::path::Path>) -> Config {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => config_path(),
    };
    let Some(path) = path else {
        tracing::debug!(target: "config", "no config path available, using defaults");
        return Config::default();
    };
    if !path.exists() {
        tracing::debug!(target: "config", path = %path.display(), "no config file found, using defaults");
        return Config::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!(target: "config", path = %path.display(), "loaded config");
                config
            }
            Err(e) => {
                tracing::error!(target: "config", path = %path.display(), error = %e, "failed to parse config, using defaults");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!(target: "config", path = %path.display(), error = %e, "failed to read config, using defaults");
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("default_name"));
    }

    #[test]
    fn config_roundtrip() {
        let mut config = Config::default();
        config.default_volume = 50;
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.default_volume, 50);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let toml = "default_volume = 10\n";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.default_volume, 10);
        assert_eq!(config.default_name, "cliap2");
    }

    #[test]
    fn load_missing_path_returns_defaults() {
        let config = load(Some(std::path::Path::new("/nonexistent/cliap2.toml")));
        assert_eq!(config.default_port, 7000);
    }
}
