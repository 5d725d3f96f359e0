//! Configuration file management for fahrplan.
//!
//! Provides a TOML-based config file at `~/.config/fahrplan/config.toml`
//! and a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use fahrplan_engine::EngineConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub engine: EngineSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EngineSection {
    pub url: String,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the fahrplan config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/fahrplan` or
/// `~/.config/fahrplan`. We intentionally ignore the platform-specific
/// `dirs::config_dir()` (which returns `~/Library/Application Support`
/// on macOS).
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("fahrplan");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("fahrplan")
}

/// Return the path to the fahrplan config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct FahrplanConfig {
    pub engine: EngineConfig,
}

impl FahrplanConfig {
    /// Resolve configuration using the chain: CLI flag > env var >
    /// config file > default.
    ///
    /// Engine URL: `cli_url` > `FAHRPLAN_ENGINE_URL` env >
    /// `config_file.engine.url` > `EngineConfig::DEFAULT_URL`.
    pub fn resolve(cli_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let url = if let Some(url) = cli_url {
            url.to_string()
        } else if let Ok(url) = std::env::var("FAHRPLAN_ENGINE_URL") {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.engine.url.clone()
        } else {
            EngineConfig::DEFAULT_URL.to_string()
        };

        Ok(Self {
            engine: EngineConfig::new(url),
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("fahrplan");
        let path = dir.join("config.toml");

        let original = ConfigFile {
            engine: EngineSection {
                url: "http://engine.internal:9000".to_string(),
            },
        };

        std::fs::create_dir_all(&dir).unwrap();
        let contents = toml::to_string_pretty(&original).unwrap();
        std::fs::write(&path, &contents).unwrap();

        let loaded_contents = std::fs::read_to_string(&path).unwrap();
        let loaded: ConfigFile = toml::from_str(&loaded_contents).unwrap();

        assert_eq!(loaded.engine.url, original.engine.url);
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();

        // Even if env var is set, CLI flag wins.
        unsafe { std::env::set_var("FAHRPLAN_ENGINE_URL", "http://env:8000") };

        let config = FahrplanConfig::resolve(Some("http://cli:8000")).unwrap();
        assert_eq!(config.engine.base_url, "http://cli:8000");

        unsafe { std::env::remove_var("FAHRPLAN_ENGINE_URL") };
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let _lock = lock_env();

        unsafe { std::env::set_var("FAHRPLAN_ENGINE_URL", "http://env:8000") };

        let config = FahrplanConfig::resolve(None).unwrap();
        assert_eq!(config.engine.base_url, "http://env:8000");

        unsafe { std::env::remove_var("FAHRPLAN_ENGINE_URL") };
    }

    #[test]
    fn resolve_defaults_url_when_nothing_set() {
        let _lock = lock_env();

        unsafe { std::env::remove_var("FAHRPLAN_ENGINE_URL") };
        // Point HOME and XDG_CONFIG_HOME at a temp dir so load_config()
        // cannot find a real config file.
        let tmp = tempfile::TempDir::new().unwrap();
        let orig_home = std::env::var("HOME").ok();
        let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe { std::env::set_var("HOME", tmp.path()) };
        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };

        let result = FahrplanConfig::resolve(None);

        // Restore env before asserting, to avoid poisoning the mutex on failure.
        match orig_home {
            Some(h) => unsafe { std::env::set_var("HOME", h) },
            None => unsafe { std::env::remove_var("HOME") },
        }
        match orig_xdg {
            Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
            None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
        }

        let config = result.unwrap();
        assert_eq!(config.engine.base_url, EngineConfig::DEFAULT_URL);
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("fahrplan/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
