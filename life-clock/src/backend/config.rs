//! # Configuration
//!
//! `config.yaml` in the data directory, created with defaults on first run:
//!
//! ```yaml
//! counter_interval_ms: 50
//! grid_interval_ms: 60000
//! default_target_age: 80
//! quote_api_url: https://dummyjson.com/quotes/random
//! quote_timeout_ms: 3000
//! watch_poll_ms: 500
//! ```
//!
//! The data directory is `$LIFE_CLOCK_DATA_DIR` when set, otherwise
//! `<platform data dir>/life-clock`. A `.life_clock_redirect` file in the
//! default directory can point at another location.

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::domain::clock::{DEFAULT_INTERVAL_MS, LOW_FREQUENCY_INTERVAL_MS};
use crate::backend::domain::quote_service::DEFAULT_QUOTE_API_URL;
use shared::TargetAge;

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const DATA_DIR_ENV: &str = "LIFE_CLOCK_DATA_DIR";
pub const REDIRECT_FILE_NAME: &str = ".life_clock_redirect";
const APP_DIR_NAME: &str = "life-clock";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cadence of the live age counter
    pub counter_interval_ms: u64,
    /// Cadence of the week grid and insights
    pub grid_interval_ms: u64,
    pub default_target_age: u32,
    pub quote_api_url: String,
    pub quote_timeout_ms: u64,
    /// How often the data directory is checked for writes from other processes
    pub watch_poll_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            counter_interval_ms: DEFAULT_INTERVAL_MS,
            grid_interval_ms: LOW_FREQUENCY_INTERVAL_MS,
            default_target_age: TargetAge::default().years(),
            quote_api_url: DEFAULT_QUOTE_API_URL.to_string(),
            quote_timeout_ms: 3000,
            watch_poll_ms: 500,
        }
    }
}

impl AppConfig {
    /// Load `config.yaml` from `data_dir`, writing the defaults if it is missing.
    /// An unreadable file is left alone and the defaults are used.
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE_NAME);

        if !path.exists() {
            let config = Self::default();
            config.save(data_dir)?;
            info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let yaml = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        match serde_yaml::from_str::<AppConfig>(&yaml) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                warn!("Invalid config at {}, using defaults: {}", path.display(), e);
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        if !data_dir.exists() {
            fs::create_dir_all(data_dir)
                .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        }
        let path = data_dir.join(CONFIG_FILE_NAME);
        let yaml = serde_yaml::to_string(self)?;

        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, yaml)?;
        fs::rename(&temp_path, &path)?;

        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Configured default target age, or 80 if the configured value is out of range
    pub fn default_target_age(&self) -> TargetAge {
        TargetAge::new(self.default_target_age).unwrap_or_else(|e| {
            warn!("Ignoring configured default_target_age: {}", e);
            TargetAge::default()
        })
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_timeout_ms)
    }

    pub fn watch_poll(&self) -> Duration {
        Duration::from_millis(self.watch_poll_ms.max(1))
    }
}

/// `<platform data dir>/life-clock`
pub fn default_data_directory() -> Result<PathBuf> {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("share")))
        .map(|base| base.join(APP_DIR_NAME))
        .ok_or_else(|| anyhow!("Could not determine a data directory; set {}", DATA_DIR_ENV))
}

/// Pick the data directory: explicit path, then `$LIFE_CLOCK_DATA_DIR`, then
/// the default directory (following its redirect file).
pub fn resolve_data_directory(explicit: Option<&Path>) -> Result<PathBuf> {
    let from_env = std::env::var(DATA_DIR_ENV).ok();
    let env_blank = from_env.as_deref().map_or(true, |value| value.trim().is_empty());
    let default_dir = if explicit.is_none() && env_blank {
        Some(default_data_directory()?)
    } else {
        None
    };
    Ok(choose_data_directory(explicit, from_env.as_deref(), default_dir.as_deref()))
}

fn choose_data_directory(explicit: Option<&Path>, from_env: Option<&str>, default_dir: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        info!("Using data directory from command line: {}", path.display());
        return path.to_path_buf();
    }
    if let Some(path) = from_env.filter(|value| !value.trim().is_empty()) {
        info!("Using data directory from {}: {}", DATA_DIR_ENV, path);
        return PathBuf::from(path.trim());
    }
    match default_dir {
        Some(dir) => follow_redirect(dir),
        None => PathBuf::from(APP_DIR_NAME),
    }
}

/// Directory named by `default_dir/.life_clock_redirect`, if that file exists
/// and points at an existing directory; otherwise `default_dir`.
pub fn follow_redirect(default_dir: &Path) -> PathBuf {
    let redirect_file = default_dir.join(REDIRECT_FILE_NAME);
    if !redirect_file.exists() {
        debug!("No redirect file, using default data directory: {}", default_dir.display());
        return default_dir.to_path_buf();
    }

    match fs::read_to_string(&redirect_file) {
        Ok(contents) => {
            let target = PathBuf::from(contents.trim());
            if target.is_dir() {
                info!("Found redirect file, using data directory: {}", target.display());
                target
            } else {
                warn!(
                    "Redirect file points to non-existent directory: {}. Using default.",
                    target.display()
                );
                default_dir.to_path_buf()
            }
        }
        Err(e) => {
            error!("Failed to read redirect file: {}. Using default directory.", e);
            default_dir.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_load_writes_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load_or_create(temp_dir.path()).unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.counter_interval_ms, 50);
        assert_eq!(config.grid_interval_ms, 60_000);
        assert!(temp_dir.path().join(CONFIG_FILE_NAME).exists());

        let reloaded = AppConfig::load_or_create(temp_dir.path()).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_partial_file_fills_missing_fields() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "counter_interval_ms: 1000\n").unwrap();

        let config = AppConfig::load_or_create(temp_dir.path()).unwrap();
        assert_eq!(config.counter_interval_ms, 1000);
        assert_eq!(config.default_target_age, 80);
        assert_eq!(config.quote_api_url, DEFAULT_QUOTE_API_URL);
    }

    #[test]
    fn test_invalid_file_falls_back_without_overwriting() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "counter_interval_ms: [not a number\n").unwrap();

        assert_eq!(AppConfig::load_or_create(temp_dir.path()).unwrap(), AppConfig::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "counter_interval_ms: [not a number\n");
    }

    #[test]
    fn test_out_of_range_target_age_uses_default() {
        let config = AppConfig {
            default_target_age: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.default_target_age(), TargetAge::default());

        let config = AppConfig {
            default_target_age: 95,
            ..AppConfig::default()
        };
        assert_eq!(config.default_target_age().years(), 95);
    }

    #[test]
    fn test_data_directory_precedence() {
        let temp_dir = TempDir::new().unwrap();
        let explicit = temp_dir.path().join("explicit");
        let default_dir = temp_dir.path().join("default");

        assert_eq!(
            choose_data_directory(Some(&explicit), Some("/from/env"), Some(&default_dir)),
            explicit
        );
        assert_eq!(
            choose_data_directory(None, Some("/from/env"), Some(&default_dir)),
            PathBuf::from("/from/env")
        );
        assert_eq!(choose_data_directory(None, Some("  "), Some(&default_dir)), default_dir);
        assert_eq!(choose_data_directory(None, None, Some(&default_dir)), default_dir);
    }

    #[test]
    fn test_redirect_file() {
        let temp_dir = TempDir::new().unwrap();
        let default_dir = temp_dir.path().join("default");
        let moved = temp_dir.path().join("moved");
        fs::create_dir_all(&default_dir).unwrap();

        assert_eq!(follow_redirect(&default_dir), default_dir);

        // redirect to a directory that does not exist yet is ignored
        fs::write(default_dir.join(REDIRECT_FILE_NAME), format!("{}\n", moved.display())).unwrap();
        assert_eq!(follow_redirect(&default_dir), default_dir);

        fs::create_dir_all(&moved).unwrap();
        assert_eq!(follow_redirect(&default_dir), moved);
    }
}
