// Configuration management for moodpipe
// Handles loading/saving settings, with sensible defaults when config is missing

use anyhow::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub playlist: PlaylistConfig,
    pub playback: PlaybackConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub per_task_timeout_ms: u64,
    pub overall_timeout_ms: u64,
    pub max_concurrency: Option<usize>, // unset = one task per query, no cap
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistConfig {
    pub tracks_per_trigger: usize,
    pub catalog_path: Option<PathBuf>, // built-in catalog when unset
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    pub default_volume: u8, // percent
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub filter: String,
    pub stderr: bool,
}

impl Default for Config {
    fn default() -> Self {
        let base_dir = config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("moodpipe");

        Self {
            resolver: ResolverConfig {
                per_task_timeout_ms: 8_000,
                overall_timeout_ms: 15_000,
                max_concurrency: None,
            },
            playlist: PlaylistConfig {
                tracks_per_trigger: 5,
                catalog_path: None,
            },
            playback: PlaybackConfig { default_volume: 50 },
            logging: LoggingConfig {
                directory: base_dir.join("logs"),
                filter: "info,moodpipe=debug".to_string(),
                stderr: false,
            },
        }
    }
}

impl ResolverConfig {
    pub fn per_task_timeout(&self) -> Duration {
        Duration::from_millis(self.per_task_timeout_ms)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }
}

impl Config {
    /// Load from the default location, writing the defaults there on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(Self::config_path()?)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolver.overall_timeout_ms == 0 || self.resolver.per_task_timeout_ms == 0 {
            anyhow::bail!("resolver timeouts must be greater than zero");
        }
        if self.resolver.max_concurrency == Some(0) {
            anyhow::bail!("resolver.max_concurrency must be at least 1");
        }
        if self.playback.default_volume > 100 {
            anyhow::bail!("playback.default_volume must be between 0 and 100");
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("moodpipe");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.resolver.max_concurrency = Some(3);
        config.playlist.catalog_path = Some(PathBuf::from("/tmp/catalog.toml"));
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.playlist.tracks_per_trigger, 5);
        assert!(config.resolver.overall_timeout() > config.resolver.per_task_timeout());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.resolver.max_concurrency = Some(0);
        config.save_to(&path).unwrap();
        assert!(Config::load_from(&path).is_err());

        let mut config = Config::default();
        config.playback.default_volume = 180;
        assert!(config.validate().is_err());
    }
}
