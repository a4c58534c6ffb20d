use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub capture: CaptureConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding captured blobs. Empty = platform data dir.
    pub captures_dir: Option<PathBuf>,
    /// SQLite database path. Empty = platform data dir.
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device node used for photo and video capture.
    pub camera_device: String,
    /// Microphone sample rate in Hz.
    pub sample_rate: u32,
    /// Requested video frame size.
    pub video_width: u32,
    pub video_height: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            captures_dir: None,
            db_path: None,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_device: "/dev/video0".to_string(),
            sample_rate: 44_100,
            video_width: 1280,
            video_height: 720,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3846 }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Blob directory, honoring the config override.
    pub fn captures_dir(&self) -> Result<PathBuf> {
        match &self.storage.captures_dir {
            Some(dir) => Ok(dir.clone()),
            None => global::captures_dir(),
        }
    }

    /// Database path, honoring the config override.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(path.clone()),
            None => global::db_file(),
        }
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
