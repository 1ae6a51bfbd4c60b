use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::browser::{BrowserOptions, Readiness};
use crate::{DeviceProfile, Viewport};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] toml::de::Error),
}

/// Per-run defaults, loaded from TOML. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub viewport: Viewport,
    pub device_scale_factor: f64,
    pub headless: bool,
    pub wait_until: Readiness,
    /// Re-type font responses by file suffix during render passes.
    pub retype_fonts: bool,
    pub timeouts: Timeouts,
    pub node_command: String,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    #[serde(with = "humantime_serde")]
    pub navigation: Duration,
    #[serde(with = "humantime_serde")]
    pub network_idle: Duration,
    #[serde(with = "humantime_serde")]
    pub process: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(30),
            network_idle: Duration::from_secs(10),
            process: Duration::from_secs(45),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            device_scale_factor: 2.0,
            headless: true,
            wait_until: Readiness::NetworkIdle,
            retype_fonts: true,
            timeouts: Timeouts::default(),
            node_command: "node".to_string(),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Config {
    /// `~/.config/pagetrim/config.toml`, when a home directory is known.
    pub fn central_config_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("pagetrim")
                    .join("config.toml")
            })
    }

    /// Priority: explicit path > central config (if present) > defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::central_config_path() {
            Some(central) if central.is_file() => Self::from_file(&central),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(format!("viewport must be non-zero, got {}", self.viewport));
        }
        if !(self.device_scale_factor.is_finite() && self.device_scale_factor > 0.0) {
            return Err(format!(
                "device_scale_factor must be positive, got {}",
                self.device_scale_factor
            ));
        }
        for (name, value) in [
            ("timeouts.navigation", self.timeouts.navigation),
            ("timeouts.network_idle", self.timeouts.network_idle),
            ("timeouts.process", self.timeouts.process),
        ] {
            if value.is_zero() {
                return Err(format!("{name} must be greater than zero"));
            }
        }
        if self.node_command.trim().is_empty() {
            return Err("node_command must not be empty".to_string());
        }
        Ok(())
    }

    pub fn device(&self) -> DeviceProfile {
        DeviceProfile::mobile(self.viewport, self.device_scale_factor)
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            node_command: self.node_command.clone(),
            headless: self.headless,
            navigation_timeout: self.timeouts.navigation,
            network_idle_timeout: self.timeouts.network_idle,
            process_timeout: self.timeouts.process,
            ..BrowserOptions::default()
        }
    }
}
