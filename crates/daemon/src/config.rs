//! Configuration management for the xtray daemon.
//!
//! Configuration is loaded from the first TOML file found in these locations:
//! 1. `--config <PATH>` on the command line
//! 2. `$XDG_CONFIG_HOME/xtray/config.toml` (platform config dir)
//! 3. `~/.config/xtray/config.toml`
//! 4. `./config.toml` (current directory, for development)

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use xtray_core::{TrayGeometry, TrayOptions};

/// Main configuration structure for xtray.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// X display to connect to (e.g. ":1"). Defaults to `$DISPLAY`.
    pub display: Option<String>,
    /// Host window geometry and icon slots.
    pub geometry: TrayGeometry,
    /// Appearance configuration.
    pub appearance: AppearanceConfig,
    /// Behavior configuration.
    pub behavior: BehaviorConfig,
}

/// Appearance-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    /// Title stored on the host window.
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
        }
    }
}

/// Behavior-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_title() -> String {
    "X11 System Tray".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A configuration value that was out of range and has been reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Config {
    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Reset out-of-range values to their defaults.
    ///
    /// Returns one warning per corrected field.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let defaults = TrayGeometry::default();
        let geometry = &mut self.geometry;

        if geometry.width <= 0 {
            warnings.push(ConfigWarning::new(
                "geometry.width",
                format!("{} is not positive, using {}", geometry.width, defaults.width),
            ));
            geometry.width = defaults.width;
        }
        if geometry.height <= 0 {
            warnings.push(ConfigWarning::new(
                "geometry.height",
                format!("{} is not positive, using {}", geometry.height, defaults.height),
            ));
            geometry.height = defaults.height;
        }
        if geometry.icon_size <= 0 {
            warnings.push(ConfigWarning::new(
                "geometry.icon_size",
                format!(
                    "{} is not positive, using {}",
                    geometry.icon_size, defaults.icon_size
                ),
            ));
            geometry.icon_size = defaults.icon_size;
        }
        if geometry.icon_padding < 0 {
            warnings.push(ConfigWarning::new(
                "geometry.icon_padding",
                format!(
                    "{} is negative, using {}",
                    geometry.icon_padding, defaults.icon_padding
                ),
            ));
            geometry.icon_padding = defaults.icon_padding;
        }
        if geometry.left_margin < 0 {
            warnings.push(ConfigWarning::new(
                "geometry.left_margin",
                format!(
                    "{} is negative, using {}",
                    geometry.left_margin, defaults.left_margin
                ),
            ));
            geometry.left_margin = defaults.left_margin;
        }

        let level = self.behavior.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            warnings.push(ConfigWarning::new(
                "behavior.log_level",
                format!("unknown level '{}', using info", self.behavior.log_level),
            ));
            self.behavior.log_level = default_log_level();
        }

        warnings
    }

    /// Startup options for the tray on `screen`.
    pub fn tray_options(&self, screen: usize) -> TrayOptions {
        TrayOptions {
            geometry: self.geometry,
            title: self.appearance.title.clone(),
            screen,
        }
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Platform config dir: ~/.config/xtray/config.toml on Linux
    if let Some(proj_dirs) = ProjectDirs::from("", "", "xtray") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    // 2. Unix-style fallback when XDG_CONFIG_HOME points elsewhere
    if let Some(home) = dirs_home() {
        let path = home.join(".config").join("xtray").join("config.toml");
        if !paths.contains(&path) {
            paths.push(path);
        }
    }

    // 3. Current directory: ./config.toml
    paths.push(PathBuf::from("config.toml"));

    paths
}

/// First config file that exists in the standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    first_existing(config_paths())
}

fn first_existing(paths: Vec<PathBuf>) -> Option<PathBuf> {
    paths.into_iter().find(|path| path.exists())
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
