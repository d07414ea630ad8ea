// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::types::Facing;
use crate::constants::{gesture, scanner, zoom};
use cosmic::cosmic_config::{self, CosmicConfigEntry, cosmic_config_derive::CosmicConfigEntry};
use cosmic::{Theme, theme};
use serde::{Deserialize, Serialize};

/// Application theme preference
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum AppTheme {
    /// Follow the system setting
    #[default]
    System,
    Dark,
    Light,
}

impl AppTheme {
    pub fn theme(&self) -> Theme {
        match self {
            Self::Dark => {
                let mut theme = theme::system_dark();
                theme.theme_type.prefer_dark(Some(true));
                theme
            }
            Self::Light => {
                let mut theme = theme::system_light();
                theme.theme_type.prefer_dark(Some(false));
                theme
            }
            Self::System => theme::system_preference(),
        }
    }
}

#[derive(Debug, Clone, CosmicConfigEntry, PartialEq, Serialize, Deserialize)]
#[version = 1]
pub struct Config {
    /// Application theme preference (System, Dark, Light)
    pub app_theme: AppTheme,
    /// Facing selected when the camera screen mounts
    pub default_facing: Facing,
    /// Device path forced for the front facing
    pub front_camera: Option<String>,
    /// Device path forced for the back facing
    pub back_camera: Option<String>,
    /// Prefer an ultra-wide lens when one matches the facing
    pub prefer_ultra_wide: bool,
    /// Shutter hold time that starts a recording
    pub long_press_ms: u64,
    /// Upper zoom limit for devices without a hardware zoom control
    pub max_digital_zoom: f32,
    /// Minimum spacing between scanner passes in code-scan mode
    pub scan_interval_ms: u64,
    /// Record the microphone alongside video when permitted
    pub record_audio: bool,
    /// Outbox used by the upload stand-in (empty = default)
    pub upload_dir: String,
    /// Photo and video directory override (empty = XDG defaults)
    pub save_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_theme: AppTheme::default(),
            default_facing: Facing::Back,
            front_camera: None,
            back_camera: None,
            prefer_ultra_wide: true,
            long_press_ms: gesture::DEFAULT_LONG_PRESS_MS,
            max_digital_zoom: zoom::DEFAULT_MAX_DIGITAL_ZOOM,
            scan_interval_ms: scanner::DEFAULT_SCAN_INTERVAL_MS,
            record_audio: true,
            upload_dir: String::new(),
            save_dir: String::new(),
        }
    }
}

impl Config {
    /// Load from cosmic-config, falling back to defaults on any failure
    pub fn load(app_id: &str) -> (Option<cosmic_config::Config>, Self) {
        match cosmic_config::Config::new(app_id, Self::VERSION) {
            Ok(handler) => {
                let config = match Self::get_entry(&handler) {
                    Ok(config) => config,
                    Err((errors, config)) => {
                        for why in errors {
                            tracing::error!(%why, "Error loading app config");
                        }
                        config
                    }
                };
                (Some(handler), config)
            }
            Err(why) => {
                tracing::warn!(%why, "Config unavailable, using defaults");
                (None, Self::default())
            }
        }
    }

    pub fn save_dir_override(&self) -> Option<&str> {
        Some(self.save_dir.as_str()).filter(|d| !d.is_empty())
    }

    pub fn upload_dir_override(&self) -> Option<&str> {
        Some(self.upload_dir.as_str()).filter(|d| !d.is_empty())
    }
}
