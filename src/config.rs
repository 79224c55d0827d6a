// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Settings persist as TOML through `confy`. Every field carries a serde
//! default so older files keep loading as new settings are added.

use std::path::PathBuf;

use log::info;
use serde::{Deserialize, Serialize};

use radarscope_core::{DisplayConfig, GeoPoint, LabelConfig, Style};

const APP_NAME: &str = "radarscope";
const CONFIG_NAME: &str = "config";

/// Default BaseStation feed address (dump1090 `--net-sbs-port`).
pub const DEFAULT_SERVER_ADDRESS: &str = "localhost:30003";

const CURRENT_CONFIG_VERSION: u32 = 1;

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// BaseStation feed in host:port format
    #[serde(default = "default_server")]
    pub server_address: String,

    #[serde(default = "default_center_lat")]
    pub center_lat: f64,

    #[serde(default = "default_center_lon")]
    pub center_lon: f64,

    /// Initial view radius in km
    #[serde(default = "default_radius")]
    pub radius: f64,

    #[serde(default = "default_ui_scale")]
    pub ui_scale: f32,

    /// Show km and km/h instead of miles and mph
    #[serde(default)]
    pub metric: bool,

    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Coastline/border geometry, binary or GeoJSON, optionally gzipped
    #[serde(default)]
    pub map_path: Option<PathBuf>,

    #[serde(default = "default_window_width")]
    pub window_width: f32,

    #[serde(default = "default_window_height")]
    pub window_height: f32,

    #[serde(default)]
    pub fullscreen: bool,

    #[serde(default)]
    pub style: Style,

    #[serde(default)]
    pub labels: LabelConfig,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    CURRENT_CONFIG_VERSION
}

fn default_server() -> String {
    DEFAULT_SERVER_ADDRESS.to_string()
}

fn default_center_lat() -> f64 {
    37.7749
}

fn default_center_lon() -> f64 {
    -122.4194
}

fn default_radius() -> f64 {
    25.0
}

fn default_ui_scale() -> f32 {
    1.0
}

fn default_fps() -> u32 {
    60
}

fn default_window_width() -> f32 {
    1024.0
}

fn default_window_height() -> f32 {
    768.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            server_address: default_server(),
            center_lat: default_center_lat(),
            center_lon: default_center_lon(),
            radius: default_radius(),
            ui_scale: default_ui_scale(),
            metric: false,
            fps: default_fps(),
            map_path: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
            fullscreen: false,
            style: Style::default(),
            labels: LabelConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        let mut config: AppConfig = confy::load(APP_NAME, CONFIG_NAME)?;

        if config.config_version < CURRENT_CONFIG_VERSION {
            info!(
                "Upgrading configuration from version {} to {}",
                config.config_version, CURRENT_CONFIG_VERSION
            );
            config.config_version = CURRENT_CONFIG_VERSION;
            config.save()?;
        }

        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    #[must_use]
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.center_lat, self.center_lon)
    }

    /// Display startup parameters for a viewport of the given size.
    #[must_use]
    pub fn display_config(&self, width: f32, height: f32) -> DisplayConfig {
        let mut style = self.style.clone();
        style.metric = self.metric;
        DisplayConfig {
            center: self.center(),
            radius: self.radius,
            screen_width: width,
            screen_height: height,
            ui_scale: self.ui_scale,
            fps: self.fps,
            style,
            labels: self.labels.clone(),
        }
    }
}
