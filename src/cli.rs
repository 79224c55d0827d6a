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

//! Command line flags. Each one overrides the stored configuration for a
//! single run unless `--save-config` is given.

use std::path::PathBuf;

use clap::Parser;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// BaseStation feed address (host:port)
    #[arg(long)]
    pub server: Option<String>,

    /// Initial center latitude
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Initial center longitude
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Initial view radius in km
    #[arg(long)]
    pub radius: Option<f64>,

    /// Map geometry file (.bin, .json, .geojson, optionally .gz)
    #[arg(long)]
    pub map: Option<PathBuf>,

    #[arg(long)]
    pub ui_scale: Option<f32>,

    /// Target frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Use km and km/h
    #[arg(long, default_value_t = false)]
    pub metric: bool,

    #[arg(long, default_value_t = false)]
    pub fullscreen: bool,

    /// Render this many frames without a window, then exit
    #[arg(long, value_name = "FRAMES")]
    pub headless: Option<u32>,

    /// Persist the effective configuration
    #[arg(long, default_value_t = false)]
    pub save_config: bool,
}

impl Args {
    /// Layer the given flags over `config`.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(server) = &self.server {
            config.server_address.clone_from(server);
        }
        if let Some(lat) = self.lat {
            config.center_lat = lat;
        }
        if let Some(lon) = self.lon {
            config.center_lon = lon;
        }
        if let Some(radius) = self.radius {
            config.radius = radius;
        }
        if let Some(map) = &self.map {
            config.map_path = Some(map.clone());
        }
        if let Some(ui_scale) = self.ui_scale {
            config.ui_scale = ui_scale;
        }
        if let Some(fps) = self.fps {
            config.fps = fps.max(1);
        }
        config.metric |= self.metric;
        config.fullscreen |= self.fullscreen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "radarscope",
            "--server",
            "10.0.0.5:30003",
            "--lat",
            "-33.94",
            "--lon",
            "151.17",
            "--map",
            "coast.bin.gz",
            "--fps",
            "0",
            "--metric",
        ])
        .unwrap();

        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.server_address, "10.0.0.5:30003");
        assert!((config.center_lat + 33.94).abs() < 1e-9);
        assert!((config.center_lon - 151.17).abs() < 1e-9);
        assert_eq!(config.map_path, Some(PathBuf::from("coast.bin.gz")));
        assert_eq!(config.fps, 1);
        assert!(config.metric);
        assert!(!config.fullscreen);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::try_parse_from(["radarscope", "--headless", "10"]).unwrap();
        let mut config = AppConfig {
            metric: true,
            ..AppConfig::default()
        };
        args.apply(&mut config);
        assert_eq!(config, AppConfig { metric: true, ..AppConfig::default() });
        assert_eq!(args.headless, Some(10));
    }
}
