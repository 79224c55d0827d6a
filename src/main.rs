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

//! Radarscope: a real-time aircraft situation display for BaseStation feeds.

mod app;
mod cli;
mod config;
mod feed;
mod headless;
mod painter;

use std::io::Write;
use std::sync::{Arc, Mutex};

use clap::Parser;
use log::{error, info, warn};
use mimalloc::MiMalloc;

use radarscope_core::{load_map_file, AircraftStore, QuadTree};

use crate::app::RadarscopeApp;
use crate::cli::Args;
use crate::config::AppConfig;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn setup_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                record.level(),
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .init();
}

fn load_config(args: &Args) -> AppConfig {
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {e}");
        AppConfig::default()
    });
    args.apply(&mut config);

    if args.save_config {
        match config.save() {
            Ok(()) => match AppConfig::get_config_path() {
                Ok(path) => info!("Saved configuration to {}", path.display()),
                Err(_) => info!("Saved configuration"),
            },
            Err(e) => error!("Failed to save config: {e}"),
        }
    }
    config
}

fn load_map(config: &AppConfig) -> QuadTree {
    let Some(path) = &config.map_path else {
        info!("No map data configured");
        return QuadTree::default();
    };
    match load_map_file(path) {
        Ok(segments) => {
            let tree = QuadTree::build(segments);
            info!("Map index: {} nodes, depth {}", tree.node_count(), tree.depth());
            tree
        }
        Err(e) => {
            error!("Failed to load map data from {}: {e}", path.display());
            QuadTree::default()
        }
    }
}

fn main() -> Result<(), eframe::Error> {
    setup_logging();
    let args = Args::parse();
    let config = load_config(&args);
    let tree = load_map(&config);

    let store = Arc::new(Mutex::new(AircraftStore::default()));
    if let Err(e) = feed::spawn_feed(config.server_address.clone(), Arc::clone(&store)) {
        error!("Failed to start feed thread: {e}");
    }

    if let Some(frames) = args.headless {
        headless::run(&config, &store, &tree, frames);
        return Ok(());
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_fullscreen(config.fullscreen)
            .with_title("Radarscope"),
        ..Default::default()
    };

    eframe::run_native(
        "Radarscope",
        options,
        Box::new(move |_cc| Ok(Box::new(RadarscopeApp::new(&config, store, tree)))),
    )
}
