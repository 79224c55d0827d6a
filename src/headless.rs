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

//! Window-less mode: drive the full frame pipeline into a recording backend
//! at the configured rate and report what was drawn.

use std::sync::PoisonError;

use log::info;

use radarscope_core::{FramePacer, FrameStats, PrimitiveCounts, QuadTree, RecordingBackend, SituationDisplay};

use crate::config::AppConfig;
use crate::feed::SharedStore;

/// Totals over a headless run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeadlessReport {
    pub frames: u32,
    pub redraws: u32,
    pub last: FrameStats,
    pub last_counts: PrimitiveCounts,
    pub mean_fps: f32,
}

pub fn run(config: &AppConfig, store: &SharedStore, tree: &QuadTree, frames: u32) -> HeadlessReport {
    let mut display = SituationDisplay::new(config.display_config(config.window_width, config.window_height));
    let mut pacer = FramePacer::new(config.fps);
    let mut backend = RecordingBackend::default();
    let mut report = HeadlessReport::default();
    let mut fps_sum = 0.0;

    for n in 0..frames {
        let now = pacer.begin();
        backend.reset();
        let stats = {
            let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
            display.frame(&mut backend, &mut store, tree, now)
        };
        let fps = pacer.finish();

        report.frames += 1;
        report.redraws += u32::from(stats.map_redrawn);
        report.last = stats;
        report.last_counts = backend.counts();
        if n > 0 {
            fps_sum += fps;
        }
    }
    if frames > 1 {
        report.mean_fps = fps_sum / (frames - 1) as f32;
    }

    let counts = report.last_counts;
    info!(
        "Headless run: {} frames, {} map redraws, {:.1} fps",
        report.frames, report.redraws, report.mean_fps
    );
    info!(
        "Last frame: {} lines, {} triangles, {} rects, {} circles, {} texts; {}/{} aircraft visible",
        counts.lines, counts.triangles, counts.rects, counts.circles, counts.texts, report.last.visible, report.last.total
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use radarscope_core::{AircraftStore, GeoPoint, LineSegment};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    #[test]
    fn test_headless_run_draws_map_and_traffic() {
        let config = AppConfig {
            center_lat: 52.3,
            center_lon: 4.76,
            fps: 200,
            window_width: 640.0,
            window_height: 480.0,
            ..AppConfig::default()
        };
        let tree = QuadTree::build(vec![LineSegment::new(GeoPoint::new(52.2, 4.6), GeoPoint::new(52.4, 4.9))]);

        let mut aircraft = AircraftStore::default();
        let now = Instant::now();
        aircraft.record_message(0x4840D6, now).flight = "KLM1023".to_string();
        aircraft.update_position(0x4840D6, GeoPoint::new(52.31, 4.77), now);
        let store = Arc::new(Mutex::new(aircraft));

        let report = run(&config, &store, &tree, 3);
        assert_eq!(report.frames, 3);
        assert!(report.redraws >= 1);
        assert_eq!(report.last.total, 1);
        assert_eq!(report.last.visible, 1);
        assert!(report.last.map_lines >= 1);
        assert!(report.last_counts.texts > 0);
    }
}
