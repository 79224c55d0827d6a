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

//! Per-frame orchestration of the whole display.
//!
//! [`SituationDisplay::frame`] runs one frame in a fixed order: ease the view
//! toward its animation target, relax the labels, composite the map layer,
//! draw aircraft, then the overlays. Pointer input is handed in as screen
//! coordinates between frames.

use std::time::{Duration, Instant};

use log::debug;

use crate::aircraft::{Aircraft, AircraftStore};
use crate::backend::{DrawBackend, Point2};
use crate::color::Rgba;
use crate::geo::GeoPoint;
use crate::labels::LabelSolver;
use crate::overlay::{status_entries, OverlayRenderer};
use crate::quadtree::QuadTree;
use crate::render::AircraftRenderer;
use crate::style::{LabelConfig, Style};
use crate::view::{MapView, ViewState, DEFAULT_RADIUS};

/// Pixel radius within which a tap selects an aircraft.
pub const SELECT_RADIUS: f32 = 30.0;
/// Double tap zooms to this fraction of the current radius.
const TAP_ZOOM: f64 = 0.25;

/// Startup parameters of a [`SituationDisplay`].
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub center: GeoPoint,
    pub radius: f64,
    pub screen_width: f32,
    pub screen_height: f32,
    pub ui_scale: f32,
    pub fps: u32,
    pub style: Style,
    pub labels: LabelConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            center: GeoPoint::new(37.7749, -122.4194),
            radius: DEFAULT_RADIUS,
            screen_width: 800.0,
            screen_height: 600.0,
            ui_scale: 1.0,
            fps: 60,
            style: Style::default(),
            labels: LabelConfig::default(),
        }
    }
}

/// What one frame drew.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub map_lines: usize,
    pub map_redrawn: bool,
    /// Aircraft drawn on screen, off-screen indicators excluded.
    pub visible: usize,
    pub total: usize,
    pub fps: f32,
}

#[derive(Debug)]
pub struct SituationDisplay {
    view: MapView,
    solver: LabelSolver,
    aircraft: AircraftRenderer,
    overlay: OverlayRenderer,
    background: Rgba,
    click: Option<(Point2, Instant)>,
    cursor: Option<(Point2, Instant)>,
    selected_at: Option<Instant>,
    last_frame: Option<Instant>,
    fps: f32,
}

impl SituationDisplay {
    #[must_use]
    pub fn new(config: DisplayConfig) -> Self {
        let mut state = ViewState::new(config.center, config.screen_width, config.screen_height);
        state.radius = config.radius;
        state.ui_scale = config.ui_scale;

        let mut aircraft = AircraftRenderer::new(config.style.clone(), &config.labels);
        aircraft.set_ui_scale(config.ui_scale);
        let mut overlay = OverlayRenderer::new(config.style.clone());
        overlay.set_ui_scale(config.ui_scale);

        let mut solver = LabelSolver::new(config.labels);
        solver.set_ui_scale(config.ui_scale);

        Self {
            view: MapView::new(state, frame_time(config.fps)),
            solver,
            aircraft,
            overlay,
            background: config.style.background,
            click: None,
            cursor: None,
            selected_at: None,
            last_frame: None,
            fps: 0.0,
        }
    }

    #[must_use]
    pub fn view(&self) -> &MapView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut MapView {
        &mut self.view
    }

    pub fn set_ui_scale(&mut self, ui_scale: f32) {
        self.view.set_ui_scale(ui_scale);
        self.solver.set_ui_scale(ui_scale);
        self.aircraft.set_ui_scale(ui_scale);
        self.overlay.set_ui_scale(ui_scale);
    }

    pub fn set_fps(&mut self, fps: u32) {
        self.view.set_frame_time(frame_time(fps));
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.view.resize(width, height);
    }

    pub fn pan_by_pixels(&mut self, dx: f32, dy: f32) {
        self.view.pan_by_pixels(dx, dy);
    }

    pub fn zoom_by(&mut self, factor: f64) {
        self.view.zoom_by(factor);
    }

    pub fn move_center_to_pixel(&mut self, x: f32, y: f32) {
        self.view.move_center_to_pixel(x, y);
    }

    /// Handle a tap. One tap selects the nearest aircraft within
    /// [`SELECT_RADIUS`] (or clears the selection when none is close); two
    /// taps zoom in on the tapped point.
    pub fn register_click(&mut self, store: &mut AircraftStore, taps: u32, x: f32, y: f32, now: Instant) {
        let at = Point2::new(x, y);
        self.click = Some((at, now));
        match taps {
            1 => {
                let nearest = store
                    .iter()
                    .filter(|a| a.label.anchored)
                    .map(|a| (a.addr, at.distance_sq(Point2::new(a.label.cx, a.label.cy))))
                    .filter(|&(_, d2)| d2 <= SELECT_RADIUS * SELECT_RADIUS)
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(addr, _)| addr);

                match nearest {
                    Some(addr) => {
                        if store.selected_addr() != Some(addr) {
                            self.selected_at = Some(now);
                        }
                        store.select(Some(addr));
                        if let Some(pos) = store.get(addr).and_then(|a| a.fix()) {
                            self.view.animate_center_to(pos);
                        }
                        debug!("Selected aircraft {addr:06X}");
                    }
                    None => store.clear_selection(),
                }
            }
            2 => {
                let radius = self.view.state().radius * TAP_ZOOM;
                self.view.animate_radius_to(radius);
                self.view.animate_center_to_pixel(x, y);
            }
            _ => {}
        }
    }

    pub fn register_pointer_move(&mut self, x: f32, y: f32, now: Instant) {
        self.cursor = Some((Point2::new(x, y), now));
    }

    /// Draw one complete frame.
    pub fn frame(
        &mut self,
        backend: &mut dyn DrawBackend,
        store: &mut AircraftStore,
        tree: &QuadTree,
        now: Instant,
    ) -> FrameStats {
        self.measure_fps(now);
        // the view keeps chasing the selected aircraft
        if let Some(pos) = store.selected().and_then(Aircraft::fix) {
            self.view.animate_center_to(pos);
        }
        self.view.step_animation();

        let (width, height) = (self.view.state().width, self.view.state().height);
        self.solver.solve(store.as_mut_slice(), width, height);

        backend.clear(self.background);
        let map = self.view.composite(backend, tree, self.aircraft.style(), now);

        let proj = self.view.projection();
        self.aircraft.draw_trails(backend, &proj, store);
        let visible = self.aircraft.draw_aircraft(backend, &proj, store, now);

        let stats = store.stats(visible);
        self.overlay.draw_scale_bar(backend, &proj);
        self.overlay
            .draw_status(backend, &proj, &status_entries(proj.center, &stats));

        if let Some((at, when)) = self.click {
            self.overlay.draw_click(backend, at, millis_since(when, now));
        }
        if let Some(selected) = store.selected().filter(|a| a.label.anchored) {
            let at = Point2::new(selected.label.cx, selected.label.cy);
            let elapsed = self.selected_at.map_or(f32::MAX, |t| millis_since(t, now));
            self.overlay.draw_selection_box(backend, at, elapsed);
        }
        if let Some((at, when)) = self.cursor {
            self.overlay.draw_cursor(backend, at, millis_since(when, now));
        }
        self.overlay
            .draw_frame_info(backend, &proj, map.lines, self.fps);

        FrameStats {
            map_lines: map.lines,
            map_redrawn: map.redrawn,
            visible,
            total: stats.total,
            fps: self.fps,
        }
    }

    fn measure_fps(&mut self, now: Instant) {
        if let Some(prev) = self.last_frame {
            let dt = now.saturating_duration_since(prev).as_secs_f32();
            if dt > 0.0 {
                let instant = 1.0 / dt;
                self.fps = if self.fps > 0.0 {
                    0.9 * self.fps + 0.1 * instant
                } else {
                    instant
                };
            }
        }
        self.last_frame = Some(now);
    }
}

fn frame_time(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

fn millis_since(then: Instant, now: Instant) -> f32 {
    now.saturating_duration_since(then).as_secs_f32() * 1000.0
}

/// Fixed-rate frame scheduler on the monotonic clock.
#[derive(Debug)]
pub struct FramePacer {
    frame_time: Duration,
    started: Instant,
    last_finish: Option<Instant>,
}

impl FramePacer {
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            frame_time: frame_time(fps),
            started: Instant::now(),
            last_finish: None,
        }
    }

    #[must_use]
    pub fn frame_time(&self) -> Duration {
        self.frame_time
    }

    /// Stamp the start of a frame.
    pub fn begin(&mut self) -> Instant {
        self.started = Instant::now();
        self.started
    }

    /// Unused part of the current frame budget.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.frame_time.saturating_sub(self.started.elapsed())
    }

    /// Sleep out the rest of the frame budget and return the achieved frame
    /// rate, measured between consecutive calls.
    pub fn finish(&mut self) -> f32 {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
        let now = Instant::now();
        let fps = self
            .last_finish
            .map(|prev| now.saturating_duration_since(prev).as_secs_f32())
            .filter(|&dt| dt > 0.0)
            .map_or(0.0, |dt| 1.0 / dt);
        self.last_finish = Some(now);
        fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ScreenRect;
    use crate::geo::LineSegment;
    use crate::recording::RecordingBackend;

    fn scenario() -> (SituationDisplay, AircraftStore, Instant) {
        let display = SituationDisplay::new(DisplayConfig {
            center: GeoPoint::new(0.0, 0.0),
            radius: 25.0,
            screen_width: 800.0,
            screen_height: 600.0,
            ..Default::default()
        });
        let now = Instant::now();
        let then = now - Duration::from_secs(1);

        let mut store = AircraftStore::default();
        let a = store.record_message(0x4840D6, then);
        a.flight = "KLM1023".to_string();
        a.altitude = 12000;
        a.speed = 250;
        a.heading = 90.0;
        store.update_position(0x4840D6, GeoPoint::new(0.01, 0.01), then);
        (display, store, now)
    }

    #[test]
    fn test_single_aircraft_frame() {
        let (mut display, mut store, now) = scenario();
        let tree = QuadTree::default();
        let mut backend = RecordingBackend::default();

        let mut stats = FrameStats::default();
        for i in 0..3 {
            backend.reset();
            stats = display.frame(&mut backend, &mut store, &tree, now + Duration::from_millis(16 * i));
        }
        assert_eq!((stats.visible, stats.total), (1, 1));
        assert!(backend.has_text("1/1"));
        assert!(backend.has_text("KLM1023"));

        let tris: Vec<[Point2; 3]> = backend.triangles().map(|(t, _)| t).collect();
        assert_eq!(tris.len(), 3);
        let label = store.get(0x4840D6).unwrap().label.clone();
        // near the center, nose pointing east
        assert!((label.cx - 400.0).abs() < 30.0 && (label.cy - 300.0).abs() < 30.0);
        let nose = tris[0][0];
        assert!(nose.x > label.cx);
        assert!((nose.y - label.cy).abs() < 1e-3);

        let pts = tris.iter().flatten();
        let icon = pts.fold(
            ScreenRect::new(f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |r, p| ScreenRect::new(r.left.min(p.x), r.top.min(p.y), r.right.max(p.x), r.bottom.max(p.y)),
        );
        let label_rect = ScreenRect::new(label.x, label.y, label.x + label.w, label.y + label.h);
        assert!(label.w > 0.0 && label.h > 0.0);
        assert!(icon.overlap_area(&label_rect) <= 0.0);
        assert!(label_rect.left - icon.right < 20.0);
    }

    #[test]
    fn test_tap_selects_nearest_then_clears() {
        let (mut display, mut store, now) = scenario();
        let tree = QuadTree::default();
        let mut backend = RecordingBackend::default();
        display.frame(&mut backend, &mut store, &tree, now);

        let label = store.get(0x4840D6).unwrap().label.clone();
        display.register_click(&mut store, 1, label.cx + 10.0, label.cy + 10.0, now);
        assert_eq!(store.selected_addr(), Some(0x4840D6));
        assert!(display.view().target().center.is_some());

        display.register_click(&mut store, 1, label.cx + 100.0, label.cy, now);
        assert!(store.selected().is_none());
    }

    #[test]
    fn test_view_follows_selected_aircraft() {
        let (mut display, mut store, now) = scenario();
        let tree = QuadTree::default();
        let mut backend = RecordingBackend::default();
        store.select(Some(0x4840D6));

        let mut lon = 0.01;
        for i in 1..=300 {
            lon += 0.001;
            let t = now + Duration::from_millis(16 * i);
            store.update_position(0x4840D6, GeoPoint::new(0.01, lon), t);
            backend.reset();
            display.frame(&mut backend, &mut store, &tree, t);
        }

        let center = display.view().state().center;
        // steady-state lag of a 10% ease at 0.001 deg per frame is 0.009 deg
        assert!((center.lon - lon).abs() < 0.02, "center {center:?}, aircraft lon {lon}");
        assert!((center.lat - 0.01).abs() < 1e-3);

        store.clear_selection();
        for i in 301..=500 {
            display.frame(&mut backend, &mut store, &tree, now + Duration::from_millis(16 * i));
        }
        assert!(!display.view().target().is_active());
    }

    #[test]
    fn test_frame_survives_empty_viewport() {
        let (mut display, mut store, now) = scenario();
        let tree = QuadTree::build(vec![LineSegment::new(
            GeoPoint::new(-0.05, -0.05),
            GeoPoint::new(0.05, 0.05),
        )]);
        let mut backend = RecordingBackend::default();
        display.frame(&mut backend, &mut store, &tree, now);

        display.resize(0.0, 0.0);
        backend.reset();
        let stats = display.frame(&mut backend, &mut store, &tree, now + Duration::from_millis(16));
        assert_eq!(stats.total, 1);
        assert_eq!(stats.visible, 0);
    }

    #[test]
    fn test_double_tap_zooms_toward_point() {
        let (mut display, mut store, now) = scenario();
        display.register_click(&mut store, 2, 600.0, 300.0, now);
        let target = *display.view().target();
        assert!((target.radius.unwrap() - 6.25).abs() < 1e-9);
        assert!(target.center.unwrap().lon > 0.0);

        let tree = QuadTree::build(vec![LineSegment::new(
            GeoPoint::new(-0.05, -0.05),
            GeoPoint::new(0.05, 0.05),
        )]);
        let mut backend = RecordingBackend::default();
        for i in 0..200 {
            display.frame(&mut backend, &mut store, &tree, now + Duration::from_millis(16 * i));
            backend.reset();
        }
        assert!(!display.view().target().is_active());
        assert!((display.view().state().radius - 6.25).abs() < 1e-3);
    }

    #[test]
    fn test_frame_pacer_budget() {
        let mut pacer = FramePacer::new(50);
        assert_eq!(pacer.frame_time(), Duration::from_millis(20));
        pacer.begin();
        assert!(pacer.remaining() <= Duration::from_millis(20));
        pacer.finish();
        pacer.begin();
        let fps = pacer.finish();
        assert!(fps > 0.0 && fps <= 55.0, "fps {fps}");
    }
}
