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

//! The windowed application: owns the display, maps egui input onto it and
//! paints each frame through [`EguiBackend`].

use std::sync::PoisonError;
use std::time::Instant;

use egui::{Key, Pos2, Sense};
use log::info;

use radarscope_core::{FramePacer, QuadTree, SituationDisplay};

use crate::config::AppConfig;
use crate::feed::SharedStore;
use crate::painter::{EguiBackend, FontSizes};

// Radius change per scrolled point.
const SCROLL_ZOOM_RATE: f64 = 0.002;
const KEY_PAN_STEP: f32 = 50.0;
const KEY_ZOOM_STEP: f64 = 1.25;

/// Radius factor for one frame of scrolling and pinching.
///
/// Scrolling up or spreading fingers zooms in, which shrinks the radius.
#[must_use]
pub fn zoom_factor(scroll_y: f32, pinch: f32) -> f64 {
    let scroll = (-f64::from(scroll_y) * SCROLL_ZOOM_RATE).exp();
    let pinch = if pinch > 0.0 { 1.0 / f64::from(pinch) } else { 1.0 };
    scroll * pinch
}

pub struct RadarscopeApp {
    display: SituationDisplay,
    store: SharedStore,
    tree: QuadTree,
    pacer: FramePacer,
    fonts: FontSizes,
    last_pointer: Option<Pos2>,
}

impl std::fmt::Debug for RadarscopeApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarscopeApp")
            .field("map_segments", &self.tree.len())
            .field("last_pointer", &self.last_pointer)
            .finish_non_exhaustive()
    }
}

impl RadarscopeApp {
    #[must_use]
    pub fn new(config: &AppConfig, store: SharedStore, tree: QuadTree) -> Self {
        let display = SituationDisplay::new(config.display_config(config.window_width, config.window_height));
        info!("Display initialized at {:?}, radius {} km", config.center(), config.radius);
        Self {
            display,
            store,
            tree,
            pacer: FramePacer::new(config.fps),
            fonts: FontSizes::new(&config.style, config.ui_scale),
            last_pointer: None,
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context, response: &egui::Response, origin: Pos2, now: Instant) {
        if response.dragged() {
            let delta = response.drag_delta();
            self.display.pan_by_pixels(delta.x, delta.y);
        }

        let (scroll, pinch) = ctx.input(|i| (i.smooth_scroll_delta.y, i.zoom_delta()));
        if response.hovered() && (scroll != 0.0 || (pinch - 1.0).abs() > f32::EPSILON) {
            self.display.zoom_by(zoom_factor(scroll, pinch));
        }

        let taps = if response.double_clicked() {
            2
        } else if response.clicked() {
            1
        } else {
            0
        };
        if taps > 0 {
            if let Some(pos) = response.interact_pointer_pos() {
                let local = pos - origin;
                let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
                self.display.register_click(&mut store, taps, local.x, local.y, now);
            }
        }

        if let Some(pos) = response.hover_pos() {
            if self.last_pointer != Some(pos) {
                let local = pos - origin;
                self.display.register_pointer_move(local.x, local.y, now);
                self.last_pointer = Some(pos);
            }
        }

        ctx.input(|i| {
            if i.key_pressed(Key::ArrowLeft) {
                self.display.pan_by_pixels(KEY_PAN_STEP, 0.0);
            }
            if i.key_pressed(Key::ArrowRight) {
                self.display.pan_by_pixels(-KEY_PAN_STEP, 0.0);
            }
            if i.key_pressed(Key::ArrowUp) {
                self.display.pan_by_pixels(0.0, KEY_PAN_STEP);
            }
            if i.key_pressed(Key::ArrowDown) {
                self.display.pan_by_pixels(0.0, -KEY_PAN_STEP);
            }
            if i.key_pressed(Key::Plus) || i.key_pressed(Key::Equals) {
                self.display.zoom_by(1.0 / KEY_ZOOM_STEP);
            }
            if i.key_pressed(Key::Minus) {
                self.display.zoom_by(KEY_ZOOM_STEP);
            }
        });
        if ctx.input(|i| i.key_pressed(Key::Escape)) {
            self.store.lock().unwrap_or_else(PoisonError::into_inner).clear_selection();
        }
    }
}

impl eframe::App for RadarscopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = self.pacer.begin();

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
                let canvas = response.rect;
                self.display.resize(canvas.width(), canvas.height());
                self.handle_input(ctx, &response, canvas.min, now);

                let mut backend = EguiBackend::new(&painter, canvas, self.fonts);
                let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
                self.display.frame(&mut backend, &mut store, &self.tree, now);
            });

        ctx.request_repaint_after(self.pacer.remaining());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_factor_direction() {
        assert!((zoom_factor(0.0, 1.0) - 1.0).abs() < 1e-12);
        // scrolling up zooms in
        assert!(zoom_factor(100.0, 1.0) < 1.0);
        assert!(zoom_factor(-100.0, 1.0) > 1.0);
        // pinch out by 2x halves the radius
        assert!((zoom_factor(0.0, 2.0) - 0.5).abs() < 1e-12);
        // a bogus pinch value is ignored
        assert!((zoom_factor(0.0, 0.0) - 1.0).abs() < 1e-12);
    }
}
