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

//! Screen-space overlays drawn on top of the map and aircraft: scale bar,
//! status readout, frame info and the pointer/selection cues.

use crate::aircraft::FleetStats;
use crate::backend::{DrawBackend, FontKind, Point2, ScreenRect};
use crate::geo::GeoPoint;
use crate::projection::{Projection, MILES_PER_KM};
use crate::style::Style;

const CLICK_RIPPLE_MS: f32 = 256.0;
const CURSOR_FADE_MS: f32 = 1000.0;
const SELECTION_EASE_MS: f32 = 300.0;
const SELECTION_SIZE: f32 = 20.0;

/// One labelled box of the status readout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub label: &'static str,
    pub value: String,
}

/// Status readout content for the current view and fleet.
#[must_use]
pub fn status_entries(center: GeoPoint, stats: &FleetStats) -> Vec<StatusEntry> {
    let ns = if center.lat < 0.0 { 'S' } else { 'N' };
    let ew = if center.lon < 0.0 { 'W' } else { 'E' };
    vec![
        StatusEntry {
            label: "loc",
            value: format!("{:.3}{ns} {:.3}{ew}", center.lat.abs(), center.lon.abs()),
        },
        StatusEntry {
            label: "disp",
            value: format!("{}/{}", stats.visible, stats.total),
        },
        StatusEntry {
            label: "rate",
            value: format!("{:.0}/s", stats.msg_rate),
        },
        StatusEntry {
            label: "sAvg",
            value: format!("{:.0}%", 100.0 * stats.avg_signal / f32::from(u8::MAX)),
        },
    ]
}

/// Scale bar tick offsets in pixels and the caption of the longest tick.
///
/// Ticks sit at powers of ten of the display unit and stop before passing
/// `max_px`.
#[must_use]
pub fn scale_ticks(proj: &Projection, metric: bool, max_px: f32) -> (Vec<f32>, Option<String>) {
    let (km_per_unit, unit) = if metric {
        (1.0, "km")
    } else {
        (1.0 / MILES_PER_KM, "mi")
    };

    let mut ticks = Vec::new();
    let mut caption = None;
    for power in -2..=6 {
        let dist = 10f64.powi(power);
        let px = proj.screen_dist(dist * km_per_unit);
        if px < 2.0 {
            continue;
        }
        if px > max_px {
            break;
        }
        ticks.push(px);
        caption = Some(format!("{dist}{unit}"));
    }
    (ticks, caption)
}

#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    style: Style,
    ui_scale: f32,
}

impl OverlayRenderer {
    #[must_use]
    pub fn new(style: Style) -> Self {
        Self {
            style,
            ui_scale: 1.0,
        }
    }

    pub fn set_ui_scale(&mut self, ui_scale: f32) {
        self.ui_scale = ui_scale;
    }

    fn pad(&self) -> f32 {
        self.style.pad * self.ui_scale
    }

    pub fn draw_scale_bar(&self, backend: &mut dyn DrawBackend, proj: &Projection) {
        let pad = self.pad();
        let s = self.ui_scale;
        let origin = Point2::new(pad, pad + self.style.map_font_height * s);
        let (ticks, caption) = scale_ticks(proj, self.style.metric, proj.width - 2.0 * pad);
        let Some(&last) = ticks.last() else {
            return;
        };

        let color = self.style.scale_bar;
        backend.line(origin, Point2::new(origin.x + last, origin.y), s, color);
        backend.line(origin, Point2::new(origin.x, origin.y + 4.0 * s), s, color);
        for &px in &ticks {
            let x = origin.x + px;
            let len = if (px - last).abs() < f32::EPSILON { 6.0 } else { 4.0 };
            backend.line(Point2::new(x, origin.y), Point2::new(x, origin.y + len * s), s, color);
        }
        if let Some(caption) = caption {
            let pos = Point2::new(origin.x + last + 3.0 * s, origin.y - self.style.map_font_height * s / 2.0);
            backend.text(pos, &caption, FontKind::Map, color, None);
        }
    }

    /// Boxes laid out left to right along the bottom, wrapping upward.
    pub fn draw_status(&self, backend: &mut dyn DrawBackend, proj: &Projection, entries: &[StatusEntry]) {
        let pad = self.pad();
        let fw = self.style.status_font_width * self.ui_scale;
        let fh = self.style.status_font_height * self.ui_scale;
        let box_h = fh + pad;
        let radius = self.style.round_radius * self.ui_scale;

        let mut x = pad;
        let mut y = proj.height - pad - box_h;
        for entry in entries {
            let label_chars = entry.label.chars().count() + 1;
            let chars = label_chars + entry.value.chars().count();
            let box_w = chars as f32 * fw + pad;
            if x > pad && x + box_w > proj.width - pad {
                x = pad;
                y -= box_h + pad;
            }

            let rect = ScreenRect::new(x, y, x + box_w, y + box_h);
            backend.filled_rounded_rect(rect, radius, self.style.label_background);
            backend.rounded_rect_outline(rect, radius, self.style.button);
            let text_pos = Point2::new(x + pad / 2.0, y + pad / 2.0);
            backend.text(text_pos, entry.label, FontKind::Status, self.style.button, None);
            backend.text(
                Point2::new(text_pos.x + label_chars as f32 * fw, text_pos.y),
                &entry.value,
                FontKind::Status,
                self.style.label_text,
                None,
            );
            x += box_w + pad;
        }
    }

    /// `<lines> lines @ <fps>fps` in the top-right corner.
    pub fn draw_frame_info(&self, backend: &mut dyn DrawBackend, proj: &Projection, lines: usize, fps: f32) {
        let text = format!("{lines} lines @ {fps:.1}fps");
        let fw = self.style.status_font_width * self.ui_scale;
        let pos = Point2::new(proj.width - self.pad() - text.chars().count() as f32 * fw, self.pad());
        backend.text(pos, &text, FontKind::Status, self.style.scale_bar, None);
    }

    /// Filled circle spreading from a click, gone after a quarter second.
    pub fn draw_click(&self, backend: &mut dyn DrawBackend, at: Point2, elapsed_ms: f32) {
        if elapsed_ms >= CLICK_RIPPLE_MS {
            return;
        }
        let radius = (0.25 * elapsed_ms * self.ui_scale).max(1.0);
        let alpha = (128.0 - 0.5 * elapsed_ms).clamp(0.0, 255.0).round() as u8;
        backend.filled_circle(at, radius, self.style.label_text.with_alpha(alpha));
    }

    /// Crosshair at the last pointer position, fading out over a second.
    pub fn draw_cursor(&self, backend: &mut dyn DrawBackend, at: Point2, elapsed_ms: f32) {
        if elapsed_ms >= CURSOR_FADE_MS {
            return;
        }
        let alpha = (255.0 * (1.0 - elapsed_ms / CURSOR_FADE_MS)).round() as u8;
        let color = self.style.button.with_alpha(alpha);
        let r = 10.0 * self.ui_scale;
        backend.line(Point2::new(at.x - r, at.y), Point2::new(at.x + r, at.y), self.ui_scale, color);
        backend.line(Point2::new(at.x, at.y - r), Point2::new(at.x, at.y + r), self.ui_scale, color);
    }

    /// Corner brackets closing in on the selected aircraft.
    pub fn draw_selection_box(&self, backend: &mut dyn DrawBackend, center: Point2, elapsed_ms: f32) {
        let t = (elapsed_ms / SELECTION_EASE_MS).clamp(0.0, 1.0);
        let ease = 1.0 - (1.0 - t) * (1.0 - t);
        let half = SELECTION_SIZE * self.ui_scale * (2.0 - ease) / 2.0;
        let arm = half / 2.0;
        let alpha = (255.0 * ease.max(0.25)).round() as u8;
        let color = self.style.selected.with_alpha(alpha);
        let w = self.ui_scale;

        for (sx, sy) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            let corner = Point2::new(center.x + sx * half, center.y + sy * half);
            backend.line(corner, Point2::new(corner.x - sx * arm, corner.y), w, color);
            backend.line(corner, Point2::new(corner.x, corner.y - sy * arm), w, color);
        }
    }
}
