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

//! [`DrawBackend`] on top of an `egui::Painter`.

use egui::{Align2, Color32, FontFamily, FontId, Painter, Pos2, Rect, Shape, Stroke, StrokeKind};

use radarscope_core::{DrawBackend, FontKind, Point2, Rgba, ScreenRect, Style};

// Advance of egui's default monospace face as a fraction of its size.
const MONO_ADVANCE: f32 = 0.6;

/// Font sizes for each [`FontKind`], derived from the style's glyph metrics.
#[derive(Debug, Clone, Copy)]
pub struct FontSizes {
    map: f32,
    status: f32,
}

impl FontSizes {
    #[must_use]
    pub fn new(style: &Style, ui_scale: f32) -> Self {
        Self {
            map: style.map_font_width * ui_scale / MONO_ADVANCE,
            status: style.status_font_width * ui_scale / MONO_ADVANCE,
        }
    }

    fn font(&self, kind: FontKind) -> FontId {
        match kind {
            FontKind::Map => FontId::new(self.map, FontFamily::Monospace),
            FontKind::MapBold => FontId::new(self.map, FontFamily::Proportional),
            FontKind::Status => FontId::new(self.status, FontFamily::Monospace),
        }
    }
}

#[must_use]
pub fn to_color32(c: Rgba) -> Color32 {
    Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

/// Paints display primitives into `canvas`, whose top-left is the display origin.
pub struct EguiBackend<'a> {
    painter: &'a Painter,
    canvas: Rect,
    fonts: FontSizes,
}

impl std::fmt::Debug for EguiBackend<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EguiBackend")
            .field("canvas", &self.canvas)
            .field("fonts", &self.fonts)
            .finish_non_exhaustive()
    }
}

impl<'a> EguiBackend<'a> {
    #[must_use]
    pub fn new(painter: &'a Painter, canvas: Rect, fonts: FontSizes) -> Self {
        Self {
            painter,
            canvas,
            fonts,
        }
    }

    fn pos(&self, p: Point2) -> Pos2 {
        self.canvas.min + egui::vec2(p.x, p.y)
    }

    fn rect(&self, r: ScreenRect) -> Rect {
        Rect::from_min_max(
            self.pos(Point2::new(r.left, r.top)),
            self.pos(Point2::new(r.right, r.bottom)),
        )
    }
}

impl DrawBackend for EguiBackend<'_> {
    fn clear(&mut self, color: Rgba) {
        self.painter.rect_filled(self.canvas, 0.0, to_color32(color));
    }

    fn line(&mut self, from: Point2, to: Point2, width: f32, color: Rgba) {
        self.painter
            .line_segment([self.pos(from), self.pos(to)], Stroke::new(width, to_color32(color)));
    }

    fn filled_triangle(&mut self, a: Point2, b: Point2, c: Point2, color: Rgba) {
        self.painter.add(Shape::convex_polygon(
            vec![self.pos(a), self.pos(b), self.pos(c)],
            to_color32(color),
            Stroke::NONE,
        ));
    }

    fn filled_rounded_rect(&mut self, rect: ScreenRect, radius: f32, color: Rgba) {
        self.painter.rect_filled(self.rect(rect), radius, to_color32(color));
    }

    fn rounded_rect_outline(&mut self, rect: ScreenRect, radius: f32, color: Rgba) {
        self.painter.rect_stroke(
            self.rect(rect),
            radius,
            Stroke::new(1.0, to_color32(color)),
            StrokeKind::Inside,
        );
    }

    fn filled_circle(&mut self, center: Point2, radius: f32, color: Rgba) {
        self.painter.circle_filled(self.pos(center), radius, to_color32(color));
    }

    fn circle_outline(&mut self, center: Point2, radius: f32, color: Rgba) {
        self.painter
            .circle_stroke(self.pos(center), radius, Stroke::new(1.0, to_color32(color)));
    }

    fn text(&mut self, pos: Point2, text: &str, font: FontKind, color: Rgba, background: Option<Rgba>) {
        let at = self.pos(pos);
        let font = self.fonts.font(font);
        match background {
            Some(bg) => {
                let galley = self.painter.layout_no_wrap(text.to_owned(), font, to_color32(color));
                let rect = Align2::LEFT_TOP.anchor_size(at, galley.size());
                self.painter.rect_filled(rect, 0.0, to_color32(bg));
                self.painter.galley(rect.min, galley, to_color32(color));
            }
            None => {
                self.painter.text(at, Align2::LEFT_TOP, text, font, to_color32(color));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_conversion_keeps_straight_alpha() {
        assert_eq!(to_color32(Rgba::rgb(10, 20, 30)), Color32::from_rgb(10, 20, 30));
        let faded = to_color32(Rgba::WHITE.with_alpha(128));
        assert_eq!(faded.a(), 128);
    }

    #[test]
    fn test_font_sizes_follow_ui_scale() {
        let style = Style::default();
        let one = FontSizes::new(&style, 1.0);
        let two = FontSizes::new(&style, 2.0);
        assert!((two.map - 2.0 * one.map).abs() < 1e-4);
        assert!((one.map * MONO_ADVANCE - style.map_font_width).abs() < 1e-4);
        assert_eq!(one.font(FontKind::Status).family, FontFamily::Monospace);
    }
}
