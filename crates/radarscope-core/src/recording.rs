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

//! A [`DrawBackend`] that records primitives instead of drawing them.
//!
//! Used by the headless runner and throughout the tests to inspect what a
//! frame would have put on screen.

use crate::backend::{DrawBackend, FontKind, Point2, ScreenRect};
use crate::color::Rgba;

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Clear(Rgba),
    Line {
        from: Point2,
        to: Point2,
        width: f32,
        color: Rgba,
    },
    Triangle {
        points: [Point2; 3],
        color: Rgba,
    },
    RoundedRect {
        rect: ScreenRect,
        radius: f32,
        color: Rgba,
        filled: bool,
    },
    Circle {
        center: Point2,
        radius: f32,
        color: Rgba,
        filled: bool,
    },
    Text {
        pos: Point2,
        text: String,
        font: FontKind,
        color: Rgba,
        background: Option<Rgba>,
    },
}

/// Primitive counts per kind, used for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrimitiveCounts {
    pub lines: usize,
    pub triangles: usize,
    pub rects: usize,
    pub circles: usize,
    pub texts: usize,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub primitives: Vec<Primitive>,
}

impl RecordingBackend {
    /// Drop everything recorded so far.
    pub fn reset(&mut self) {
        self.primitives.clear();
    }

    #[must_use]
    pub fn counts(&self) -> PrimitiveCounts {
        let mut counts = PrimitiveCounts::default();
        for p in &self.primitives {
            match p {
                Primitive::Clear(_) => {}
                Primitive::Line { .. } => counts.lines += 1,
                Primitive::Triangle { .. } => counts.triangles += 1,
                Primitive::RoundedRect { .. } => counts.rects += 1,
                Primitive::Circle { .. } => counts.circles += 1,
                Primitive::Text { .. } => counts.texts += 1,
            }
        }
        counts
    }

    pub fn lines(&self) -> impl Iterator<Item = (Point2, Point2, Rgba)> + '_ {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Line { from, to, color, .. } => Some((*from, *to, *color)),
            _ => None,
        })
    }

    pub fn triangles(&self) -> impl Iterator<Item = ([Point2; 3], Rgba)> + '_ {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Triangle { points, color } => Some((*points, *color)),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = (Point2, &str)> + '_ {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Text { pos, text, .. } => Some((*pos, text.as_str())),
            _ => None,
        })
    }

    /// Whether any recorded text equals `needle`.
    #[must_use]
    pub fn has_text(&self, needle: &str) -> bool {
        self.texts().any(|(_, t)| t == needle)
    }
}

impl DrawBackend for RecordingBackend {
    fn clear(&mut self, color: Rgba) {
        self.primitives.push(Primitive::Clear(color));
    }

    fn line(&mut self, from: Point2, to: Point2, width: f32, color: Rgba) {
        self.primitives.push(Primitive::Line {
            from,
            to,
            width,
            color,
        });
    }

    fn filled_triangle(&mut self, a: Point2, b: Point2, c: Point2, color: Rgba) {
        self.primitives.push(Primitive::Triangle {
            points: [a, b, c],
            color,
        });
    }

    fn filled_rounded_rect(&mut self, rect: ScreenRect, radius: f32, color: Rgba) {
        self.primitives.push(Primitive::RoundedRect {
            rect,
            radius,
            color,
            filled: true,
        });
    }

    fn rounded_rect_outline(&mut self, rect: ScreenRect, radius: f32, color: Rgba) {
        self.primitives.push(Primitive::RoundedRect {
            rect,
            radius,
            color,
            filled: false,
        });
    }

    fn filled_circle(&mut self, center: Point2, radius: f32, color: Rgba) {
        self.primitives.push(Primitive::Circle {
            center,
            radius,
            color,
            filled: true,
        });
    }

    fn circle_outline(&mut self, center: Point2, radius: f32, color: Rgba) {
        self.primitives.push(Primitive::Circle {
            center,
            radius,
            color,
            filled: false,
        });
    }

    fn text(&mut self, pos: Point2, text: &str, font: FontKind, color: Rgba, background: Option<Rgba>) {
        self.primitives.push(Primitive::Text {
            pos,
            text: text.to_string(),
            font,
            color,
            background,
        });
    }
}
