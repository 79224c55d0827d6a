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

//! Drawing backend abstraction.
//!
//! The display never rasterizes anything itself. Every frame is emitted as a
//! stream of primitive calls on a [`DrawBackend`], which a host maps onto its
//! toolkit (egui painter, recording buffer for tests, ...).

use crate::color::Rgba;

/// Screen position in pixels, origin at the top-left of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance_sq(&self, other: Point2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Pixel rectangle given by its edges. `right`/`bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl ScreenRect {
    #[must_use]
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    #[must_use]
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    #[must_use]
    pub fn contains(&self, p: Point2) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    /// Whether the bounding box of the segment `a`-`b` touches this rectangle.
    #[must_use]
    pub fn touches_span(&self, a: Point2, b: Point2) -> bool {
        a.x.max(b.x) >= self.left
            && a.x.min(b.x) < self.right
            && a.y.max(b.y) >= self.top
            && a.y.min(b.y) < self.bottom
    }

    /// Overlapping area with `other`, zero when disjoint.
    #[must_use]
    pub fn overlap_area(&self, other: &ScreenRect) -> f32 {
        let w = self.right.min(other.right) - self.left.max(other.left);
        let h = self.bottom.min(other.bottom) - self.top.max(other.top);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }
}

/// Font faces the display asks the backend for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontKind {
    /// Regular map text (altitude, speed, scale bar).
    Map,
    /// Bold map text (flight identifiers).
    MapBold,
    /// Status box labels and messages.
    Status,
}

/// Primitive drawing operations consumed by the display.
pub trait DrawBackend {
    /// Fill the whole viewport.
    fn clear(&mut self, color: Rgba);

    fn line(&mut self, from: Point2, to: Point2, width: f32, color: Rgba);

    fn filled_triangle(&mut self, a: Point2, b: Point2, c: Point2, color: Rgba);

    fn filled_rounded_rect(&mut self, rect: ScreenRect, radius: f32, color: Rgba);

    fn rounded_rect_outline(&mut self, rect: ScreenRect, radius: f32, color: Rgba);

    fn filled_circle(&mut self, center: Point2, radius: f32, color: Rgba);

    fn circle_outline(&mut self, center: Point2, radius: f32, color: Rgba);

    /// Blit `text` with its top-left corner at `pos`, optionally over a
    /// background fill.
    fn text(&mut self, pos: Point2, text: &str, font: FontKind, color: Rgba, background: Option<Rgba>);
}
