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

//! View state, target-seeking animation and the cached map layer.
//!
//! The map layer is expensive to regenerate, so it is rendered into a
//! [`MapCache`] of pixel-space lines. While the view pans or zooms the cache
//! is replayed through a translate-and-scale transform and any screen area it
//! no longer covers is filled straight from the quadtree. Once the view holds
//! still for a frame the cache is rebuilt at the new center and radius.

use std::time::{Duration, Instant};

use log::debug;

use crate::backend::{DrawBackend, Point2, ScreenRect};
use crate::color::{lerp_color, Rgba};
use crate::geo::{GeoPoint, LineSegment};
use crate::projection::Projection;
use crate::quadtree::QuadTree;
use crate::style::Style;

pub const DEFAULT_RADIUS: f64 = 25.0;
pub const MIN_RADIUS: f64 = 0.1;
pub const MAX_RADIUS: f64 = 20_000.0;

/// Fraction of the remaining distance covered per animation step.
const ANIMATION_RATE: f64 = 0.1;
/// Distance below which a target counts as reached, degrees or kilometres.
const ANIMATION_EPSILON: f64 = 1e-4;
/// Frames an animation may run on the transformed cache before a rebuild.
const REDRAW_BUDGET_FRAMES: u32 = 8;

/// Where the viewport looks and how large it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub center: GeoPoint,
    /// Kilometres from the center to the edge of the larger screen dimension.
    pub radius: f64,
    pub width: f32,
    pub height: f32,
    pub ui_scale: f32,
}

impl ViewState {
    #[must_use]
    pub fn new(center: GeoPoint, width: f32, height: f32) -> Self {
        Self {
            center,
            radius: DEFAULT_RADIUS,
            width,
            height,
            ui_scale: 1.0,
        }
    }

    #[must_use]
    pub fn projection(&self) -> Projection {
        Projection::new(self.center, self.radius, self.width, self.height)
    }
}

/// Pending goal for the view center and/or radius.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnimationTarget {
    pub center: Option<GeoPoint>,
    pub radius: Option<f64>,
}

impl AnimationTarget {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.center.is_some() || self.radius.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Coarse state of the view, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    /// Cache matches the view.
    Static,
    /// The view moved since the last frame; the cache is shown transformed.
    PanningZooming,
    /// The cache is stale and will be rebuilt on the next frame.
    Redrawing,
    /// Easing toward an [`AnimationTarget`].
    Animating,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CachedLine {
    from: Point2,
    to: Point2,
    color: Rgba,
}

/// Map geometry rendered at a known center and radius.
#[derive(Debug)]
pub struct MapCache {
    lines: Vec<CachedLine>,
    center: GeoPoint,
    radius: f64,
    rendered_at: Option<Instant>,
    dirty: bool,
}

impl Default for MapCache {
    fn default() -> Self {
        Self {
            lines: Vec::new(),
            center: GeoPoint::default(),
            radius: DEFAULT_RADIUS,
            rendered_at: None,
            dirty: true,
        }
    }
}

impl MapCache {
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn center(&self) -> GeoPoint {
        self.center
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[must_use]
    pub fn rendered_at(&self) -> Option<Instant> {
        self.rendered_at
    }
}

/// Result of compositing the map layer for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompositeStats {
    /// Whether the cache was rebuilt this frame.
    pub redrawn: bool,
    /// Lines handed to the backend.
    pub lines: usize,
}

/// Owns the view, its animation target and the map cache.
#[derive(Debug)]
pub struct MapView {
    state: ViewState,
    target: AnimationTarget,
    cache: MapCache,
    moved: bool,
    frame_time: Duration,
}

impl MapView {
    #[must_use]
    pub fn new(state: ViewState, frame_time: Duration) -> Self {
        Self {
            state,
            target: AnimationTarget::default(),
            cache: MapCache::default(),
            moved: false,
            frame_time,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    #[must_use]
    pub fn target(&self) -> &AnimationTarget {
        &self.target
    }

    #[must_use]
    pub fn cache(&self) -> &MapCache {
        &self.cache
    }

    #[must_use]
    pub fn projection(&self) -> Projection {
        self.state.projection()
    }

    #[must_use]
    pub fn phase(&self) -> ViewPhase {
        if self.target.is_active() {
            ViewPhase::Animating
        } else if self.moved {
            ViewPhase::PanningZooming
        } else if self.cache.dirty {
            ViewPhase::Redrawing
        } else {
            ViewPhase::Static
        }
    }

    fn mark_moved(&mut self) {
        self.moved = true;
        self.cache.dirty = true;
    }

    /// Ease center and radius 10% toward their targets. Returns whether the
    /// view changed.
    pub fn step_animation(&mut self) -> bool {
        let mut changed = false;

        if let Some(goal) = self.target.center {
            let c = &mut self.state.center;
            let dlat = goal.lat - c.lat;
            let dlon = goal.lon - c.lon;
            if dlat.abs() < ANIMATION_EPSILON && dlon.abs() < ANIMATION_EPSILON {
                *c = goal;
                self.target.center = None;
            } else {
                c.lat += ANIMATION_RATE * dlat;
                c.lon += ANIMATION_RATE * dlon;
            }
            changed = true;
        }

        if let Some(goal) = self.target.radius {
            let dr = goal - self.state.radius;
            if dr.abs() < ANIMATION_EPSILON {
                self.state.radius = goal;
                self.target.radius = None;
            } else {
                self.state.radius += ANIMATION_RATE * dr;
            }
            changed = true;
        }

        if changed {
            self.mark_moved();
        }
        changed
    }

    /// Drag the map by a pixel delta. Cancels any animation.
    pub fn pan_by_pixels(&mut self, dx: f32, dy: f32) {
        let proj = self.projection();
        let c = proj.screen_center();
        self.state.center = proj.screen_to_geo(Point2::new(c.x - dx, c.y - dy));
        self.target.clear();
        self.mark_moved();
    }

    /// Jump the center to a screen position.
    pub fn move_center_to_pixel(&mut self, x: f32, y: f32) {
        self.state.center = self.projection().screen_to_geo(Point2::new(x, y));
        self.target.center = None;
        self.mark_moved();
    }

    /// Start easing the center toward a screen position.
    pub fn animate_center_to_pixel(&mut self, x: f32, y: f32) {
        self.target.center = Some(self.projection().screen_to_geo(Point2::new(x, y)));
    }

    pub fn animate_center_to(&mut self, center: GeoPoint) {
        self.target.center = Some(center);
    }

    pub fn animate_radius_to(&mut self, radius: f64) {
        self.target.radius = Some(radius.clamp(MIN_RADIUS, MAX_RADIUS));
    }

    /// Multiply the radius, clamped to the allowed zoom range.
    pub fn zoom_by(&mut self, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.state.radius = (self.state.radius * factor).clamp(MIN_RADIUS, MAX_RADIUS);
        self.target.radius = None;
        self.mark_moved();
    }

    pub fn set_center(&mut self, center: GeoPoint) {
        self.state.center = center;
        self.mark_moved();
    }

    /// New screen size. The cache no longer fits and is rebuilt next frame.
    pub fn resize(&mut self, width: f32, height: f32) {
        if (width - self.state.width).abs() < f32::EPSILON
            && (height - self.state.height).abs() < f32::EPSILON
        {
            return;
        }
        self.state.width = width;
        self.state.height = height;
        self.cache.dirty = true;
    }

    pub fn set_ui_scale(&mut self, ui_scale: f32) {
        self.state.ui_scale = ui_scale;
        self.cache.dirty = true;
    }

    pub fn set_frame_time(&mut self, frame_time: Duration) {
        self.frame_time = frame_time;
    }

    /// Draw the map layer, rebuilding the cache when the view has settled or
    /// an animation has run long enough on the transformed one.
    pub fn composite(
        &mut self,
        backend: &mut dyn DrawBackend,
        tree: &QuadTree,
        style: &Style,
        now: Instant,
    ) -> CompositeStats {
        let since_redraw = self
            .cache
            .rendered_at
            .map_or(Duration::MAX, |t| now.saturating_duration_since(t));
        let budget = self.frame_time * REDRAW_BUDGET_FRAMES;
        let redraw = (self.cache.dirty && !self.moved)
            || (self.target.is_active() && since_redraw > budget);

        if redraw {
            self.rebuild(tree, style, now);
            self.moved = false;
            let lines = self.replay(backend, 1.0, Point2::default());
            return CompositeStats {
                redrawn: true,
                lines,
            };
        }

        let proj = self.projection();
        let viewport = proj.viewport();
        let ratio = (self.cache.radius / self.state.radius) as f32;
        let c = proj.screen_center();
        let anchor = proj.geo_to_screen_unfiltered(self.cache.center);
        let dest = ScreenRect::new(
            anchor.x - c.x * ratio,
            anchor.y - c.y * ratio,
            anchor.x + (viewport.right - c.x) * ratio,
            anchor.y + (viewport.bottom - c.y) * ratio,
        );

        let mut lines = self.replay(backend, ratio, Point2::new(dest.left, dest.top));
        for strip in uncovered_strips(&viewport, &dest) {
            lines += draw_region(backend, tree, &proj, &strip, style, self.state.ui_scale);
        }

        self.moved = false;
        CompositeStats {
            redrawn: false,
            lines,
        }
    }

    fn rebuild(&mut self, tree: &QuadTree, style: &Style, now: Instant) {
        let proj = self.projection();
        let viewport = proj.viewport();
        self.cache.lines.clear();
        for segment in tree.query_visible(proj.geo_bounds(&viewport)) {
            if let Some(line) = project_segment(&proj, segment, &viewport, style) {
                self.cache.lines.push(line);
            }
        }
        self.cache.center = self.state.center;
        self.cache.radius = self.state.radius;
        self.cache.rendered_at = Some(now);
        self.cache.dirty = false;
        debug!(
            "Map cache rebuilt: {} lines at radius {:.2} km",
            self.cache.lines.len(),
            self.state.radius
        );
    }

    fn replay(&self, backend: &mut dyn DrawBackend, ratio: f32, offset: Point2) -> usize {
        let width = self.state.ui_scale;
        let place = |p: Point2| Point2::new(p.x * ratio + offset.x, p.y * ratio + offset.y);
        for line in &self.cache.lines {
            backend.line(place(line.from), place(line.to), width, line.color);
        }
        self.cache.lines.len()
    }
}

// Parts of the viewport outside `dest`, as up to four non-overlapping strips.
fn uncovered_strips(viewport: &ScreenRect, dest: &ScreenRect) -> Vec<ScreenRect> {
    let mut strips = Vec::new();
    let inner_left = dest.left.clamp(viewport.left, viewport.right);
    let inner_right = dest.right.clamp(viewport.left, viewport.right);

    if dest.left > viewport.left {
        strips.push(ScreenRect::new(viewport.left, viewport.top, inner_left, viewport.bottom));
    }
    if dest.right < viewport.right {
        strips.push(ScreenRect::new(inner_right, viewport.top, viewport.right, viewport.bottom));
    }
    if inner_right > inner_left {
        if dest.top > viewport.top {
            let bottom = dest.top.min(viewport.bottom);
            strips.push(ScreenRect::new(inner_left, viewport.top, inner_right, bottom));
        }
        if dest.bottom < viewport.bottom {
            let top = dest.bottom.max(viewport.top);
            strips.push(ScreenRect::new(inner_left, top, inner_right, viewport.bottom));
        }
    }
    strips.retain(|s| s.width() > 0.0 && s.height() > 0.0);
    strips
}

fn draw_region(
    backend: &mut dyn DrawBackend,
    tree: &QuadTree,
    proj: &Projection,
    region: &ScreenRect,
    style: &Style,
    width: f32,
) -> usize {
    let mut drawn = 0;
    for segment in tree.query_visible(proj.geo_bounds(region)) {
        if let Some(line) = project_segment(proj, segment, region, style) {
            backend.line(line.from, line.to, width, line.color);
            drawn += 1;
        }
    }
    drawn
}

// Projects and culls against `clip` by pixel bounding box.
fn project_segment(
    proj: &Projection,
    segment: &LineSegment,
    clip: &ScreenRect,
    style: &Style,
) -> Option<CachedLine> {
    let from = proj.geo_to_screen(segment.start);
    let to = proj.geo_to_screen(segment.end);
    if from == to {
        return None;
    }
    if !clip.touches_span(from, to) {
        return None;
    }

    let c = proj.screen_center();
    let mid = Point2::new((from.x + to.x) / 2.0, (from.y + to.y) / 2.0);
    let reach = 0.5 * proj.width.max(proj.height);
    let fade = mid.distance_sq(c).sqrt() / reach;
    Some(CachedLine {
        from,
        to,
        color: lerp_color(style.map_inner, style.map_outer, fade),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{Primitive, RecordingBackend};

    fn view() -> MapView {
        MapView::new(
            ViewState::new(GeoPoint::new(37.0, -122.0), 800.0, 600.0),
            Duration::from_millis(16),
        )
    }

    fn seg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> LineSegment {
        LineSegment::new(GeoPoint::new(lat1, lon1), GeoPoint::new(lat2, lon2))
    }

    #[test]
    fn test_animation_converges_and_clears_target() {
        let mut v = view();
        v.animate_radius_to(6.25);
        v.animate_center_to(GeoPoint::new(37.1, -121.9));
        assert_eq!(v.phase(), ViewPhase::Animating);

        // remaining distance decays by 0.9 per step
        let bound = ((ANIMATION_EPSILON / 18.75).ln() / 0.9f64.ln()).ceil() as usize + 2;
        let mut steps = 0;
        while v.target().is_active() {
            assert!(v.step_animation());
            steps += 1;
            assert!(steps <= bound, "no convergence after {steps} steps");
        }
        assert!((v.state().radius - 6.25).abs() < ANIMATION_EPSILON);
        assert!((v.state().center.lat - 37.1).abs() < ANIMATION_EPSILON);
        assert!(!v.step_animation());
    }

    #[test]
    fn test_step_moves_ten_percent() {
        let mut v = view();
        v.animate_radius_to(15.0);
        v.step_animation();
        assert!((v.state().radius - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_pan_defers_redraw_until_still() {
        let tree = QuadTree::build(vec![seg(36.95, -122.05, 37.05, -121.95)]);
        let style = Style::default();
        let mut backend = RecordingBackend::default();
        let mut v = view();
        let now = Instant::now();

        assert_eq!(v.phase(), ViewPhase::Redrawing);
        let first = v.composite(&mut backend, &tree, &style, now);
        assert!(first.redrawn);
        assert_eq!(first.lines, 1);
        assert_eq!(v.phase(), ViewPhase::Static);

        v.pan_by_pixels(30.0, 0.0);
        assert_eq!(v.phase(), ViewPhase::PanningZooming);
        backend.reset();
        let moving = v.composite(&mut backend, &tree, &style, now);
        assert!(!moving.redrawn);
        // the cached line is replayed shifted right by the drag
        let (from, _, _) = backend.lines().next().unwrap();
        let cached_from = v.cache().lines[0].from;
        assert!((from.x - (cached_from.x + 30.0)).abs() <= 1.0);
        assert_eq!(v.phase(), ViewPhase::Redrawing);

        let settled = v.composite(&mut backend, &tree, &style, now);
        assert!(settled.redrawn);
        assert!(!v.cache().is_dirty());
    }

    #[test]
    fn test_static_view_keeps_cache() {
        let tree = QuadTree::build(vec![seg(36.95, -122.05, 37.05, -121.95)]);
        let style = Style::default();
        let mut backend = RecordingBackend::default();
        let mut v = view();
        let now = Instant::now();
        v.composite(&mut backend, &tree, &style, now);
        for _ in 0..3 {
            let stats = v.composite(&mut backend, &tree, &style, now);
            assert!(!stats.redrawn);
            assert_eq!(stats.lines, 1);
        }
        assert_eq!(v.cache().rendered_at(), Some(now));
    }

    #[test]
    fn test_zoom_out_fills_uncovered_strips() {
        // one segment near the center, one outside the initial view
        let tree = QuadTree::build(vec![
            seg(36.99, -122.01, 37.01, -121.99),
            seg(37.0, -121.5, 37.01, -121.49),
        ]);
        let style = Style::default();
        let mut backend = RecordingBackend::default();
        let mut v = view();
        let now = Instant::now();

        v.composite(&mut backend, &tree, &style, now);
        assert_eq!(v.cache().len(), 1);

        v.zoom_by(4.0);
        backend.reset();
        let stats = v.composite(&mut backend, &tree, &style, now);
        assert!(!stats.redrawn);
        assert_eq!(stats.lines, 2);
        // the far segment comes from the right-hand strip
        assert!(backend.lines().any(|(from, _, _)| from.x > 500.0));
    }

    #[test]
    fn test_animation_rebuilds_after_budget() {
        let tree = QuadTree::build(vec![seg(36.95, -122.05, 37.05, -121.95)]);
        let style = Style::default();
        let mut backend = RecordingBackend::default();
        let mut v = view();
        let start = Instant::now();
        v.composite(&mut backend, &tree, &style, start);

        v.animate_radius_to(5.0);
        v.step_animation();
        let soon = v.composite(&mut backend, &tree, &style, start + Duration::from_millis(16));
        assert!(!soon.redrawn);
        v.step_animation();
        let late = v.composite(&mut backend, &tree, &style, start + Duration::from_millis(200));
        assert!(late.redrawn);
    }

    #[test]
    fn test_budget_redraw_settles_movement() {
        let tree = QuadTree::build(vec![seg(36.95, -122.05, 37.05, -121.95)]);
        let style = Style::default();
        let mut backend = RecordingBackend::default();
        let mut v = view();
        let start = Instant::now();
        v.composite(&mut backend, &tree, &style, start);

        v.animate_center_to(GeoPoint::new(37.2, -121.8));
        v.step_animation();
        let stats = v.composite(&mut backend, &tree, &style, start + Duration::from_millis(500));
        assert!(stats.redrawn);
        assert!(!v.moved);
        assert_eq!(v.phase(), ViewPhase::Animating);
    }

    #[test]
    fn test_strip_lines_match_cached_width() {
        let tree = QuadTree::build(vec![
            seg(36.99, -122.01, 37.01, -121.99),
            seg(37.0, -121.5, 37.01, -121.49),
        ]);
        let style = Style::default();
        let mut backend = RecordingBackend::default();
        let mut v = view();
        v.set_ui_scale(2.0);
        let now = Instant::now();
        v.composite(&mut backend, &tree, &style, now);

        v.zoom_by(4.0);
        backend.reset();
        let stats = v.composite(&mut backend, &tree, &style, now);
        assert_eq!(stats.lines, 2);
        let widths: Vec<f32> = backend
            .primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Line { width, .. } => Some(*width),
                _ => None,
            })
            .collect();
        assert_eq!(widths, vec![2.0, 2.0]);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut v = view();
        v.zoom_by(1e9);
        assert!((v.state().radius - MAX_RADIUS).abs() < f64::EPSILON);
        v.zoom_by(1e-12);
        assert!((v.state().radius - MIN_RADIUS).abs() < f64::EPSILON);
        v.zoom_by(-1.0);
        assert!((v.state().radius - MIN_RADIUS).abs() < f64::EPSILON);
    }

    #[test]
    fn test_move_center_to_pixel() {
        let mut v = view();
        let goal = v.projection().screen_to_geo(Point2::new(500.0, 200.0));
        v.move_center_to_pixel(500.0, 200.0);
        assert!((v.state().center.lat - goal.lat).abs() < 1e-12);
        assert!((v.state().center.lon - goal.lon).abs() < 1e-12);
        assert_eq!(v.phase(), ViewPhase::PanningZooming);
    }

    #[test]
    fn test_strips_cover_everything_outside_dest() {
        let viewport = ScreenRect::from_size(800.0, 600.0);
        let dest = ScreenRect::new(100.0, 50.0, 700.0, 500.0);
        let strips = uncovered_strips(&viewport, &dest);
        assert_eq!(strips.len(), 4);
        let area: f32 = strips.iter().map(|s| s.width() * s.height()).sum();
        assert!((area - (800.0 * 600.0 - 600.0 * 450.0)).abs() < 1e-3);

        assert!(uncovered_strips(&viewport, &viewport).is_empty());
    }
}
