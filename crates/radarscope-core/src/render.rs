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

//! Aircraft drawing: icons, trails, off-screen indicators and labels.
//!
//! The renderer is also where each aircraft's label anchor gets resolved for
//! the frame. The label solver reads those anchors on the next frame.

use std::time::{Duration, Instant};

use crate::aircraft::{Aircraft, AircraftStore};
use crate::backend::{DrawBackend, FontKind, Point2, ScreenRect};
use crate::color::{lerp_color, signal_to_color, Rgba};
use crate::geo::GeoPoint;
use crate::projection::Projection;
use crate::style::{LabelConfig, Style};

// Icon geometry at ui scale 1, in pixels.
const ICON_BODY: f32 = 8.0;
const ICON_WING: f32 = 6.0;
const ICON_TAIL: f32 = 3.0;
const ICON_BODY_WIDTH: f32 = 2.0;

const INDICATOR_ARROW: f32 = 8.0;
const NEW_RING_RADIUS: f32 = 20.0;
const PING_MS: f32 = 500.0;
const SIGNAL_MARK_MS: f32 = 1024.0;
const CONNECTOR_STEPS: usize = 8;

const FEET_TO_METERS: f32 = 0.3048;
const KNOTS_TO_KMH: f32 = 1.852;
const KNOTS_TO_MPH: f32 = 1.150_78;

/// Pressure thresholds, already compared against `pressure * screen_width`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DetailLimits {
    identifier: f32,
    altitude: f32,
    speed: f32,
}

/// Draws the aircraft layer of a frame.
#[derive(Debug, Clone)]
pub struct AircraftRenderer {
    style: Style,
    detail: DetailLimits,
    ui_scale: f32,
}

impl AircraftRenderer {
    #[must_use]
    pub fn new(style: Style, labels: &LabelConfig) -> Self {
        Self {
            style,
            detail: DetailLimits {
                identifier: labels.identifier_limit,
                altitude: labels.altitude_limit,
                speed: labels.speed_limit,
            },
            ui_scale: 1.0,
        }
    }

    #[must_use]
    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn set_ui_scale(&mut self, ui_scale: f32) {
        self.ui_scale = ui_scale;
    }

    fn font_size(&self) -> (f32, f32) {
        (
            self.style.map_font_width * self.ui_scale,
            self.style.map_font_height * self.ui_scale,
        )
    }

    /// Trails for every aircraft, fading from transparent at the oldest
    /// sample to half opacity at the newest.
    pub fn draw_trails(&self, backend: &mut dyn DrawBackend, proj: &Projection, store: &AircraftStore) {
        let viewport = proj.viewport();
        for a in store {
            let n = a.history.len();
            if n < 2 {
                continue;
            }
            let segments = a.history.iter().zip(a.history.iter().skip(1));
            for (k, (s0, s1)) in segments.enumerate() {
                let from = proj.geo_to_screen(GeoPoint::new(s0.lat, s0.lon));
                let to = proj.geo_to_screen(GeoPoint::new(s1.lat, s1.lon));
                if !viewport.touches_span(from, to) {
                    continue;
                }
                let age = (k + 1) as f32 / (n - 1) as f32;
                let alpha = (0.5 * age * 255.0).round() as u8;
                backend.line(from, to, self.ui_scale, self.style.trail.with_alpha(alpha));
            }
        }
    }

    /// Draw every aircraft with a fix and resolve its label anchor. Returns
    /// how many aircraft landed on screen.
    pub fn draw_aircraft(
        &self,
        backend: &mut dyn DrawBackend,
        proj: &Projection,
        store: &mut AircraftStore,
        now: Instant,
    ) -> usize {
        let selected = store.selected_addr();
        let mut visible = 0;

        for a in store.iter_mut() {
            a.label.anchored = false;
            let Some(pos) = a.fix() else {
                continue;
            };
            let is_selected = selected == Some(a.addr);
            let color = self.icon_color(a, is_selected, now);
            let screen = proj.geo_to_screen(pos);

            if proj.out_of_bounds(screen) {
                let tip = self.draw_offscreen_indicator(backend, proj, screen, color);
                a.label.anchor_at(tip.x, tip.y);
            } else {
                visible += 1;
                let age_ms = millis(a.age(now));
                if age_ms < self.style.new_aircraft_ms {
                    self.draw_new_aircraft_ring(backend, screen, age_ms);
                } else {
                    self.draw_icon(backend, screen, a.heading, color);
                }
                self.draw_position_ping(backend, screen, millis(a.since_position(now)), proj.width, color);
                a.label.anchor_at(screen.x, screen.y);
            }

            self.draw_label(backend, a, proj.width, now);
            if is_selected {
                self.draw_selected_detail(backend, a);
            }
        }
        visible
    }

    fn icon_color(&self, a: &Aircraft, selected: bool, now: Instant) -> Rgba {
        if selected {
            return self.style.selected;
        }
        let fade = a.since_seen(now).as_secs_f32() / self.style.gone_fade_secs;
        lerp_color(signal_to_color(a.signal_average()), self.style.plane_gone, fade)
    }

    /// Body, wings and tail oriented along `heading` (degrees, north up).
    pub fn draw_icon(&self, backend: &mut dyn DrawBackend, p: Point2, heading: f32, color: Rgba) {
        let s = self.ui_scale;
        let rad = heading.to_radians();
        let fwd = (rad.sin(), -rad.cos());
        let side = (-fwd.1, fwd.0);

        let nose = along(p, fwd, ICON_BODY * s);
        let back = along(p, fwd, -ICON_BODY * s);
        backend.filled_triangle(
            nose,
            along(back, side, ICON_BODY_WIDTH * s),
            along(back, side, -ICON_BODY_WIDTH * s),
            color,
        );

        backend.filled_triangle(
            along(p, side, ICON_WING * s),
            along(p, side, -ICON_WING * s),
            along(p, fwd, ICON_BODY * s / 2.0),
            color,
        );

        backend.filled_triangle(
            along(back, side, ICON_TAIL * s),
            along(back, side, -ICON_TAIL * s),
            along(p, fwd, -ICON_BODY * s / 2.0),
            color,
        );
    }

    /// Two chevrons on the viewport edge pointing at an off-screen aircraft.
    /// Returns the point behind the inner chevron, used as the label anchor.
    pub fn draw_offscreen_indicator(
        &self,
        backend: &mut dyn DrawBackend,
        proj: &Projection,
        target: Point2,
        color: Rgba,
    ) -> Point2 {
        let center = proj.screen_center();
        let edge = edge_point(&proj.viewport(), center, target);

        let dx = target.x - center.x;
        let dy = target.y - center.y;
        let len = dx.hypot(dy).max(f32::EPSILON);
        let dir = (dx / len, dy / len);
        // cross product of the direction with the screen normal
        let perp = (dir.1, -dir.0);

        let aw = INDICATOR_ARROW * self.ui_scale;
        for i in 0..2 {
            let tip = along(edge, dir, -(i as f32) * aw);
            let base = along(tip, dir, -aw);
            backend.filled_triangle(
                tip,
                along(base, perp, aw / 2.0),
                along(base, perp, -aw / 2.0),
                color,
            );
        }
        along(edge, dir, -2.0 * aw)
    }

    fn draw_new_aircraft_ring(&self, backend: &mut dyn DrawBackend, p: Point2, age_ms: f32) {
        let t = (age_ms / self.style.new_aircraft_ms).clamp(0.0, 1.0);
        let radius = (NEW_RING_RADIUS * self.ui_scale * t).max(1.0);
        let alpha = (255.0 * (1.0 - t)).round() as u8;
        backend.circle_outline(p, radius, self.style.plane.with_alpha(alpha));
    }

    fn draw_position_ping(
        &self,
        backend: &mut dyn DrawBackend,
        p: Point2,
        since_ms: f32,
        screen_width: f32,
        color: Rgba,
    ) {
        if since_ms >= PING_MS {
            return;
        }
        let radius = since_ms * screen_width / 8192.0;
        let alpha = (255.0 * (1.0 - since_ms / PING_MS)).round() as u8;
        if radius > 0.0 {
            backend.circle_outline(p, radius, color.with_alpha(alpha));
        }
    }

    /// Label text for an aircraft at a given scaled pressure, most important
    /// line first. Empty when the label should be hidden.
    #[must_use]
    pub fn label_lines(&self, a: &Aircraft, scaled_pressure: f32) -> Vec<String> {
        if scaled_pressure >= self.detail.identifier {
            return Vec::new();
        }
        let mut lines = vec![identifier(a)];
        if scaled_pressure < self.detail.altitude {
            lines.push(self.altitude_text(a.altitude));
        }
        if scaled_pressure < self.detail.speed {
            lines.push(self.speed_text(a.speed));
        }
        lines
    }

    fn altitude_text(&self, feet: i32) -> String {
        if self.style.metric {
            format!("{}m", (feet as f32 * FEET_TO_METERS).round() as i32)
        } else {
            format!("{feet}'")
        }
    }

    fn speed_text(&self, knots: i32) -> String {
        if self.style.metric {
            format!("{}km/h", (knots as f32 * KNOTS_TO_KMH).round() as i32)
        } else {
            format!("{}mph", (knots as f32 * KNOTS_TO_MPH).round() as i32)
        }
    }

    fn draw_label(&self, backend: &mut dyn DrawBackend, a: &mut Aircraft, screen_width: f32, now: Instant) {
        let lines = self.label_lines(a, a.label.pressure * screen_width);
        let (fw, fh) = self.font_size();
        let l = &mut a.label;
        if lines.is_empty() {
            l.w = 0.0;
            l.h = 0.0;
            return;
        }

        let max_chars = lines.iter().map(|s| s.chars().count()).max().unwrap_or(0);
        l.w = max_chars as f32 * fw;
        l.h = lines.len() as f32 * fh;

        let anchor = Point2::new(l.cx, l.cy);
        let rect = ScreenRect::new(l.x, l.y, l.x + l.w, l.y + l.h);
        if !rect.contains(anchor) {
            self.draw_connector(backend, anchor, &rect, fh);
        }
        backend.line(
            Point2::new(l.x - 2.0 * self.ui_scale, l.y),
            Point2::new(l.x - 2.0 * self.ui_scale, l.y + l.h),
            self.ui_scale,
            self.style.connector,
        );

        for (i, text) in lines.iter().enumerate() {
            let pos = Point2::new(l.x, l.y + i as f32 * fh);
            if i == 0 {
                backend.text(pos, text, FontKind::MapBold, self.style.label_text, Some(self.style.label_background));
            } else {
                backend.text(pos, text, FontKind::Map, self.style.label_detail, Some(self.style.label_background));
            }
        }

        let mark = Point2::new(l.x + l.w + 3.0 * self.ui_scale, l.y + fh / 2.0);
        self.draw_signal_marks(
            backend,
            mark,
            millis(a.since_seen(now)),
            millis(a.since_position(now)),
        );
    }

    // Curve from the anchor to the nearest corner of the label's left edge.
    fn draw_connector(&self, backend: &mut dyn DrawBackend, anchor: Point2, rect: &ScreenRect, fh: f32) {
        let (end, approach) = if anchor.y < rect.top {
            let end = Point2::new(rect.left, rect.top);
            (end, Point2::new(end.x, end.y - fh))
        } else if anchor.y > rect.bottom {
            let end = Point2::new(rect.left, rect.bottom);
            (end, Point2::new(end.x, end.y + fh))
        } else {
            let end = Point2::new(rect.left, (rect.top + rect.bottom) / 2.0);
            (end, Point2::new(end.x - fh, end.y))
        };
        let mid = Point2::new((anchor.x + end.x) / 2.0, (anchor.y + end.y) / 2.0);

        let mut prev = anchor;
        for step in 1..=CONNECTOR_STEPS {
            let t = step as f32 / CONNECTOR_STEPS as f32;
            let next = cubic_bezier(anchor, mid, approach, end, t);
            backend.line(prev, next, self.ui_scale, self.style.connector);
            prev = next;
        }
    }

    // Circle for any recent message, cross for a recent position.
    fn draw_signal_marks(&self, backend: &mut dyn DrawBackend, at: Point2, seen_ms: f32, position_ms: f32) {
        let s = self.ui_scale;
        let fade = |ms: f32| (255.0 - ms / 4.0).clamp(0.0, 255.0).round() as u8;

        if seen_ms < SIGNAL_MARK_MS {
            backend.filled_circle(at, 2.0 * s, self.style.label_text.with_alpha(fade(seen_ms)));
        }
        if position_ms < SIGNAL_MARK_MS {
            let c = Point2::new(at.x + 6.0 * s, at.y);
            let color = self.style.label_text.with_alpha(fade(position_ms));
            let r = 2.0 * s;
            backend.line(Point2::new(c.x - r, c.y - r), Point2::new(c.x + r, c.y + r), s, color);
            backend.line(Point2::new(c.x - r, c.y + r), Point2::new(c.x + r, c.y - r), s, color);
        }
    }

    /// Address, heading and message count under the selected aircraft.
    pub fn draw_selected_detail(&self, backend: &mut dyn DrawBackend, a: &Aircraft) {
        let s = self.ui_scale;
        let (_, fh) = self.font_size();
        let origin = Point2::new(a.label.cx - 20.0 * s, a.label.cy + 22.0 * s);
        let lines = [
            format!("{:06X}", a.addr),
            format!("hdg {:03.0}", a.heading.rem_euclid(360.0)),
            format!("{} msgs", a.messages),
        ];
        for (i, text) in lines.iter().enumerate() {
            backend.text(
                Point2::new(origin.x, origin.y + i as f32 * fh),
                text,
                FontKind::Map,
                self.style.selected,
                Some(self.style.label_background),
            );
        }
    }
}

fn identifier(a: &Aircraft) -> String {
    let flight = a.flight.trim();
    if flight.is_empty() {
        format!("{:06X}", a.addr)
    } else {
        flight.to_string()
    }
}

fn millis(d: Duration) -> f32 {
    d.as_secs_f32() * 1000.0
}

fn along(p: Point2, dir: (f32, f32), k: f32) -> Point2 {
    Point2::new(p.x + dir.0 * k, p.y + dir.1 * k)
}

fn cubic_bezier(p0: Point2, p1: Point2, p2: Point2, p3: Point2, t: f32) -> Point2 {
    let u = 1.0 - t;
    let b0 = u * u * u;
    let b1 = 3.0 * u * u * t;
    let b2 = 3.0 * u * t * t;
    let b3 = t * t * t;
    Point2::new(
        b0 * p0.x + b1 * p1.x + b2 * p2.x + b3 * p3.x,
        b0 * p0.y + b1 * p1.y + b2 * p2.y + b3 * p3.y,
    )
}

/// Where the ray from `center` toward `target` leaves the viewport, or
/// `target` itself when it is inside. The result always lies within the
/// viewport, on its last pixel row or column when clipped.
#[must_use]
pub fn edge_point(viewport: &ScreenRect, center: Point2, target: Point2) -> Point2 {
    let dx = target.x - center.x;
    let dy = target.y - center.y;
    // a viewport under one pixel collapses onto its left/top edge
    let max_x = (viewport.right - 1.0).max(viewport.left);
    let max_y = (viewport.bottom - 1.0).max(viewport.top);

    let tx = if dx > 0.0 {
        (max_x - center.x) / dx
    } else if dx < 0.0 {
        (viewport.left - center.x) / dx
    } else {
        f32::INFINITY
    };
    let ty = if dy > 0.0 {
        (max_y - center.y) / dy
    } else if dy < 0.0 {
        (viewport.top - center.y) / dy
    } else {
        f32::INFINITY
    };

    let t = tx.min(ty).min(1.0);
    Point2::new(
        (center.x + dx * t).clamp(viewport.left, max_x),
        (center.y + dy * t).clamp(viewport.top, max_y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{Primitive, RecordingBackend};

    fn renderer() -> AircraftRenderer {
        AircraftRenderer::new(Style::default(), &LabelConfig::default())
    }

    fn proj() -> Projection {
        Projection::new(GeoPoint::new(40.0, -75.0), 25.0, 800.0, 600.0)
    }

    fn on_boundary(p: Point2) -> bool {
        p.x.abs() < 1e-3 || (p.x - 799.0).abs() < 1e-3 || p.y.abs() < 1e-3 || (p.y - 599.0).abs() < 1e-3
    }

    #[test]
    fn test_edge_point_tolerates_empty_viewport() {
        let empty = ScreenRect::from_size(0.0, 0.0);
        let p = edge_point(&empty, Point2::new(0.0, 0.0), Point2::new(250.0, -40.0));
        assert_eq!(p, Point2::new(0.0, 0.0));

        let sliver = ScreenRect::from_size(0.5, 300.0);
        let p = edge_point(&sliver, Point2::new(0.25, 150.0), Point2::new(-90.0, 160.0));
        assert!(p.x.abs() < 1e-6);
    }

    #[test]
    fn test_label_text_has_background() {
        let p = proj();
        let mut store = AircraftStore::default();
        let now = Instant::now();
        let a = store.upsert(0xABCDEF, now - Duration::from_secs(2));
        a.flight = "UAL9".to_string();
        a.altitude = 31000;
        store.update_position(0xABCDEF, GeoPoint::new(40.01, -75.01), now - Duration::from_secs(2));

        let mut backend = RecordingBackend::default();
        renderer().draw_aircraft(&mut backend, &p, &mut store, now);
        let backgrounds: Vec<Option<Rgba>> = backend
            .primitives
            .iter()
            .filter_map(|prim| match prim {
                Primitive::Text { text, background, .. } if text == "UAL9" || text == "31000'" => Some(*background),
                _ => None,
            })
            .collect();
        assert_eq!(backgrounds.len(), 2);
        assert!(backgrounds.iter().all(|b| *b == Some(Style::default().label_background)));
    }

    #[test]
    fn test_edge_point_lands_on_boundary() {
        let viewport = ScreenRect::from_size(800.0, 600.0);
        let center = Point2::new(400.0, 300.0);
        for target in [
            Point2::new(2000.0, 310.0),
            Point2::new(-50.0, -4000.0),
            Point2::new(400.0, 9000.0),
            Point2::new(-300.0, 650.0),
            Point2::new(1200.0, -900.0),
        ] {
            let e = edge_point(&viewport, center, target);
            assert!(viewport.contains(e), "{e:?} outside for {target:?}");
            assert!(on_boundary(e), "{e:?} not on edge for {target:?}");
            // same direction as the target
            assert!((e.x - center.x) * (target.x - center.x) >= 0.0);
            assert!((e.y - center.y) * (target.y - center.y) >= 0.0);
        }
    }

    #[test]
    fn test_offscreen_aircraft_gets_indicator_on_edge() {
        let p = proj();
        let mut store = AircraftStore::default();
        let now = Instant::now();
        let a = store.upsert(1, now - Duration::from_secs(2));
        a.position = Some(GeoPoint::new(40.0, -73.0));

        let mut backend = RecordingBackend::default();
        let visible = renderer().draw_aircraft(&mut backend, &p, &mut store, now);
        assert_eq!(visible, 0);

        let tris: Vec<_> = backend.triangles().collect();
        assert_eq!(tris.len(), 2);
        let tip = tris[0].0[0];
        assert!((tip.x - 799.0).abs() < 1e-3);
        for (points, _) in &tris {
            assert!(points.iter().any(|pt| p.viewport().contains(*pt)));
        }
        let label = &store.get(1).unwrap().label;
        assert!(label.anchored);
        assert!((label.cx - (799.0 - 16.0)).abs() < 1e-3);
    }

    #[test]
    fn test_icon_points_along_heading() {
        let mut backend = RecordingBackend::default();
        let p = Point2::new(100.0, 100.0);
        renderer().draw_icon(&mut backend, p, 90.0, Rgba::WHITE);
        let body = backend.triangles().next().unwrap().0;
        assert!((body[0].x - 108.0).abs() < 1e-4);
        assert!((body[0].y - 100.0).abs() < 1e-4);

        backend.reset();
        renderer().draw_icon(&mut backend, p, 0.0, Rgba::WHITE);
        let body = backend.triangles().next().unwrap().0;
        assert!((body[0].y - 92.0).abs() < 1e-4);
    }

    #[test]
    fn test_unset_position_is_not_drawn() {
        let mut store = AircraftStore::default();
        let now = Instant::now();
        store.upsert(1, now).position = Some(GeoPoint::new(0.0, 0.0));
        let mut backend = RecordingBackend::default();
        let visible = renderer().draw_aircraft(&mut backend, &proj(), &mut store, now);
        assert_eq!(visible, 0);
        assert!(backend.primitives.is_empty());
        assert!(!store.get(1).unwrap().label.anchored);
    }

    #[test]
    fn test_trail_alpha_grows_with_recency() {
        let p = proj();
        let now = Instant::now();
        let mut store = AircraftStore::default();
        for i in 0..5 {
            store.update_position(1, GeoPoint::new(40.0 + f64::from(i) * 0.01, -75.0), now);
        }
        let mut backend = RecordingBackend::default();
        renderer().draw_trails(&mut backend, &p, &store);

        let alphas: Vec<u8> = backend.lines().map(|(_, _, c)| c.a).collect();
        assert_eq!(alphas.len(), 4);
        assert!(alphas.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*alphas.last().unwrap(), 128);
    }

    #[test]
    fn test_label_detail_drops_with_pressure() {
        let r = renderer();
        let mut a = Aircraft::new(0xABCDEF, Instant::now());
        a.altitude = 35000;
        a.speed = 450;

        assert_eq!(r.label_lines(&a, 0.0), vec!["ABCDEF", "35000'", "518mph"]);
        a.flight = "DAL42  ".to_string();
        assert_eq!(r.label_lines(&a, 0.7), vec!["DAL42", "35000'"]);
        assert_eq!(r.label_lines(&a, 1.5), vec!["DAL42"]);
        assert!(r.label_lines(&a, 2.0).is_empty());
    }

    #[test]
    fn test_new_aircraft_shows_ring_not_icon() {
        let p = proj();
        let now = Instant::now();
        let mut store = AircraftStore::default();
        let a = store.upsert(1, now - Duration::from_millis(100));
        a.position = Some(GeoPoint::new(40.01, -75.0));
        a.seen_position = now - Duration::from_secs(5);

        let mut backend = RecordingBackend::default();
        renderer().draw_aircraft(&mut backend, &p, &mut store, now);
        assert_eq!(backend.triangles().count(), 0);
        assert!(backend
            .primitives
            .iter()
            .any(|prim| matches!(prim, crate::recording::Primitive::Circle { filled: false, .. })));
    }

    #[test]
    fn test_selected_aircraft_uses_highlight() {
        let p = proj();
        let now = Instant::now();
        let mut store = AircraftStore::default();
        let a = store.upsert(7, now - Duration::from_secs(3));
        a.position = Some(GeoPoint::new(40.01, -75.01));
        store.select(Some(7));

        let mut backend = RecordingBackend::default();
        renderer().draw_aircraft(&mut backend, &p, &mut store, now);
        assert!(backend.triangles().all(|(_, c)| c == Style::default().selected));
        assert!(backend.has_text("000007"));
    }
}
