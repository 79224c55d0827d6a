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

//! Geographic projection between latitude/longitude and screen pixels.
//!
//! Uses an equirectangular approximation around the view center. The
//! longitude term is corrected by the cosine of the latitude halfway between
//! the projected point and the center, which keeps distortion low across the
//! whole viewport instead of only near one reference latitude.
//!
//! Distances are in kilometres. The zoom radius is the distance mapped onto
//! half of the larger screen dimension, and the same pixel scale applies to
//! both axes so geographic aspect ratio is preserved whatever the window
//! shape.

use crate::backend::{Point2, ScreenRect};
use crate::geo::{GeoBounds, GeoPoint};

/// Kilometres per degree of latitude on a 6371 km sphere.
pub const KM_PER_DEGREE: f64 = 6371.0 * std::f64::consts::PI / 180.0;

/// Statute miles per kilometre.
pub const MILES_PER_KM: f64 = 0.621_371;

/// Vertical position of the view center as a fraction of screen height.
pub const CENTER_OFFSET: f32 = 0.5;

/// A snapshot of the parameters needed to project, cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub center: GeoPoint,
    /// Zoom radius in kilometres.
    pub radius: f64,
    pub width: f32,
    pub height: f32,
}

impl Projection {
    #[must_use]
    pub fn new(center: GeoPoint, radius: f64, width: f32, height: f32) -> Self {
        Self {
            center,
            radius,
            width,
            height,
        }
    }

    /// Pixels per kilometre.
    #[must_use]
    pub fn scale(&self) -> f64 {
        0.5 * f64::from(self.width.max(self.height)) / self.radius
    }

    /// Screen position of the view center.
    #[must_use]
    pub fn screen_center(&self) -> Point2 {
        Point2::new((self.width / 2.0).floor(), (self.height * CENTER_OFFSET).floor())
    }

    /// East/north offset of `p` from the view center, in kilometres.
    ///
    /// An unset point (exactly `(0, 0)`) maps to a zero offset; callers
    /// filter those out before drawing.
    #[must_use]
    pub fn offset_km(&self, p: GeoPoint) -> (f64, f64) {
        if p.is_unset() {
            return (0.0, 0.0);
        }
        self.raw_offset_km(p)
    }

    fn raw_offset_km(&self, p: GeoPoint) -> (f64, f64) {
        let mid_lat = ((p.lat + self.center.lat) / 2.0).to_radians();
        let dx = KM_PER_DEGREE * (p.lon - self.center.lon) * mid_lat.cos();
        let dy = KM_PER_DEGREE * (p.lat - self.center.lat);
        (dx, dy)
    }

    /// Magnitude of a geographic distance in whole pixels.
    #[must_use]
    pub fn screen_dist(&self, km: f64) -> f32 {
        (km.abs() * self.scale()).round() as f32
    }

    /// Pixel distance back to kilometres.
    #[must_use]
    pub fn km_from_pixels(&self, px: f32) -> f64 {
        f64::from(px) / self.scale()
    }

    /// Screen position for a kilometre offset from the center.
    #[must_use]
    pub fn screen_from_offset(&self, dx: f64, dy: f64) -> Point2 {
        let c = self.screen_center();
        let sx = if dx > 0.0 { 1.0 } else { -1.0 };
        let sy = if dy > 0.0 { -1.0 } else { 1.0 };
        Point2::new(
            c.x + sx * self.screen_dist(dx),
            c.y + sy * self.screen_dist(dy),
        )
    }

    /// Project a geographic point to whole-pixel screen coordinates.
    #[must_use]
    pub fn geo_to_screen(&self, p: GeoPoint) -> Point2 {
        let (dx, dy) = self.offset_km(p);
        self.screen_from_offset(dx, dy)
    }

    /// Like [`Projection::geo_to_screen`] but also places `(0, 0)` itself.
    /// Used for view centers, where the origin is a legitimate location.
    #[must_use]
    pub fn geo_to_screen_unfiltered(&self, p: GeoPoint) -> Point2 {
        let (dx, dy) = self.raw_offset_km(p);
        self.screen_from_offset(dx, dy)
    }

    /// Inverse projection from a screen position.
    #[must_use]
    pub fn screen_to_geo(&self, pt: Point2) -> GeoPoint {
        let c = self.screen_center();
        let scale = self.scale();
        let dx = f64::from(pt.x - c.x) / scale;
        let dy = -f64::from(pt.y - c.y) / scale;

        let lat = self.center.lat + dy / KM_PER_DEGREE;
        let mid_lat = ((lat + self.center.lat) / 2.0).to_radians();
        let lon = self.center.lon + dx / (KM_PER_DEGREE * mid_lat.cos());
        GeoPoint::new(lat, lon)
    }

    /// Geographic box covering a screen rectangle.
    ///
    /// All four corners are unprojected since the cosine correction makes
    /// the longitude span depend on latitude.
    #[must_use]
    pub fn geo_bounds(&self, rect: &ScreenRect) -> GeoBounds {
        let corners = [
            Point2::new(rect.left, rect.top),
            Point2::new(rect.right, rect.top),
            Point2::new(rect.left, rect.bottom),
            Point2::new(rect.right, rect.bottom),
        ];
        let first = self.screen_to_geo(corners[0]);
        let mut bounds = GeoBounds::from_points(first, first);
        for corner in &corners[1..] {
            let p = self.screen_to_geo(*corner);
            bounds.extend(&GeoBounds::from_points(p, p));
        }
        bounds
    }

    /// Full viewport as a screen rectangle.
    #[must_use]
    pub fn viewport(&self) -> ScreenRect {
        ScreenRect::from_size(self.width, self.height)
    }

    #[must_use]
    pub fn out_of_bounds(&self, p: Point2) -> bool {
        !self.viewport().contains(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proj() -> Projection {
        Projection::new(GeoPoint::new(37.7749, -122.4194), 25.0, 800.0, 600.0)
    }

    #[test]
    fn test_scale_uses_larger_dimension() {
        let p = proj();
        assert!((p.scale() - 16.0).abs() < 1e-9);
        let tall = Projection::new(p.center, 25.0, 600.0, 800.0);
        assert!((tall.scale() - p.scale()).abs() < 1e-9);
    }

    #[test]
    fn test_center_maps_to_screen_center() {
        let p = proj();
        assert_eq!(p.geo_to_screen(p.center), Point2::new(400.0, 300.0));
    }

    #[test]
    fn test_north_is_up_east_is_right() {
        let p = proj();
        let north = p.geo_to_screen(GeoPoint::new(p.center.lat + 0.05, p.center.lon));
        let east = p.geo_to_screen(GeoPoint::new(p.center.lat, p.center.lon + 0.05));
        assert!(north.y < 300.0);
        assert!((north.x - 400.0).abs() < f32::EPSILON);
        assert!(east.x > 400.0);
    }

    #[test]
    fn test_unset_point_maps_to_zero_offset() {
        let p = proj();
        assert_eq!(p.offset_km(GeoPoint::new(0.0, 0.0)), (0.0, 0.0));
    }

    #[test]
    fn test_unfiltered_places_the_origin() {
        let p = Projection::new(GeoPoint::new(0.0, 0.1), 25.0, 800.0, 600.0);
        let origin = p.geo_to_screen_unfiltered(GeoPoint::new(0.0, 0.0));
        assert!(origin.x < 400.0);
        assert_eq!(p.geo_to_screen(GeoPoint::new(0.0, 0.0)), Point2::new(400.0, 300.0));
    }

    #[test]
    fn test_round_trip_within_a_pixel() {
        let p = proj();
        // one pixel expressed in degrees of latitude
        let tol = 1.0 / (p.scale() * KM_PER_DEGREE);
        for (dlat, dlon) in [(0.1, 0.1), (-0.12, 0.2), (0.05, -0.3), (0.0, 0.01)] {
            let g = GeoPoint::new(p.center.lat + dlat, p.center.lon + dlon);
            let back = p.screen_to_geo(p.geo_to_screen(g));
            assert!((back.lat - g.lat).abs() <= tol, "lat {} vs {}", back.lat, g.lat);
            let lon_tol = tol / g.lat.to_radians().cos();
            assert!((back.lon - g.lon).abs() <= lon_tol, "lon {} vs {}", back.lon, g.lon);
        }
    }

    #[test]
    fn test_geo_bounds_cover_viewport() {
        let p = proj();
        let b = p.geo_bounds(&p.viewport());
        assert!(b.lat_min < p.center.lat && p.center.lat < b.lat_max);
        assert!(b.lon_min < p.center.lon && p.center.lon < b.lon_max);
        // 300 px of latitude at 16 px/km
        let expected_half_lat = 300.0 / 16.0 / KM_PER_DEGREE;
        assert!((b.lat_max - p.center.lat - expected_half_lat).abs() < 1e-3);
    }
}
