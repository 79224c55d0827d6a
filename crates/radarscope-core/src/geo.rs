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

//! Geographic primitives: points, line segments and bounding boxes.

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in degrees.
///
/// `(0, 0)` is the "no fix" sentinel: anything sitting exactly there is
/// never plotted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when both components are exactly zero.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0
    }
}

/// A map geometry segment between two points. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: GeoPoint,
    pub end: GeoPoint,
}

impl LineSegment {
    #[must_use]
    pub const fn new(start: GeoPoint, end: GeoPoint) -> Self {
        Self { start, end }
    }

    /// Bounding box enclosing both endpoints.
    #[must_use]
    pub fn bounds(&self) -> GeoBounds {
        GeoBounds::from_points(self.start, self.end)
    }
}

/// Axis-aligned latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl GeoBounds {
    #[must_use]
    pub const fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    /// Smallest box containing both points, in any order.
    #[must_use]
    pub fn from_points(a: GeoPoint, b: GeoPoint) -> Self {
        Self {
            lat_min: a.lat.min(b.lat),
            lat_max: a.lat.max(b.lat),
            lon_min: a.lon.min(b.lon),
            lon_max: a.lon.max(b.lon),
        }
    }

    /// Grow this box to include `other`.
    pub fn extend(&mut self, other: &GeoBounds) {
        self.lat_min = self.lat_min.min(other.lat_min);
        self.lat_max = self.lat_max.max(other.lat_max);
        self.lon_min = self.lon_min.min(other.lon_min);
        self.lon_max = self.lon_max.max(other.lon_max);
    }

    /// Boxes are disjoint when separated on either axis; touching edges intersect.
    #[must_use]
    pub fn intersects(&self, other: &GeoBounds) -> bool {
        if self.lat_min > other.lat_max || other.lat_min > self.lat_max {
            return false;
        }
        if self.lon_min > other.lon_max || other.lon_min > self.lon_max {
            return false;
        }
        true
    }

    #[must_use]
    pub fn contains(&self, other: &GeoBounds) -> bool {
        other.lat_min >= self.lat_min
            && other.lat_max <= self.lat_max
            && other.lon_min >= self.lon_min
            && other.lon_max <= self.lon_max
    }

    #[must_use]
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.lat_min + self.lat_max) / 2.0,
            (self.lon_min + self.lon_max) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_point() {
        assert!(GeoPoint::new(0.0, 0.0).is_unset());
        assert!(!GeoPoint::new(0.0, 0.01).is_unset());
        assert!(!GeoPoint::new(-33.9, 0.0).is_unset());
    }

    #[test]
    fn test_bounds_intersection_per_axis() {
        let a = GeoBounds::new(0.0, 10.0, 0.0, 10.0);
        // overlaps in latitude but disjoint in longitude
        let b = GeoBounds::new(5.0, 15.0, 11.0, 20.0);
        assert!(!a.intersects(&b));

        let c = GeoBounds::new(10.0, 12.0, 10.0, 12.0);
        assert!(a.intersects(&c));
        assert!(c.intersects(&a));
    }

    #[test]
    fn test_bounds_from_points_orders_components() {
        let b = GeoBounds::from_points(GeoPoint::new(5.0, -3.0), GeoPoint::new(-2.0, 4.0));
        assert_eq!(b, GeoBounds::new(-2.0, 5.0, -3.0, 4.0));
        assert!(b.contains(&GeoBounds::new(0.0, 1.0, 0.0, 1.0)));
    }
}
