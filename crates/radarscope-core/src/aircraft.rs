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

//! Aircraft records as seen by the display, and the collection that owns them.
//!
//! The tracker feeding the display writes identity, position and timing
//! fields. The per-frame layout state in [`LabelState`] belongs to the
//! display: the label solver and renderer are its only writers.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::geo::GeoPoint;

/// Trail samples kept per aircraft unless configured otherwise.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Minimum movement, in degrees, before a new trail sample is recorded.
const TRAIL_MIN_MOVE_DEGREES: f64 = 0.001;

/// Number of recent signal readings averaged for the signal color.
pub const SIGNAL_SAMPLES: usize = 8;

/// One recorded trail point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSample {
    pub lon: f64,
    pub lat: f64,
    pub heading: f32,
}

/// Label layout state for one aircraft, rewritten every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelState {
    /// Whether the anchor was resolved during the last frame.
    pub anchored: bool,
    /// Icon (or off-screen indicator tip) position.
    pub cx: f32,
    pub cy: f32,
    /// Label offset from the anchor.
    pub ox: f32,
    pub oy: f32,
    /// Offset velocity.
    pub vx: f32,
    pub vy: f32,
    /// Offset acceleration accumulated during one solver iteration.
    pub ax: f32,
    pub ay: f32,
    /// Resolved label top-left, whole pixels.
    pub x: f32,
    pub y: f32,
    /// Label size in pixels as last drawn.
    pub w: f32,
    pub h: f32,
    /// Local label density, sum of inverse squared anchor distances.
    pub pressure: f32,
}

impl Default for LabelState {
    fn default() -> Self {
        Self {
            anchored: false,
            cx: 0.0,
            cy: 0.0,
            ox: 10.0,
            oy: 0.0,
            vx: 0.0,
            vy: 0.0,
            ax: 0.0,
            ay: 0.0,
            x: 0.0,
            y: 0.0,
            w: 0.0,
            h: 0.0,
            pressure: 0.0,
        }
    }
}

impl LabelState {
    /// Place the anchor and snap the label next to it.
    pub fn anchor_at(&mut self, cx: f32, cy: f32) {
        self.anchored = true;
        self.cx = cx;
        self.cy = cy;
        self.x = cx + self.ox.round();
        self.y = cy + self.oy.round();
    }
}

/// An aircraft known to the display.
#[derive(Debug, Clone)]
pub struct Aircraft {
    /// ICAO 24-bit address.
    pub addr: u32,
    pub flight: String,
    /// Last reported position. `None` or `(0, 0)` both mean "no fix".
    pub position: Option<GeoPoint>,
    /// Altitude in feet.
    pub altitude: i32,
    /// Ground speed in knots.
    pub speed: i32,
    /// Track in degrees, north = 0.
    pub heading: f32,
    pub signal_level: [u8; SIGNAL_SAMPLES],
    signal_idx: usize,
    pub created: Instant,
    /// Last message of any kind.
    pub seen: Instant,
    /// Last position message.
    pub seen_position: Instant,
    pub messages: u64,
    pub history: VecDeque<TrailSample>,
    pub label: LabelState,
}

impl Aircraft {
    #[must_use]
    pub fn new(addr: u32, now: Instant) -> Self {
        Self {
            addr,
            flight: String::new(),
            position: None,
            altitude: 0,
            speed: 0,
            heading: 0.0,
            signal_level: [0; SIGNAL_SAMPLES],
            signal_idx: 0,
            created: now,
            seen: now,
            seen_position: now,
            messages: 0,
            history: VecDeque::new(),
            label: LabelState::default(),
        }
    }

    /// Position usable for drawing, filtering the `(0, 0)` sentinel.
    #[must_use]
    pub fn fix(&self) -> Option<GeoPoint> {
        self.position.filter(|p| !p.is_unset())
    }

    /// Record a position report, extending the trail when it moved far enough.
    pub fn update_position(&mut self, pos: GeoPoint, now: Instant, history_limit: usize) {
        let moved = match self.history.back() {
            Some(last) => {
                let d = ((pos.lat - last.lat).powi(2) + (pos.lon - last.lon).powi(2)).sqrt();
                d > TRAIL_MIN_MOVE_DEGREES
            }
            None => true,
        };

        if moved && !pos.is_unset() {
            self.history.push_back(TrailSample {
                lon: pos.lon,
                lat: pos.lat,
                heading: self.heading,
            });
            while self.history.len() > history_limit {
                self.history.pop_front();
            }
        }

        self.position = Some(pos);
        self.seen_position = now;
    }

    /// Push one signal reading into the rolling window.
    pub fn record_signal(&mut self, level: u8) {
        self.signal_level[self.signal_idx] = level;
        self.signal_idx = (self.signal_idx + 1) % SIGNAL_SAMPLES;
    }

    /// Rounded mean of the signal window.
    #[must_use]
    pub fn signal_average(&self) -> i32 {
        let sum: u32 = self.signal_level.iter().map(|&s| u32::from(s)).sum();
        ((sum + 3) >> 3) as i32
    }

    #[must_use]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created)
    }

    #[must_use]
    pub fn since_seen(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.seen)
    }

    #[must_use]
    pub fn since_position(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.seen_position)
    }
}

/// Aggregate numbers for the status readout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FleetStats {
    pub visible: usize,
    pub total: usize,
    /// Messages per second.
    pub msg_rate: f32,
    pub avg_signal: f32,
}

/// Insertion-ordered aircraft collection keyed by address.
///
/// Holds at most one selected address. The selection is only cleared
/// explicitly: an aircraft dropping out and coming back stays selected.
#[derive(Debug)]
pub struct AircraftStore {
    aircraft: Vec<Aircraft>,
    index: HashMap<u32, usize>,
    selected: Option<u32>,
    history_limit: usize,
    rate_window_start: Option<Instant>,
    rate_window_count: u64,
    msg_rate: f32,
}

impl Default for AircraftStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl AircraftStore {
    #[must_use]
    pub fn new(history_limit: usize) -> Self {
        Self {
            aircraft: Vec::new(),
            index: HashMap::new(),
            selected: None,
            history_limit: history_limit.max(2),
            rate_window_start: None,
            rate_window_count: 0,
            msg_rate: 0.0,
        }
    }

    #[must_use]
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Get the aircraft for `addr`, creating it at the end of the order if new.
    pub fn upsert(&mut self, addr: u32, now: Instant) -> &mut Aircraft {
        let idx = match self.index.get(&addr) {
            Some(&idx) => idx,
            None => {
                self.aircraft.push(Aircraft::new(addr, now));
                let idx = self.aircraft.len() - 1;
                self.index.insert(addr, idx);
                idx
            }
        };
        &mut self.aircraft[idx]
    }

    /// Count one received message toward the rate and mark the aircraft seen.
    pub fn record_message(&mut self, addr: u32, now: Instant) -> &mut Aircraft {
        let start = *self.rate_window_start.get_or_insert(now);
        self.rate_window_count += 1;
        let elapsed = now.saturating_duration_since(start).as_secs_f32();
        if elapsed >= 1.0 {
            self.msg_rate = self.rate_window_count as f32 / elapsed;
            self.rate_window_start = Some(now);
            self.rate_window_count = 0;
        }

        let aircraft = self.upsert(addr, now);
        aircraft.seen = now;
        aircraft.messages += 1;
        aircraft
    }

    /// Apply a position report using the store's trail length.
    pub fn update_position(&mut self, addr: u32, pos: GeoPoint, now: Instant) {
        let limit = self.history_limit;
        self.upsert(addr, now).update_position(pos, now, limit);
    }

    #[must_use]
    pub fn get(&self, addr: u32) -> Option<&Aircraft> {
        self.index.get(&addr).map(|&idx| &self.aircraft[idx])
    }

    pub fn get_mut(&mut self, addr: u32) -> Option<&mut Aircraft> {
        self.index.get(&addr).map(|&idx| &mut self.aircraft[idx])
    }

    /// Drop aircraft not heard from within `max_age`. Returns how many were removed.
    pub fn remove_stale(&mut self, max_age: Duration, now: Instant) -> usize {
        let before = self.aircraft.len();
        self.aircraft
            .retain(|a| now.saturating_duration_since(a.seen) < max_age);
        let removed = before - self.aircraft.len();
        if removed > 0 {
            self.index = self
                .aircraft
                .iter()
                .enumerate()
                .map(|(idx, a)| (a.addr, idx))
                .collect();
        }
        removed
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Aircraft> {
        self.aircraft.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Aircraft> {
        self.aircraft.iter_mut()
    }

    pub fn as_mut_slice(&mut self) -> &mut [Aircraft] {
        &mut self.aircraft
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    pub fn select(&mut self, addr: Option<u32>) {
        self.selected = addr;
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    #[must_use]
    pub fn selected_addr(&self) -> Option<u32> {
        self.selected
    }

    /// The selected aircraft, if it is currently present.
    #[must_use]
    pub fn selected(&self) -> Option<&Aircraft> {
        self.selected.and_then(|addr| self.get(addr))
    }

    #[must_use]
    pub fn msg_rate(&self) -> f32 {
        self.msg_rate
    }

    /// Stats snapshot; `visible` comes from the last rendered frame.
    #[must_use]
    pub fn stats(&self, visible: usize) -> FleetStats {
        let avg_signal = if self.aircraft.is_empty() {
            0.0
        } else {
            let sum: i64 = self.aircraft.iter().map(|a| i64::from(a.signal_average())).sum();
            sum as f32 / self.aircraft.len() as f32
        };
        FleetStats {
            visible,
            total: self.aircraft.len(),
            msg_rate: self.msg_rate,
            avg_signal,
        }
    }
}

impl<'a> IntoIterator for &'a AircraftStore {
    type Item = &'a Aircraft;
    type IntoIter = std::slice::Iter<'a, Aircraft>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_keeps_insertion_order() {
        let now = Instant::now();
        let mut store = AircraftStore::default();
        for addr in [0xC0FFEE, 0xA1B2C3, 0x123456] {
            store.upsert(addr, now);
        }
        store.upsert(0xA1B2C3, now).flight = "UAL123".to_string();

        let order: Vec<u32> = store.iter().map(|a| a.addr).collect();
        assert_eq!(order, vec![0xC0FFEE, 0xA1B2C3, 0x123456]);
        assert_eq!(store.get(0xA1B2C3).unwrap().flight, "UAL123");
    }

    #[test]
    fn test_remove_stale_reindexes() {
        let start = Instant::now();
        let mut store = AircraftStore::default();
        store.record_message(1, start);
        store.record_message(2, start + Duration::from_secs(50));
        store.record_message(3, start);

        let removed = store.remove_stale(Duration::from_secs(30), start + Duration::from_secs(60));
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(1).is_none());
        assert_eq!(store.get(2).unwrap().addr, 2);
    }

    #[test]
    fn test_selection_survives_removal() {
        let now = Instant::now();
        let mut store = AircraftStore::default();
        store.record_message(7, now);
        store.select(Some(7));
        store.remove_stale(Duration::from_secs(1), now + Duration::from_secs(5));
        assert!(store.selected().is_none());
        assert_eq!(store.selected_addr(), Some(7));

        store.record_message(7, now + Duration::from_secs(6));
        assert_eq!(store.selected().map(|a| a.addr), Some(7));
        store.clear_selection();
        assert!(store.selected().is_none());
    }

    #[test]
    fn test_history_is_bounded_and_filters_jitter() {
        let now = Instant::now();
        let mut store = AircraftStore::new(5);
        for i in 0..20 {
            store.update_position(9, GeoPoint::new(40.0 + f64::from(i) * 0.01, -75.0), now);
        }
        // tiny move, not recorded
        store.update_position(9, GeoPoint::new(40.19 + 0.0001, -75.0), now);

        let a = store.get(9).unwrap();
        assert_eq!(a.history.len(), 5);
        assert!((a.history.back().unwrap().lat - 40.19).abs() < 1e-9);
        assert!((a.position.unwrap().lat - 40.1901).abs() < 1e-9);
    }

    #[test]
    fn test_zero_position_has_no_fix() {
        let now = Instant::now();
        let mut a = Aircraft::new(1, now);
        assert!(a.fix().is_none());
        a.update_position(GeoPoint::new(0.0, 0.0), now, 10);
        assert!(a.fix().is_none());
        assert!(a.history.is_empty());
        a.update_position(GeoPoint::new(0.0, 0.5), now, 10);
        assert!(a.fix().is_some());
    }

    #[test]
    fn test_signal_average_rounds() {
        let mut a = Aircraft::new(1, Instant::now());
        for level in [10, 10, 10, 10, 10, 10, 10, 11] {
            a.record_signal(level);
        }
        assert_eq!(a.signal_average(), 10);
        a.record_signal(200);
        // oldest reading replaced
        assert_eq!(a.signal_average(), (70 + 11 + 200 - 10 + 3) >> 3);
    }
}
