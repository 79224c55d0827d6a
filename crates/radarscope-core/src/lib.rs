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

//! Core of a real-time aircraft situation display.
//!
//! This library carries the parts of the display that hold the algorithmic
//! weight, independent of any windowing or drawing toolkit:
//!
//! - **Projection**: latitude/longitude to screen pixels and back
//! - **Spatial map index**: a loose quadtree of coastline/border segments
//! - **View state machine**: pan/zoom, cached map redraw, target-seeking animation
//! - **Aircraft renderer**: icons, trails, off-screen indicators and labels
//! - **Label layout**: a per-frame force-directed solver for label offsets
//!
//! Everything is drawn through the [`DrawBackend`] trait, so a host program
//! only needs to supply lines, triangles, rounded rectangles, circles and
//! text.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Instant;
//! use radarscope_core::{
//!     AircraftStore, GeoPoint, LineSegment, QuadTree, RecordingBackend, SituationDisplay,
//!     DisplayConfig,
//! };
//!
//! let tree = QuadTree::build(vec![LineSegment::new(
//!     GeoPoint::new(37.0, -122.5),
//!     GeoPoint::new(37.5, -122.0),
//! )]);
//!
//! let mut display = SituationDisplay::new(DisplayConfig {
//!     center: GeoPoint::new(37.2, -122.2),
//!     screen_width: 800.0,
//!     screen_height: 600.0,
//!     ..Default::default()
//! });
//!
//! let mut store = AircraftStore::default();
//! let mut backend = RecordingBackend::default();
//! let stats = display.frame(&mut backend, &mut store, &tree, Instant::now());
//! println!("drew {} map lines", stats.map_lines);
//! ```

pub mod aircraft;
pub mod backend;
pub mod color;
pub mod display;
pub mod geo;
pub mod labels;
pub mod mapdata;
pub mod overlay;
pub mod projection;
pub mod quadtree;
pub mod recording;
pub mod render;
pub mod style;
pub mod view;

pub use aircraft::{Aircraft, AircraftStore, FleetStats, LabelState, TrailSample};
pub use backend::{DrawBackend, FontKind, Point2, ScreenRect};
pub use color::{lerp_color, signal_to_color, Rgba};
pub use display::{DisplayConfig, FramePacer, FrameStats, SituationDisplay};
pub use geo::{GeoBounds, GeoPoint, LineSegment};
pub use labels::LabelSolver;
pub use mapdata::{load_map_file, MapDataError};
pub use overlay::{status_entries, OverlayRenderer, StatusEntry};
pub use projection::Projection;
pub use quadtree::QuadTree;
pub use recording::{Primitive, PrimitiveCounts, RecordingBackend};
pub use render::{edge_point, AircraftRenderer};
pub use style::{LabelConfig, Style};
pub use view::{AnimationTarget, CompositeStats, MapCache, MapView, ViewPhase, ViewState};
