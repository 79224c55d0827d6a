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

//! Display style and label-layout tuning.
//!
//! Both structs are plain configuration owned by the display; they are
//! serde-friendly so a host can persist them alongside its own settings.

use serde::{Deserialize, Serialize};

use crate::color::Rgba;

/// Colors, font metrics and timing constants of the display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Style {
    pub background: Rgba,
    pub selected: Rgba,
    /// Color used for the "just appeared" ring.
    pub plane: Rgba,
    /// Color aircraft fade toward as their last message ages.
    pub plane_gone: Rgba,
    /// Map line color at the screen center, fading to `map_outer` at the edge.
    pub map_inner: Rgba,
    pub map_outer: Rgba,
    pub scale_bar: Rgba,
    pub button: Rgba,
    pub trail: Rgba,
    pub label_text: Rgba,
    pub label_detail: Rgba,
    pub label_background: Rgba,
    pub connector: Rgba,

    /// Glyph advance of the map font at ui scale 1, in pixels.
    pub map_font_width: f32,
    /// Line height of the map font at ui scale 1, in pixels.
    pub map_font_height: f32,
    pub status_font_width: f32,
    pub status_font_height: f32,
    pub round_radius: f32,
    pub pad: f32,

    /// Seconds after the last message over which an icon fades to `plane_gone`.
    pub gone_fade_secs: f32,
    /// Aircraft younger than this many milliseconds get the appear cue.
    pub new_aircraft_ms: f32,
    pub metric: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            background: Rgba::rgb(0, 0, 20),
            selected: Rgba::PINK,
            plane: Rgba::rgb(236, 192, 68),
            plane_gone: Rgba::GREY,
            map_inner: Rgba::rgb(66, 91, 108),
            map_outer: Rgba::rgb(23, 41, 51),
            scale_bar: Rgba::LIGHT_GREY,
            button: Rgba::rgb(211, 208, 203),
            trail: Rgba::WHITE,
            label_text: Rgba::WHITE,
            label_detail: Rgba::GREY,
            label_background: Rgba::BLACK,
            connector: Rgba::rgb(200, 200, 200),
            map_font_width: 5.0,
            map_font_height: 12.0,
            status_font_width: 6.0,
            status_font_height: 12.0,
            round_radius: 3.0,
            pad: 5.0,
            gone_fade_secs: 30.0,
            new_aircraft_ms: 500.0,
            metric: false,
        }
    }
}

/// Tuning of the force-directed label solver and detail thresholds.
///
/// The detail thresholds compare `pressure * screen_width` against each
/// limit: crowded labels first lose the speed line, then the altitude line,
/// and past `identifier_limit` the label disappears entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub iterations: usize,
    pub label_force: f32,
    pub plane_force: f32,
    pub damping: f32,
    pub spring_force: f32,
    pub spring_length: f32,
    /// Per-axis velocity clamp, pixels per iteration.
    pub max_speed: f32,
    /// Velocities below this are zeroed.
    pub min_speed: f32,
    /// Padding around the label being resolved.
    pub label_padding: f32,
    /// Padding around the labels it is checked against.
    pub neighbour_padding: f32,
    /// Half-size of the box around an aircraft icon.
    pub icon_padding: f32,
    pub edge_margin: f32,
    pub identifier_limit: f32,
    pub altitude_limit: f32,
    pub speed_limit: f32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            iterations: 4,
            label_force: 0.01,
            plane_force: 0.01,
            damping: 0.95,
            spring_force: 0.02,
            spring_length: 10.0,
            max_speed: 10.0,
            min_speed: 1.0,
            label_padding: 10.0,
            neighbour_padding: 5.0,
            icon_padding: 5.0,
            edge_margin: 10.0,
            identifier_limit: 2.0,
            altitude_limit: 1.0,
            speed_limit: 0.5,
        }
    }
}
