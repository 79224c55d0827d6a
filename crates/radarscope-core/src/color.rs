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

//! Colors, the signal-strength ramp and color interpolation.

use serde::{Deserialize, Serialize};

/// 8-bit RGBA color, straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const GREY: Rgba = Rgba::rgb(127, 127, 127);
    pub const LIGHT_GREY: Rgba = Rgba::rgb(196, 196, 196);
    pub const PINK: Rgba = Rgba::rgb(249, 38, 114);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// Color used for aircraft with no usable signal reading.
pub const NO_SIGNAL_COLOR: Rgba = Rgba::rgb(96, 96, 96);

/// Highest signal level the ramp distinguishes.
pub const MAX_SIGNAL: i32 = 127;

// Key stops of the parula colormap, evenly spaced over 0..=MAX_SIGNAL.
const PARULA_STOPS: [(u8, u8, u8); 9] = [
    (53, 42, 135),
    (15, 92, 221),
    (18, 125, 216),
    (7, 156, 207),
    (21, 177, 180),
    (89, 189, 140),
    (165, 190, 107),
    (225, 185, 82),
    (249, 251, 14),
];

/// Map an averaged signal level onto the parula ramp.
///
/// Negative levels mean "no signal" and map to a flat grey; anything above
/// [`MAX_SIGNAL`] saturates.
#[must_use]
pub fn signal_to_color(signal: i32) -> Rgba {
    if signal < 0 {
        return NO_SIGNAL_COLOR;
    }
    let signal = signal.min(MAX_SIGNAL);

    let segments = (PARULA_STOPS.len() - 1) as f32;
    let pos = signal as f32 / MAX_SIGNAL as f32 * segments;
    let idx = (pos.floor() as usize).min(PARULA_STOPS.len() - 2);
    let t = pos - idx as f32;

    let (r0, g0, b0) = PARULA_STOPS[idx];
    let (r1, g1, b1) = PARULA_STOPS[idx + 1];
    lerp_color(Rgba::rgb(r0, g0, b0), Rgba::rgb(r1, g1, b1), t)
}

/// Linear interpolation in RGB. `factor` is clamped to `[0, 1]`; alpha is
/// taken from `a`.
#[must_use]
pub fn lerp_color(a: Rgba, b: Rgba, factor: f32) -> Rgba {
    let factor = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
    let mix = |x: u8, y: u8| -> u8 {
        ((1.0 - factor) * f32::from(x) + factor * f32::from(y)).round() as u8
    };
    Rgba {
        r: mix(a.r, b.r),
        g: mix(a.g, b.g),
        b: mix(a.b, b.b),
        a: a.a,
    }
}
