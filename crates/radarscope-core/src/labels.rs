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

//! Force-directed label placement.
//!
//! Each aircraft label hangs off its icon on a spring. Every frame a few
//! relaxation iterations push overlapping labels apart, push labels off
//! aircraft icons and keep them inside the viewport. The solver is
//! steady-state: it never finishes, it re-converges as aircraft move.
//!
//! Within one iteration all forces are computed from the positions left by
//! the previous iteration before any label moves, so the result does not
//! depend on the order of the aircraft collection.

use crate::aircraft::{Aircraft, LabelState};
use crate::style::LabelConfig;

#[derive(Debug, Clone, Copy, Default)]
struct Force {
    ax: f32,
    ay: f32,
    pressure: f32,
}

/// Axis-aligned box used for collision checks.
#[derive(Debug, Clone, Copy)]
struct Extent {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

impl Extent {
    fn label(l: &LabelState, pad: f32) -> Self {
        Self {
            left: l.x - pad,
            right: l.x + l.w + pad,
            top: l.y - pad,
            bottom: l.y + l.h + pad,
        }
    }

    fn icon(l: &LabelState, half: f32) -> Self {
        Self {
            left: l.cx - half,
            right: l.cx + half,
            top: l.cy - half,
            bottom: l.cy + half,
        }
    }

    fn disjoint(&self, other: &Extent) -> bool {
        other.left > self.right
            || other.right < self.left
            || other.top > self.bottom
            || other.bottom < self.top
    }

    /// Push on `self` away from `other`, scaled by the overlap depth per axis.
    fn repulsion(&self, other: &Extent, k: f32) -> (f32, f32) {
        if self.disjoint(other) {
            return (0.0, 0.0);
        }
        let depth_x = self.right.min(other.right) - self.left.max(other.left);
        let depth_y = self.bottom.min(other.bottom) - self.top.max(other.top);
        let dir_x = direction((self.left + self.right) - (other.left + other.right));
        let dir_y = direction((self.top + self.bottom) - (other.top + other.bottom));
        (dir_x * depth_x * k, dir_y * depth_y * k)
    }
}

fn direction(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Iterative label layout over the anchored aircraft of one frame.
///
/// Paddings and the edge margin in [`LabelConfig`] are given at ui scale 1
/// and grow with [`LabelSolver::set_ui_scale`], like the labels themselves.
#[derive(Debug, Clone)]
pub struct LabelSolver {
    config: LabelConfig,
    ui_scale: f32,
    scratch: Vec<Force>,
}

impl Default for LabelSolver {
    fn default() -> Self {
        Self::new(LabelConfig::default())
    }
}

impl LabelSolver {
    #[must_use]
    pub fn new(config: LabelConfig) -> Self {
        Self {
            config,
            ui_scale: 1.0,
            scratch: Vec::new(),
        }
    }

    pub fn set_ui_scale(&mut self, ui_scale: f32) {
        self.ui_scale = ui_scale;
    }

    #[must_use]
    pub fn config(&self) -> &LabelConfig {
        &self.config
    }

    /// Run the configured number of iterations.
    pub fn solve(&mut self, aircraft: &mut [Aircraft], width: f32, height: f32) {
        for _ in 0..self.config.iterations {
            self.step(aircraft, width, height);
        }
    }

    /// One relaxation iteration. Aircraft whose anchor was not resolved last
    /// frame neither move nor push.
    pub fn step(&mut self, aircraft: &mut [Aircraft], width: f32, height: f32) {
        let cfg = &self.config;
        let s = self.ui_scale;
        self.scratch.clear();
        self.scratch.resize(aircraft.len(), Force::default());

        for (i, p) in aircraft.iter().enumerate() {
            let pl = &p.label;
            if !pl.anchored {
                continue;
            }
            let mut force = Force::default();

            let o_mag = pl.ox.hypot(pl.oy);
            if o_mag > 0.0 {
                let pull = cfg.spring_force * (o_mag - cfg.spring_length);
                force.ax -= pl.ox / o_mag * pull;
                force.ay -= pl.oy / o_mag * pull;
            }

            let mine = Extent::label(pl, cfg.label_padding * s);
            for (j, other) in aircraft.iter().enumerate() {
                let ol = &other.label;
                if !ol.anchored {
                    continue;
                }

                if i != j {
                    let d2 = (ol.cx - pl.cx).powi(2) + (ol.cy - pl.cy).powi(2);
                    force.pressure += 1.0 / d2.max(1.0);

                    let theirs = Extent::label(ol, cfg.neighbour_padding * s);
                    let (ax, ay) = mine.repulsion(&theirs, cfg.label_force);
                    force.ax += ax;
                    force.ay += ay;
                }

                // every icon, own included
                let icon = Extent::icon(ol, cfg.icon_padding * s);
                let (ax, ay) = mine.repulsion(&icon, cfg.plane_force);
                force.ax += ax;
                force.ay += ay;
            }

            self.scratch[i] = force;
        }

        for (p, force) in aircraft.iter_mut().zip(&self.scratch) {
            let l = &mut p.label;
            if !l.anchored {
                continue;
            }
            l.ax = force.ax;
            l.ay = force.ay;
            l.pressure = force.pressure;

            l.vx = integrate_velocity(l.vx, l.ax, cfg);
            l.vy = integrate_velocity(l.vy, l.ay, cfg);
            l.ox += l.vx;
            l.oy += l.vy;

            keep_on_screen(l, width, height, cfg.edge_margin * s);

            l.x = l.cx + l.ox.round();
            l.y = l.cy + l.oy.round();
        }
    }
}

fn integrate_velocity(v: f32, a: f32, cfg: &LabelConfig) -> f32 {
    let v = (cfg.damping * (v + a)).clamp(-cfg.max_speed, cfg.max_speed);
    if v.abs() < cfg.min_speed {
        0.0
    } else {
        v
    }
}

// Moves the rest offset itself so the spring does not pull the label back out.
fn keep_on_screen(l: &mut LabelState, width: f32, height: f32, margin: f32) {
    let x = l.cx + l.ox;
    let y = l.cy + l.oy;
    if x < margin {
        l.ox += margin - x;
    } else if x + l.w > width - margin {
        l.ox -= x + l.w - (width - margin);
    }
    if y < margin {
        l.oy += margin - y;
    } else if y + l.h > height - margin {
        l.oy -= y + l.h - (height - margin);
    }
}
