// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;

const DEFAULT_GRAVITY: f32 = 5.0;
const DEFAULT_BALL_RADIUS: f32 = 0.03;
const DEFAULT_BALL_MASS: f32 = 0.05;
const DEFAULT_BALL_ELASTICITY: f32 = 0.9;
const DEFAULT_SIDES: u32 = 6;
const DEFAULT_WALL_ELASTICITY: f32 = 0.3;
const DEFAULT_WALL_THICKNESS: f32 = 0.01;
const DEFAULT_ROTATION_RATE: f32 = 0.6;
const DEFAULT_TICK_PERIOD: &str = "10ms";
const DEFAULT_DROPOUT_EXTENT: f32 = 3.0;

const DEFAULT_VELOCITY_BASE: f32 = 60.0;
const DEFAULT_VELOCITY_SPAN: f32 = 60.0;
const DEFAULT_IMPULSE_SCALE: f32 = 10.0;

/// A YAML representation of the simulation's physical constants. Lengths are in
/// container radii, so the container always has a circumradius of 1.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Physics {
    /// Downward acceleration applied to every ball.
    gravity: f32,
    ball_radius: f32,
    ball_mass: f32,
    ball_elasticity: f32,
    /// The number of walls in the container.
    sides: u32,
    wall_elasticity: f32,
    wall_thickness: f32,
    /// The container's angular velocity in radians per second.
    rotation_rate: f32,
    /// How often the simulation is advanced, e.g. "10ms".
    tick_period: String,
    /// Balls further than this from the centre on either axis are removed.
    dropout_extent: f32,
}

impl Default for Physics {
    fn default() -> Self {
        Physics {
            gravity: DEFAULT_GRAVITY,
            ball_radius: DEFAULT_BALL_RADIUS,
            ball_mass: DEFAULT_BALL_MASS,
            ball_elasticity: DEFAULT_BALL_ELASTICITY,
            sides: DEFAULT_SIDES,
            wall_elasticity: DEFAULT_WALL_ELASTICITY,
            wall_thickness: DEFAULT_WALL_THICKNESS,
            rotation_rate: DEFAULT_ROTATION_RATE,
            tick_period: DEFAULT_TICK_PERIOD.to_string(),
            dropout_extent: DEFAULT_DROPOUT_EXTENT,
        }
    }
}

impl Physics {
    pub fn gravity(&self) -> f32 {
        self.gravity
    }

    pub fn ball_radius(&self) -> f32 {
        self.ball_radius
    }

    pub fn ball_mass(&self) -> f32 {
        self.ball_mass
    }

    pub fn ball_elasticity(&self) -> f32 {
        self.ball_elasticity
    }

    pub fn sides(&self) -> u32 {
        self.sides
    }

    pub fn wall_elasticity(&self) -> f32 {
        self.wall_elasticity
    }

    pub fn wall_thickness(&self) -> f32 {
        self.wall_thickness
    }

    pub fn rotation_rate(&self) -> f32 {
        self.rotation_rate
    }

    pub fn dropout_extent(&self) -> f32 {
        self.dropout_extent
    }

    /// Returns the parsed tick period.
    pub fn tick_period(&self) -> Result<Duration, ConfigError> {
        let period: Duration = DurationString::from_string(self.tick_period.clone())
            .map_err(|e| ConfigError::InvalidTickPeriod {
                value: self.tick_period.clone(),
                reason: e.to_string(),
            })?
            .into();
        if period.is_zero() {
            return Err(ConfigError::InvalidTickPeriod {
                value: self.tick_period.clone(),
                reason: "must be longer than zero".to_string(),
            });
        }
        Ok(period)
    }

    /// Overrides the container's rotation rate.
    pub fn with_rotation_rate(mut self, rotation_rate: f32) -> Self {
        self.rotation_rate = rotation_rate;
        self
    }

    /// Overrides both elasticities, mostly useful for settling balls in place.
    pub fn with_elasticity(mut self, ball_elasticity: f32, wall_elasticity: f32) -> Self {
        self.ball_elasticity = ball_elasticity;
        self.wall_elasticity = wall_elasticity;
        self
    }

    /// Overrides the number of walls.
    pub fn with_sides(mut self, sides: u32) -> Self {
        self.sides = sides;
        self
    }

    /// Checks the values that would otherwise produce a degenerate world.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sides < 3 {
            return Err(ConfigError::InvalidSides(self.sides));
        }
        for (name, value) in [
            ("ball_radius", self.ball_radius),
            ("ball_mass", self.ball_mass),
            ("wall_thickness", self.wall_thickness),
            ("dropout_extent", self.dropout_extent),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        self.tick_period()?;
        Ok(())
    }
}

/// Maps a contact impulse onto a MIDI note velocity:
/// `base + span * min(1, impulse * impulse_scale)`.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct VelocityMapping {
    /// The velocity of the softest possible hit.
    base: f32,
    /// How much louder the hardest hit is than the softest.
    span: f32,
    /// Impulses at or above `1 / impulse_scale` produce the loudest hit.
    impulse_scale: f32,
}

impl Default for VelocityMapping {
    fn default() -> Self {
        VelocityMapping {
            base: DEFAULT_VELOCITY_BASE,
            span: DEFAULT_VELOCITY_SPAN,
            impulse_scale: DEFAULT_IMPULSE_SCALE,
        }
    }
}

impl VelocityMapping {
    /// Creates a new velocity mapping.
    pub fn new(base: f32, span: f32, impulse_scale: f32) -> VelocityMapping {
        VelocityMapping {
            base,
            span,
            impulse_scale,
        }
    }

    pub fn base(&self) -> f32 {
        self.base
    }

    pub fn span(&self) -> f32 {
        self.span
    }

    pub fn impulse_scale(&self) -> f32 {
        self.impulse_scale
    }
}
