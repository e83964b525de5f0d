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
use std::f32::consts::TAU;

use crate::{
    config::Physics,
    physics::{BodyHandle, Material, PhysicsWorld, ShapeTag},
};

/// The rotating polygon that the notes bounce around in. It has a circumradius of
/// one and is turned by the physics engine at a constant angular velocity.
pub struct Container {
    body: BodyHandle,
    segments: Vec<([f32; 2], [f32; 2])>,
}

impl Container {
    /// Builds the container's walls in the given world. The first vertex sits at
    /// (1, 0) and the rest follow counter-clockwise in equal steps.
    pub fn setup(physics: &mut PhysicsWorld, config: &Physics) -> Container {
        let body = physics.add_kinematic(config.rotation_rate());
        let sides = config.sides();
        let material = Material {
            elasticity: config.wall_elasticity(),
        };

        let mut segments = Vec::with_capacity(sides as usize);
        let mut v1 = [1.0, 0.0];
        for i in 0..sides {
            let angle = TAU / sides as f32 * (i + 1) as f32;
            let v2 = [angle.cos(), angle.sin()];
            physics.add_segment(
                body,
                v1,
                v2,
                config.wall_thickness(),
                material,
                ShapeTag::Wall,
            );
            segments.push((v1, v2));
            v1 = v2;
        }

        Container { body, segments }
    }

    /// The current angle of the container in [0, 2π).
    pub fn angle(&self, physics: &PhysicsWorld) -> f32 {
        normalize_angle(physics.angle(self.body).unwrap_or_default())
    }

    /// The walls in container-local coordinates.
    pub fn segments(&self) -> &[([f32; 2], [f32; 2])] {
        &self.segments
    }
}

/// Wraps an angle into [0, 2π).
pub(crate) fn normalize_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod test {
    use std::f32::consts::{PI, TAU};

    use crate::{config::Physics, physics::PhysicsWorld};

    use super::{normalize_angle, Container};

    /// Smallest distance between two angles on the circle.
    fn angle_distance(a: f32, b: f32) -> f32 {
        let d = normalize_angle(a - b);
        d.min(TAU - d)
    }

    #[test]
    fn test_hexagon_geometry() {
        let mut physics = PhysicsWorld::new(5.0);
        let container = Container::setup(&mut physics, &Physics::default());

        let segments = container.segments();
        assert_eq!(6, segments.len());
        assert_eq!(6, physics.collider_count());
        assert_eq!(1, physics.body_count());

        let side = 2.0 * (PI / 6.0).sin();
        for (i, (a, b)) in segments.iter().enumerate() {
            assert!((a[0].hypot(a[1]) - 1.0).abs() < 1e-5);
            assert!((b[0].hypot(b[1]) - 1.0).abs() < 1e-5);
            assert!(((b[0] - a[0]).hypot(b[1] - a[1]) - side).abs() < 1e-5);
            // Consecutive walls share a vertex and the polygon closes.
            let next = segments[(i + 1) % segments.len()].0;
            assert!((b[0] - next[0]).abs() < 1e-5 && (b[1] - next[1]).abs() < 1e-5);
        }
        assert_eq!([1.0, 0.0], segments[0].0);
    }

    #[test]
    fn test_side_count() {
        let mut physics = PhysicsWorld::new(5.0);
        let container = Container::setup(&mut physics, &Physics::default().with_sides(3));
        assert_eq!(3, container.segments().len());
        assert_eq!(3, physics.collider_count());
    }

    #[test]
    fn test_angle_independent_of_step_size() {
        let config = Physics::default();
        let total = 3.0f32;

        let mut angles = Vec::new();
        for steps in [30usize, 300, 1000] {
            let mut physics = PhysicsWorld::new(config.gravity());
            let container = Container::setup(&mut physics, &config);
            let dt = total / steps as f32;
            for _ in 0..steps {
                physics.step(dt, |_| {});
            }
            angles.push(container.angle(&physics));
        }

        let expected = normalize_angle(config.rotation_rate() * total);
        for angle in angles {
            assert!(
                angle_distance(angle, expected) < 1e-3,
                "expected {} got {}",
                expected,
                angle
            );
        }
    }

    #[test]
    fn test_angle_wraps() {
        let config = Physics::default().with_rotation_rate(2.0);
        let mut physics = PhysicsWorld::new(config.gravity());
        let container = Container::setup(&mut physics, &config);
        for _ in 0..500 {
            physics.step(0.01, |_| {});
        }
        let angle = container.angle(&physics);
        assert!((0.0..TAU).contains(&angle));
        assert!(angle_distance(angle, 10.0) < 1e-3);
    }

    #[test]
    fn test_normalize_angle() {
        assert_eq!(0.0, normalize_angle(0.0));
        assert!((normalize_angle(-PI / 2.0) - 1.5 * PI).abs() < 1e-6);
        assert!((normalize_angle(TAU + 1.0) - 1.0).abs() < 1e-5);
        assert!(normalize_angle(-1e-9) < TAU);
    }
}
