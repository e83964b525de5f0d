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
use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;

use super::world::SimulationWorld;

/// The visible area spans this many container radii across the surface width.
const VIEW_SPAN: f32 = 3.0;

/// A ball, in surface coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteSprite {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Everything needed to draw one frame, scaled to the caller's surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: f32,
    pub height: f32,
    /// Surface units per container radius.
    pub scale: f32,
    /// The container's angle in [0, 2π).
    pub angle: f32,
    /// Scaled walls in container-local coordinates, before rotation.
    pub walls: Vec<([f32; 2], [f32; 2])>,
    pub notes: Vec<NoteSprite>,
}

impl Frame {
    /// The surface point that the container turns around.
    pub fn center(&self) -> [f32; 2] {
        [self.width / 2.0, self.height / 2.0]
    }

    /// The walls rotated by the container angle and moved to the centre.
    pub fn rotated_walls(&self) -> Vec<([f32; 2], [f32; 2])> {
        let (sin, cos) = self.angle.sin_cos();
        let [cx, cy] = self.center();
        let place = |[x, y]: [f32; 2]| [cx + x * cos - y * sin, cy + x * sin + y * cos];
        self.walls
            .iter()
            .map(|(a, b)| (place(*a), place(*b)))
            .collect()
    }
}

/// A read-only view of the simulation. Every read takes the world lock, so a
/// frame never shows a half finished step.
#[derive(Clone)]
pub struct SimulationSnapshot {
    world: Arc<Mutex<SimulationWorld>>,
}

impl SimulationSnapshot {
    pub(super) fn new(world: Arc<Mutex<SimulationWorld>>) -> SimulationSnapshot {
        SimulationSnapshot { world }
    }

    /// Captures the container and notes scaled to a `width` by `height` surface.
    pub fn draw(&self, width: f32, height: f32) -> Frame {
        let scale = width / VIEW_SPAN;
        let [cx, cy] = [width / 2.0, height / 2.0];

        let world = self.world.lock();
        let walls = world
            .container()
            .segments()
            .iter()
            .map(|(a, b)| {
                (
                    [a[0] * scale, a[1] * scale],
                    [b[0] * scale, b[1] * scale],
                )
            })
            .collect();
        let radius = world.notes().radius() * scale;
        let notes = world
            .notes()
            .iter()
            .filter_map(|note| world.note_position(note.id()))
            .map(|[x, y]| NoteSprite {
                x: cx + x * scale,
                y: cy + y * scale,
                radius,
            })
            .collect();

        Frame {
            width,
            height,
            scale,
            angle: world.container_angle(),
            walls,
            notes,
        }
    }

    /// The number of live notes.
    pub fn note_count(&self) -> usize {
        self.world.lock().notes().len()
    }

    /// Total simulated time.
    pub fn elapsed(&self) -> Duration {
        self.world.lock().elapsed()
    }
}
