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
use std::collections::{btree_map, BTreeMap};

use midly::num::u7;
use tracing::debug;

use crate::{
    config::Physics,
    physics::{BodyHandle, Material, NoteId, PhysicsWorld, ShapeTag},
};

/// A ball in flight, carrying the pitch it was spawned with.
#[derive(Debug)]
pub struct NoteBody {
    id: NoteId,
    pitch: u7,
    body: BodyHandle,
}

impl NoteBody {
    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn pitch(&self) -> u7 {
        self.pitch
    }

    /// The note's current position.
    pub fn position(&self, physics: &PhysicsWorld) -> Option<[f32; 2]> {
        physics.position(self.body)
    }
}

/// The live notes, indexed by id. Every entry owns exactly one body in the
/// physics world.
pub struct NoteBodies {
    notes: BTreeMap<NoteId, NoteBody>,
    next_id: NoteId,
    radius: f32,
    mass: f32,
    material: Material,
}

impl NoteBodies {
    pub fn new(config: &Physics) -> NoteBodies {
        NoteBodies {
            notes: BTreeMap::new(),
            next_id: NoteId::new(0),
            radius: config.ball_radius(),
            mass: config.ball_mass(),
            material: Material {
                elasticity: config.ball_elasticity(),
            },
        }
    }

    /// Drops a new ball at rest in the centre of the container.
    pub fn spawn(&mut self, physics: &mut PhysicsWorld, pitch: u7) -> NoteId {
        let id = self.next_id;
        let body = physics.add_ball(
            [0.0, 0.0],
            self.radius,
            self.mass,
            self.material,
            ShapeTag::Note(id),
        );
        self.notes.insert(id, NoteBody { id, pitch, body });
        self.next_id = id.next();

        debug!(note = %id, pitch = pitch.as_int(), "Spawned note.");
        id
    }

    /// Removes every note that is further than `max_extent` from the centre on
    /// either axis. Returns the number of notes removed.
    pub fn sweep_dropouts(&mut self, physics: &mut PhysicsWorld, max_extent: f32) -> usize {
        let before = self.notes.len();
        self.notes.retain(|id, note| {
            let inside = physics.position(note.body).is_some_and(|[x, y]| {
                x.abs() <= max_extent && y.abs() <= max_extent
            });
            if !inside {
                debug!(note = %id, pitch = note.pitch.as_int(), "Note dropped out.");
                physics.remove_body(note.body);
            }
            inside
        });
        before - self.notes.len()
    }

    pub fn get(&self, id: NoteId) -> Option<&NoteBody> {
        self.notes.get(&id)
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.notes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Iterates the live notes in id order.
    pub fn iter(&self) -> btree_map::Values<'_, NoteId, NoteBody> {
        self.notes.values()
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[cfg(test)]
    pub(crate) fn body(&self, id: NoteId) -> Option<BodyHandle> {
        self.notes.get(&id).map(|note| note.body)
    }
}
