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

use midly::num::u7;
use tracing::debug;

use crate::{
    config::{ConfigError, Tombola},
    midi::NoteOutput,
    physics::{NoteId, PhysicsWorld},
};

use super::{
    collision::CollisionMapper, container::Container, input::InputMapper, notes::NoteBodies,
    Error,
};

/// Everything that changes while the tombola runs. There is one of these per
/// process, owned by the [`super::Simulation`].
pub struct SimulationWorld {
    physics: PhysicsWorld,
    container: Container,
    notes: NoteBodies,
    collisions: CollisionMapper,
    input: InputMapper,
    dropout_extent: f32,
    elapsed: Duration,
}

impl SimulationWorld {
    /// Builds the container and an empty set of notes. Collisions are played
    /// through the given output.
    pub fn new(config: &Tombola, output: NoteOutput) -> Result<SimulationWorld, ConfigError> {
        config.validate()?;

        let physics_config = config.physics();
        let mut physics = PhysicsWorld::new(physics_config.gravity());
        let container = Container::setup(&mut physics, physics_config);

        Ok(SimulationWorld {
            physics,
            container,
            notes: NoteBodies::new(physics_config),
            collisions: CollisionMapper::new(
                config.output_channel()?,
                config.velocity().clone(),
                output,
            ),
            input: InputMapper::new(config.input_channel()?, config.decode_errors()),
            dropout_extent: physics_config.dropout_extent(),
            elapsed: Duration::ZERO,
        })
    }

    /// Steps the physics by `delta` and then removes the notes that escaped.
    /// Returns the number of notes removed.
    pub fn advance(&mut self, delta: Duration) -> usize {
        let notes = &self.notes;
        let collisions = &self.collisions;
        self.physics.step(delta.as_secs_f32(), |contact| {
            collisions.on_first_contact(notes, contact)
        });
        self.elapsed += delta;

        self.notes.sweep_dropouts(&mut self.physics, self.dropout_extent)
    }

    /// Spawns a note for every note on in the batch that arrived on the input
    /// channel, in order. Returns the new ids.
    pub fn process_batch(&mut self, batch: &[Vec<u8>]) -> Result<Vec<NoteId>, Error> {
        let mut spawned = Vec::new();
        for packet in batch {
            if let Some(pitch) = self.input.pitch(packet)? {
                spawned.push(self.spawn(pitch));
            }
        }
        if !spawned.is_empty() {
            debug!(count = spawned.len(), live = self.notes.len(), "Spawned notes.");
        }
        Ok(spawned)
    }

    /// Drops a new note into the container.
    pub fn spawn(&mut self, pitch: u7) -> NoteId {
        self.notes.spawn(&mut self.physics, pitch)
    }

    pub fn notes(&self) -> &NoteBodies {
        &self.notes
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// The container's current angle in [0, 2π).
    pub fn container_angle(&self) -> f32 {
        self.container.angle(&self.physics)
    }

    /// The note's current position.
    pub fn note_position(&self, id: NoteId) -> Option<[f32; 2]> {
        self.notes.get(id).and_then(|note| note.position(&self.physics))
    }

    /// Total simulated time.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[cfg(test)]
    pub(crate) fn teleport(&mut self, id: NoteId, position: [f32; 2]) {
        if let Some(body) = self.notes.body(id) {
            self.physics.set_position(body, position);
        }
    }

    #[cfg(test)]
    pub(crate) fn body_count(&self) -> usize {
        self.physics.body_count()
    }
}
