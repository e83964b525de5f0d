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

//! The simulation core: a rotating container full of notes, advanced by a timer
//! and fed by inbound MIDI.

mod collision;
mod container;
mod engine;
mod input;
mod notes;
mod snapshot;
mod world;

pub use self::collision::{velocity, CollisionMapper};
pub use self::container::Container;
pub use self::engine::Simulation;
pub use self::input::InputMapper;
pub use self::notes::{NoteBodies, NoteBody};
pub use self::snapshot::{Frame, NoteSprite, SimulationSnapshot};
pub use self::world::SimulationWorld;
pub use crate::physics::NoteId;

/// Errors that stop the simulation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to decode MIDI packet {packet:02x?}: {source}")]
    Decode {
        packet: Vec<u8>,
        #[source]
        source: midly::Error,
    },
}
