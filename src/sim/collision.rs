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
use midly::num::{u4, u7};
use tracing::debug;

use crate::{config::VelocityMapping, midi::NoteOutput, physics::FirstContact};

use super::notes::NoteBodies;

/// Turns a contact impulse into a note velocity. Never quieter than the mapping's
/// base and never above 127.
pub fn velocity(mapping: &VelocityMapping, impulse: f32) -> u7 {
    let strength = impulse * mapping.impulse_scale();
    let strength = if strength.is_nan() {
        0.0
    } else {
        strength.clamp(0.0, 1.0)
    };
    let velocity = (mapping.base() + mapping.span() * strength).clamp(0.0, 127.0);
    u7::from_int_lossy(velocity as u8)
}

/// Plays a note every time a ball starts touching a wall.
pub struct CollisionMapper {
    channel: u4,
    mapping: VelocityMapping,
    output: NoteOutput,
}

impl CollisionMapper {
    pub fn new(channel: u4, mapping: VelocityMapping, output: NoteOutput) -> CollisionMapper {
        CollisionMapper {
            channel,
            mapping,
            output,
        }
    }

    /// Runs inside the physics step, so it only reads the notes and queues the
    /// outbound event.
    pub fn on_first_contact(&self, notes: &NoteBodies, contact: FirstContact) {
        let Some(note) = notes.get(contact.note) else {
            return;
        };

        let vel = velocity(&self.mapping, contact.impulse);
        debug!(
            channel = self.channel.as_int() + 1,
            pitch = note.pitch().as_int(),
            velocity = vel.as_int(),
            impulse = contact.impulse,
            "Note out."
        );
        self.output.send_note_on(self.channel, note.pitch(), vel);
    }
}

#[cfg(test)]
mod test {
    use midly::{
        live::LiveEvent,
        num::{u4, u7},
        MidiMessage,
    };

    use crate::{
        config::{Physics, VelocityMapping},
        midi::note_channel,
        physics::{FirstContact, NoteId, PhysicsWorld},
        sim::notes::NoteBodies,
    };

    use super::{velocity, CollisionMapper};

    #[test]
    fn test_velocity_bounds() {
        let mapping = VelocityMapping::default();
        assert_eq!(60, velocity(&mapping, 0.0).as_int());
        assert_eq!(90, velocity(&mapping, 0.05).as_int());
        assert_eq!(120, velocity(&mapping, 0.1).as_int());
        assert_eq!(120, velocity(&mapping, 1000.0).as_int());
        assert_eq!(120, velocity(&mapping, f32::INFINITY).as_int());
        assert_eq!(60, velocity(&mapping, f32::NAN).as_int());
    }

    #[test]
    fn test_velocity_monotonic() {
        let mapping = VelocityMapping::default();
        let mut last = 0;
        for i in 0..=200 {
            let current = velocity(&mapping, i as f32 * 0.001).as_int();
            assert!(current >= last, "velocity dropped at impulse step {}", i);
            last = current;
        }
    }

    #[test]
    fn test_velocity_never_exceeds_midi_range() {
        let mapping = VelocityMapping::new(100.0, 100.0, 10.0);
        assert_eq!(127, velocity(&mapping, 1.0).as_int());
        let mapping = VelocityMapping::new(-20.0, 10.0, 10.0);
        assert_eq!(0, velocity(&mapping, 0.0).as_int());
    }

    #[test]
    fn test_on_first_contact() {
        let config = Physics::default();
        let mut physics = PhysicsWorld::new(config.gravity());
        let mut notes = NoteBodies::new(&config);
        let id = notes.spawn(&mut physics, u7::from(72));

        let (output, receiver) = note_channel();
        let mapper = CollisionMapper::new(u4::from(1), VelocityMapping::default(), output);

        mapper.on_first_contact(
            &notes,
            FirstContact {
                note: id,
                impulse: 0.05,
            },
        );
        assert_eq!(
            LiveEvent::Midi {
                channel: u4::from(1),
                message: MidiMessage::NoteOn {
                    key: u7::from(72),
                    vel: u7::from(90),
                },
            },
            receiver.try_recv().expect("expected a note")
        );

        // Unknown notes are ignored.
        mapper.on_first_contact(
            &notes,
            FirstContact {
                note: NoteId::new(99),
                impulse: 0.05,
            },
        );
        assert!(receiver.try_recv().is_err());
    }
}
