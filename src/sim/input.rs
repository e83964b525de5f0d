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
use midly::{
    live::LiveEvent,
    num::{u4, u7},
    MidiMessage,
};
use tracing::warn;

use crate::config::DecodeErrorPolicy;

use super::Error;

/// Picks the note ons that should spawn balls out of the inbound MIDI stream.
pub struct InputMapper {
    channel: u4,
    decode_errors: DecodeErrorPolicy,
}

impl InputMapper {
    pub fn new(channel: u4, decode_errors: DecodeErrorPolicy) -> InputMapper {
        InputMapper {
            channel,
            decode_errors,
        }
    }

    /// Decodes a packet, returning the pitch of a note on for the input channel.
    /// The note's velocity is ignored.
    pub fn decode(&self, packet: &[u8]) -> Result<Option<u7>, Error> {
        match LiveEvent::parse(packet) {
            Ok(LiveEvent::Midi {
                channel,
                message: MidiMessage::NoteOn { key, .. },
            }) if channel == self.channel => Ok(Some(key)),
            Ok(_) => Ok(None),
            Err(source) => Err(Error::Decode {
                packet: packet.to_vec(),
                source,
            }),
        }
    }

    /// Like [`InputMapper::decode`], but undecodable packets are dropped unless the
    /// policy says they are fatal.
    pub fn pitch(&self, packet: &[u8]) -> Result<Option<u7>, Error> {
        match self.decode(packet) {
            Err(e) if self.decode_errors == DecodeErrorPolicy::Skip => {
                warn!(err = %e, "Dropping MIDI packet.");
                Ok(None)
            }
            result => result,
        }
    }
}
