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
use std::{sync::Arc, thread};

use crossbeam_channel::{Receiver, Sender};
use midly::{
    live::LiveEvent,
    num::{u4, u7},
    MidiMessage,
};
use tracing::{debug, error, info, span, warn, Level};

use super::Device;

/// Queues outbound note events without waiting on the device.
#[derive(Clone)]
pub struct NoteOutput {
    sender: Sender<LiveEvent<'static>>,
}

/// Creates a note output and the receiving end that [`forward`] drains.
pub fn note_channel() -> (NoteOutput, Receiver<LiveEvent<'static>>) {
    let (sender, receiver) = crossbeam_channel::unbounded();
    (NoteOutput { sender }, receiver)
}

impl NoteOutput {
    /// Queues a note on. Notes are one-shot triggers, so no note off ever follows.
    pub fn send_note_on(&self, channel: u4, key: u7, vel: u7) {
        let event = LiveEvent::Midi {
            channel,
            message: MidiMessage::NoteOn { key, vel },
        };
        if let Err(e) = self.sender.send(event) {
            warn!(err = %e, "MIDI output is closed, dropping note.");
        }
    }
}

/// Writes every queued event to the device until all note outputs are dropped.
pub fn forward(
    device: Arc<dyn Device>,
    events: Receiver<LiveEvent<'static>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let span = span!(Level::INFO, "midi output");
        let _enter = span.enter();

        for event in events.iter() {
            debug!(event = format!("{:?}", event), "Emitting event.");
            if let Err(e) = device.emit(event) {
                error!(err = e.as_ref(), "Error emitting MIDI event.");
            }
        }

        info!("MIDI output closed.");
    })
}
