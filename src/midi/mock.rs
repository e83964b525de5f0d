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
use std::{collections::VecDeque, error::Error, fmt, sync::Arc};

use crossbeam_channel::Sender;
use midly::live::LiveEvent;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::InboundBatch;

/// The number of emitted events a mock device remembers.
const EMITTED_HISTORY: usize = 256;

/// A mock device. Doesn't talk to any hardware.
#[derive(Clone)]
pub struct Device {
    name: String,
    sender: Arc<Mutex<Option<Sender<InboundBatch>>>>,
    emitted: Arc<Mutex<VecDeque<Vec<u8>>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            sender: Arc::new(Mutex::new(None)),
            emitted: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    #[cfg(test)]
    /// Delivers a batch of raw messages as if they came from the transport.
    pub fn mock_batch(&self, batch: InboundBatch) {
        let sender = self.sender.lock();
        sender
            .as_ref()
            .expect("mock device is not being watched")
            .send(batch)
            .expect("error sending batch");
    }

    #[cfg(test)]
    /// Gets the raw bytes of every event emitted so far, oldest first.
    pub fn emitted(&self) -> Vec<Vec<u8>> {
        self.emitted.lock().iter().cloned().collect()
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    /// Watches MIDI input for events and sends them to the given sender.
    fn watch_events(&self, sender: Sender<InboundBatch>) -> Result<(), Box<dyn Error>> {
        let mut current = self.sender.lock();
        if current.is_some() {
            return Err("Already watching events.".into());
        }
        info!(device = self.name, "Watching mock MIDI events.");
        *current = Some(sender);
        Ok(())
    }

    /// Stops watching events. Dropping the sender closes the inbound channel.
    fn stop_watch_events(&self) {
        self.sender.lock().take();
    }

    /// Emits an event.
    fn emit(&self, event: LiveEvent<'static>) -> Result<(), Box<dyn Error>> {
        let mut buf: Vec<u8> = Vec::with_capacity(8);
        event.write(&mut buf)?;
        debug!(device = self.name, event = ?buf, "Emitting mock event.");

        let mut emitted = self.emitted.lock();
        if emitted.len() == EMITTED_HISTORY {
            emitted.pop_front();
        }
        emitted.push_back(buf);
        Ok(())
    }

    fn close(&self) {
        self.stop_watch_events();
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
