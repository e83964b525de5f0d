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
use std::{error::Error, fmt, ops::Deref, sync::Arc};

use crossbeam_channel::Sender;
use midly::live::LiveEvent;

mod midir;
mod mock;
mod output;

pub use self::output::{forward, note_channel, NoteOutput};

/// Raw MIDI messages delivered together by the transport.
pub type InboundBatch = Vec<Vec<u8>>;

/// A MIDI device that can listen for inputs and emit events.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Watches MIDI input for events and sends them to the given sender.
    fn watch_events(&self, sender: Sender<InboundBatch>) -> Result<(), Box<dyn Error>>;

    /// Stops watching events.
    fn stop_watch_events(&self);

    /// Emits an event.
    fn emit(&self, event: LiveEvent<'static>) -> Result<(), Box<dyn Error>>;

    /// Stops watching events and releases the output connection.
    fn close(&self);
}

/// Owns an open device for the life of a run and closes it when dropped, so
/// every exit path releases the transport.
pub struct DeviceGuard {
    device: Arc<dyn Device>,
}

impl DeviceGuard {
    pub fn new(device: Arc<dyn Device>) -> DeviceGuard {
        DeviceGuard { device }
    }

    /// Returns a shared handle to the guarded device.
    pub fn device(&self) -> Arc<dyn Device> {
        self.device.clone()
    }
}

impl Deref for DeviceGuard {
    type Target = dyn Device;

    fn deref(&self) -> &Self::Target {
        self.device.as_ref()
    }
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.device.close();
    }
}

/// Lists devices known to midir.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    midir::list()
}

/// Gets the first device whose name or id contains the given filter, ignoring case.
/// An empty filter picks the first device.
pub fn get_device(filter: &str) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    if filter.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(filter)));
    };

    Ok(Arc::new(midir::get(filter)?))
}

/// Reports whether a device matches a user supplied filter.
fn matches_filter(filter: &str, name: &str, ids: &[String]) -> bool {
    let filter = filter.to_lowercase();
    name.to_lowercase().contains(&filter) || ids.iter().any(|id| id.to_lowercase().contains(&filter))
}
