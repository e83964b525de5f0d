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
use std::{collections::BTreeMap, error::Error, fmt, mem};

use crossbeam_channel::Sender;
use midir::{
    MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort,
};
use midly::live::LiveEvent;
use parking_lot::Mutex;
use tracing::{debug, error, info, span, warn, Level};

use super::InboundBatch;

pub struct Device {
    name: String,
    ids: Vec<String>,
    input_port: Option<MidiInputPort>,
    output_port: Option<MidiOutputPort>,
    event_connection: Mutex<Option<MidiInputConnection<()>>>,
    output_connection: Mutex<Option<MidiOutputConnection>>,
}

impl Device {
    fn new(name: String) -> Device {
        Device {
            name,
            ids: Vec::new(),
            input_port: None,
            output_port: None,
            event_connection: Mutex::new(None),
            output_connection: Mutex::new(None),
        }
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn watch_events(&self, sender: Sender<InboundBatch>) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::INFO, "wait for event (midir)");
        let _enter = span.enter();

        let mut event_connection = self.event_connection.lock();
        if event_connection.is_some() {
            return Err("Already watching events.".into());
        }

        // Without input nothing can ever spawn, so this is a setup error.
        let input_port = match self.input_port.as_ref() {
            Some(input_port) => input_port,
            None => {
                return Err(format!("MIDI device {} has no input port", self.name).into());
            }
        };

        info!("Watching MIDI events.");

        let input = MidiInput::new("tombola input")?;
        *event_connection = Some(input.connect(
            input_port,
            "tombola input watcher",
            move |_, raw_event, _| {
                debug!(event = ?raw_event, "Received MIDI event.");
                if let Err(e) = sender.send(vec![raw_event.to_vec()]) {
                    error!(err = %e, "Error sending MIDI event to the simulation.");
                }
            },
            (),
        )?);

        Ok(())
    }

    /// Stops watching events. Dropping the connection drops the sender with it.
    fn stop_watch_events(&self) {
        let event_connection = self.event_connection.lock().take();
        mem::drop(event_connection);
    }

    fn emit(&self, event: LiveEvent<'static>) -> Result<(), Box<dyn Error>> {
        let output_port = match &self.output_port {
            Some(output_port) => output_port,
            None => {
                warn!("No MIDI output device configured, cannot emit event.");
                return Ok(());
            }
        };

        let mut buf: Vec<u8> = Vec::with_capacity(8);
        event.write(&mut buf)?;

        let mut output_connection = self.output_connection.lock();
        if output_connection.is_none() {
            let output = MidiOutput::new("tombola output")?;
            *output_connection = Some(output.connect(output_port, "tombola")?);
            info!(device = self.name, "Opened MIDI output.");
        }
        if let Some(connection) = output_connection.as_mut() {
            connection.send(&buf)?;
        }

        Ok(())
    }

    fn close(&self) {
        self.stop_watch_events();
        if let Some(connection) = self.output_connection.lock().take() {
            connection.close();
        }
        info!(device = self.name, "Closed MIDI device.");
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut capabilities: Vec<String> = Vec::new();
        if self.input_port.is_some() {
            capabilities.push(String::from("Input"));
        }
        if self.output_port.is_some() {
            capabilities.push(String::from("Output"));
        }

        write!(f, "{} ({})", self.name, capabilities.join("/"))?;
        if !self.ids.is_empty() {
            write!(f, " [{}]", self.ids.join(", "))?;
        }
        Ok(())
    }
}

/// Lists midir devices and produces the Device trait.
pub fn list() -> Result<Vec<Box<dyn super::Device>>, Box<dyn Error>> {
    Ok(list_midir_devices()?
        .into_iter()
        .map(|device| {
            let device: Box<dyn super::Device> = Box::new(device);
            device
        })
        .collect())
}

/// Lists midir devices sorted by name. Input and output ports with the same name
/// are merged into one device.
fn list_midir_devices() -> Result<Vec<Device>, Box<dyn Error>> {
    let input = MidiInput::new("tombola input listing")?;
    let output = MidiOutput::new("tombola output listing")?;

    let mut devices: BTreeMap<String, Device> = BTreeMap::new();

    for port in input.ports() {
        let name = input.port_name(&port)?;
        let device = devices
            .entry(name.clone())
            .or_insert_with(|| Device::new(name));
        if device.input_port.is_none() {
            device.ids.push(port.id());
            device.input_port = Some(port);
        }
    }

    for port in output.ports() {
        let name = output.port_name(&port)?;
        let device = devices
            .entry(name.clone())
            .or_insert_with(|| Device::new(name));
        if device.output_port.is_none() {
            let id = port.id();
            if !device.ids.contains(&id) {
                device.ids.push(id);
            }
            device.output_port = Some(port);
        }
    }

    Ok(devices.into_values().collect())
}

/// Gets the first midir device that matches the filter.
pub fn get(filter: &str) -> Result<Device, Box<dyn Error>> {
    let devices = list_midir_devices()?;
    if devices.is_empty() {
        return Err("no MIDI devices found".into());
    }

    let names = devices
        .iter()
        .map(|device| device.name.clone())
        .collect::<Vec<String>>();
    devices
        .into_iter()
        .find(|device| super::matches_filter(filter, &device.name, &device.ids))
        .ok_or_else(|| {
            format!(
                "can't find MIDI device {:?}, have [{}]",
                filter,
                names.join(", ")
            )
            .into()
        })
}

#[cfg(test)]
mod test {
    use crate::midi::{matches_filter, Device as _};

    use super::Device;

    #[test]
    fn test_matches_filter() {
        let ids = vec!["hw:2,0,0".to_string()];
        assert!(matches_filter("launch", "Launchpad Mini", &ids));
        assert!(matches_filter("LAUNCHPAD", "Launchpad Mini", &ids));
        assert!(matches_filter("hw:2", "Launchpad Mini", &ids));
        assert!(!matches_filter("keystep", "Launchpad Mini", &ids));
        assert!(matches_filter("", "Launchpad Mini", &[]));
    }

    #[test]
    fn test_watch_events_without_input_port() {
        let device = Device::new("Output Only".to_string());
        let (sender, receiver) = crossbeam_channel::unbounded();

        let err = device
            .watch_events(sender)
            .expect_err("a device without input can't be watched");
        assert!(err.to_string().contains("Output Only"), "{}", err);
        // The sender isn't kept, so the simulation would see the input close.
        assert!(receiver.recv().is_err());
        assert!(device.event_connection.lock().is_none());
    }
}
