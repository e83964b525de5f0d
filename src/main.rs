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
use std::{error::Error, path::PathBuf, thread};

use clap::{crate_version, Parser, Subcommand};
use tombola::{
    config::Tombola,
    display, midi,
    sim::{Simulation, SimulationWorld},
    thread_priority::{configure_simulation_thread, rt_enabled, simulation_thread_priority},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A rotating polygon of bouncing balls, played and heard over MIDI."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available MIDI input/output devices.
    MidiDevices {},
    /// Starts the tombola.
    Start {
        /// The path to a YAML config file.
        #[arg[short, long]]
        config: Option<PathBuf>,
        /// The MIDI channel (1-16) to listen to.
        #[arg[long]]
        inch: Option<u8>,
        /// The MIDI channel (1-16) to play collisions on.
        #[arg[long]]
        outch: Option<u8>,
        /// The MIDI device to use. Matches a substring of the name or id.
        #[arg[short, long]]
        dev: Option<String>,
        /// Run without drawing to the terminal.
        #[arg[long]]
        headless: bool,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    // The terminal belongs to the display, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Start {
            config,
            inch,
            outch,
            dev,
            headless,
        } => {
            let mut tombola = match config {
                Some(path) => Tombola::deserialize(&path)?,
                None => Tombola::default(),
            };
            if let Some(inch) = inch {
                tombola = tombola.with_input_channel(inch);
            }
            if let Some(outch) = outch {
                tombola = tombola.with_output_channel(outch);
            }
            if let Some(dev) = dev {
                tombola = tombola.with_device(&dev);
            }
            tombola.validate()?;

            start(tombola, headless)?;
        }
    }

    Ok(())
}

fn start(tombola: Tombola, headless: bool) -> Result<(), Box<dyn Error>> {
    let tick_period = tombola.physics().tick_period()?;
    // Closed on every return from here on.
    let device = midi::DeviceGuard::new(midi::get_device(tombola.device())?);
    info!(device = %device.name(), "Using MIDI device.");

    let (output, events) = midi::note_channel();
    let forwarder = midi::forward(device.device(), events);

    let simulation = Simulation::new(SimulationWorld::new(&tombola, output)?);
    let snapshot = simulation.snapshot();

    let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded();
    device.watch_events(inbound_tx)?;
    let ticker = crossbeam_channel::tick(tick_period);

    let priority = simulation_thread_priority();
    let rt = rt_enabled();
    let handle = thread::Builder::new()
        .name("simulation".into())
        .spawn(move || {
            configure_simulation_thread(priority, rt);
            simulation.run(ticker, inbound_rx)
        })?;

    let drawn = if headless {
        Ok(())
    } else {
        let drawn = display::run(&snapshot, || !handle.is_finished());
        // Closing the input ends the simulation loop.
        device.stop_watch_events();
        drawn
    };

    let result = handle
        .join()
        .map_err(|_| "simulation thread panicked")?;

    // The world holds the last note output, releasing it ends the forwarder.
    drop(snapshot);
    if forwarder.join().is_err() {
        error!("MIDI output thread panicked.");
    }

    drawn?;
    result?;
    info!("Tombola stopped.");
    Ok(())
}
