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
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam_channel::{select, Receiver};
use parking_lot::Mutex;
use tracing::{debug, info, span, Level};

use crate::{midi::InboundBatch, physics::NoteId};

use super::{snapshot::SimulationSnapshot, world::SimulationWorld, Error};

/// Owns the simulation world and serializes everything that touches it. Timer
/// ticks and inbound batches are each handled entirely under the world lock.
pub struct Simulation {
    world: Arc<Mutex<SimulationWorld>>,
    last_tick: Instant,
}

impl Simulation {
    pub fn new(world: SimulationWorld) -> Simulation {
        Simulation {
            world: Arc::new(Mutex::new(world)),
            last_tick: Instant::now(),
        }
    }

    /// Returns a read-only view of the world for drawing.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot::new(self.world.clone())
    }

    /// Advances the world by the wall clock time since the previous tick.
    /// Returns the step that was taken.
    pub fn handle_tick(&mut self, now: Instant) -> Duration {
        let delta = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        let dropouts = self.world.lock().advance(delta);
        if dropouts > 0 {
            debug!(dropouts, "Removed escaped notes.");
        }
        delta
    }

    /// Spawns the notes for a batch of inbound packets.
    pub fn handle_batch(&self, batch: &[Vec<u8>]) -> Result<Vec<NoteId>, Error> {
        self.world.lock().process_batch(batch)
    }

    /// Alternates between timer ticks and inbound batches until the inbound
    /// channel closes or a packet can't be decoded under the fatal policy.
    pub fn run(
        mut self,
        ticker: Receiver<Instant>,
        inbound: Receiver<InboundBatch>,
    ) -> Result<(), Error> {
        let span = span!(Level::INFO, "simulation");
        let _enter = span.enter();

        info!("Simulation started.");
        self.last_tick = Instant::now();

        loop {
            select! {
                recv(ticker) -> now => match now {
                    Ok(now) => {
                        self.handle_tick(now);
                    }
                    Err(_) => {
                        info!("Timer closed, stopping simulation.");
                        return Ok(());
                    }
                },
                recv(inbound) -> batch => match batch {
                    Ok(batch) => {
                        self.handle_batch(&batch)?;
                    }
                    Err(_) => {
                        info!("MIDI input closed, stopping simulation.");
                        return Ok(());
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use crate::{
        config::{DecodeErrorPolicy, Tombola},
        midi::{note_channel, test::Device, Device as _},
        sim::{world::SimulationWorld, Error},
        testutil::eventually,
    };

    use super::Simulation;

    fn simulation(config: Tombola) -> Simulation {
        let (output, _receiver) = note_channel();
        Simulation::new(SimulationWorld::new(&config, output).expect("valid config"))
    }

    #[test]
    fn test_tick_uses_elapsed_time() {
        let mut simulation = simulation(Tombola::default());
        let start = simulation.last_tick;

        assert_eq!(
            Duration::from_millis(13),
            simulation.handle_tick(start + Duration::from_millis(13))
        );
        assert_eq!(
            Duration::from_millis(7),
            simulation.handle_tick(start + Duration::from_millis(20))
        );
        // A tick from the past doesn't move anything.
        assert_eq!(Duration::ZERO, simulation.handle_tick(start));

        let snapshot = simulation.snapshot();
        assert_eq!(Duration::from_millis(20), snapshot.elapsed());
    }

    #[test]
    fn test_batch_before_next_step() {
        let mut simulation = simulation(Tombola::default());
        let ids = simulation
            .handle_batch(&[vec![0x90, 60, 100], vec![0x90, 64, 100]])
            .expect("batch should decode");
        assert_eq!(2, ids.len());
        assert_ne!(ids[0], ids[1]);

        // Both notes exist at the origin before any step has run.
        let snapshot = simulation.snapshot();
        assert_eq!(2, snapshot.note_count());
        assert_eq!(Duration::ZERO, snapshot.elapsed());

        simulation.handle_tick(simulation.last_tick + Duration::from_millis(10));
        assert_eq!(2, snapshot.note_count());
    }

    #[test]
    fn test_run() {
        let simulation = simulation(Tombola::default());
        let snapshot = simulation.snapshot();
        let device = Device::get("mock-input");

        let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded();
        device.watch_events(inbound_tx).expect("should watch events");
        let ticker = crossbeam_channel::tick(Duration::from_millis(5));
        let handle = thread::spawn(move || simulation.run(ticker, inbound_rx));

        device.mock_batch(vec![vec![0x90, 60, 100], vec![0x91, 61, 100]]);
        device.mock_batch(vec![vec![0x90, 62, 100]]);
        eventually(|| snapshot.note_count() == 2, "two notes should spawn");
        eventually(
            || snapshot.elapsed() > Duration::ZERO,
            "the timer should advance the world",
        );

        device.close();
        let result = handle.join().expect("simulation thread panicked");
        assert!(result.is_ok());
        assert_eq!(2, snapshot.note_count());
    }

    #[test]
    fn test_run_fatal_decode_error() {
        let simulation =
            simulation(Tombola::default().with_decode_errors(DecodeErrorPolicy::Fatal));
        let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded();
        let (_tick_tx, ticker) = crossbeam_channel::unbounded::<Instant>();
        let handle = thread::spawn(move || simulation.run(ticker, inbound_rx));

        inbound_tx
            .send(vec![vec![0x90, 60, 100], vec![0x90]])
            .expect("simulation should be listening");
        let result = handle.join().expect("simulation thread panicked");
        assert!(matches!(result, Err(Error::Decode { .. })));
    }

    #[test]
    fn test_run_skips_bad_packets() {
        let simulation = simulation(Tombola::default());
        let snapshot = simulation.snapshot();
        let (inbound_tx, inbound_rx) = crossbeam_channel::unbounded();
        let (_tick_tx, ticker) = crossbeam_channel::unbounded::<Instant>();
        let handle = thread::spawn(move || simulation.run(ticker, inbound_rx));

        inbound_tx
            .send(vec![vec![0x90], vec![0x90, 60, 100]])
            .expect("simulation should be listening");
        drop(inbound_tx);

        assert!(handle.join().expect("simulation thread panicked").is_ok());
        assert_eq!(1, snapshot.note_count());
    }
}
