//! Stepping on a dedicated thread with a pit-stop handshake.
//!
//! The stepping thread owns every structural change to the universe. Other
//! threads queue [`Command`]s, which are applied at the start of each batch,
//! and read the universe only between a published [`PitStop`] and their
//! acknowledgement. If no acknowledgement arrives within the read timeout the
//! thread carries on. Every stop carries a sequence number, and both reads
//! and acknowledgements only count for the stop they name.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, warn};

use super::engine::{LifeEngine, StepOutcome, StopSignal, Viewport};
use crate::error::LifeError;

/// A deferred mutation, applied by the stepping thread between batches.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    SetCell { x: i32, y: i32, alive: bool },
    SetRule(String),
    SetPacing { frame_interval: Duration, skip: u64 },
    FreshenView,
    Clear,
    StepBack,
}

/// Published after every batch of generations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PitStop {
    /// Counts stops from 1 in publication order.
    pub sequence: u64,
    pub generation: u64,
    pub outcome: Result<StepOutcome, LifeError>,
}

impl PitStop {
    /// Whether the stepping thread keeps going after this stop.
    pub fn is_final(&self) -> bool {
        !matches!(self.outcome, Ok(StepOutcome::PitStop))
    }
}

/// The engine plus the stop whose read window is open, if any.
struct Shared {
    engine: LifeEngine,
    window: Option<u64>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

fn apply(engine: &mut LifeEngine, command: Command) {
    let result = match command {
        Command::SetCell { x, y, alive } => engine.set_cell(x, y, alive),
        Command::SetRule(rule) => engine.set_rule(&rule),
        Command::SetPacing {
            frame_interval,
            skip,
        } => {
            engine.set_pacing(frame_interval, skip);
            Ok(())
        }
        Command::FreshenView => {
            engine.freshen_view();
            Ok(())
        }
        Command::Clear => {
            engine.clear();
            Ok(())
        }
        Command::StepBack => engine.step_back(),
    };
    if let Err(err) = result {
        warn!("command rejected: {err}");
    }
}

pub struct Simulation {
    shared: Arc<Mutex<Shared>>,
    commands: Sender<Command>,
    pit_stops: Receiver<PitStop>,
    resume: Sender<u64>,
    stop: StopSignal,
    shutdown: StopSignal,
    worker: Option<JoinHandle<Receiver<Command>>>,
}

impl Simulation {
    /// Moves `engine` onto a new stepping thread that runs `generations`
    /// generations (`0` until stopped), waiting at most `read_timeout` at
    /// each pit stop.
    pub fn spawn(engine: LifeEngine, generations: u64, read_timeout: Duration) -> Self {
        let stop = engine.stop_signal();
        let shared = Arc::new(Mutex::new(Shared {
            engine,
            window: None,
        }));
        let (command_tx, command_rx) = mpsc::channel();
        let (pit_tx, pit_rx) = mpsc::channel();
        let (resume_tx, resume_rx) = mpsc::channel();

        let shutdown = StopSignal::default();

        let worker = {
            let shared = Arc::clone(&shared);
            let shutdown = shutdown.clone();
            thread::spawn(move || {
                worker_loop(Worker {
                    shared,
                    commands: command_rx,
                    pit_stops: pit_tx,
                    resume: resume_rx,
                    shutdown,
                    generations,
                    read_timeout,
                })
            })
        };

        Self {
            shared,
            commands: command_tx,
            pit_stops: pit_rx,
            resume: resume_tx,
            stop,
            shutdown,
            worker: Some(worker),
        }
    }

    /// A handle for queueing commands from any thread.
    pub fn commands(&self) -> Sender<Command> {
        self.commands.clone()
    }

    /// Queues `command`. Returns `false` once the stepping thread is gone.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Waits for the next pit stop and skips to the newest one already
    /// published.
    pub fn next_pit_stop(&self, timeout: Duration) -> Option<PitStop> {
        let mut newest = self.pit_stops.recv_timeout(timeout).ok()?;
        while let Ok(stop) = self.pit_stops.try_recv() {
            newest = stop;
        }
        Some(newest)
    }

    /// Reads the universe at `stop`, then acknowledges it so the stepping
    /// thread resumes. Display tiles outside `view` are dropped from the
    /// display list.
    ///
    /// Returns `None` without calling `f` when the thread has already moved
    /// past `stop`.
    pub fn read<R>(
        &self,
        stop: &PitStop,
        view: Option<Viewport>,
        f: impl FnOnce(&LifeEngine) -> R,
    ) -> Option<R> {
        let result = {
            let mut shared = lock(&self.shared);
            if shared.window == Some(stop.sequence) {
                let result = f(&shared.engine);
                shared.engine.acknowledge_frame(view);
                Some(result)
            } else {
                debug!("stop {} read after its window closed", stop.sequence);
                None
            }
        };
        let _ = self.resume.send(stop.sequence);
        result
    }

    /// Stops the stepping thread, applies commands still queued and hands
    /// the engine back.
    pub fn stop(mut self) -> LifeEngine {
        self.halt();
        let shared = Arc::clone(&self.shared);
        drop(self);
        match Arc::try_unwrap(shared) {
            Ok(shared) => {
                shared
                    .into_inner()
                    .unwrap_or_else(PoisonError::into_inner)
                    .engine
            }
            Err(shared) => std::mem::take(&mut lock(&shared).engine),
        }
    }

    fn halt(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // A fresh run clears the engine's stop signal, so the loop watches
        // its own flag as well.
        self.shutdown.request();
        self.stop.request();
        let _ = self.resume.send(0);
        match worker.join() {
            Ok(commands) => {
                let mut shared = lock(&self.shared);
                for command in commands.try_iter() {
                    apply(&mut shared.engine, command);
                }
            }
            Err(_) => error!("stepping thread panicked"),
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.halt();
    }
}

struct Worker {
    shared: Arc<Mutex<Shared>>,
    commands: Receiver<Command>,
    pit_stops: Sender<PitStop>,
    resume: Receiver<u64>,
    shutdown: StopSignal,
    generations: u64,
    read_timeout: Duration,
}

/// Steps until shut down or finished and hands back the command queue.
fn worker_loop(worker: Worker) -> Receiver<Command> {
    let mut resuming = false;
    let mut sequence = 0;
    while !worker.shutdown.is_requested() {
        sequence += 1;
        let pit = {
            let mut shared = lock(&worker.shared);
            shared.window = None;
            for command in worker.commands.try_iter() {
                apply(&mut shared.engine, command);
            }
            let outcome = shared.engine.step(worker.generations, resuming);
            shared.window = Some(sequence);
            PitStop {
                sequence,
                generation: shared.engine.generation(),
                outcome,
            }
        };
        let last = pit.is_final();
        if worker.pit_stops.send(pit).is_err() || last {
            break;
        }
        if !wait_for_ack(&worker, sequence) {
            break;
        }
        resuming = true;
    }

    debug!(
        "stepping thread done at generation {}",
        lock(&worker.shared).engine.generation()
    );
    worker.commands
}

/// Waits until stop `sequence` is acknowledged or the read timeout runs out.
/// Acknowledgements of earlier stops are ignored. Returns `false` once every
/// reader is gone.
fn wait_for_ack(worker: &Worker, sequence: u64) -> bool {
    let deadline = Instant::now() + worker.read_timeout;
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match worker.resume.recv_timeout(left) {
            Ok(ack) if ack == sequence || worker.shutdown.is_requested() => return true,
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => return true,
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}
