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
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use tracing::{error, info, span, warn, Level};

use super::thread_priority::{
    configure_sequencer_thread_priority, rt_enabled, sequencer_thread_priority,
};
use super::{Command, Sequencer, SequencerError};
use crate::cancel::CancelHandle;
use crate::transition::Progress;
use crate::transport::{FrameSink, TextSink};

/// Timing of the sequencer thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunnerOptions {
    /// How often the fixtures are recomputed and flushed.
    pub tick_period: Duration,
    /// How often the progress snapshot is refreshed.
    pub status_period: Duration,
    /// When to store the sky defaults after startup, if at all.
    pub store_defaults_after: Option<Duration>,
    /// Whether to raise the sequencer thread's priority.
    pub realtime: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        RunnerOptions {
            tick_period: Duration::from_millis(50),
            status_period: Duration::from_millis(100),
            store_defaults_after: None,
            realtime: false,
        }
    }
}

/// A handle to a running sequencer thread.
pub struct SequencerHandle {
    commands: Sender<Command>,
    status: Arc<RwLock<Progress>>,
    cancel_handle: CancelHandle,
    join: JoinHandle<Result<(), SequencerError>>,
}

impl SequencerHandle {
    /// Queues a command for the next tick.
    pub fn send(&self, command: Command) -> Result<(), SequencerError> {
        self.commands
            .send(command)
            .map_err(|_| SequencerError::Stopped)
    }

    /// A sender that can be handed to other threads.
    pub fn commands(&self) -> Sender<Command> {
        self.commands.clone()
    }

    /// The shared progress snapshot.
    pub fn status(&self) -> Arc<RwLock<Progress>> {
        self.status.clone()
    }

    /// Asks the thread to stop after the current tick.
    pub fn stop(&self) {
        self.cancel_handle.cancel();
    }

    /// Returns true if the thread has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the thread to exit, returning the error that stopped it if there was one.
    pub fn join(self) -> Result<(), SequencerError> {
        self.join.join().map_err(|_| SequencerError::Panicked)?
    }
}

/// Starts the sequencer thread. The thread owns the sequencer and both sinks until it
/// stops, at which point the driver chain is switched off.
pub fn start(
    sequencer: Sequencer,
    frames: Box<dyn FrameSink>,
    text: Box<dyn TextSink>,
    options: RunnerOptions,
) -> io::Result<SequencerHandle> {
    let (commands_tx, commands_rx) = crossbeam_channel::unbounded();
    let status = Arc::new(RwLock::new(sequencer.progress(0.0)));
    let cancel_handle = CancelHandle::new();

    let join = {
        let status = status.clone();
        let cancel_handle = cancel_handle.clone();
        thread::Builder::new()
            .name("sequencer".to_string())
            .spawn(move || {
                run(
                    sequencer,
                    frames,
                    text,
                    options,
                    commands_rx,
                    status,
                    cancel_handle,
                )
            })?
    };

    Ok(SequencerHandle {
        commands: commands_tx,
        status,
        cancel_handle,
        join,
    })
}

fn run(
    mut sequencer: Sequencer,
    mut frames: Box<dyn FrameSink>,
    mut text: Box<dyn TextSink>,
    options: RunnerOptions,
    commands: Receiver<Command>,
    status: Arc<RwLock<Progress>>,
    cancel_handle: CancelHandle,
) -> Result<(), SequencerError> {
    let span = span!(Level::INFO, "sequencer");
    let _enter = span.enter();

    if options.realtime {
        configure_sequencer_thread_priority(sequencer_thread_priority(), rt_enabled());
    }

    info!(
        tick = ?options.tick_period,
        status = ?options.status_period,
        "Sequencer started."
    );

    let start = Instant::now();
    let mut last_time = start;
    let mut next_status = start;
    let mut store_at = options.store_defaults_after.map(|delay| start + delay);

    let result = loop {
        if cancel_handle.is_cancelled() {
            break Ok(());
        }

        let instant = Instant::now();
        let now = instant.duration_since(start).as_secs_f64();

        for command in commands.try_iter() {
            if let Err(e) = sequencer.apply(command, now) {
                warn!(err = %e, "Ignoring command.");
            }
        }

        if store_at.is_some_and(|at| instant >= at) {
            store_at = None;
            if let Err(e) = sequencer.apply(Command::StoreDefaults, now) {
                warn!(err = %e, "Unable to store sky defaults.");
            }
        }

        sequencer.tick(now);
        if let Err(e) = sequencer.flush(frames.as_mut(), text.as_mut()) {
            error!(err = %e, "Output failed, stopping sequencer.");
            break Err(e);
        }

        if instant >= next_status {
            *status.write() = sequencer.progress(now);
            next_status = instant + options.status_period;
        }

        last_time += options.tick_period;
        spin_sleep::sleep(last_time.saturating_duration_since(Instant::now()));
    };

    if let Err(e) = sequencer.all_off(frames.as_mut()) {
        error!(err = %e, "Unable to switch outputs off.");
        if result.is_ok() {
            return Err(e);
        }
    }

    info!("Sequencer stopped.");
    result
}
