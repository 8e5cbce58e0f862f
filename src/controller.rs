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
use std::error::Error;
use std::io;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Instrument, Level};

use crate::sequencer::runner::SequencerHandle;
use crate::sequencer::{Command, SequencerError};

pub mod keyboard;

/// Controller events that will trigger behavior in the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A command to queue for the sequencer's next tick.
    Command(Command),

    /// Prints the current day/night progress.
    Status,

    /// Stops the sequencer, switching everything off.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Controls a running sequencer.
pub struct Controller {
    handle: JoinHandle<Result<(), SequencerError>>,
}

impl Controller {
    /// Creates a new controller with the given driver. The controller owns the sequencer
    /// thread and stops it when the driver quits or goes away.
    pub fn new(
        sequencer: SequencerHandle,
        driver: Arc<dyn Driver>,
    ) -> Result<Controller, Box<dyn Error>> {
        Ok(Controller {
            handle: tokio::spawn(
                Controller::trigger_events(sequencer, driver)
                    .instrument(span!(Level::INFO, "controller")),
            ),
        })
    }

    /// Join will block until the controller and the sequencer finish.
    pub async fn join(&mut self) -> Result<(), Box<dyn Error>> {
        (&mut self.handle).await??;
        Ok(())
    }

    /// Forwards driver events to the sequencer until the driver quits.
    async fn trigger_events(
        sequencer: SequencerHandle,
        driver: Arc<dyn Driver>,
    ) -> Result<(), SequencerError> {
        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);
        let status = sequencer.status();

        info!("Controller started.");

        loop {
            match events_rx.recv().await {
                Some(Event::Command(command)) => {
                    info!(command = ?command, "Received command.");
                    if let Err(e) = sequencer.send(command) {
                        error!(err = %e, "Error talking to sequencer.");
                        break;
                    }
                }
                Some(Event::Status) => {
                    let progress = *status.read();
                    println!("{}", progress);
                }
                Some(Event::Quit) => {
                    info!("Quit requested.");
                    if let Err(e) = join_handle.await {
                        error!("Error waiting for event monitor to stop: {}", e);
                    }
                    break;
                }
                None => {
                    info!("Controller closing.");
                    if let Err(e) = join_handle.await {
                        error!("Error waiting for event monitor to stop: {}", e);
                    }
                    break;
                }
            }
        }

        sequencer.stop();
        match tokio::task::spawn_blocking(move || sequencer.join()).await {
            Ok(result) => result,
            Err(e) => {
                error!("Error waiting for sequencer to stop: {}", e);
                Err(SequencerError::Panicked)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;
    use std::io;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use crate::fixture::{Address, DayNight, Fixture, Keyframes, Mode, SwitchGroup};
    use crate::frame::{DriverFrame, DEFAULT_MODULES};
    use crate::sequencer::runner::{self, RunnerOptions};
    use crate::sequencer::{Command, Sequencer, SequencerOptions};
    use crate::testutil::eventually;
    use crate::transition::{Phase, TransitionTiming};
    use crate::transport::test::RecordingSink;

    use super::{Controller, Driver, Event};

    /// A driver whose events come from the test.
    struct TestDriver {
        events: Mutex<Option<std_mpsc::Receiver<Event>>>,
    }

    impl TestDriver {
        fn new() -> (TestDriver, std_mpsc::Sender<Event>) {
            let (tx, rx) = std_mpsc::channel();
            (
                TestDriver {
                    events: Mutex::new(Some(rx)),
                },
                tx,
            )
        }
    }

    impl Driver for TestDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events = self.events.lock().take();
            tokio::task::spawn_blocking(move || {
                let Some(events) = events else {
                    return Ok(());
                };
                for event in events {
                    let quit = event == Event::Quit;
                    if events_tx.blocking_send(event).is_err() || quit {
                        break;
                    }
                }
                Ok(())
            })
        }
    }

    fn sequencer() -> Sequencer {
        Sequencer::new(
            vec![Fixture::new(
                "Sky front white",
                Mode::DayNight(DayNight {
                    to_night: Keyframes::from_pairs(&[(0.0, 1000), (60.0, 40)]),
                    to_day: Keyframes::from_pairs(&[(0.0, 40), (60.0, 1000)]),
                }),
                Address::Sky { port: 3 },
                Some(SwitchGroup::Sky),
            )],
            &SequencerOptions {
                modules: DEFAULT_MODULES,
                timing: TransitionTiming {
                    transition_length: 60.0,
                    auto_period: 180.0,
                },
                auto: false,
                sky: true,
            },
            StdRng::seed_from_u64(3),
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_controller() -> Result<(), Box<dyn Error>> {
        let frames = RecordingSink::new();
        let handle = runner::start(
            sequencer(),
            Box::new(frames.clone()),
            Box::new(RecordingSink::new()),
            RunnerOptions {
                tick_period: Duration::from_millis(5),
                status_period: Duration::from_millis(5),
                ..Default::default()
            },
        )?;
        let status = handle.status();

        let (driver, events) = TestDriver::new();
        let mut controller = Controller::new(handle, Arc::new(driver))?;

        events.send(Event::Command(Command::GoToNight))?;
        eventually(
            || status.read().phase == Phase::Sunset,
            "Sequencer never started the sunset",
        );
        events.send(Event::Status)?;
        events.send(Event::Quit)?;

        controller.join().await?;
        assert_eq!(
            Some(DriverFrame::all_off(DEFAULT_MODULES).as_bytes().to_vec()),
            frames.last_frame()
        );
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_controller_stops_when_driver_closes() -> Result<(), Box<dyn Error>> {
        let frames = RecordingSink::new();
        let handle = runner::start(
            sequencer(),
            Box::new(frames.clone()),
            Box::new(RecordingSink::new()),
            RunnerOptions {
                tick_period: Duration::from_millis(5),
                ..Default::default()
            },
        )?;

        let (driver, events) = TestDriver::new();
        let mut controller = Controller::new(handle, Arc::new(driver))?;
        drop(events);

        controller.join().await?;
        assert_eq!(
            Some(DriverFrame::all_off(DEFAULT_MODULES).as_bytes().to_vec()),
            frames.last_frame()
        );
        Ok(())
    }
}
