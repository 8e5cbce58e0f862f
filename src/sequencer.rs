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

use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::animator::{compute_level, GroupState};
use crate::encoder::OutputBuffers;
use crate::fixture::{Fixture, Level, Mode, SwitchGroup, MAX_LEVEL, TOGGLE_GROUPS};
use crate::frame::{AuxTerminator, DriverFrame};
use crate::transition::{Progress, TransitionController, TransitionTiming};
use crate::transport::{FrameSink, TextSink};

pub mod runner;
#[cfg(test)]
mod tests;
mod thread_priority;

/// The level a fixture without a constant value is driven at when a test starts.
pub const DEFAULT_TEST_LEVEL: Level = 500;

/// Commands from the control surface. They're applied at the start of a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start (or reverse into, or snap to) night.
    GoToNight,
    /// Start (or reverse into, or snap to) day.
    GoToDay,
    /// Turn auto day/night cycling on or off.
    ToggleAuto,
    /// Turn the sky bank on or off.
    ToggleSky,
    /// Flip one of the manual toggle groups.
    ToggleSwitch(u8),
    /// Drive a single fixture by hand, freezing everything else.
    BeginTest(String),
    /// Set the level of the fixture under test.
    SetTestLevel(Level),
    /// Go back to normal animation.
    EndTest,
    /// Store the current sky startup colours in the sky controller.
    StoreDefaults,
}

#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    #[error("{sink} transport failed: {source}")]
    Transport {
        sink: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("no fixture named '{0}'")]
    UnknownFixture(String),
    #[error("switch group {0} doesn't exist")]
    UnknownSwitch(u8),
    #[error("no fixture is being tested")]
    NoActiveTest,
    #[error("the sequencer has stopped")]
    Stopped,
    #[error("the sequencer thread panicked")]
    Panicked,
}

/// Startup options for the sequencer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerOptions {
    /// The number of driver modules on the chain.
    pub modules: usize,
    pub timing: TransitionTiming,
    /// Whether auto day/night cycling starts enabled.
    pub auto: bool,
    /// Whether the sky bank starts enabled.
    pub sky: bool,
}

/// A fixture being driven by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualTest {
    /// Index into the catalog.
    pub fixture: usize,
    pub level: Level,
}

/// Owns the fixtures, the output buffers and the transition state. Times are seconds on
/// the sequencer's own monotonic clock, which starts at zero.
pub struct Sequencer {
    fixtures: Vec<Fixture>,
    modules: usize,
    buffers: OutputBuffers,
    transition: TransitionController,
    groups: GroupState,
    test: Option<ManualTest>,
    store_requested: bool,
}

impl Sequencer {
    /// Creates a sequencer for the given catalog. Random sequences are generated and
    /// constant fixtures are encoded right away.
    pub fn new(fixtures: Vec<Fixture>, options: &SequencerOptions, rng: StdRng) -> Sequencer {
        let mut transition = TransitionController::new(options.timing, rng);
        if options.auto {
            transition.start_auto(0.0);
        }

        let mut sequencer = Sequencer {
            fixtures,
            modules: options.modules,
            buffers: OutputBuffers::new(options.modules),
            transition,
            groups: GroupState {
                sky: options.sky,
                ..Default::default()
            },
            test: None,
            store_requested: false,
        };

        sequencer
            .transition
            .regenerate_random_sequences(&mut sequencer.fixtures);
        for fixture in sequencer.fixtures.iter_mut() {
            if let Mode::Constant { value, .. } = fixture.mode() {
                let value = *value;
                fixture.set_level(value);
                sequencer.buffers.set_level(fixture.address(), value);
            }
        }

        info!(
            fixtures = sequencer.fixtures.len(),
            modules = sequencer.modules,
            auto = options.auto,
            "Sequencer initialized."
        );
        sequencer
    }

    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    /// Looks up a fixture by name.
    pub fn fixture(&self, name: &str) -> Option<&Fixture> {
        self.fixtures.iter().find(|fixture| fixture.name() == name)
    }

    pub fn buffers(&self) -> &OutputBuffers {
        &self.buffers
    }

    pub fn transition(&self) -> &TransitionController {
        &self.transition
    }

    pub fn groups(&self) -> &GroupState {
        &self.groups
    }

    /// The fixture currently being driven by hand, if any.
    pub fn manual_test(&self) -> Option<ManualTest> {
        self.test
    }

    pub fn progress(&self, now: f64) -> Progress {
        self.transition.progress(now)
    }

    /// Applies a single command.
    pub fn apply(&mut self, command: Command, now: f64) -> Result<(), SequencerError> {
        debug!(command = ?command, now, "Applying command.");
        match command {
            Command::GoToNight => {
                self.transition.go_to_night(now, &mut self.fixtures);
            }
            Command::GoToDay => {
                self.transition.go_to_day(now, &mut self.fixtures);
            }
            Command::ToggleAuto => {
                let enabled = !self.transition.auto_enabled();
                self.transition.set_auto(enabled, now, &mut self.fixtures);
            }
            Command::ToggleSky => {
                self.groups.sky = !self.groups.sky;
                info!(enabled = self.groups.sky, "Sky toggled.");
            }
            Command::ToggleSwitch(group) => self.toggle_switch(group)?,
            Command::BeginTest(name) => self.begin_test(&name)?,
            Command::SetTestLevel(level) => self.set_test_level(level)?,
            Command::EndTest => {
                if self.test.take().is_some() {
                    info!("Manual test ended.");
                }
            }
            Command::StoreDefaults => self.store_requested = true,
        }
        Ok(())
    }

    /// Flips a toggle group. Only the first fixture of the group follows the switch,
    /// and it's written straight away so that the change shows even while a test is
    /// running.
    fn toggle_switch(&mut self, group: u8) -> Result<(), SequencerError> {
        let index = usize::from(group);
        if index >= TOGGLE_GROUPS {
            return Err(SequencerError::UnknownSwitch(group));
        }
        self.groups.toggles[index] = !self.groups.toggles[index];
        let on = self.groups.toggles[index];
        info!(group, on, "Switch toggled.");

        if let Some(fixture) = self
            .fixtures
            .iter_mut()
            .find(|fixture| fixture.switch() == Some(SwitchGroup::Toggle(group)))
        {
            fixture.set_switched_on(on);
            if let Mode::Constant { value, value_on } = fixture.mode() {
                let level = match value_on {
                    Some(value_on) if on => *value_on,
                    _ => *value,
                };
                fixture.set_level(level);
                self.buffers.set_level(fixture.address(), level);
            }
        }
        Ok(())
    }

    fn begin_test(&mut self, name: &str) -> Result<(), SequencerError> {
        let index = self
            .fixtures
            .iter()
            .position(|fixture| fixture.name() == name)
            .ok_or_else(|| SequencerError::UnknownFixture(name.to_string()))?;

        let level = match self.fixtures[index].mode() {
            Mode::Constant { value, .. } => *value,
            _ => DEFAULT_TEST_LEVEL,
        };
        info!(fixture = %self.fixtures[index], level, "Manual test started.");
        self.test = Some(ManualTest {
            fixture: index,
            level,
        });
        self.write_test_level();
        Ok(())
    }

    fn set_test_level(&mut self, level: Level) -> Result<(), SequencerError> {
        let test = self.test.as_mut().ok_or(SequencerError::NoActiveTest)?;
        test.level = level.clamp(0, MAX_LEVEL);
        self.write_test_level();
        Ok(())
    }

    fn write_test_level(&mut self) {
        if let Some(test) = self.test {
            let fixture = &mut self.fixtures[test.fixture];
            fixture.set_level(test.level);
            self.buffers.set_level(fixture.address(), test.level);
        }
    }

    /// Runs one tick of the animation. While a manual test is active nothing is
    /// recomputed and the buffers keep their values.
    pub fn tick(&mut self, now: f64) {
        self.transition.poll_auto(now, &mut self.fixtures);

        if self.test.is_some() {
            return;
        }

        let view = self.transition.view(now);
        for fixture in self.fixtures.iter_mut() {
            if let Some(level) = compute_level(now, fixture, view, &self.groups) {
                fixture.set_level(level);
                self.buffers.set_level(fixture.address(), level);
            }
        }
    }

    /// Sends the driver frame and the live sky frame, followed by a store frame if one
    /// was requested.
    pub fn flush(
        &mut self,
        frames: &mut dyn FrameSink,
        text: &mut dyn TextSink,
    ) -> Result<(), SequencerError> {
        frames
            .write_frame(self.buffers.frame().as_bytes())
            .map_err(|source| SequencerError::Transport {
                sink: "driver",
                source,
            })?;
        write_text(text, &self.buffers.aux_frame(AuxTerminator::Live))?;

        if self.store_requested {
            self.store_requested = false;
            self.store_defaults(text)?;
        }
        Ok(())
    }

    /// Sets every sky fixture to its startup level and tells the sky controller to
    /// keep those colours as its power-on default. The next tick overwrites the
    /// buffer with live values again.
    pub fn store_defaults(&mut self, text: &mut dyn TextSink) -> Result<(), SequencerError> {
        for fixture in self.fixtures.iter_mut().filter(|fixture| fixture.is_sky()) {
            if let Some(level) = fixture.mode().startup_level() {
                fixture.set_level(level);
                self.buffers.set_level(fixture.address(), level);
            }
        }

        let frame = self.buffers.aux_frame(AuxTerminator::StoreDefault);
        info!(frame = %frame, "Storing sky defaults.");
        write_text(text, &frame)
    }

    /// Blanks every output on the driver chain.
    pub fn all_off(&self, frames: &mut dyn FrameSink) -> Result<(), SequencerError> {
        info!("Switching all driver outputs off.");
        frames
            .write_frame(DriverFrame::all_off(self.modules).as_bytes())
            .map_err(|source| SequencerError::Transport {
                sink: "driver",
                source,
            })
    }
}

fn write_text(text: &mut dyn TextSink, frame: &str) -> Result<(), SequencerError> {
    text.write_text(frame)
        .map_err(|source| SequencerError::Transport { sink: "aux", source })
}
