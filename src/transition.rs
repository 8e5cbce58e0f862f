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
use std::fmt;

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, info};

use crate::fixture::{DayNight, Fixture, Keyframes, Mode};

/// The earliest moment a random fixture may switch during a transition.
pub const RANDOM_SWITCH_EARLIEST: f64 = 10.0;

/// The latest moment a random fixture may switch during a transition.
pub const RANDOM_SWITCH_LATEST: f64 = 30.0;

/// How long a random fixture takes to ramp between its day and night levels.
pub const RANDOM_RAMP: f64 = 0.2;

/// The switch time the controller starts with: far enough in the past that the
/// installation boots fully into day.
const INITIAL_LAST_SWITCH: f64 = -1000.0;

/// The direction the installation is heading in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    ToNight,
    ToDay,
}

impl Heading {
    pub fn opposite(self) -> Heading {
        match self {
            Heading::ToNight => Heading::ToDay,
            Heading::ToDay => Heading::ToNight,
        }
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Heading::ToNight => write!(f, "to night"),
            Heading::ToDay => write!(f, "to day"),
        }
    }
}

/// What the animator needs to know about the transition on a given tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionView {
    pub heading: Heading,
    /// Seconds since the last switch.
    pub elapsed: f64,
}

/// Timing constants for the day/night cycle, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionTiming {
    /// How long a transition takes.
    pub transition_length: f64,
    /// How often auto mode flips the heading.
    pub auto_period: f64,
}

/// How a trigger was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// The opposite transition was in flight and has been mirrored in place.
    Reversed,
    /// A new transition started from a stable state.
    Started,
    /// The transition was already heading this way and has been pushed to its end.
    Snapped,
}

/// The global day/night state machine.
pub struct TransitionController {
    heading: Heading,
    /// Sequencer clock time the current transition is measured from.
    last_switch: f64,
    timing: TransitionTiming,
    /// When auto mode will next flip the heading, if auto mode is on.
    next_auto_flip: Option<f64>,
    rng: StdRng,
}

impl TransitionController {
    /// Creates a controller held at day.
    pub fn new(timing: TransitionTiming, rng: StdRng) -> TransitionController {
        TransitionController {
            heading: Heading::ToDay,
            last_switch: INITIAL_LAST_SWITCH,
            timing,
            next_auto_flip: None,
            rng,
        }
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn last_switch(&self) -> f64 {
        self.last_switch
    }

    pub fn timing(&self) -> TransitionTiming {
        self.timing
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        now - self.last_switch
    }

    /// Returns true while the current transition hasn't reached its end point.
    pub fn in_progress(&self, now: f64) -> bool {
        self.elapsed(now) < self.timing.transition_length
    }

    pub fn view(&self, now: f64) -> TransitionView {
        TransitionView {
            heading: self.heading,
            elapsed: self.elapsed(now),
        }
    }

    pub fn go_to_night(&mut self, now: f64, fixtures: &mut [Fixture]) -> TriggerKind {
        self.trigger(Heading::ToNight, now, fixtures)
    }

    pub fn go_to_day(&mut self, now: f64, fixtures: &mut [Fixture]) -> TriggerKind {
        self.trigger(Heading::ToDay, now, fixtures)
    }

    /// Heads towards the given target.
    ///
    /// Reversing a transition in flight mirrors its progress: if it was 10 seconds in,
    /// the new transition is 10 seconds from its end. Triggering the heading that's
    /// already active jumps straight to the end.
    pub fn trigger(&mut self, target: Heading, now: f64, fixtures: &mut [Fixture]) -> TriggerKind {
        let length = self.timing.transition_length;
        let kind = if self.heading == target {
            self.last_switch = now - length;
            TriggerKind::Snapped
        } else if self.in_progress(now) {
            self.last_switch = 2.0 * now - self.last_switch - length;
            TriggerKind::Reversed
        } else {
            self.regenerate_random_sequences(fixtures);
            self.last_switch = now;
            TriggerKind::Started
        };
        self.heading = target;

        info!(
            heading = %target,
            kind = ?kind,
            elapsed = self.elapsed(now),
            "Day/night transition triggered."
        );
        kind
    }

    /// Draws new switch times for every random day/night fixture.
    pub fn regenerate_random_sequences(&mut self, fixtures: &mut [Fixture]) {
        let length = self.timing.transition_length;
        let mut count = 0;
        for fixture in fixtures.iter_mut() {
            if let Mode::RandomDayNight {
                value_day,
                value_night,
                sequences,
            } = fixture.mode_mut()
            {
                let night_at = self.random_switch_time();
                let day_at = self.random_switch_time();
                *sequences = Some(DayNight {
                    to_night: Keyframes::from_pairs(&[
                        (0.0, *value_day),
                        (night_at, *value_day),
                        (night_at + RANDOM_RAMP, *value_night),
                        (length, *value_night),
                    ]),
                    to_day: Keyframes::from_pairs(&[
                        (0.0, *value_night),
                        (day_at, *value_night),
                        (day_at + RANDOM_RAMP, *value_day),
                        (length, *value_day),
                    ]),
                });
                count += 1;
            }
        }
        debug!(fixtures = count, "Regenerated random day/night sequences.");
    }

    /// A uniformly distributed switch time, rounded to a tenth of a second.
    fn random_switch_time(&mut self) -> f64 {
        let time: f64 = self
            .rng
            .gen_range(RANDOM_SWITCH_EARLIEST..=RANDOM_SWITCH_LATEST);
        (time * 10.0).round() / 10.0
    }

    pub fn auto_enabled(&self) -> bool {
        self.next_auto_flip.is_some()
    }

    /// When auto mode will next flip the heading.
    pub fn next_auto_flip(&self) -> Option<f64> {
        self.next_auto_flip
    }

    /// Turns auto mode on or off. Turning it on flips the heading right away; turning
    /// it off only cancels the pending flip.
    pub fn set_auto(&mut self, enabled: bool, now: f64, fixtures: &mut [Fixture]) {
        if enabled == self.auto_enabled() {
            return;
        }

        if enabled {
            info!(period = self.timing.auto_period, "Auto day/night enabled.");
            self.auto_flip(now, fixtures);
        } else {
            info!("Auto day/night disabled.");
            self.next_auto_flip = None;
        }
    }

    /// Turns auto mode on without flipping: the first flip happens one period from now.
    pub fn start_auto(&mut self, now: f64) {
        self.next_auto_flip = Some(now + self.timing.auto_period);
    }

    /// Flips the heading if auto mode is on and its period has run out.
    pub fn poll_auto(&mut self, now: f64, fixtures: &mut [Fixture]) -> Option<TriggerKind> {
        match self.next_auto_flip {
            Some(next) if now >= next => Some(self.auto_flip(now, fixtures)),
            _ => None,
        }
    }

    fn auto_flip(&mut self, now: f64, fixtures: &mut [Fixture]) -> TriggerKind {
        self.next_auto_flip = Some(now + self.timing.auto_period);
        self.trigger(self.heading.opposite(), now, fixtures)
    }

    /// Summarises the transition for display.
    pub fn progress(&self, now: f64) -> Progress {
        let elapsed = self.elapsed(now);
        let length = self.timing.transition_length;
        let holding = elapsed >= length;
        let phase = match (self.heading, holding) {
            (Heading::ToNight, false) => Phase::Sunset,
            (Heading::ToNight, true) => Phase::Night,
            (Heading::ToDay, false) => Phase::Sunrise,
            (Heading::ToDay, true) => Phase::Day,
        };

        Progress {
            heading: self.heading,
            phase,
            fraction: (elapsed / length).clamp(0.0, 1.0),
            elapsed,
            transition_length: length,
            auto_period: self.auto_enabled().then_some(self.timing.auto_period),
        }
    }
}

/// The named stages of the day/night cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Sunset,
    Night,
    Sunrise,
    Day,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Sunset => "Sunset",
            Phase::Night => "Night",
            Phase::Sunrise => "Sunrise",
            Phase::Day => "Day",
        };
        write!(f, "{}", name)
    }
}

/// A snapshot of the transition for the control surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub heading: Heading,
    pub phase: Phase,
    /// How far through the transition we are, from 0 to 1.
    pub fraction: f64,
    pub elapsed: f64,
    pub transition_length: f64,
    /// The auto period, if auto mode is on.
    pub auto_period: Option<f64>,
}

impl Progress {
    pub fn holding(&self) -> bool {
        matches!(self.phase, Phase::Night | Phase::Day)
    }
}

impl Default for Progress {
    fn default() -> Self {
        Progress {
            heading: Heading::ToDay,
            phase: Phase::Day,
            fraction: 1.0,
            elapsed: 0.0,
            transition_length: 0.0,
            auto_period: None,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.holding() {
            return write!(
                f,
                "{} [{:.0} / {:.0} s]",
                self.phase, self.elapsed, self.transition_length
            );
        }

        match self.auto_period {
            Some(period) => write!(
                f,
                "{} [{:.0} / {:.0} s]",
                self.phase,
                self.elapsed - self.transition_length,
                period - self.transition_length
            ),
            None => write!(f, "{} [Paused]", self.phase),
        }
    }
}
