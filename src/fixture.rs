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

/// A logical brightness level. Valid levels are 0 (off) to 1000 (brightest).
pub type Level = i32;

/// The brightest logical level.
pub const MAX_LEVEL: Level = 1000;

/// The number of PWM outputs on a single driver module.
pub const CHANNELS_PER_MODULE: u8 = 12;

/// The number of colour channels on the sky controller.
pub const SKY_CHANNELS: u8 = 8;

/// The number of independent manual toggle groups.
pub const TOGGLE_GROUPS: usize = 4;

/// The physical channel a fixture is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Address {
    /// A PWM output on one of the daisy-chained driver modules. Module 0 is the
    /// closest to the controller.
    Driver { module: u8, port: u8 },
    /// A colour channel on the serial sky controller.
    Sky { port: u8 },
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Driver { module, port } => write!(f, "{}:{}", module, port),
            Address::Sky { port } => write!(f, "sky:{}", port),
        }
    }
}

/// A named switch group a fixture can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchGroup {
    /// The sky bank. While the sky is switched off its fixtures are forced to 0.
    Sky,
    /// One of the manual toggle groups.
    Toggle(u8),
}

impl fmt::Display for SwitchGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchGroup::Sky => write!(f, "sky"),
            SwitchGroup::Toggle(n) => write!(f, "switch{}", n),
        }
    }
}

/// A single control point of a piecewise-linear sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    /// Seconds from the start of the sequence.
    pub time: f64,
    pub value: Level,
}

/// An ordered keyframe sequence. Times must be strictly increasing and there must be
/// at least two points; the catalog loader is responsible for checking that.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframes(Vec<Keyframe>);

impl Keyframes {
    /// Creates a sequence from (time, value) pairs.
    pub fn from_pairs(pairs: &[(f64, Level)]) -> Keyframes {
        Keyframes(
            pairs
                .iter()
                .map(|&(time, value)| Keyframe { time, value })
                .collect(),
        )
    }

    pub fn points(&self) -> &[Keyframe] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value of the first keyframe.
    pub fn first_value(&self) -> Option<Level> {
        self.0.first().map(|keyframe| keyframe.value)
    }

    /// The time of the last keyframe. For looping sequences this is the period.
    pub fn duration(&self) -> f64 {
        self.0.last().map_or(0.0, |keyframe| keyframe.time)
    }

    /// Samples an open sequence at the given elapsed time. Once the last keyframe has
    /// passed, the last value is held.
    pub fn sample_held(&self, elapsed: f64) -> Option<Level> {
        let last = self.0.last()?;
        if elapsed >= last.time {
            return Some(last.value);
        }
        self.interpolate(elapsed)
    }

    /// Samples the sequence as a closed loop whose period is the last keyframe time.
    pub fn sample_looped(&self, now: f64) -> Option<Level> {
        let period = self.duration();
        if period <= 0.0 {
            return None;
        }
        self.interpolate(now.rem_euclid(period))
    }

    /// Finds the first segment whose end is at or after `t` and interpolates
    /// linearly within it. The result is truncated toward zero.
    fn interpolate(&self, t: f64) -> Option<Level> {
        self.0.windows(2).find(|pair| t <= pair[1].time).map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            (f64::from(from.value) + (t - from.time) * f64::from(to.value - from.value)
                / (to.time - from.time)) as Level
        })
    }
}

/// The day and night sequences of a fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct DayNight {
    pub to_night: Keyframes,
    pub to_day: Keyframes,
}

/// How a fixture computes its brightness.
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    /// A fixed level. `value_on` replaces `value` while the fixture's toggle group is on.
    Constant { value: Level, value_on: Option<Level> },
    /// Loops over the keyframes forever.
    Cycle { keyframes: Keyframes },
    /// Plays the sequence matching the current heading, then holds its last value.
    DayNight(DayNight),
    /// Switches between two levels at a random moment of each transition. The
    /// sequences are generated by the transition controller.
    RandomDayNight {
        value_day: Level,
        value_night: Level,
        sequences: Option<DayNight>,
    },
}

impl Mode {
    /// A short name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Constant { .. } => "constant",
            Mode::Cycle { .. } => "cycle",
            Mode::DayNight(_) => "day/night",
            Mode::RandomDayNight { .. } => "random day/night",
        }
    }

    /// The level this mode starts from when the installation powers up.
    pub fn startup_level(&self) -> Option<Level> {
        match self {
            Mode::Constant { value, .. } => Some(*value),
            Mode::Cycle { keyframes } => keyframes.first_value(),
            Mode::DayNight(sequences) => sequences.to_night.first_value(),
            Mode::RandomDayNight { value_day, .. } => Some(*value_day),
        }
    }
}

/// A single logical light.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    name: String,
    mode: Mode,
    address: Address,
    switch: Option<SwitchGroup>,
    /// The level computed on the last tick.
    level: Level,
    /// Set while a toggle switch has this fixture on its `value_on` level.
    switched_on: bool,
}

impl Fixture {
    /// Creates a new fixture.
    pub fn new(name: &str, mode: Mode, address: Address, switch: Option<SwitchGroup>) -> Fixture {
        Fixture {
            name: name.to_string(),
            mode,
            address,
            switch,
            level: 0,
            switched_on: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub(crate) fn mode_mut(&mut self) -> &mut Mode {
        &mut self.mode
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn switch(&self) -> Option<SwitchGroup> {
        self.switch
    }

    /// The level computed on the last tick.
    pub fn level(&self) -> Level {
        self.level
    }

    pub(crate) fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    /// Returns true if a toggle switch has put this fixture on its `value_on` level.
    pub fn switched_on(&self) -> bool {
        self.switched_on
    }

    pub(crate) fn set_switched_on(&mut self, on: bool) {
        self.switched_on = on;
    }

    /// Returns true if this fixture is part of the sky bank.
    pub fn is_sky(&self) -> bool {
        self.switch == Some(SwitchGroup::Sky)
    }
}

impl fmt::Display for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.address, self.mode.name())
    }
}
