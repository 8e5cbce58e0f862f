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
use crate::fixture::{DayNight, Fixture, Level, Mode, TOGGLE_GROUPS};
use crate::transition::{Heading, TransitionView};

/// The state of the switch groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupState {
    /// Whether the sky bank is enabled.
    pub sky: bool,
    /// Whether each manual toggle group is switched on.
    pub toggles: [bool; TOGGLE_GROUPS],
}

impl Default for GroupState {
    fn default() -> Self {
        GroupState {
            sky: true,
            toggles: [false; TOGGLE_GROUPS],
        }
    }
}

impl GroupState {
    /// Returns true if the given toggle group is switched on.
    pub fn toggle_on(&self, group: u8) -> bool {
        self.toggles
            .get(usize::from(group))
            .copied()
            .unwrap_or(false)
    }
}

/// Computes the level a fixture should show right now.
///
/// `now` is the sequencer clock in seconds and drives cycles; day/night fixtures follow
/// the transition instead. Returns None if the fixture's sequence can't be sampled,
/// in which case the previous level should be left alone.
pub fn compute_level(
    now: f64,
    fixture: &Fixture,
    transition: TransitionView,
    groups: &GroupState,
) -> Option<Level> {
    if fixture.is_sky() && !groups.sky {
        return Some(0);
    }

    match fixture.mode() {
        Mode::Constant { value, value_on } => Some(match value_on {
            Some(value_on) if fixture.switched_on() => *value_on,
            _ => *value,
        }),
        Mode::Cycle { keyframes } => keyframes.sample_looped(now),
        Mode::DayNight(sequences) => sample_day_night(sequences, transition),
        Mode::RandomDayNight { sequences, .. } => sequences
            .as_ref()
            .and_then(|sequences| sample_day_night(sequences, transition)),
    }
}

/// Only the sequence matching the heading is ever evaluated.
fn sample_day_night(sequences: &DayNight, transition: TransitionView) -> Option<Level> {
    match transition.heading {
        Heading::ToNight => sequences.to_night.sample_held(transition.elapsed),
        Heading::ToDay => sequences.to_day.sample_held(transition.elapsed),
    }
}
