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
use tracing::trace;

use crate::fixture::{Address, Level, MAX_LEVEL};
use crate::frame::{AuxColorBuffer, AuxTerminator, DriverFrame};

/// The gamma exponent applied to logical levels.
const GAMMA: f64 = 1.8;

/// Converts a logical level (0-1000) into a gamma corrected 16 bit PWM value. The
/// result is truncated, not rounded. Levels outside of the valid range are clamped.
pub fn gamma(level: Level) -> u16 {
    let level = level.clamp(0, MAX_LEVEL);
    (f64::from(u16::MAX) * (f64::from(level) / f64::from(MAX_LEVEL)).powf(GAMMA)) as u16
}

/// Why a level wasn't written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignored {
    /// The level was outside of 0-1000. Callers are expected to clamp first.
    LevelOutOfRange,
    /// The address doesn't map onto an existing channel.
    UnknownChannel,
}

/// The result of encoding a single level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeOutcome {
    /// Written into the driver frame at the given byte offset.
    Driver { offset: usize },
    /// Written into the given sky colour slot.
    Sky { slot: usize },
    /// Nothing was written.
    Ignored(Ignored),
}

/// Both output buffers, kept together so that one tick can never leave them out of step.
#[derive(Debug, Clone)]
pub struct OutputBuffers {
    frame: DriverFrame,
    aux: AuxColorBuffer,
}

impl OutputBuffers {
    /// Creates zeroed buffers for the given number of driver modules.
    pub fn new(modules: usize) -> OutputBuffers {
        OutputBuffers {
            frame: DriverFrame::new(modules),
            aux: AuxColorBuffer::new(),
        }
    }

    pub fn frame(&self) -> &DriverFrame {
        &self.frame
    }

    pub fn aux(&self) -> &AuxColorBuffer {
        &self.aux
    }

    /// The aux colours as a text frame.
    pub fn aux_frame(&self, terminator: AuxTerminator) -> String {
        self.aux.to_frame(terminator)
    }

    /// Gamma corrects the level and stores it in the slot the address maps onto.
    ///
    /// Out of range levels and unknown addresses are silently dropped so that a bad
    /// catalog entry can't stall the tick. Note that this means an unclamped level
    /// leaves the previous value on the wire.
    pub fn set_level(&mut self, address: Address, level: Level) -> EncodeOutcome {
        if !(0..=MAX_LEVEL).contains(&level) {
            trace!(%address, level, "Ignoring out of range level");
            return EncodeOutcome::Ignored(Ignored::LevelOutOfRange);
        }

        let value = gamma(level);
        let outcome = match address {
            Address::Sky { port } => self
                .aux
                .set_channel(port, value >> 4)
                .map(|slot| EncodeOutcome::Sky { slot }),
            Address::Driver { module, port } => self
                .frame
                .set_channel(module, port, value)
                .map(|offset| EncodeOutcome::Driver { offset }),
        };

        outcome.unwrap_or_else(|| {
            trace!(%address, "Ignoring level for unknown channel");
            EncodeOutcome::Ignored(Ignored::UnknownChannel)
        })
    }
}
