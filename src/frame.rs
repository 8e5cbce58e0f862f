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
use std::fmt::Write;

use crate::fixture::{CHANNELS_PER_MODULE, SKY_CHANNELS};

/// The number of bytes each module takes up in the driver chain frame.
pub const MODULE_BLOCK_SIZE: usize = 28;

/// The number of modules on the installation's driver chain.
pub const DEFAULT_MODULES: usize = 15;

/// The write command that starts every module block.
const WRITE_COMMAND: u32 = 0x25;

/// The maximum global brightness correction for each colour group.
const BRIGHTNESS_CORRECTION: u32 = 0x7f;

/// The control flags sent ahead of each module's greyscale data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Output timing: outputs switch on the rising edge of the greyscale clock.
    pub outtmg: bool,
    /// External greyscale clock.
    pub extgck: bool,
    /// Reset greyscale counters on every new frame.
    pub tmgrst: bool,
    /// Auto repeat PWM cycles.
    pub dsprpt: bool,
    /// Blank all outputs.
    pub blank: bool,
}

impl BlockHeader {
    /// The header used for live frames.
    pub const LIVE: BlockHeader = BlockHeader {
        outtmg: true,
        extgck: false,
        tmgrst: false,
        dsprpt: true,
        blank: false,
    };

    /// The header used to blank every output.
    pub const ALL_OFF: BlockHeader = BlockHeader {
        blank: true,
        ..BlockHeader::LIVE
    };

    /// Packs the header into its four wire bytes.
    pub fn to_bytes(self) -> [u8; 4] {
        let word = WRITE_COMMAND << 26
            | u32::from(self.outtmg) << 25
            | u32::from(self.extgck) << 24
            | u32::from(self.tmgrst) << 23
            | u32::from(self.dsprpt) << 22
            | u32::from(self.blank) << 21
            | BRIGHTNESS_CORRECTION << 14
            | BRIGHTNESS_CORRECTION << 7
            | BRIGHTNESS_CORRECTION;
        word.to_be_bytes()
    }
}

/// The complete frame written to the driver chain. The first block goes to the module
/// farthest from the controller, so module 0 is the last block on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverFrame {
    modules: usize,
    bytes: Vec<u8>,
}

impl DriverFrame {
    /// Creates a live frame with every channel at zero.
    pub fn new(modules: usize) -> DriverFrame {
        Self::with_header(modules, BlockHeader::LIVE)
    }

    /// Creates the frame that blanks every output on the chain.
    pub fn all_off(modules: usize) -> DriverFrame {
        Self::with_header(modules, BlockHeader::ALL_OFF)
    }

    fn with_header(modules: usize, header: BlockHeader) -> DriverFrame {
        let mut block = [0u8; MODULE_BLOCK_SIZE];
        block[..4].copy_from_slice(&header.to_bytes());

        DriverFrame {
            modules,
            bytes: block.repeat(modules),
        }
    }

    /// The number of modules in this frame.
    pub fn modules(&self) -> usize {
        self.modules
    }

    /// The bytes to send down the chain.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The byte offset of the given channel, or None if the module or port doesn't exist.
    pub fn channel_offset(&self, module: u8, port: u8) -> Option<usize> {
        let module = usize::from(module);
        if module >= self.modules || port >= CHANNELS_PER_MODULE {
            return None;
        }
        Some((self.modules - 1 - module) * MODULE_BLOCK_SIZE + 26 - 2 * usize::from(port))
    }

    /// Writes a 16 bit value into the given channel. Returns the offset written to.
    pub fn set_channel(&mut self, module: u8, port: u8, value: u16) -> Option<usize> {
        let offset = self.channel_offset(module, port)?;
        self.bytes[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
        Some(offset)
    }

    /// Reads the 16 bit value of the given channel.
    pub fn channel(&self, module: u8, port: u8) -> Option<u16> {
        let offset = self.channel_offset(module, port)?;
        Some(u16::from_be_bytes([self.bytes[offset], self.bytes[offset + 1]]))
    }
}

/// What the sky controller should do with a colour frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxTerminator {
    /// Show the colours now.
    Live,
    /// Store the colours as the power-on default.
    StoreDefault,
}

impl AuxTerminator {
    fn as_char(self) -> char {
        match self {
            AuxTerminator::Live => '>',
            AuxTerminator::StoreDefault => '$',
        }
    }
}

/// The 12 bit colour values of the sky controller: front red, green, blue and white,
/// then back red, green, blue and white.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxColorBuffer {
    channels: [u16; SKY_CHANNELS as usize],
}

impl AuxColorBuffer {
    pub fn new() -> AuxColorBuffer {
        AuxColorBuffer::default()
    }

    /// Sets a colour channel. Values are masked to 12 bits.
    pub fn set_channel(&mut self, port: u8, value: u16) -> Option<usize> {
        let slot = usize::from(port);
        let channel = self.channels.get_mut(slot)?;
        *channel = value & 0x0fff;
        Some(slot)
    }

    pub fn channels(&self) -> &[u16] {
        &self.channels
    }

    /// Renders the text frame, e.g. `<000FFF...>`.
    pub fn to_frame(&self, terminator: AuxTerminator) -> String {
        let mut frame = String::with_capacity(2 + 3 * self.channels.len());
        frame.push('<');
        for value in self.channels.iter() {
            // Writing to a String can't fail.
            let _ = write!(frame, "{:03X}", value);
        }
        frame.push(terminator.as_char());
        frame
    }
}
