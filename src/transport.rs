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
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, trace};

/// Receives binary frames for the driver chain.
pub trait FrameSink: Send {
    /// Writes a complete frame. Errors are fatal to the sequencer.
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// Receives text frames for the sky controller.
pub trait TextSink: Send {
    /// Writes a complete text frame. Errors are fatal to the sequencer.
    fn write_text(&mut self, text: &str) -> io::Result<()>;
}

/// Writes frames to a device node that has already been configured, e.g. a spidev
/// or a tty whose speed has been set by the system.
pub struct DeviceSink {
    path: PathBuf,
    file: File,
}

impl DeviceSink {
    /// Opens the device for writing.
    pub fn open(path: &Path) -> io::Result<DeviceSink> {
        let file = OpenOptions::new().write(true).open(path)?;
        info!(device = %path.display(), "Opened output device.");
        Ok(DeviceSink {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)?;
        self.file.flush()
    }
}

impl FrameSink for DeviceSink {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.write_all(frame)
    }
}

impl TextSink for DeviceSink {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.write_all(text.as_bytes())
    }
}

/// Logs frames instead of sending them anywhere. Used when no device is configured.
pub struct LogSink {
    name: &'static str,
}

impl LogSink {
    pub fn new(name: &'static str) -> LogSink {
        LogSink { name }
    }
}

impl FrameSink for LogSink {
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        trace!(sink = self.name, bytes = frame.len(), "Frame");
        Ok(())
    }
}

impl TextSink for LogSink {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        trace!(sink = self.name, text, "Text frame");
        Ok(())
    }
}

/// Opens the driver chain sink. With no device, frames are only logged.
pub fn frame_sink(device: Option<&Path>) -> io::Result<Box<dyn FrameSink>> {
    Ok(match device {
        Some(path) => Box::new(DeviceSink::open(path)?),
        None => {
            info!("No driver device configured, logging frames instead.");
            Box::new(LogSink::new("driver"))
        }
    })
}

/// Opens the sky controller sink. With no device, frames are only logged.
pub fn text_sink(device: Option<&Path>) -> io::Result<Box<dyn TextSink>> {
    Ok(match device {
        Some(path) => Box::new(DeviceSink::open(path)?),
        None => {
            info!("No aux device configured, logging frames instead.");
            Box::new(LogSink::new("aux"))
        }
    })
}
