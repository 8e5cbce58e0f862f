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

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;
use crate::sequencer::Command;

const NIGHT: &str = "night";
const DAY: &str = "day";
const AUTO: &str = "auto";
const SKY: &str = "sky";
const SWITCH: &str = "switch";
const TEST: &str = "test";
const LEVEL: &str = "level";
const UNTEST: &str = "untest";
const STORE: &str = "store";
const STATUS: &str = "status";
const QUIT: &str = "quit";

/// A controller that drives the sequencer from lines typed on stdin.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Parses a single input line. Fixture names keep their case, everything else is
    /// case insensitive.
    fn parse(input: &str) -> Option<Event> {
        let input = input.trim();
        let (word, argument) = match input.split_once(char::is_whitespace) {
            Some((word, argument)) => (word, argument.trim()),
            None => (input, ""),
        };

        let event = match (word.to_lowercase().as_str(), argument) {
            (NIGHT, "") => Event::Command(Command::GoToNight),
            (DAY, "") => Event::Command(Command::GoToDay),
            (AUTO, "") => Event::Command(Command::ToggleAuto),
            (SKY, "") => Event::Command(Command::ToggleSky),
            (SWITCH, group) => Event::Command(Command::ToggleSwitch(group.parse().ok()?)),
            (TEST, name) if !name.is_empty() => {
                Event::Command(Command::BeginTest(name.to_string()))
            }
            (LEVEL, level) => Event::Command(Command::SetTestLevel(level.parse().ok()?)),
            (UNTEST, "") => Event::Command(Command::EndTest),
            (STORE, "") => Event::Command(Command::StoreDefaults),
            (STATUS, "") => Event::Status,
            (QUIT, "") => Event::Quit,
            _ => return None,
        };
        Some(event)
    }

    /// Reads one command. Returns false once the user has quit or stdin has closed.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({}, {}, {}, {}, {} N, {} NAME, {} N, {}, {}, {}, {}): ",
            NIGHT, DAY, AUTO, SKY, SWITCH, TEST, LEVEL, UNTEST, STORE, STATUS, QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            info!("Input closed.");
            events_tx
                .blocking_send(Event::Quit)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            return Ok(false);
        }

        match Self::parse(&input) {
            Some(event) => {
                let quit = event == Event::Quit;
                events_tx
                    .blocking_send(event)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                Ok(!quit)
            }
            None => {
                warn!(input = input.trim(), "Unrecognized input");
                Ok(true)
            }
        }
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            Ok(())
        })
    }
}
