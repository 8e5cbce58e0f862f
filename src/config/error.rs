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
use std::path::PathBuf;

use crate::fixture::Level;

/// Typed error for config load/parse failures so callers can distinguish
/// e.g. file-not-found from parse errors without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Catalog parse error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("Invalid duration for {key}: {source}")]
    Duration {
        key: &'static str,
        #[source]
        source: duration_string::Error,
    },

    #[error("Invalid settings: {0}")]
    Invalid(String),

    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
}

/// A fixture record that can't be used.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("fixture name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("{name}: level {value} is outside 0-1000")]
    LevelOutOfRange { name: String, value: Level },

    #[error("{name}: {sequence} needs at least two keyframes")]
    TooFewKeyframes {
        name: String,
        sequence: &'static str,
    },

    #[error("{name}: {sequence} keyframe times must start at 0 or later and strictly increase")]
    KeyframeOrder {
        name: String,
        sequence: &'static str,
    },

    #[error("{name}: port {port} doesn't exist, the limit is {limit}")]
    PortOutOfRange { name: String, port: u8, limit: u8 },

    #[error("{name}: module {module} doesn't exist, the chain has {modules} modules")]
    ModuleOutOfRange {
        name: String,
        module: u8,
        modules: usize,
    },
}
