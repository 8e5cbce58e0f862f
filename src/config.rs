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
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::controller::{keyboard, Controller};
use crate::fixture::Fixture;
use crate::sequencer::{runner, Sequencer};
use crate::transport;

use self::catalog::Catalog;

mod catalog;
mod error;
mod settings;

pub use self::error::{CatalogError, ConfigError};
pub use self::settings::Settings;

/// Parses and validates a fixture catalog.
pub fn parse_catalog(yaml: &str, modules: usize) -> Result<Vec<Fixture>, ConfigError> {
    let catalog: Catalog = serde_yml::from_str(yaml)?;
    Ok(catalog.into_fixtures(modules)?)
}

/// Loads and validates a fixture catalog from a file.
pub fn load_catalog(path: &Path, modules: usize) -> Result<Vec<Fixture>, ConfigError> {
    let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&yaml, modules)
}

/// Initializes the sequencer and controller from the given settings file and returns the
/// controller. The controller owns the sequencer thread, which can be waited on until it
/// exits.
pub fn init_sequencer_and_controller(settings_path: &Path) -> Result<Controller, Box<dyn Error>> {
    let settings = Settings::load(settings_path)?;
    let fixtures = load_catalog(&settings.catalog_path(), settings.modules())?;
    info!(
        catalog = %settings.catalog_path().display(),
        fixtures = fixtures.len(),
        "Loaded fixture catalog."
    );

    let sequencer = Sequencer::new(fixtures, &settings.sequencer_options()?, settings.rng());
    let frames = transport::frame_sink(settings.driver_device().as_deref())?;
    let text = transport::text_sink(settings.aux_device().as_deref())?;
    let handle = runner::start(sequencer, frames, text, settings.runner_options()?)?;

    Controller::new(handle, Arc::new(keyboard::Driver::new()))
}
