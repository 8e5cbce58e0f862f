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
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use duration_string::DurationString;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

use super::error::ConfigError;
use crate::frame::DEFAULT_MODULES;
use crate::sequencer::runner::RunnerOptions;
use crate::sequencer::SequencerOptions;
use crate::transition::{TransitionTiming, RANDOM_RAMP, RANDOM_SWITCH_LATEST};

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(50);
pub const DEFAULT_STATUS_PERIOD: Duration = Duration::from_millis(100);
pub const DEFAULT_TRANSITION_LENGTH: Duration = Duration::from_secs(60);
pub const DEFAULT_AUTO_PERIOD: Duration = Duration::from_secs(180);

/// The environment prefix that overrides settings, e.g. SCENELIGHT_AUTO=true.
const ENV_PREFIX: &str = "SCENELIGHT";

/// A YAML representation of the sequencer settings.
#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    /// The fixture catalog, relative to the settings file.
    catalog: String,

    /// The number of modules on the driver chain.
    modules: Option<usize>,

    tick_period: Option<String>,
    status_period: Option<String>,
    transition_length: Option<String>,
    auto_period: Option<String>,

    /// Start with auto day/night cycling on.
    auto: Option<bool>,

    /// Start with the sky bank on.
    sky: Option<bool>,

    /// Seed for the random day/night switch times. Random if unset.
    seed: Option<u64>,

    /// Store the sky defaults this long after startup.
    store_defaults_after: Option<String>,

    /// The driver chain device. Frames are logged if unset.
    driver_device: Option<String>,

    /// The sky controller device. Frames are logged if unset.
    aux_device: Option<String>,

    /// Directory the settings were loaded from.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Settings {
    /// Loads the settings from a file, with environment overrides.
    pub fn load(path: &Path) -> Result<Settings, ConfigError> {
        let mut settings: Settings = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from a YAML string. Relative paths resolve against the current directory.
    pub fn from_yaml(yaml: &str) -> Result<Settings, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// The path of the fixture catalog.
    pub fn catalog_path(&self) -> PathBuf {
        self.base_dir.join(&self.catalog)
    }

    pub fn modules(&self) -> usize {
        self.modules.unwrap_or(DEFAULT_MODULES)
    }

    pub fn tick_period(&self) -> Result<Duration, ConfigError> {
        parse_duration("tick_period", &self.tick_period, DEFAULT_TICK_PERIOD)
    }

    pub fn status_period(&self) -> Result<Duration, ConfigError> {
        parse_duration("status_period", &self.status_period, DEFAULT_STATUS_PERIOD)
    }

    pub fn transition_length(&self) -> Result<Duration, ConfigError> {
        parse_duration(
            "transition_length",
            &self.transition_length,
            DEFAULT_TRANSITION_LENGTH,
        )
    }

    pub fn auto_period(&self) -> Result<Duration, ConfigError> {
        parse_duration("auto_period", &self.auto_period, DEFAULT_AUTO_PERIOD)
    }

    pub fn store_defaults_after(&self) -> Result<Option<Duration>, ConfigError> {
        match &self.store_defaults_after {
            Some(_) => Ok(Some(parse_duration(
                "store_defaults_after",
                &self.store_defaults_after,
                Duration::ZERO,
            )?)),
            None => Ok(None),
        }
    }

    pub fn driver_device(&self) -> Option<PathBuf> {
        self.driver_device.as_ref().map(PathBuf::from)
    }

    pub fn aux_device(&self) -> Option<PathBuf> {
        self.aux_device.as_ref().map(PathBuf::from)
    }

    /// The random source for the day/night switch times.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn sequencer_options(&self) -> Result<SequencerOptions, ConfigError> {
        Ok(SequencerOptions {
            modules: self.modules(),
            timing: TransitionTiming {
                transition_length: self.transition_length()?.as_secs_f64(),
                auto_period: self.auto_period()?.as_secs_f64(),
            },
            auto: self.auto.unwrap_or(false),
            sky: self.sky.unwrap_or(true),
        })
    }

    pub fn runner_options(&self) -> Result<RunnerOptions, ConfigError> {
        Ok(RunnerOptions {
            tick_period: self.tick_period()?,
            status_period: self.status_period()?,
            store_defaults_after: self.store_defaults_after()?,
            realtime: true,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.modules() == 0 {
            return Err(ConfigError::Invalid(
                "modules must be at least 1".to_string(),
            ));
        }
        if self.modules() > usize::from(u8::MAX) + 1 {
            return Err(ConfigError::Invalid(format!(
                "modules can't be more than {}",
                usize::from(u8::MAX) + 1
            )));
        }
        if self.tick_period()?.is_zero() {
            return Err(ConfigError::Invalid(
                "tick_period must be greater than zero".to_string(),
            ));
        }

        let transition_length = self.transition_length()?.as_secs_f64();
        let latest_switch = RANDOM_SWITCH_LATEST + RANDOM_RAMP;
        if transition_length <= latest_switch {
            return Err(ConfigError::Invalid(format!(
                "transition_length must be longer than {}s",
                latest_switch
            )));
        }
        if self.auto_period()?.as_secs_f64() <= transition_length {
            return Err(ConfigError::Invalid(
                "auto_period must be longer than transition_length".to_string(),
            ));
        }
        self.status_period()?;
        self.store_defaults_after()?;
        Ok(())
    }
}

fn parse_duration(
    key: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => Ok(DurationString::from_string(value.clone())
            .map_err(|source| ConfigError::Duration { key, source })?
            .into()),
        None => Ok(default),
    }
}
