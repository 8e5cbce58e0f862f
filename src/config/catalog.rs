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
use std::collections::HashSet;

use serde::Deserialize;

use super::error::CatalogError;
use crate::fixture::{
    Address, DayNight, Fixture, Keyframes, Level, Mode, SwitchGroup, CHANNELS_PER_MODULE,
    MAX_LEVEL, SKY_CHANNELS,
};

/// A YAML representation of the fixture catalog.
#[derive(Deserialize)]
pub(crate) struct Catalog {
    fixtures: Vec<FixtureRecord>,
}

/// A YAML representation of a single fixture.
#[derive(Deserialize, Clone, Debug)]
pub(crate) struct FixtureRecord {
    name: String,
    #[serde(flatten)]
    mode: ModeRecord,
    switch: Option<SwitchRecord>,
    module: ModuleRecord,
    port: u8,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum ModeRecord {
    Constant {
        value: Level,
        value_on: Option<Level>,
    },
    Cycle {
        keyframes: Vec<(f64, Level)>,
    },
    DayNight {
        to_night: Vec<(f64, Level)>,
        to_day: Vec<(f64, Level)>,
    },
    RandomDayNight {
        value_day: Level,
        value_night: Level,
    },
}

#[derive(Deserialize, Clone, Copy, Debug)]
#[serde(rename_all = "snake_case")]
enum SwitchRecord {
    Sky,
    Switch0,
    Switch1,
    Switch2,
    Switch3,
}

impl From<SwitchRecord> for SwitchGroup {
    fn from(record: SwitchRecord) -> Self {
        match record {
            SwitchRecord::Sky => SwitchGroup::Sky,
            SwitchRecord::Switch0 => SwitchGroup::Toggle(0),
            SwitchRecord::Switch1 => SwitchGroup::Toggle(1),
            SwitchRecord::Switch2 => SwitchGroup::Toggle(2),
            SwitchRecord::Switch3 => SwitchGroup::Toggle(3),
        }
    }
}

/// Either a driver module index or `sky`.
#[derive(Deserialize, Clone, Copy, Debug)]
#[serde(untagged)]
enum ModuleRecord {
    Index(u8),
    Sky(SkyModule),
}

#[derive(Deserialize, Clone, Copy, Debug)]
#[serde(rename_all = "snake_case")]
enum SkyModule {
    Sky,
}

impl Catalog {
    /// Validates every record and converts the catalog into fixtures, keeping the
    /// catalog order.
    pub(crate) fn into_fixtures(self, modules: usize) -> Result<Vec<Fixture>, CatalogError> {
        let mut names = HashSet::new();
        let mut fixtures = Vec::with_capacity(self.fixtures.len());
        for record in self.fixtures {
            if !names.insert(record.name.clone()) {
                return Err(CatalogError::DuplicateName(record.name));
            }
            fixtures.push(record.into_fixture(modules)?);
        }
        Ok(fixtures)
    }
}

impl FixtureRecord {
    fn into_fixture(self, modules: usize) -> Result<Fixture, CatalogError> {
        let address = self.address(modules)?;
        let mode = self.mode()?;
        Ok(Fixture::new(
            &self.name,
            mode,
            address,
            self.switch.map(SwitchGroup::from),
        ))
    }

    fn address(&self, modules: usize) -> Result<Address, CatalogError> {
        let (address, limit) = match self.module {
            ModuleRecord::Sky(_) => (Address::Sky { port: self.port }, SKY_CHANNELS),
            ModuleRecord::Index(module) => {
                if usize::from(module) >= modules {
                    return Err(CatalogError::ModuleOutOfRange {
                        name: self.name.clone(),
                        module,
                        modules,
                    });
                }
                (
                    Address::Driver {
                        module,
                        port: self.port,
                    },
                    CHANNELS_PER_MODULE,
                )
            }
        };

        if self.port >= limit {
            return Err(CatalogError::PortOutOfRange {
                name: self.name.clone(),
                port: self.port,
                limit,
            });
        }
        Ok(address)
    }

    fn mode(&self) -> Result<Mode, CatalogError> {
        Ok(match &self.mode {
            ModeRecord::Constant { value, value_on } => {
                self.check_level(*value)?;
                if let Some(value_on) = value_on {
                    self.check_level(*value_on)?;
                }
                Mode::Constant {
                    value: *value,
                    value_on: *value_on,
                }
            }
            ModeRecord::Cycle { keyframes } => Mode::Cycle {
                keyframes: self.keyframes("keyframes", keyframes)?,
            },
            ModeRecord::DayNight { to_night, to_day } => Mode::DayNight(DayNight {
                to_night: self.keyframes("to_night", to_night)?,
                to_day: self.keyframes("to_day", to_day)?,
            }),
            ModeRecord::RandomDayNight {
                value_day,
                value_night,
            } => {
                self.check_level(*value_day)?;
                self.check_level(*value_night)?;
                Mode::RandomDayNight {
                    value_day: *value_day,
                    value_night: *value_night,
                    sequences: None,
                }
            }
        })
    }

    fn keyframes(
        &self,
        sequence: &'static str,
        pairs: &[(f64, Level)],
    ) -> Result<Keyframes, CatalogError> {
        if pairs.len() < 2 {
            return Err(CatalogError::TooFewKeyframes {
                name: self.name.clone(),
                sequence,
            });
        }

        let starts_ok = pairs[0].0 >= 0.0;
        let increasing = pairs
            .windows(2)
            .all(|pair| pair[0].0 < pair[1].0 && pair[1].0.is_finite());
        if !starts_ok || !increasing {
            return Err(CatalogError::KeyframeOrder {
                name: self.name.clone(),
                sequence,
            });
        }

        for (_, value) in pairs {
            self.check_level(*value)?;
        }
        Ok(Keyframes::from_pairs(pairs))
    }

    fn check_level(&self, value: Level) -> Result<(), CatalogError> {
        if !(0..=MAX_LEVEL).contains(&value) {
            return Err(CatalogError::LevelOutOfRange {
                name: self.name.clone(),
                value,
            });
        }
        Ok(())
    }
}
