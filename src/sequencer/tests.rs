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
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::encoder::gamma;
use crate::fixture::{Address, DayNight, Fixture, Keyframes, Level, Mode, SwitchGroup};
use crate::frame::{DriverFrame, DEFAULT_MODULES};
use crate::transition::{Heading, TransitionTiming};
use crate::transport::test::RecordingSink;

use super::{Command, Sequencer, SequencerError, SequencerOptions};

const SKY_PORT: u8 = 3;

fn catalog() -> Vec<Fixture> {
    vec![
        Fixture::new(
            "Tunnel",
            Mode::Constant {
                value: 150,
                value_on: None,
            },
            Address::Driver { module: 9, port: 0 },
            None,
        ),
        Fixture::new(
            "Entrance sign",
            Mode::Cycle {
                keyframes: Keyframes::from_pairs(&[(0.0, 300), (0.5, 300), (0.51, 0), (1.0, 0)]),
            },
            Address::Driver { module: 14, port: 7 },
            None,
        ),
        Fixture::new(
            "Sky front white",
            Mode::DayNight(DayNight {
                to_night: Keyframes::from_pairs(&[(0.0, 1000), (60.0, 40)]),
                to_day: Keyframes::from_pairs(&[(0.0, 40), (60.0, 1000)]),
            }),
            Address::Sky { port: SKY_PORT },
            Some(SwitchGroup::Sky),
        ),
        Fixture::new(
            "Lamp posts",
            Mode::RandomDayNight {
                value_day: 0,
                value_night: 200,
                sequences: None,
            },
            Address::Driver { module: 6, port: 9 },
            None,
        ),
        Fixture::new(
            "U/G left",
            Mode::Constant {
                value: 0,
                value_on: Some(1000),
            },
            Address::Driver { module: 0, port: 6 },
            Some(SwitchGroup::Toggle(0)),
        ),
        Fixture::new(
            "U/G right",
            Mode::Constant {
                value: 0,
                value_on: Some(800),
            },
            Address::Driver { module: 0, port: 7 },
            Some(SwitchGroup::Toggle(0)),
        ),
        Fixture::new(
            "Truck lamp",
            Mode::Constant {
                value: 300,
                value_on: None,
            },
            Address::Driver { module: 0, port: 7 },
            None,
        ),
    ]
}

fn options(auto: bool) -> SequencerOptions {
    SequencerOptions {
        modules: DEFAULT_MODULES,
        timing: TransitionTiming {
            transition_length: 60.0,
            auto_period: 180.0,
        },
        auto,
        sky: true,
    }
}

fn sequencer() -> Sequencer {
    Sequencer::new(catalog(), &options(false), StdRng::seed_from_u64(42))
}

fn level(sequencer: &Sequencer, name: &str) -> Level {
    sequencer
        .fixture(name)
        .map(|fixture| fixture.level())
        .unwrap_or_else(|| panic!("no fixture named {}", name))
}

fn driver(sequencer: &Sequencer, module: u8, port: u8) -> u16 {
    sequencer
        .buffers()
        .frame()
        .channel(module, port)
        .expect("channel exists")
}

fn sky(sequencer: &Sequencer) -> u16 {
    sequencer.buffers().aux().channels()[usize::from(SKY_PORT)]
}

fn sky_frame(value: u16, terminator: char) -> String {
    format!("<000000000{:03X}000000000000{}", value, terminator)
}

#[test]
fn test_startup_encodes_constants() {
    let sequencer = sequencer();
    assert_eq!(gamma(150), driver(&sequencer, 9, 0));
    assert_eq!(0, driver(&sequencer, 0, 6));
    // Shared channel: the later fixture wins.
    assert_eq!(gamma(300), driver(&sequencer, 0, 7));
    // Not computed until the first tick.
    assert_eq!(0, sky(&sequencer));
}

#[test]
fn test_first_tick_is_held_day() {
    let mut sequencer = sequencer();
    sequencer.tick(0.0);

    assert_eq!(1000, level(&sequencer, "Sky front white"));
    assert_eq!(gamma(1000) >> 4, sky(&sequencer));
    assert_eq!(0, level(&sequencer, "Lamp posts"));
    assert_eq!(300, level(&sequencer, "Entrance sign"));
    assert_eq!(gamma(300), driver(&sequencer, 14, 7));
}

#[test]
fn test_cycle_follows_clock() {
    let mut sequencer = sequencer();
    sequencer.tick(10.25);
    assert_eq!(300, level(&sequencer, "Entrance sign"));
    sequencer.tick(10.75);
    assert_eq!(0, level(&sequencer, "Entrance sign"));
    assert_eq!(0, driver(&sequencer, 14, 7));
}

#[test]
fn test_double_trigger_snaps_to_night() -> Result<(), SequencerError> {
    let mut sequencer = sequencer();
    sequencer.apply(Command::GoToNight, 100.0)?;
    sequencer.apply(Command::GoToNight, 105.0)?;
    sequencer.tick(105.0);

    assert_eq!(40, level(&sequencer, "Sky front white"));
    assert_eq!(gamma(40) >> 4, sky(&sequencer));
    assert_eq!(200, level(&sequencer, "Lamp posts"));
    Ok(())
}

#[test]
fn test_reversal_is_continuous() -> Result<(), SequencerError> {
    let mut sequencer = sequencer();
    sequencer.apply(Command::GoToNight, 100.0)?;
    sequencer.tick(110.0);
    assert_eq!(840, level(&sequencer, "Sky front white"));

    sequencer.apply(Command::GoToDay, 110.0)?;
    assert_eq!(Heading::ToDay, sequencer.transition().heading());
    assert_eq!(50.0, sequencer.transition().elapsed(110.0));
    sequencer.tick(110.0);
    assert_eq!(840, level(&sequencer, "Sky front white"));

    sequencer.tick(120.0);
    assert_eq!(1000, level(&sequencer, "Sky front white"));
    Ok(())
}

#[test]
fn test_random_fixture_switches_once() -> Result<(), SequencerError> {
    let mut sequencer = sequencer();
    sequencer.apply(Command::GoToNight, 100.0)?;

    sequencer.tick(105.0);
    assert_eq!(0, level(&sequencer, "Lamp posts"));
    sequencer.tick(130.3);
    assert_eq!(200, level(&sequencer, "Lamp posts"));
    assert_eq!(gamma(200), driver(&sequencer, 6, 9));
    sequencer.tick(500.0);
    assert_eq!(200, level(&sequencer, "Lamp posts"));
    Ok(())
}

#[test]
fn test_manual_test_freezes_everything_else() -> Result<(), SequencerError> {
    let mut sequencer = sequencer();
    sequencer.tick(0.0);

    sequencer.apply(Command::BeginTest("Entrance sign".to_string()), 0.0)?;
    assert_eq!(500, level(&sequencer, "Entrance sign"));
    assert_eq!(gamma(500), driver(&sequencer, 14, 7));

    sequencer.apply(Command::GoToNight, 1.0)?;
    sequencer.tick(200.0);
    assert_eq!(gamma(1000) >> 4, sky(&sequencer));
    assert_eq!(gamma(500), driver(&sequencer, 14, 7));

    sequencer.apply(Command::SetTestLevel(2000), 200.0)?;
    assert_eq!(gamma(1000), driver(&sequencer, 14, 7));
    sequencer.apply(Command::SetTestLevel(-5), 200.0)?;
    assert_eq!(0, driver(&sequencer, 14, 7));
    sequencer.apply(Command::SetTestLevel(250), 200.0)?;
    assert_eq!(gamma(250), driver(&sequencer, 14, 7));

    sequencer.apply(Command::EndTest, 200.0)?;
    assert_eq!(None, sequencer.manual_test());
    sequencer.tick(200.25);
    assert_eq!(gamma(40) >> 4, sky(&sequencer));
    assert_eq!(gamma(300), driver(&sequencer, 14, 7));
    Ok(())
}

#[test]
fn test_manual_test_of_constant_uses_its_value() -> Result<(), SequencerError> {
    let mut sequencer = sequencer();
    sequencer.apply(Command::BeginTest("Tunnel".to_string()), 0.0)?;
    assert_eq!(150, level(&sequencer, "Tunnel"));
    let test = sequencer.manual_test().expect("test is active");
    assert_eq!(0, test.fixture);
    assert_eq!(150, test.level);
    Ok(())
}

#[test]
fn test_command_errors() {
    let mut sequencer = sequencer();
    assert!(matches!(
        sequencer.apply(Command::BeginTest("Nope".to_string()), 0.0),
        Err(SequencerError::UnknownFixture(name)) if name == "Nope"
    ));
    assert!(matches!(
        sequencer.apply(Command::SetTestLevel(10), 0.0),
        Err(SequencerError::NoActiveTest)
    ));
    assert!(matches!(
        sequencer.apply(Command::ToggleSwitch(4), 0.0),
        Err(SequencerError::UnknownSwitch(4))
    ));
    assert!(sequencer.apply(Command::EndTest, 0.0).is_ok());
}

#[test]
fn test_toggle_switch() -> Result<(), SequencerError> {
    let mut sequencer = sequencer();
    sequencer.apply(Command::BeginTest("Tunnel".to_string()), 0.0)?;

    // The first fixture of the group changes right away, even during a test.
    sequencer.apply(Command::ToggleSwitch(0), 0.0)?;
    assert!(sequencer.groups().toggle_on(0));
    assert_eq!(gamma(1000), driver(&sequencer, 0, 6));
    assert_eq!(gamma(300), driver(&sequencer, 0, 7));

    sequencer.apply(Command::EndTest, 0.0)?;
    sequencer.tick(1.0);
    assert_eq!(1000, level(&sequencer, "U/G left"));
    assert_eq!(gamma(1000), driver(&sequencer, 0, 6));
    // Only the first fixture of the group follows the switch.
    assert_eq!(0, level(&sequencer, "U/G right"));
    assert_eq!(
        Some(false),
        sequencer
            .fixture("U/G right")
            .map(|fixture| fixture.switched_on())
    );
    // The truck lamp shares the channel and comes later in the catalog.
    assert_eq!(gamma(300), driver(&sequencer, 0, 7));

    sequencer.apply(Command::ToggleSwitch(0), 1.0)?;
    assert_eq!(0, driver(&sequencer, 0, 6));
    sequencer.tick(2.0);
    assert_eq!(0, level(&sequencer, "U/G left"));
    assert_eq!(0, level(&sequencer, "U/G right"));
    Ok(())
}

#[test]
fn test_toggle_switch_leaves_rest_of_group() -> Result<(), SequencerError> {
    let fixtures = vec![
        Fixture::new(
            "Platform lamp A",
            Mode::Constant {
                value: 0,
                value_on: Some(1000),
            },
            Address::Driver { module: 1, port: 0 },
            Some(SwitchGroup::Toggle(2)),
        ),
        Fixture::new(
            "Platform lamp B",
            Mode::Constant {
                value: 0,
                value_on: Some(800),
            },
            Address::Driver { module: 1, port: 1 },
            Some(SwitchGroup::Toggle(2)),
        ),
    ];
    let mut sequencer = Sequencer::new(fixtures, &options(false), StdRng::seed_from_u64(42));

    sequencer.apply(Command::ToggleSwitch(2), 0.0)?;
    assert_eq!(gamma(1000), driver(&sequencer, 1, 0));
    assert_eq!(0, driver(&sequencer, 1, 1));

    // Recomputing agrees with what the toggle wrote.
    for now in [0.05, 0.1, 10.0] {
        sequencer.tick(now);
        assert_eq!(gamma(1000), driver(&sequencer, 1, 0));
        assert_eq!(0, driver(&sequencer, 1, 1));
    }
    Ok(())
}

#[test]
fn test_toggle_sky() -> Result<(), SequencerError> {
    let mut sequencer = sequencer();
    sequencer.apply(Command::ToggleSky, 0.0)?;
    sequencer.tick(0.0);
    assert_eq!(0, sky(&sequencer));
    assert_eq!(gamma(150), driver(&sequencer, 9, 0));

    sequencer.apply(Command::ToggleSky, 1.0)?;
    sequencer.tick(1.0);
    assert_eq!(gamma(1000) >> 4, sky(&sequencer));
    Ok(())
}

#[test]
fn test_toggle_auto() -> Result<(), SequencerError> {
    let mut sequencer = sequencer();
    sequencer.apply(Command::ToggleAuto, 10.0)?;
    assert!(sequencer.transition().auto_enabled());
    assert_eq!(Heading::ToNight, sequencer.transition().heading());

    sequencer.tick(190.0);
    assert_eq!(Heading::ToDay, sequencer.transition().heading());

    sequencer.apply(Command::ToggleAuto, 200.0)?;
    sequencer.tick(1000.0);
    assert!(!sequencer.transition().auto_enabled());
    assert_eq!(Heading::ToDay, sequencer.transition().heading());
    Ok(())
}

#[test]
fn test_auto_from_startup() {
    let mut sequencer = Sequencer::new(catalog(), &options(true), StdRng::seed_from_u64(42));
    sequencer.tick(179.0);
    assert_eq!(Heading::ToDay, sequencer.transition().heading());
    sequencer.tick(180.0);
    assert_eq!(Heading::ToNight, sequencer.transition().heading());
}

#[test]
fn test_flush() -> Result<(), SequencerError> {
    let mut sequencer = sequencer();
    let mut frames = RecordingSink::new();
    let mut text = RecordingSink::new();

    sequencer.tick(0.0);
    sequencer.flush(&mut frames, &mut text)?;
    assert_eq!(
        Some(sequencer.buffers().frame().as_bytes().to_vec()),
        frames.last_frame()
    );
    assert_eq!(15 * 28, frames.last_frame().map_or(0, |frame| frame.len()));
    assert_eq!(vec![sky_frame(gamma(1000) >> 4, '>')], text.texts());
    Ok(())
}

#[test]
fn test_store_defaults() -> Result<(), SequencerError> {
    let mut sequencer = sequencer();
    let mut frames = RecordingSink::new();
    let mut text = RecordingSink::new();

    sequencer.apply(Command::GoToNight, 0.0)?;
    sequencer.tick(100.0);
    sequencer.apply(Command::StoreDefaults, 100.0)?;
    sequencer.flush(&mut frames, &mut text)?;

    // The live frame goes first, then the startup colours are stored.
    assert_eq!(
        vec![
            sky_frame(gamma(40) >> 4, '>'),
            sky_frame(gamma(1000) >> 4, '$')
        ],
        text.texts()
    );

    // Only once.
    sequencer.tick(100.05);
    sequencer.flush(&mut frames, &mut text)?;
    assert_eq!(Some(sky_frame(gamma(40) >> 4, '>')), text.last_text());
    Ok(())
}

#[test]
fn test_transport_failures() {
    let mut sequencer = sequencer();
    assert!(matches!(
        sequencer.flush(&mut RecordingSink::failing(), &mut RecordingSink::new()),
        Err(SequencerError::Transport { sink: "driver", .. })
    ));
    assert!(matches!(
        sequencer.flush(&mut RecordingSink::new(), &mut RecordingSink::failing()),
        Err(SequencerError::Transport { sink: "aux", .. })
    ));
    assert!(sequencer.all_off(&mut RecordingSink::failing()).is_err());
}

#[test]
fn test_all_off() -> Result<(), SequencerError> {
    let sequencer = sequencer();
    let mut frames = RecordingSink::new();
    sequencer.all_off(&mut frames)?;
    assert_eq!(
        Some(DriverFrame::all_off(DEFAULT_MODULES).as_bytes().to_vec()),
        frames.last_frame()
    );
    Ok(())
}

#[test]
fn test_same_seed_same_show() -> Result<(), SequencerError> {
    let mut a = sequencer();
    let mut b = sequencer();
    for sequencer in [&mut a, &mut b] {
        sequencer.apply(Command::GoToNight, 0.0)?;
    }
    for step in 0..700 {
        let now = f64::from(step) * 0.1;
        a.tick(now);
        b.tick(now);
        assert_eq!(a.buffers().frame(), b.buffers().frame());
    }
    Ok(())
}
