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
use std::path::PathBuf;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use scenelight::config::{self, init_sequencer_and_controller};
use scenelight::frame::DEFAULT_MODULES;
use scenelight::verify;
use tracing_subscriber::EnvFilter;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=day/night lighting sequencer

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/scenelight
ExecStart=/usr/local/bin/scenelight start "$SCENELIGHT_SETTINGS"
ExecReload=/bin/kill -HUP $MAINPID

[Install]
WantedBy=multi-user.target
Alias=scenelight.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A day/night lighting sequencer."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start will run the sequencer, controlled from the keyboard.
    Start {
        /// The path to the sequencer settings.
        settings_path: String,
    },
    /// Verifies a fixture catalog and reports suspicious fixtures.
    Verify {
        /// The path to the fixture catalog.
        catalog_path: String,
        /// The number of modules on the driver chain.
        #[arg[short, long, default_value_t = DEFAULT_MODULES]]
        modules: usize,
        /// The day/night transition length the sequences should match.
        #[arg[short, long, default_value = "60s"]]
        transition_length: String,
    },
    /// Prints the module and port wiring table for a fixture catalog.
    Table {
        /// The path to the fixture catalog.
        catalog_path: String,
        /// The number of modules on the driver chain.
        #[arg[short, long, default_value_t = DEFAULT_MODULES]]
        modules: usize,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { settings_path } => {
            init_sequencer_and_controller(&PathBuf::from(settings_path))?
                .join()
                .await?;
        }
        Commands::Verify {
            catalog_path,
            modules,
            transition_length,
        } => {
            let fixtures = config::load_catalog(&PathBuf::from(&catalog_path), modules)?;
            let transition_length: Duration =
                DurationString::from_string(transition_length)?.into();

            let report = verify::check_catalog(&fixtures, transition_length.as_secs_f64());
            verify::print_report(&report, &fixtures);
            if report.has_errors() {
                return Err(format!("{} failed verification", catalog_path).into());
            }
        }
        Commands::Table {
            catalog_path,
            modules,
        } => {
            let fixtures = config::load_catalog(&PathBuf::from(catalog_path), modules)?;
            print!("{}", verify::format_table(&fixtures));
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}
