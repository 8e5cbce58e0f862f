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

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::fixture::{Address, Fixture, Mode, SwitchGroup};

/// Severity level for a verification issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single verification issue found during checking.
#[derive(Debug, Clone)]
pub struct Issue {
    pub severity: Severity,
    pub category: &'static str,
    pub fixture: String,
    pub message: String,
}

/// Result of verifying a catalog.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub issues: Vec<Issue>,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Merge another report into this one.
    pub fn merge(&mut self, other: VerificationReport) {
        self.issues.extend(other.issues);
    }
}

/// Groups fixture names by the channel they drive, keeping only channels with more
/// than one fixture. Names are in catalog order, so the last one is what gets shown.
pub fn shared_channels(fixtures: &[Fixture]) -> BTreeMap<Address, Vec<&str>> {
    let mut channels: BTreeMap<Address, Vec<&str>> = BTreeMap::new();
    for fixture in fixtures {
        channels
            .entry(fixture.address())
            .or_default()
            .push(fixture.name());
    }
    channels.retain(|_, names| names.len() > 1);
    channels
}

/// Reports channels driven by more than one fixture.
pub fn check_shared_channels(fixtures: &[Fixture]) -> Vec<Issue> {
    shared_channels(fixtures)
        .into_iter()
        .map(|(address, names)| Issue {
            severity: Severity::Warning,
            category: "shared-channel",
            fixture: names.last().map(|name| name.to_string()).unwrap_or_default(),
            message: format!(
                "channel {} is shared by {}; the last one wins",
                address,
                names
                    .iter()
                    .map(|name| format!("\"{}\"", name))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        })
        .collect()
}

/// Reports switch groups that won't do what the catalog probably means.
pub fn check_switches(fixtures: &[Fixture]) -> Vec<Issue> {
    let mut issues = Vec::new();
    for fixture in fixtures {
        let warning = |message: String| Issue {
            severity: Severity::Warning,
            category: "switch",
            fixture: fixture.name().to_string(),
            message,
        };

        match (fixture.address(), fixture.switch()) {
            (Address::Sky { .. }, switch) if switch != Some(SwitchGroup::Sky) => {
                issues.push(warning(
                    "drives a sky channel but isn't in the sky group, so the sky switch won't turn it off"
                        .to_string(),
                ))
            }
            (Address::Driver { .. }, Some(SwitchGroup::Sky)) => issues.push(warning(
                "is in the sky group but drives a module channel".to_string(),
            )),
            _ => {}
        }

        if let Mode::Constant {
            value_on: Some(_), ..
        } = fixture.mode()
        {
            if !matches!(fixture.switch(), Some(SwitchGroup::Toggle(_))) {
                issues.push(warning(
                    "has value_on but no toggle group, so value_on is never used".to_string(),
                ));
            }
        }
    }
    issues
}

/// Reports day/night sequences that end before or after the transition does. A
/// sequence that runs past the transition never reaches its last keyframe, so that
/// is an error. Ending early only holds the last level for a while.
pub fn check_sequence_lengths(fixtures: &[Fixture], transition_length: f64) -> Vec<Issue> {
    let mut issues = Vec::new();
    for fixture in fixtures {
        if let Mode::DayNight(sequences) = fixture.mode() {
            for (name, keyframes) in [("to_night", &sequences.to_night), ("to_day", &sequences.to_day)] {
                let duration = keyframes.duration();
                if (duration - transition_length).abs() <= f64::EPSILON {
                    continue;
                }
                let (severity, message) = if duration > transition_length {
                    (
                        Severity::Error,
                        format!(
                            "{} ends at {}s after transitions finish at {}s, so its last keyframe is never reached",
                            name, duration, transition_length
                        ),
                    )
                } else {
                    (
                        Severity::Warning,
                        format!(
                            "{} ends at {}s but transitions last {}s",
                            name, duration, transition_length
                        ),
                    )
                };
                issues.push(Issue {
                    severity,
                    category: "sequence-length",
                    fixture: fixture.name().to_string(),
                    message,
                });
            }
        }
    }
    issues
}

/// Runs every check against the catalog.
pub fn check_catalog(fixtures: &[Fixture], transition_length: f64) -> VerificationReport {
    let mut report = VerificationReport::default();
    report.issues.extend(check_shared_channels(fixtures));
    report.issues.extend(check_switches(fixtures));
    report
        .issues
        .extend(check_sequence_lengths(fixtures, transition_length));
    report
}

/// Counts the fixtures using each mode.
pub fn mode_counts(fixtures: &[Fixture]) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for fixture in fixtures {
        *counts.entry(fixture.mode().name()).or_default() += 1;
    }
    counts
}

/// Formats the wiring table: every channel in use, grouped by module, with the sky
/// controller last.
pub fn format_table(fixtures: &[Fixture]) -> String {
    let mut sorted: Vec<&Fixture> = fixtures.iter().collect();
    sorted.sort_by_key(|fixture| fixture.address());

    let mut table = String::new();
    let mut previous: Option<Option<u8>> = None;
    for fixture in sorted {
        let (module, port) = match fixture.address() {
            Address::Driver { module, port } => (Some(module), port),
            Address::Sky { port } => (None, port),
        };

        // Writing to a String can't fail.
        if previous != Some(module) {
            previous = Some(module);
            let _ = match module {
                Some(module) => writeln!(table, "\n--- Module {:2} --------------------------", module),
                None => writeln!(table, "\n--- Sky -------------------------------"),
            };
        }
        let _ = writeln!(table, "Port {:2}: {}", port, fixture.name());
    }
    table
}

/// Prints a verification report grouped by fixture name.
pub fn print_report(report: &VerificationReport, fixtures: &[Fixture]) {
    println!("Fixtures (count: {}):", fixtures.len());
    for (mode, count) in mode_counts(fixtures) {
        println!("- {}: {}", mode, count);
    }
    println!();

    if report.is_clean() {
        println!("\u{2705} All {} fixture(s) passed verification.", fixtures.len());
        return;
    }

    // Group issues by fixture name.
    let mut by_fixture: BTreeMap<&str, Vec<&Issue>> = BTreeMap::new();
    for issue in &report.issues {
        by_fixture.entry(&issue.fixture).or_default().push(issue);
    }

    for (fixture, issues) in &by_fixture {
        let has_errors = issues.iter().any(|i| i.severity == Severity::Error);
        let icon = if has_errors {
            "\u{274c}"
        } else {
            "\u{26a0}\u{fe0f} "
        };
        println!("{} {}", icon, fixture);
        for issue in issues {
            let severity_icon = match issue.severity {
                Severity::Warning => "\u{26a0}\u{fe0f} ",
                Severity::Error => "\u{274c}",
            };
            println!(
                "   {} [{}] {}",
                severity_icon, issue.category, issue.message
            );
        }
    }

    println!(
        "\nSummary: {} issue(s) found across {} fixture(s).",
        report.issues.len(),
        by_fixture.len()
    );
}
