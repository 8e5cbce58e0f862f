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

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Default priority for the sequencer thread when SCENELIGHT_THREAD_PRIORITY is unset.
const DEFAULT_SEQUENCER_THREAD_PRIORITY: u8 = 50;

/// Reads SCENELIGHT_THREAD_PRIORITY (0-99).
pub fn sequencer_thread_priority() -> u8 {
    parse_priority(std::env::var("SCENELIGHT_THREAD_PRIORITY").ok().as_deref())
}

fn parse_priority(value: Option<&str>) -> u8 {
    value
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|n| *n < 100)
        .unwrap_or(DEFAULT_SEQUENCER_THREAD_PRIORITY)
}

fn flag_set(value: Option<&str>) -> bool {
    value
        .map(|v| {
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Returns whether we should attempt RT (SCHED_FIFO) scheduling for the sequencer thread.
/// Default: enabled. Opt out with SCENELIGHT_DISABLE_RT=1.
pub fn rt_enabled() -> bool {
    !flag_set(std::env::var("SCENELIGHT_DISABLE_RT").ok().as_deref())
}

/// Raises the priority of the calling thread. Failures are logged and otherwise ignored.
pub fn configure_sequencer_thread_priority(priority: u8, rt: bool) {
    let priority = match ThreadPriorityValue::try_from(priority) {
        Ok(priority) => priority,
        Err(e) => {
            warn!(priority, error = ?e, "Invalid sequencer thread priority");
            return;
        }
    };
    let tp = ThreadPriority::Crossplatform(priority);
    if let Err(e) = set_current_thread_priority(tp) {
        warn!(error = ?e, "Failed to raise sequencer thread priority");
    }

    #[cfg(unix)]
    if rt {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        let tid = thread_native_id();
        match set_thread_priority_and_policy(
            tid,
            tp,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => info!("Enabled RT SCHED_FIFO for sequencer thread"),
            Err(e) => warn!(
                error = %e,
                "Failed to set RT SCHED_FIFO for sequencer thread"
            ),
        }
    }
    #[cfg(not(unix))]
    let _ = rt;
}

#[cfg(test)]
mod test {
    use super::{flag_set, parse_priority};

    #[test]
    fn test_parse_priority() {
        assert_eq!(50, parse_priority(None));
        assert_eq!(50, parse_priority(Some("garbage")));
        assert_eq!(50, parse_priority(Some("100")));
        assert_eq!(80, parse_priority(Some(" 80 ")));
    }

    #[test]
    fn test_flag_set() {
        assert!(flag_set(Some("1")));
        assert!(flag_set(Some("TRUE")));
        assert!(flag_set(Some("on")));
        assert!(!flag_set(Some("0")));
        assert!(!flag_set(None));
    }
}
