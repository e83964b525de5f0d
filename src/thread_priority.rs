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

/// Default priority for the simulation thread when TOMBOLA_THREAD_PRIORITY is unset.
const DEFAULT_SIMULATION_THREAD_PRIORITY: u8 = 70;

/// Reads TOMBOLA_THREAD_PRIORITY (0-99), falling back to the default for missing or
/// out of range values.
pub fn simulation_thread_priority() -> Option<ThreadPriorityValue> {
    std::env::var("TOMBOLA_THREAD_PRIORITY")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .filter(|n| *n < 100)
        .and_then(|n| ThreadPriorityValue::try_from(n).ok())
        .or_else(|| ThreadPriorityValue::try_from(DEFAULT_SIMULATION_THREAD_PRIORITY).ok())
}

pub(crate) fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| {
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Returns whether we should attempt RT (SCHED_FIFO) scheduling for the simulation thread.
/// Default: enabled. Opt out with TOMBOLA_DISABLE_RT=1.
pub fn rt_enabled() -> bool {
    !env_flag("TOMBOLA_DISABLE_RT")
}

/// Raises the priority of the calling thread. Failures are logged and otherwise ignored,
/// the simulation still runs at normal priority.
pub fn configure_simulation_thread(priority: Option<ThreadPriorityValue>, rt: bool) {
    let Some(priority) = priority else {
        return;
    };
    let tp = ThreadPriority::Crossplatform(priority);
    if let Err(e) = set_current_thread_priority(tp) {
        warn!(error = %e, "Failed to raise simulation thread priority");
    }

    #[cfg(unix)]
    if rt {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        match set_thread_priority_and_policy(
            thread_native_id(),
            tp,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => info!("Enabled RT SCHED_FIFO for simulation thread"),
            Err(e) => warn!(error = %e, "Failed to set RT SCHED_FIFO for simulation thread"),
        }
    }

    #[cfg(not(unix))]
    let _ = rt;
}
