//! Real-time scheduling for the transmitter thread
//!
//! ## Platform Mapping
//!
//! - **Unix**: `SCHED_FIFO` via `pthread_setschedparam`, priority clamped to
//!   the policy's range. Needs root or `CAP_SYS_NICE`.
//! - **Windows**: `THREAD_PRIORITY_TIME_CRITICAL`.
//! - **Anything else**: no change.
//!
//! A refused request is not fatal. The transmitter keeps running at normal
//! priority and the output picks up more timing jitter.

/// What the scheduler actually granted the calling thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulingOutcome {
    /// Running under a real-time policy
    RealTime { priority: i32 },
    /// Left at normal priority
    BestEffort { reason: String },
}

impl SchedulingOutcome {
    pub fn is_realtime(&self) -> bool {
        matches!(self, SchedulingOutcome::RealTime { .. })
    }
}

/// Ask for real-time scheduling on the calling thread
pub fn promote_current_thread(priority: i32) -> SchedulingOutcome {
    let outcome = imp::promote(priority);
    match &outcome {
        SchedulingOutcome::RealTime { priority } => {
            tracing::debug!("Transmitter running with real-time priority {}", priority);
        }
        SchedulingOutcome::BestEffort { reason } => {
            tracing::warn!(
                "Real-time scheduling unavailable ({}), timing will be less precise",
                reason
            );
        }
    }
    outcome
}

#[cfg(unix)]
mod imp {
    use super::SchedulingOutcome;

    pub fn promote(priority: i32) -> SchedulingOutcome {
        // SAFETY: plain queries with no pointers
        let (min, max) = unsafe {
            (
                libc::sched_get_priority_min(libc::SCHED_FIFO),
                libc::sched_get_priority_max(libc::SCHED_FIFO),
            )
        };
        if min < 0 || max < 0 {
            return SchedulingOutcome::BestEffort {
                reason: std::io::Error::last_os_error().to_string(),
            };
        }
        let priority = priority.clamp(min, max);

        // SAFETY: sched_param is plain data; zeroing covers platform padding
        let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
        param.sched_priority = priority;

        // SAFETY: valid thread handle for the calling thread and a live param
        let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
        if rc == 0 {
            SchedulingOutcome::RealTime { priority }
        } else {
            SchedulingOutcome::BestEffort {
                reason: std::io::Error::from_raw_os_error(rc).to_string(),
            }
        }
    }
}

#[cfg(windows)]
mod imp {
    use super::SchedulingOutcome;
    use windows::Win32::System::Threading::{
        GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_TIME_CRITICAL,
    };

    pub fn promote(_priority: i32) -> SchedulingOutcome {
        // SAFETY: pseudo-handle for the calling thread
        match unsafe { SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_TIME_CRITICAL) } {
            Ok(()) => SchedulingOutcome::RealTime {
                priority: THREAD_PRIORITY_TIME_CRITICAL.0,
            },
            Err(e) => SchedulingOutcome::BestEffort {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(not(any(unix, windows)))]
mod imp {
    use super::SchedulingOutcome;

    pub fn promote(_priority: i32) -> SchedulingOutcome {
        SchedulingOutcome::BestEffort {
            reason: "no real-time policy on this platform".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_never_fails_hard() {
        // Unprivileged test runners get BestEffort, root gets RealTime
        let outcome = std::thread::spawn(|| promote_current_thread(90))
            .join()
            .unwrap();
        match outcome {
            SchedulingOutcome::RealTime { priority } => assert!(priority > 0),
            SchedulingOutcome::BestEffort { reason } => assert!(!reason.is_empty()),
        }
    }
}
