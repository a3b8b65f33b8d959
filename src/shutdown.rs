//! Halt flag and orderly teardown
//!
//! The halt flag only ever goes from false to true. Signal handlers, the
//! input timeout, the transmitter's own exit path and teardown all set it;
//! the reader and the transmitter poll it at loop boundaries.
//!
//! The coordinator owns the transmitter's join handle. Dropping it halts and
//! joins, so the clock output is disabled before the process exits on every
//! path, including early returns with `?`.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::transmitter::TransmitReport;

/// Process-wide stop request
#[derive(Clone, Default)]
pub struct HaltFlag(Arc<AtomicBool>);

impl HaltFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a halt. Idempotent.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for HaltFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HaltFlag").field(&self.is_set()).finish()
    }
}

/// Signals that request a halt
#[cfg(unix)]
pub const HALT_SIGNALS: &[i32] = &[
    signal_hook::consts::SIGINT,
    signal_hook::consts::SIGQUIT,
    signal_hook::consts::SIGTERM,
    signal_hook::consts::SIGHUP,
];

#[cfg(not(unix))]
pub const HALT_SIGNALS: &[i32] = &[signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM];

/// Owns the halt flag and the transmitter thread
pub struct ShutdownCoordinator {
    halt: HaltFlag,
    transmitter: Mutex<Option<JoinHandle<TransmitReport>>>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            halt: HaltFlag::new(),
            transmitter: Mutex::new(None),
        }
    }

    /// Shared handle to the halt flag
    pub fn halt_flag(&self) -> HaltFlag {
        self.halt.clone()
    }

    pub fn is_halted(&self) -> bool {
        self.halt.is_set()
    }

    /// Route termination signals to the halt flag.
    ///
    /// The handlers do a single atomic store and nothing else.
    pub fn install_signal_handlers(&self) -> std::io::Result<()> {
        for &signal in HALT_SIGNALS {
            signal_hook::flag::register(signal, Arc::clone(&self.halt.0))?;
        }
        tracing::debug!("Halt signal handlers installed ({} signals)", HALT_SIGNALS.len());
        Ok(())
    }

    /// Take ownership of the transmitter thread
    pub fn attach(&self, handle: JoinHandle<TransmitReport>) {
        let previous = self.transmitter.lock().replace(handle);
        debug_assert!(previous.is_none(), "transmitter attached twice");
    }

    /// Wait for the transmitter to finish on its own (drain path).
    /// Returns None if there is no thread or it was already joined.
    pub fn wait_for_transmitter(&self) -> Option<TransmitReport> {
        let handle = self.transmitter.lock().take()?;
        match handle.join() {
            Ok(report) => Some(report),
            Err(_) => {
                tracing::error!("Transmitter thread panicked");
                self.halt.trigger();
                None
            }
        }
    }

    /// Halt and wait for the transmitter to disable the output
    pub fn shutdown(&self) -> Option<TransmitReport> {
        self.halt.trigger();
        self.wait_for_transmitter()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ShutdownCoordinator {
    fn drop(&mut self) {
        if let Some(report) = self.shutdown() {
            tracing::debug!("Transmitter joined during teardown: {:?}", report.stop_reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_halt_flag_is_shared_and_sticky() {
        let halt = HaltFlag::new();
        let other = halt.clone();
        assert!(!other.is_set());
        halt.trigger();
        halt.trigger();
        assert!(other.is_set());
    }

    #[test]
    fn test_shutdown_sets_flag_and_joins() {
        let coordinator = ShutdownCoordinator::new();
        let halt = coordinator.halt_flag();
        let handle = thread::spawn(move || {
            while !halt.is_set() {
                thread::sleep(Duration::from_millis(1));
            }
            TransmitReport::default()
        });
        coordinator.attach(handle);

        assert!(coordinator.shutdown().is_some());
        assert!(coordinator.is_halted());
        // Joined exactly once
        assert!(coordinator.shutdown().is_none());
    }

    #[test]
    fn test_drop_joins_transmitter() {
        let finished = Arc::new(AtomicBool::new(false));
        {
            let coordinator = ShutdownCoordinator::new();
            let halt = coordinator.halt_flag();
            let finished = finished.clone();
            coordinator.attach(thread::spawn(move || {
                while !halt.is_set() {
                    thread::yield_now();
                }
                finished.store(true, Ordering::SeqCst);
                TransmitReport::default()
            }));
        }
        assert!(finished.load(Ordering::SeqCst));
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_sets_halt() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.install_signal_handlers().unwrap();
        assert!(!coordinator.is_halted());

        signal_hook::low_level::raise(signal_hook::consts::SIGHUP).unwrap();
        assert!(coordinator.is_halted());
    }
}
