//! Wiring of the reader and transmitter threads
//!
//! [`TxContext`] is the only state the two threads share. [`run`] starts the
//! transmitter, feeds it from the input on the calling thread, and waits for
//! it to finish.

use std::io::Read;
use std::sync::Arc;

use crate::audio::{InputReader, ReadSummary, SampleQueue};
use crate::config::TransmitterConfig;
use crate::error::Result;
use crate::hal::ClockOutput;
use crate::modulation::Modulator;
use crate::shutdown::{HaltFlag, ShutdownCoordinator};
use crate::transmitter::{TransmitReport, Transmitter};

/// State shared by the reader and the transmitter
pub struct TxContext {
    pub queue: SampleQueue,
    pub halt: HaltFlag,
}

impl TxContext {
    pub fn new(capacity: usize, halt: HaltFlag) -> Self {
        Self {
            queue: SampleQueue::new(capacity),
            halt,
        }
    }
}

/// Outcome of one transmission
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub input: ReadSummary,
    /// None if the transmitter thread panicked
    pub transmit: Option<TransmitReport>,
}

/// Transmit `input` through `clock` until the input ends, the timeout
/// elapses, or the coordinator's halt flag is raised.
///
/// The transmitter is attached to `coordinator` before any input is read,
/// so an error returned from here still leaves the coordinator able to
/// halt and join it.
pub fn run<C, R>(
    config: &TransmitterConfig,
    clock: C,
    input: R,
    coordinator: &ShutdownCoordinator,
) -> Result<RunSummary>
where
    C: ClockOutput + 'static,
    R: Read,
{
    config.validate()?;

    let ctx = Arc::new(TxContext::new(
        config.queue_capacity(),
        coordinator.halt_flag(),
    ));

    let mut transmitter = Transmitter::new(clock, ctx.clone(), config.sample_period_us());
    if config.rt_priority > 0 {
        transmitter = transmitter.with_priority(config.rt_priority);
    }
    coordinator.attach(transmitter.spawn()?);

    tracing::info!(
        "Transmitting on {} MHz, deviation {} kHz, {} samples/s",
        config.frequency_mhz,
        config.deviation_khz,
        config.sample_rate
    );

    let mut reader = InputReader::new(input, Modulator::from_config(config), ctx.clone())
        .with_timeout(config.timeout());

    let input = match reader.run() {
        Ok(summary) => summary,
        Err(e) => {
            coordinator.shutdown();
            return Err(e.into());
        }
    };

    // End of input leaves the halt flag clear so queued samples still go out
    let transmit = coordinator.wait_for_transmitter();

    if ctx.queue.rejected_pushes() > 0 {
        tracing::debug!(
            "Reader waited on a full queue {} times",
            ctx.queue.rejected_pushes()
        );
    }

    Ok(RunSummary { input, transmit })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{ClockController, SimBus};
    use crate::transmitter::StopReason;
    use std::io::Cursor;

    #[test]
    fn test_invalid_config_starts_nothing() {
        let coordinator = ShutdownCoordinator::new();
        let bus = SimBus::new();
        let config = TransmitterConfig::with_frequency(0.0);

        let result = run(&config, ClockController::new(bus.clone()), Cursor::new(Vec::new()), &coordinator);

        assert!(result.is_err());
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn test_empty_input_stops_cleanly() {
        let coordinator = ShutdownCoordinator::new();
        let bus = SimBus::new();
        let config = TransmitterConfig {
            rt_priority: 0,
            ..TransmitterConfig::with_frequency(100.5)
        };

        let (tx_bus, halt) = (bus.clone(), coordinator.halt_flag());
        // The transmitter waits for a first sample that never comes
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            halt.trigger();
        });
        let summary = run(&config, ClockController::new(tx_bus), Cursor::new(Vec::new()), &coordinator).unwrap();
        stopper.join().unwrap();

        assert_eq!(summary.input.samples_read, 0);
        assert_eq!(
            summary.transmit.map(|r| r.stop_reason),
            Some(StopReason::HaltedBeforeStart)
        );
        assert!(bus.divisors().is_empty());
    }
}
