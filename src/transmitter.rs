//! Real-time divisor dispatch
//!
//! The transmitter thread moves through three states:
//!
//! ```text
//! WaitingForFirstSample ──pull ok──▶ Streaming ──underflow / halt──▶ Stopped
//!          │                                                           ▲
//!          └──────────────────────────halt─────────────────────────────┘
//! ```
//!
//! While streaming it spins on the system timer until the next sample
//! deadline, writes the held divisor, pulls the next one and moves the
//! deadline forward by one sample period. Deadlines advance from the first
//! one rather than from "now", so a late write does not shift every sample
//! after it. The spin is deliberate: a sleeping wait cannot hit a 50µs grid
//! on a stock kernel. The loop owns a CPU core for the whole transmission.

use crossbeam::utils::Backoff;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};
use crate::hal::ClockOutput;
use crate::platform::{self, SchedulingOutcome};
use crate::station::TxContext;

/// Why the transmitter stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// Halt requested before any sample arrived; output never enabled
    HaltedBeforeStart,
    /// Halt requested while streaming
    #[default]
    Halted,
    /// Queue ran dry: input exhausted or the reader fell behind
    Underflow,
}

/// Summary returned when the transmitter thread exits
#[derive(Debug, Clone, Default)]
pub struct TransmitReport {
    /// Divisors written to the hardware
    pub divisors_written: u64,
    /// Deadlines reached a full sample period or more late
    pub late_deadlines: u64,
    pub stop_reason: StopReason,
    /// Whether the thread ran under a real-time policy
    pub realtime: bool,
}

/// Consumer side of the sample queue
pub struct Transmitter<C: ClockOutput> {
    clock: C,
    ctx: Arc<TxContext>,
    period_us: u64,
    rt_priority: Option<i32>,
}

impl<C: ClockOutput> Transmitter<C> {
    pub fn new(clock: C, ctx: Arc<TxContext>, period_us: u64) -> Self {
        Self {
            clock,
            ctx,
            period_us,
            rt_priority: None,
        }
    }

    /// Request real-time scheduling when the thread starts
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.rt_priority = Some(priority);
        self
    }

    /// Start the transmitter on its own thread
    pub fn spawn(self) -> Result<JoinHandle<TransmitReport>>
    where
        C: 'static,
    {
        thread::Builder::new()
            .name("transmitter".to_string())
            .spawn(move || self.run())
            .map_err(|e| Error::Thread(e.to_string()))
    }

    /// Run the state machine on the calling thread until it stops
    pub fn run(self) -> TransmitReport {
        let realtime = self
            .rt_priority
            .map(platform::promote_current_thread)
            .as_ref()
            .is_some_and(SchedulingOutcome::is_realtime);

        let mut report = TransmitReport {
            realtime,
            ..TransmitReport::default()
        };

        report.stop_reason = match self.wait_for_first_sample() {
            Some(first) => {
                tracing::debug!("First sample queued, enabling GPCLK0");
                self.stream(first, &mut report)
            }
            None => StopReason::HaltedBeforeStart,
        };

        self.stop();
        tracing::info!(
            "Transmitter stopped ({:?}): {} divisors written, {} late",
            report.stop_reason,
            report.divisors_written,
            report.late_deadlines
        );
        report
    }

    fn wait_for_first_sample(&self) -> Option<u32> {
        let backoff = Backoff::new();
        loop {
            if let Some(divisor) = self.ctx.queue.pull() {
                return Some(divisor);
            }
            if self.ctx.halt.is_set() {
                return None;
            }
            backoff.snooze();
        }
    }

    fn stream(&self, first: u32, report: &mut TransmitReport) -> StopReason {
        self.clock.set_clock_enabled(true);

        let mut divisor = first;
        let mut deadline = self.clock.read_counter();

        while !self.ctx.halt.is_set() {
            let Some(lateness) = self.wait_until(deadline) else {
                return StopReason::Halted;
            };
            if lateness >= self.period_us {
                report.late_deadlines += 1;
            }

            self.clock.write_divisor(divisor);
            report.divisors_written += 1;

            divisor = match self.ctx.queue.pull() {
                Some(next) => next,
                None => return StopReason::Underflow,
            };
            deadline = deadline.wrapping_add(self.period_us);
            thread::yield_now();
        }
        StopReason::Halted
    }

    /// Spin until the counter reaches `deadline`. Returns how far past the
    /// deadline the counter was, or None if a halt arrived first.
    fn wait_until(&self, deadline: u64) -> Option<u64> {
        loop {
            // Signed difference tolerates counter wraparound
            let behind = self.clock.read_counter().wrapping_sub(deadline) as i64;
            if behind >= 0 {
                return Some(behind as u64);
            }
            if self.ctx.halt.is_set() {
                return None;
            }
        }
    }

    fn stop(&self) {
        self.ctx.halt.trigger();
        self.clock.set_clock_enabled(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::registers::{CM_GP0CTL, DISABLE_WORD, GPFSEL0};
    use crate::hal::{ClockController, SimBus};
    use crate::shutdown::HaltFlag;

    fn setup(capacity: usize, start: u64, tick: u64) -> (SimBus, Arc<TxContext>) {
        let bus = SimBus::with_counter(start, tick);
        let ctx = Arc::new(TxContext::new(capacity, HaltFlag::new()));
        (bus, ctx)
    }

    #[test]
    fn test_drains_queue_in_order_then_halts() {
        let (bus, ctx) = setup(64, 1_000, 3);
        for d in 20000..20040 {
            assert!(ctx.queue.push(d));
        }

        let report = Transmitter::new(ClockController::new(bus.clone()), ctx.clone(), 50).run();

        assert_eq!(report.stop_reason, StopReason::Underflow);
        assert_eq!(report.divisors_written, 40);
        assert_eq!(bus.divisors(), (20000..20040).collect::<Vec<_>>());
        assert!(ctx.halt.is_set());
        assert_eq!(bus.peek(CM_GP0CTL), DISABLE_WORD);
        assert_eq!(bus.peek(GPFSEL0), 0);
    }

    #[test]
    fn test_writes_paced_by_counter() {
        let (bus, ctx) = setup(8, 0, 1);
        for d in [1, 2, 3, 4] {
            ctx.queue.push(d);
        }
        Transmitter::new(ClockController::new(bus.clone()), ctx, 50).run();

        // Three full periods elapse between the first and last write
        assert!(bus.counter() >= 150);
    }

    #[test]
    fn test_deadline_survives_counter_wrap() {
        let (bus, ctx) = setup(8, u64::MAX - 60, 7);
        for d in [10, 11, 12, 13] {
            ctx.queue.push(d);
        }
        let report = Transmitter::new(ClockController::new(bus.clone()), ctx, 50).run();

        assert_eq!(report.stop_reason, StopReason::Underflow);
        assert_eq!(bus.divisors(), vec![10, 11, 12, 13]);
        assert!(bus.counter() < u64::MAX - 60);
    }

    #[test]
    fn test_halt_before_first_sample_never_enables() {
        let (bus, ctx) = setup(8, 0, 1);
        ctx.halt.trigger();

        let report = Transmitter::new(ClockController::new(bus.clone()), ctx, 50).run();

        assert_eq!(report.stop_reason, StopReason::HaltedBeforeStart);
        assert_eq!(report.divisors_written, 0);
        // Only the disable pair was written
        assert_eq!(bus.writes_to(CM_GP0CTL), vec![DISABLE_WORD]);
        assert!(bus.divisors().is_empty());
    }

    #[test]
    fn test_halt_while_streaming_skips_pending_divisor() {
        // Counter never advances, so the second deadline is never reached
        let (bus, ctx) = setup(8, 500, 0);
        for d in [7, 8, 9] {
            ctx.queue.push(d);
        }
        let halt = ctx.halt.clone();
        let handle = Transmitter::new(ClockController::new(bus.clone()), ctx, 50)
            .spawn()
            .unwrap();

        while bus.divisors().is_empty() {
            thread::yield_now();
        }
        halt.trigger();
        let report = handle.join().unwrap();

        assert_eq!(report.stop_reason, StopReason::Halted);
        assert_eq!(bus.divisors(), vec![7]);
        assert_eq!(bus.peek(CM_GP0CTL), DISABLE_WORD);
    }

    #[test]
    fn test_counts_late_deadlines() {
        // Every counter read jumps two periods
        let (bus, ctx) = setup(8, 0, 100);
        for d in [1, 2, 3] {
            ctx.queue.push(d);
        }
        let report = Transmitter::new(ClockController::new(bus), ctx, 50).run();
        assert!(report.late_deadlines >= 2);
    }
}
