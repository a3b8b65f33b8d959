//! PCM input reader
//!
//! Reads 16-bit little-endian mono samples, converts each one to a GPCLK0
//! divisor and pushes it onto the sample queue, retrying while the queue is
//! full. Runs on the main thread.

use crossbeam::utils::Backoff;
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::BYTES_PER_SAMPLE;
use crate::error::InputError;
use crate::modulation::Modulator;
use crate::station::TxContext;

/// Why the reader stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Input ended cleanly; the transmitter drains what is queued
    EndOfStream,
    /// Someone else requested a halt
    Halted,
    /// The configured timeout elapsed; the reader set the halt flag
    TimedOut,
}

/// Counters from one reader run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSummary {
    pub samples_read: u64,
    pub samples_queued: u64,
    pub outcome: ReadOutcome,
}

/// Producer side of the sample queue
pub struct InputReader<R: Read> {
    input: R,
    modulator: Modulator,
    ctx: Arc<TxContext>,
    deadline: Option<Instant>,
}

impl<R: Read> InputReader<R> {
    pub fn new(input: R, modulator: Modulator, ctx: Arc<TxContext>) -> Self {
        Self {
            input,
            modulator,
            ctx,
            deadline: None,
        }
    }

    /// Halt once `timeout` has elapsed from now
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.deadline = timeout.map(|t| Instant::now() + t);
        self
    }

    /// Read and queue samples until end of input, halt, or timeout
    pub fn run(&mut self) -> Result<ReadSummary, InputError> {
        let mut samples_read = 0u64;
        let mut samples_queued = 0u64;

        let outcome = loop {
            if self.ctx.halt.is_set() {
                break ReadOutcome::Halted;
            }

            let Some(sample) = self.read_sample()? else {
                break ReadOutcome::EndOfStream;
            };
            samples_read += 1;

            let divisor = self.modulator.divisor(sample);
            if self.enqueue(divisor) {
                samples_queued += 1;
            }

            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                tracing::info!("Timeout reached after {} samples", samples_read);
                self.ctx.halt.trigger();
                break ReadOutcome::TimedOut;
            }
        };

        tracing::debug!(
            "Input reader finished ({:?}): {} read, {} queued",
            outcome,
            samples_read,
            samples_queued
        );

        Ok(ReadSummary {
            samples_read,
            samples_queued,
            outcome,
        })
    }

    /// Push with retry. False if a halt arrived before the queue had room.
    fn enqueue(&self, divisor: u32) -> bool {
        let backoff = Backoff::new();
        loop {
            if self.ctx.queue.push(divisor) {
                return true;
            }
            if self.ctx.halt.is_set() {
                return false;
            }
            backoff.snooze();
        }
    }

    /// Next sample, or None at a clean end of input. A stream that ends
    /// partway through a sample is an error.
    fn read_sample(&mut self) -> Result<Option<i16>, InputError> {
        let mut buf = [0u8; BYTES_PER_SAMPLE];
        let mut filled = 0;

        while filled < buf.len() {
            match self.input.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {
                    if self.ctx.halt.is_set() && filled == 0 {
                        return Ok(None);
                    }
                }
                Err(e) => return Err(InputError::Io(e)),
            }
        }

        match filled {
            0 => Ok(None),
            BYTES_PER_SAMPLE => Ok(Some(i16::from_le_bytes(buf))),
            got => Err(InputError::ShortRead {
                got,
                expected: BYTES_PER_SAMPLE,
            }),
        }
    }
}
