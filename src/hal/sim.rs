//! In-memory register bus
//!
//! Behaves like the peripheral window closely enough to exercise the clock
//! protocol and the transmitter without hardware: registers hold the last
//! value written, every access is logged, and the system timer advances by a
//! fixed step on each low-word read.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::registers::{CM_GP0DIV, SYST_CHI, SYST_CLO};
use crate::constants::DIVISOR_MAX;
use super::RegisterBus;

/// One logged register access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusAccess {
    Read(usize),
    Write(usize, u32),
}

#[derive(Default)]
struct SimState {
    registers: HashMap<usize, u32>,
    log: Vec<BusAccess>,
}

/// Simulated peripheral window. Clones share the same registers.
#[derive(Clone)]
pub struct SimBus {
    state: Arc<Mutex<SimState>>,
    counter: Arc<AtomicU64>,
    tick: u64,
}

impl SimBus {
    /// Counter starts at zero and advances 1µs per read
    pub fn new() -> Self {
        Self::with_counter(0, 1)
    }

    /// Counter starts at `start` and advances `tick` µs per low-word read
    pub fn with_counter(start: u64, tick: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::default())),
            counter: Arc::new(AtomicU64::new(start)),
            tick,
        }
    }

    /// Set a register without logging
    pub fn poke(&self, offset: usize, value: u32) {
        self.state.lock().registers.insert(offset, value);
    }

    /// Read a register without logging
    pub fn peek(&self, offset: usize) -> u32 {
        self.state.lock().registers.get(&offset).copied().unwrap_or(0)
    }

    /// Current counter value, without advancing it
    pub fn counter(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn log(&self) -> Vec<BusAccess> {
        self.state.lock().log.clone()
    }

    /// Logged writes, in order
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.state
            .lock()
            .log
            .iter()
            .filter_map(|access| match *access {
                BusAccess::Write(offset, value) => Some((offset, value)),
                BusAccess::Read(_) => None,
            })
            .collect()
    }

    /// Logged writes to one register, in order
    pub fn writes_to(&self, offset: usize) -> Vec<u32> {
        self.writes()
            .into_iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| v)
            .collect()
    }

    /// Values written to the divisor register, tag stripped
    pub fn divisors(&self) -> Vec<u32> {
        self.writes_to(CM_GP0DIV)
            .into_iter()
            .map(|word| word & DIVISOR_MAX)
            .collect()
    }

    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterBus for SimBus {
    fn read32(&self, offset: usize) -> u32 {
        match offset {
            SYST_CLO => {
                // Timer reads are not logged; the transmitter spins on them
                let now = self.counter.fetch_add(self.tick, Ordering::SeqCst);
                now as u32
            }
            SYST_CHI => (self.counter.load(Ordering::SeqCst) >> 32) as u32,
            _ => {
                let mut state = self.state.lock();
                state.log.push(BusAccess::Read(offset));
                state.registers.get(&offset).copied().unwrap_or(0)
            }
        }
    }

    fn write32(&self, offset: usize, value: u32) {
        let mut state = self.state.lock();
        state.log.push(BusAccess::Write(offset, value));
        state.registers.insert(offset, value);
    }
}
