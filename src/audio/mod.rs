//! Audio subsystem module

pub mod buffer;
pub mod reader;

pub use buffer::SampleQueue;
pub use reader::{InputReader, ReadOutcome, ReadSummary};
