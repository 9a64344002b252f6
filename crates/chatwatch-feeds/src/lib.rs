//! chatwatch-feeds: chat log source adapter for chatwatch.
//!
//! The only feed is the client's rotating daily log file. [`file::Tailer`]
//! reads newly appended bytes and [`encoding`] turns them into text; the
//! result is handed to `chatwatch_core::EventExtractor` by the dispatcher.

pub mod encoding;
pub mod file;

pub use file::{Clock, Fragment, LocalClock, LogFileNaming, ManualClock, PollOutcome, TailState, Tailer};
