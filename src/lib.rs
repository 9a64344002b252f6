//! chatwatch: live chat log monitor.
//!
//! Tails the game client's daily chat log, extracts chat lines, classifies
//! them against NG/SP words and channel toggles, and hands them to sinks.
//! This crate wires the `chatwatch-core` pipeline to the `chatwatch-feeds`
//! tailer and exposes the result as a [`Dispatcher`].
//!
//! # Architecture
//!
//! ```text
//! Tailer ──► EventExtractor ──► classify ──► MessageStore
//!                                   │
//!                                   └──► Sinks (on_event / replay)
//! ```
//!
//! The poll loop runs as one background `tokio` task. Rule edits happen on the
//! caller's side and replay the store to every sink.

pub mod commands;
pub mod dispatcher;
pub mod sink;

pub use dispatcher::{Dispatcher, MonitorState, MonitorStats};
pub use sink::{channel_sink, format_line, ChannelSink, Sink, SinkMessage};
