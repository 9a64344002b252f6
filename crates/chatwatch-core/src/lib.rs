//! chatwatch-core: chat log classification core.
//!
//! This crate holds everything between "a decoded text fragment" and "an event
//! with a display decision": the colour registry, the markup extractor, the
//! rule engine and the bounded message store, plus the shared types and
//! configuration.
//!
//! # Architecture
//!
//! ```text
//! Tailer ──► EventExtractor ──► RuleEngine ──► Sinks
//!                   │                ▲
//!                   └──► MessageStore┘ (replay on rule change)
//! ```
//!
//! File access lives in `chatwatch-feeds`; orchestration in the `chatwatch`
//! crate.

pub mod config;
pub mod error;
pub mod extract;
pub mod registry;
pub mod rules;
pub mod store;
pub mod types;

pub use error::{Error, Result};
pub use extract::{EventExtractor, NoiseFilter, NoisePrefix};
pub use registry::ChannelRegistry;
pub use rules::{classify, RuleEdit, RuleSet, WordList};
pub use store::MessageStore;
pub use types::{ChannelKind, ColorKey, Disposition, RawEvent};
