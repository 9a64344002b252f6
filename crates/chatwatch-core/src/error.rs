//! Error taxonomy for chatwatch.
//!
//! Most conditions the pipeline meets are not errors at all:
//!
//! | Condition | Handling |
//! |-----------|----------|
//! | today's file does not exist yet | `PollOutcome::NotFound`, retried next tick |
//! | undecodable bytes | replaced, logged at debug |
//! | malformed markup span | that span skipped, logged at trace |
//! | editing a word that is absent | [`RuleEdit::NotPresent`](crate::rules::RuleEdit) |
//!
//! Only I/O faults and bad configuration surface as [`Error`]. Neither stops a
//! running monitor; the dispatcher logs the fault and polls again.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading the chat log failed for a reason other than absence.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration value could not be used.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Monitoring was requested while a session is already running.
    #[error("monitoring is already running")]
    AlreadyMonitoring,

    /// Monitoring was started outside a `tokio` runtime.
    #[error("no async runtime: {0}")]
    Runtime(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
