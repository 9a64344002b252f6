//! Daily chat log tailer.
//!
//! The client writes one file per local calendar day,
//! `<folder>/<prefix>_<YYYY_MM_DD>.<ext>`, and only ever appends to it. The
//! [`Tailer`] remembers a byte offset into today's file and, on every
//! [`poll`](Tailer::poll), reads exactly the bytes appended since the last
//! successful read.
//!
//! # Invariants
//!
//! - Progress is measured in bytes, never lines. Every byte is returned once.
//!   A multi-byte character split across two reads decodes as U+FFFD on both
//!   sides of the boundary.
//! - When the local date changes, the tailer switches to the new day's file at
//!   offset 0. Unread bytes left in the previous day's file are abandoned.
//! - A shrinking file is reported as [`PollOutcome::NoChange`]; the offset is
//!   never moved backwards.
//!
//! Pacing is the caller's concern. The tailer does no sleeping of its own.

use crate::encoding::decode_legacy;
use chatwatch_core::Error;
use chrono::{Datelike, NaiveDate};
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current local date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock local date.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// A clock that only moves when told to. Used to exercise rotation.
#[derive(Debug)]
pub struct ManualClock {
    days_from_ce: AtomicI32,
}

impl ManualClock {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            days_from_ce: AtomicI32::new(date.num_days_from_ce()),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        self.days_from_ce.store(date.num_days_from_ce(), Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i32) {
        self.days_from_ce.fetch_add(days, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        NaiveDate::from_num_days_from_ce_opt(self.days_from_ce.load(Ordering::SeqCst))
            .unwrap_or(NaiveDate::MIN)
    }
}

// ---------------------------------------------------------------------------
// File naming
// ---------------------------------------------------------------------------

/// The client's daily file naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileNaming {
    pub folder: PathBuf,
    pub prefix: String,
    pub extension: String,
}

impl LogFileNaming {
    pub fn new(folder: impl Into<PathBuf>, prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    /// `<folder>/<prefix>_<YYYY_MM_DD>.<ext>`
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.folder.join(format!(
            "{}_{}.{}",
            self.prefix,
            date.format("%Y_%m_%d"),
            self.extension
        ))
    }
}

// ---------------------------------------------------------------------------
// Tail state
// ---------------------------------------------------------------------------

/// Position of the tailer within the day's file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailState {
    pub file_path: PathBuf,
    /// Bytes of `file_path` already returned.
    pub byte_offset: u64,
    /// Local date the last poll ran on.
    pub logical_date: NaiveDate,
}

/// One poll's worth of newly appended text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    /// Raw bytes consumed from the file.
    pub bytes_read: u64,
    pub had_substitutions: bool,
}

/// Result of a single [`Tailer::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// New bytes were read and decoded.
    Fragment(Fragment),
    /// The file exists but has not grown.
    NoChange,
    /// Today's file does not exist yet.
    NotFound,
}

// ---------------------------------------------------------------------------
// Tailer
// ---------------------------------------------------------------------------

/// Incremental reader of the current day's chat log.
pub struct Tailer {
    naming: LogFileNaming,
    clock: Arc<dyn Clock>,
    state: TailState,
}

impl std::fmt::Debug for Tailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tailer")
            .field("naming", &self.naming)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Tailer {
    /// Start at offset 0 of today's file.
    pub fn new(naming: LogFileNaming, clock: Arc<dyn Clock>) -> Self {
        let today = clock.today();
        let state = TailState {
            file_path: naming.path_for(today),
            byte_offset: 0,
            logical_date: today,
        };
        Self {
            naming,
            clock,
            state,
        }
    }

    /// Resume from a previously saved position.
    pub fn with_state(naming: LogFileNaming, clock: Arc<dyn Clock>, state: TailState) -> Self {
        Self {
            naming,
            clock,
            state,
        }
    }

    pub fn state(&self) -> &TailState {
        &self.state
    }

    pub fn naming(&self) -> &LogFileNaming {
        &self.naming
    }

    /// Read whatever was appended since the last successful poll.
    ///
    /// Absence of today's file is not an error. Any other I/O failure is
    /// returned and leaves the offset untouched, so the next poll retries the
    /// same bytes.
    pub fn poll(&mut self) -> Result<PollOutcome, Error> {
        let today = self.clock.today();
        self.state.logical_date = today;

        let expected = self.naming.path_for(today);
        if expected != self.state.file_path {
            tracing::debug!(
                from = %self.state.file_path.display(),
                to = %expected.display(),
                abandoned_offset = self.state.byte_offset,
                "date changed, rotating chat log"
            );
            self.state.file_path = expected;
            self.state.byte_offset = 0;
        }

        let path = self.state.file_path.clone();
        let size = match std::fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PollOutcome::NotFound),
            Err(e) => return Err(Error::io(path, e)),
        };

        let offset = self.state.byte_offset;
        if size <= offset {
            if size < offset {
                tracing::debug!(path = %path.display(), size, offset, "chat log shrank, waiting");
            }
            return Ok(PollOutcome::NoChange);
        }

        let bytes = match read_range(&path, offset, size) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PollOutcome::NotFound),
            Err(e) => return Err(Error::io(path, e)),
        };
        if bytes.is_empty() {
            return Ok(PollOutcome::NoChange);
        }

        let bytes_read = bytes.len() as u64;
        self.state.byte_offset = offset + bytes_read;

        let decoded = decode_legacy(&bytes);
        if decoded.had_substitutions {
            tracing::debug!(
                path = %path.display(),
                offset,
                bytes_read,
                "undecodable bytes replaced"
            );
        }

        Ok(PollOutcome::Fragment(Fragment {
            text: decoded.text,
            bytes_read,
            had_substitutions: decoded.had_substitutions,
        }))
    }
}

/// Read bytes `[from, to)`. Returns fewer bytes if the file was truncated in
/// between; never reads past `to`.
fn read_range(path: &Path, from: u64, to: u64) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(from))?;
    let len = to - from;
    let mut buf = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    file.take(len).read_to_end(&mut buf)?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
