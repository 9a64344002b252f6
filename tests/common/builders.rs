//! Test builders: ergonomic constructors for events, markup, rule sets and
//! on-disk chat logs.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use chatwatch::{Sink, SinkMessage};
use chatwatch_core::{ChannelKind, Disposition, RawEvent, RuleSet};
use chatwatch_feeds::{LogFileNaming, ManualClock};
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Events and markup
// ---------------------------------------------------------------------------

pub fn event(channel: ChannelKind, text: &str) -> RawEvent {
    RawEvent::new(channel, "00:00:00", text)
}

pub fn general(timestamp: &str, text: &str) -> RawEvent {
    RawEvent::new(ChannelKind::General, timestamp, text)
}

/// One timestamp/message pair exactly as the client writes it.
pub fn chat_pair(timestamp: &str, color: &str, text: &str) -> String {
    format!(r#"<font>{timestamp}</font><font color="{color}">{text}</font><br>"#)
}

/// `n` general-channel pairs numbered from `start`.
pub fn numbered_pairs(start: usize, n: usize) -> String {
    (start..start + n)
        .map(|i| chat_pair(&format!("t{i}"), "#c8ffc8", &format!("line {i}")))
        .collect()
}

pub fn rules(ng: &[&str], sp: &[&str]) -> RuleSet {
    RuleSet::new(ng.iter().copied(), sp.iter().copied(), Vec::<(ChannelKind, bool)>::new())
}

// ---------------------------------------------------------------------------
// Chat log on disk
// ---------------------------------------------------------------------------

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A temporary chat log folder with a controllable clock.
pub struct TempChatLog {
    pub dir: tempfile::TempDir,
    pub naming: LogFileNaming,
    pub clock: Arc<ManualClock>,
}

impl TempChatLog {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let naming = LogFileNaming::new(dir.path(), "TWChatLog", "html");
        Self {
            dir,
            naming,
            clock: Arc::new(ManualClock::new(date(2024, 5, 1))),
        }
    }

    /// Path of the file for the clock's current date.
    pub fn today_path(&self) -> PathBuf {
        use chatwatch_feeds::Clock;
        self.naming.path_for(self.clock.today())
    }

    pub fn append_bytes(&self, bytes: &[u8]) {
        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.today_path())
            .unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
    }

    /// Append `text` encoded in the client's code page.
    pub fn append_legacy(&self, text: &str) {
        let (bytes, _, unmappable) = chatwatch_feeds::encoding::LEGACY_ENCODING.encode(text);
        assert!(!unmappable, "test text must be representable in cp932");
        self.append_bytes(&bytes);
    }

    /// A config pointing at this folder with a fast poll interval.
    pub fn config(&self) -> chatwatch_core::config::Config {
        let mut config = chatwatch_core::config::Config::defaults();
        config.source.folder = self.dir.path().to_path_buf();
        config.source.poll_interval_ms = 10;
        config
    }
}

// ---------------------------------------------------------------------------
// Recording sink
// ---------------------------------------------------------------------------

/// Sink that records every call and models a display surface: a replay
/// clears the visible list and rebuilds it.
#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<SinkMessage>>,
    visible: Mutex<Vec<RawEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn visible(&self) -> Vec<RawEvent> {
        self.visible.lock().clone()
    }

    pub fn visible_texts(&self) -> Vec<String> {
        self.visible.lock().iter().map(|e| e.text.clone()).collect()
    }

    pub fn live_events(&self) -> Vec<(RawEvent, Disposition)> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                SinkMessage::Event { event, disposition } => Some((event.clone(), *disposition)),
                _ => None,
            })
            .collect()
    }

    pub fn replay_count(&self) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|m| matches!(m, SinkMessage::ReplayBegin))
            .count()
    }
}

impl Sink for RecordingSink {
    fn on_event(&self, event: &RawEvent, disposition: Disposition) {
        self.messages.lock().push(SinkMessage::Event {
            event: event.clone(),
            disposition,
        });
        if disposition.is_visible() {
            self.visible.lock().push(event.clone());
        }
    }

    fn on_replay_begin(&self) {
        self.messages.lock().push(SinkMessage::ReplayBegin);
        self.visible.lock().clear();
    }

    fn on_replay_event(&self, event: &RawEvent, disposition: Disposition) {
        self.messages.lock().push(SinkMessage::ReplayEvent {
            event: event.clone(),
            disposition,
        });
        if disposition.is_visible() {
            self.visible.lock().push(event.clone());
        }
    }

    fn on_replay_end(&self) {
        self.messages.lock().push(SinkMessage::ReplayEnd);
    }
}
