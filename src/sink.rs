//! Sink interface: how classified events leave the core.
//!
//! Sinks are notified while the dispatcher holds its state lock, so an
//! implementation must return quickly and never block. [`ChannelSink`]
//! forwards everything onto an unbounded `tokio` channel and is the usual way
//! to bridge into a UI or printer task.
//!
//! A rule change produces a replay bracket:
//!
//! ```text
//! on_replay_begin
//! on_replay_event × store.len()
//! on_replay_end
//! ```
//!
//! Sinks should discard their visible state on `on_replay_begin` and rebuild
//! it from the replay events.

use chatwatch_core::{Disposition, RawEvent};
use tokio::sync::mpsc;

/// Consumer of classified events.
pub trait Sink: Send + Sync {
    /// A newly extracted event.
    fn on_event(&self, event: &RawEvent, disposition: Disposition);

    /// A full re-render is starting.
    fn on_replay_begin(&self) {}

    /// One stored event re-classified under the new rules.
    fn on_replay_event(&self, event: &RawEvent, disposition: Disposition);

    /// The re-render is complete.
    fn on_replay_end(&self) {}
}

/// Message carried by a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkMessage {
    Event {
        event: RawEvent,
        disposition: Disposition,
    },
    ReplayBegin,
    ReplayEvent {
        event: RawEvent,
        disposition: Disposition,
    },
    ReplayEnd,
}

/// Fire-and-forget sink backed by an unbounded channel. Messages sent after
/// the receiver is dropped are silently discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkMessage>,
}

/// Create a [`ChannelSink`] and the receiver that drains it.
pub fn channel_sink() -> (ChannelSink, mpsc::UnboundedReceiver<SinkMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}

impl ChannelSink {
    fn send(&self, message: SinkMessage) {
        if self.tx.send(message).is_err() {
            tracing::trace!("sink receiver dropped, message discarded");
        }
    }
}

impl Sink for ChannelSink {
    fn on_event(&self, event: &RawEvent, disposition: Disposition) {
        self.send(SinkMessage::Event {
            event: event.clone(),
            disposition,
        });
    }

    fn on_replay_begin(&self) {
        self.send(SinkMessage::ReplayBegin);
    }

    fn on_replay_event(&self, event: &RawEvent, disposition: Disposition) {
        self.send(SinkMessage::ReplayEvent {
            event: event.clone(),
            disposition,
        });
    }

    fn on_replay_end(&self) {
        self.send(SinkMessage::ReplayEnd);
    }
}

/// Render an event as one display line: `[timestamp ][[label] ]text`.
pub fn format_line(event: &RawEvent, show_time: bool, show_label: bool) -> String {
    let mut line = String::with_capacity(event.text.len() + 32);
    if show_time {
        line.push_str(&event.timestamp);
        line.push(' ');
    }
    if show_label {
        line.push('[');
        line.push_str(event.channel.label());
        line.push_str("] ");
    }
    line.push_str(&event.text);
    line
}
