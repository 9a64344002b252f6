//! Dispatcher: owns a monitoring session and the shared rule/store state.
//!
//! # States
//!
//! ```text
//!          start()                     stop()
//!   Idle ───────────► Monitoring ────────────► Idle
//! ```
//!
//! While monitoring, one background task repeats a cycle every poll interval:
//!
//! 1. check the stop signal
//! 2. `Tailer::poll` on the blocking pool, with no lock held, then check the
//!    stop signal again so a stopped loop never ingests
//! 3. lock the shared state once, then for each extracted event:
//!    `classify` → `MessageStore::append` → notify every sink
//! 4. sleep
//!
//! A failed cycle is logged and the loop carries on. Only `stop` ends a session.
//! A `start` issued while the previous loop is still finishing waits for it,
//! so two loops never read the file at once.
//!
//! # Locking
//!
//! Rules, store, extractor and sinks live behind a single mutex. A cycle
//! classifies its whole batch under one acquisition, so it never observes a
//! half-applied edit. Rule edits take the same lock, mutate and replay the
//! store to every sink before releasing it.

use crate::sink::Sink;
use chatwatch_core::config::Config;
use chatwatch_core::rules::WordList;
use chatwatch_core::{
    classify, ChannelKind, ChannelRegistry, Error, EventExtractor, MessageStore, RawEvent, RuleEdit,
    RuleSet,
};
use chatwatch_feeds::{Clock, LocalClock, LogFileNaming, PollOutcome, Tailer};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Whether a session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Monitoring,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorState::Idle => write!(f, "idle"),
            MonitorState::Monitoring => write!(f, "monitoring"),
        }
    }
}

/// Counters accumulated across sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub cycles: u64,
    pub fragments: u64,
    pub events: u64,
    pub faults: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cycles: AtomicU64,
    fragments: AtomicU64,
    events: AtomicU64,
    faults: AtomicU64,
}

/// Where to read from, applied when a session starts.
#[derive(Debug, Clone)]
struct SourceSettings {
    naming: LogFileNaming,
    poll_interval: Duration,
    carry_partial_pairs: bool,
}

struct Shared {
    rules: RuleSet,
    store: MessageStore,
    extractor: EventExtractor,
    sinks: Vec<Arc<dyn Sink>>,
}

impl Shared {
    /// Re-classify the whole store and push it to every sink.
    fn replay(&self) {
        tracing::debug!(events = self.store.len(), sinks = self.sinks.len(), "replaying store");
        for sink in &self.sinks {
            sink.on_replay_begin();
        }
        for event in self.store.iter() {
            let disposition = classify(event, &self.rules);
            for sink in &self.sinks {
                sink.on_replay_event(event, disposition);
            }
        }
        for sink in &self.sinks {
            sink.on_replay_end();
        }
    }
}

struct Session {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Session {
    /// Not yet told to stop and not exited.
    fn is_running(&self) -> bool {
        !*self.stop_tx.borrow() && !self.handle.is_finished()
    }
}

struct Inner {
    shared: Mutex<Shared>,
    source: Mutex<SourceSettings>,
    session: Mutex<Option<Session>>,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl Inner {
    fn ingest(&self, fragment: &str) -> Option<String> {
        let mut shared = self.shared.lock();
        let Shared {
            rules,
            store,
            extractor,
            sinks,
        } = &mut *shared;

        let extraction = extractor.extract_detailed(fragment);
        tracing::trace!(stats = ?extraction.stats, "fragment extracted");
        self.counters
            .events
            .fetch_add(extraction.events.len() as u64, Ordering::Relaxed);

        for event in extraction.events {
            let disposition = classify(&event, rules);
            store.append(event.clone());
            for sink in sinks.iter() {
                sink.on_event(&event, disposition);
            }
        }
        extraction.remainder
    }
}

/// Handle to the monitoring pipeline. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &self.state())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Build from configuration, using the local wall-clock date.
    pub fn new(config: &Config) -> Result<Self, Error> {
        Self::with_clock(config, Arc::new(LocalClock))
    }

    /// Build with an explicit date source.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, Error> {
        let registry = Arc::new(ChannelRegistry::standard());
        let shared = Shared {
            rules: config.rules.build()?,
            store: config.store.build(),
            extractor: EventExtractor::new(registry, config.noise_filter()),
            sinks: Vec::new(),
        };
        let source = SourceSettings {
            naming: LogFileNaming::new(
                &config.source.folder,
                &config.source.file_prefix,
                &config.source.file_extension,
            ),
            poll_interval: config.source.poll_interval(),
            carry_partial_pairs: config.source.carry_partial_pairs,
        };
        Ok(Self {
            inner: Arc::new(Inner {
                shared: Mutex::new(shared),
                source: Mutex::new(source),
                session: Mutex::new(None),
                clock,
                counters: Counters::default(),
            }),
        })
    }

    // -----------------------------------------------------------------------
    // Session control
    // -----------------------------------------------------------------------

    /// Begin monitoring today's file from offset 0. Must be called from inside
    /// a `tokio` runtime. Starting twice is rejected.
    ///
    /// If a previous session was told to stop but is still finishing its last
    /// cycle, the new loop waits for it to exit before its first poll, so at
    /// most one loop ever reads the file.
    pub fn start(&self) -> Result<(), Error> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;

        let mut session = self.inner.session.lock();
        if session.as_ref().is_some_and(Session::is_running) {
            return Err(Error::AlreadyMonitoring);
        }
        let previous = session
            .take()
            .map(|s| s.handle)
            .filter(|handle| !handle.is_finished());

        let source = self.inner.source.lock().clone();
        let tailer = Tailer::new(source.naming.clone(), self.inner.clock.clone());
        let (stop_tx, stop_rx) = watch::channel(false);

        tracing::info!(path = %tailer.state().file_path.display(), "monitoring started");
        let weak = Arc::downgrade(&self.inner);
        let handle = runtime.spawn(async move {
            if let Some(previous) = previous {
                tracing::debug!("waiting for previous poll loop to exit");
                if let Err(e) = previous.await {
                    tracing::error!(error = %e, "previous poll loop ended abnormally");
                }
            }
            poll_loop(weak, tailer, source, stop_rx).await;
        });
        *session = Some(Session { stop_tx, handle });
        Ok(())
    }

    /// Signal the running session to stop after its current cycle. Returns
    /// `false` if nothing was running. The loop may still be finishing when
    /// this returns; [`stop_and_wait`](Self::stop_and_wait) waits for it.
    pub fn stop(&self) -> bool {
        match self.inner.session.lock().as_ref() {
            Some(session) if session.is_running() => {
                let _ = session.stop_tx.send(true);
                true
            }
            _ => false,
        }
    }

    /// Like [`stop`](Self::stop), then wait for the loop to exit.
    pub async fn stop_and_wait(&self) {
        let session = self.inner.session.lock().take();
        if let Some(session) = session {
            let _ = session.stop_tx.send(true);
            if let Err(e) = session.handle.await {
                tracing::error!(error = %e, "poll loop ended abnormally");
            }
        }
    }

    /// `Monitoring` from `start` until `stop`; a session that has been told to
    /// stop reports `Idle` even while its last cycle finishes.
    pub fn state(&self) -> MonitorState {
        match self.inner.session.lock().as_ref() {
            Some(s) if s.is_running() => MonitorState::Monitoring,
            _ => MonitorState::Idle,
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.state() == MonitorState::Monitoring
    }

    /// Change the watched folder. Takes effect on the next `start`.
    pub fn set_folder(&self, folder: impl Into<PathBuf>) {
        let folder = folder.into();
        tracing::info!(folder = %folder.display(), "chat log folder changed");
        self.inner.source.lock().naming.folder = folder;
    }

    pub fn folder(&self) -> PathBuf {
        self.inner.source.lock().naming.folder.clone()
    }

    pub fn stats(&self) -> MonitorStats {
        let c = &self.inner.counters;
        MonitorStats {
            cycles: c.cycles.load(Ordering::Relaxed),
            fragments: c.fragments.load(Ordering::Relaxed),
            events: c.events.load(Ordering::Relaxed),
            faults: c.faults.load(Ordering::Relaxed),
        }
    }

    // -----------------------------------------------------------------------
    // Sinks
    // -----------------------------------------------------------------------

    pub fn add_sink(&self, sink: Arc<dyn Sink>) {
        self.inner.shared.lock().sinks.push(sink);
    }

    // -----------------------------------------------------------------------
    // Ingestion
    // -----------------------------------------------------------------------

    /// Run one decoded fragment through extraction, classification, storage
    /// and sink notification. Returns the unconsumed tail, if any.
    pub fn ingest(&self, fragment: &str) -> Option<String> {
        self.inner.ingest(fragment)
    }

    // -----------------------------------------------------------------------
    // Rule edits (each applied edit triggers a replay)
    // -----------------------------------------------------------------------

    pub fn add_word(&self, list: WordList, word: &str) -> RuleEdit {
        self.edit_rules(|rules| rules.add_word(list, word))
    }

    pub fn remove_word(&self, list: WordList, word: &str) -> RuleEdit {
        self.edit_rules(|rules| rules.remove_word(list, word))
    }

    pub fn set_channel_enabled(&self, channel: ChannelKind, enabled: bool) -> RuleEdit {
        self.edit_rules(|rules| rules.set_channel_enabled(channel, enabled))
    }

    /// Flip a channel toggle and replay. Returns the new value.
    pub fn toggle_channel(&self, channel: ChannelKind) -> bool {
        let mut shared = self.inner.shared.lock();
        let enabled = shared.rules.toggle_channel(channel);
        tracing::debug!(%channel, enabled, "channel toggled");
        shared.replay();
        enabled
    }

    /// Replace the whole rule set and replay.
    pub fn replace_rules(&self, rules: RuleSet) {
        let mut shared = self.inner.shared.lock();
        shared.rules = rules;
        shared.replay();
    }

    /// Toggle a noise prefix. Affects future extraction only; dropped noise was
    /// never stored, so there is nothing to replay. Returns `false` if the
    /// prefix is not configured.
    pub fn set_noise_suppressed(&self, prefix: &str, suppress: bool) -> bool {
        self.inner
            .shared
            .lock()
            .extractor
            .noise_mut()
            .set_suppressed(prefix, suppress)
    }

    fn edit_rules(&self, edit: impl FnOnce(&mut RuleSet) -> RuleEdit) -> RuleEdit {
        let mut shared = self.inner.shared.lock();
        let outcome = edit(&mut shared.rules);
        if outcome.changed() {
            shared.replay();
        } else {
            tracing::debug!(?outcome, "rule edit was a no-op");
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Re-send the whole store to every sink under the current rules.
    pub fn replay(&self) {
        self.inner.shared.lock().replay();
    }

    /// Drop all stored history and replay (an empty bracket) so sinks reset.
    pub fn clear_messages(&self) {
        let mut shared = self.inner.shared.lock();
        shared.store.clear();
        shared.replay();
    }

    pub fn rules(&self) -> RuleSet {
        self.inner.shared.lock().rules.clone()
    }

    pub fn snapshot(&self) -> Vec<RawEvent> {
        self.inner.shared.lock().store.snapshot()
    }

    /// Stored events containing `needle`, ignoring case.
    pub fn search(&self, needle: &str) -> Vec<RawEvent> {
        self.inner
            .shared
            .lock()
            .store
            .search(needle)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn noise_prefixes(&self) -> Vec<chatwatch_core::NoisePrefix> {
        self.inner.shared.lock().extractor.noise().prefixes().to_vec()
    }
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

/// The loop holds only a weak reference between cycles, so dropping every
/// [`Dispatcher`] handle closes the stop channel and ends the session.
async fn poll_loop(
    weak: Weak<Inner>,
    mut tailer: Tailer,
    source: SourceSettings,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut pending = String::new();
    let mut current_path = tailer.state().file_path.clone();

    loop {
        let stopped = *stop_rx.borrow();
        if stopped || stop_rx.has_changed().is_err() {
            break;
        }
        let Some(inner) = weak.upgrade() else {
            break;
        };
        inner.counters.cycles.fetch_add(1, Ordering::Relaxed);

        let saved = tailer.state().clone();
        let (returned, result) = match tokio::task::spawn_blocking(move || {
            let result = tailer.poll();
            (tailer, result)
        })
        .await
        {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(error = %e, "poll task failed, resuming from last position");
                inner.counters.faults.fetch_add(1, Ordering::Relaxed);
                let restored = Tailer::with_state(source.naming.clone(), inner.clock.clone(), saved);
                (restored, Ok(PollOutcome::NoChange))
            }
        };
        tailer = returned;

        // A fragment read after stop was requested is left for the next
        // session, which starts again from offset 0.
        let stopped = *stop_rx.borrow();
        if stopped || stop_rx.has_changed().is_err() {
            break;
        }

        if tailer.state().file_path != current_path {
            tracing::info!(path = %tailer.state().file_path.display(), "now tailing new day's log");
            current_path = tailer.state().file_path.clone();
            pending.clear();
        }

        match result {
            Ok(PollOutcome::Fragment(fragment)) => {
                inner.counters.fragments.fetch_add(1, Ordering::Relaxed);
                let text = if pending.is_empty() {
                    fragment.text
                } else {
                    std::mem::take(&mut pending) + &fragment.text
                };
                let remainder = inner.ingest(&text);
                if source.carry_partial_pairs {
                    pending = remainder.unwrap_or_default();
                }
            }
            Ok(PollOutcome::NoChange) => {}
            Ok(PollOutcome::NotFound) => {
                tracing::trace!(path = %current_path.display(), "chat log not present yet");
            }
            Err(e) => {
                inner.counters.faults.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "poll cycle failed");
            }
        }
        drop(inner);

        tokio::select! {
            _ = tokio::time::sleep(source.poll_interval) => {}
            _ = stop_rx.changed() => {}
        }
    }

    tracing::info!("monitoring stopped");
}
