//! Event extractor: recovers `(timestamp, colour, text)` triples from the
//! client's markup and turns them into [`RawEvent`] values.
//!
//! The chat log is a stream of `<font>` spans. The client always writes a
//! timestamp span immediately followed by a coloured message span, so the
//! extractor pairs spans positionally: span `2i` is the timestamp and span
//! `2i + 1` the message. Nothing else about the document structure is parsed.
//!
//! Extraction never fails. A pair with a missing colour or an empty message is
//! skipped on its own; the rest of the fragment is still processed.
//!
//! # Fragment boundaries
//!
//! A trailing unpaired span is discarded by [`EventExtractor::extract`]. Callers
//! that want split pairs recovered use [`EventExtractor::extract_detailed`] and
//! prepend [`Extraction::remainder`] to the next fragment.

use crate::registry::ChannelRegistry;
use crate::types::RawEvent;
use quick_xml::escape::unescape_with;
use regex::Regex;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::{Arc, LazyLock};

/// Upper bound on a carried remainder. A tail longer than this is dropped
/// instead of being carried forward again.
pub const MAX_REMAINDER_BYTES: usize = 64 * 1024;

static SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<font\b([^>]*)>(.*?)</font\s*>").expect("span regex is valid")
});

static OPEN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<font\b").expect("open tag regex is valid"));

static COLOR_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bcolor\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("color attribute regex is valid")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"));


// ---------------------------------------------------------------------------
// Noise filter
// ---------------------------------------------------------------------------

/// One system-notice prefix, e.g. the experience-gain line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NoisePrefix {
    pub prefix: String,
    /// Human label for settings UIs.
    #[serde(default)]
    pub label: String,
    /// When `true`, messages starting with `prefix` are dropped.
    #[serde(default = "default_suppress")]
    pub suppress: bool,
}

fn default_suppress() -> bool {
    true
}

impl NoisePrefix {
    pub fn new(prefix: impl Into<String>, label: impl Into<String>, suppress: bool) -> Self {
        Self {
            prefix: prefix.into(),
            label: label.into(),
            suppress,
        }
    }
}

/// Set of noise prefixes with per-prefix toggles.
///
/// Noise filtering runs before channel mapping and rule evaluation and is
/// independent of NG/SP words. Dropped lines never reach the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoiseFilter {
    prefixes: Vec<NoisePrefix>,
}

impl NoiseFilter {
    pub fn new(prefixes: Vec<NoisePrefix>) -> Self {
        Self { prefixes }
    }

    /// The client's system notices (experience, rune experience, ELSO and pet
    /// gains), all suppressed.
    pub fn standard() -> Self {
        Self::new(vec![
            NoisePrefix::new("経験値が", "取得経験値", true),
            NoisePrefix::new("ルーン経験値が", "取得ルーン経験値", true),
            NoisePrefix::new("[ELSO", "取得ELSO", true),
            NoisePrefix::new("ペットが", "ペット取得", true),
        ])
    }

    /// Whether `text` starts with a suppressed prefix.
    pub fn is_noise(&self, text: &str) -> bool {
        self.prefixes
            .iter()
            .any(|p| p.suppress && !p.prefix.is_empty() && text.starts_with(&p.prefix))
    }

    /// Flip the toggle for an existing prefix. Returns `false` if the prefix is
    /// not configured.
    pub fn set_suppressed(&mut self, prefix: &str, suppress: bool) -> bool {
        match self.prefixes.iter_mut().find(|p| p.prefix == prefix) {
            Some(entry) => {
                entry.suppress = suppress;
                true
            }
            None => false,
        }
    }

    pub fn prefixes(&self) -> &[NoisePrefix] {
        &self.prefixes
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Per-fragment counters, logged at trace level by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub spans: usize,
    pub pairs: usize,
    pub noise: usize,
    pub malformed: usize,
    pub unknown_color: usize,
}

/// Result of [`EventExtractor::extract_detailed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub events: Vec<RawEvent>,
    /// Unconsumed tail starting at the first unpaired or unterminated span,
    /// if any. Always a suffix of the input fragment.
    pub remainder: Option<String>,
    pub stats: ExtractStats,
}

/// Converts markup fragments into [`RawEvent`]s.
#[derive(Debug, Clone)]
pub struct EventExtractor {
    registry: Arc<ChannelRegistry>,
    noise: NoiseFilter,
}

struct Span<'a> {
    start: usize,
    end: usize,
    attrs: &'a str,
    inner: &'a str,
}

impl EventExtractor {
    pub fn new(registry: Arc<ChannelRegistry>, noise: NoiseFilter) -> Self {
        Self { registry, noise }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn noise(&self) -> &NoiseFilter {
        &self.noise
    }

    pub fn noise_mut(&mut self) -> &mut NoiseFilter {
        &mut self.noise
    }

    /// Extract every complete pair in `fragment`, in source order. A trailing
    /// unpaired span is dropped.
    pub fn extract(&self, fragment: &str) -> Vec<RawEvent> {
        self.extract_detailed(fragment).events
    }

    /// Like [`extract`](Self::extract), additionally reporting the unconsumed
    /// tail and per-fragment counters.
    pub fn extract_detailed(&self, fragment: &str) -> Extraction {
        let spans: Vec<Span<'_>> = SPAN_RE
            .captures_iter(fragment)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(Span {
                    start: whole.start(),
                    end: whole.end(),
                    attrs: caps.get(1).map_or("", |m| m.as_str()),
                    inner: caps.get(2).map_or("", |m| m.as_str()),
                })
            })
            .collect();

        let mut stats = ExtractStats {
            spans: spans.len(),
            ..ExtractStats::default()
        };
        let mut events = Vec::with_capacity(spans.len() / 2);

        for pair in spans.chunks_exact(2) {
            stats.pairs += 1;
            let (time_span, chat_span) = (&pair[0], &pair[1]);

            let timestamp = inner_text(time_span.inner);
            let text = inner_text(chat_span.inner);

            if self.noise.is_noise(&text) {
                stats.noise += 1;
                continue;
            }

            let Some(color) = color_attr(chat_span.attrs) else {
                tracing::trace!(span = chat_span.inner, "message span without colour, skipped");
                stats.malformed += 1;
                continue;
            };
            if text.is_empty() {
                tracing::trace!(%timestamp, "empty message span, skipped");
                stats.malformed += 1;
                continue;
            }

            match self.registry.lookup_raw(color) {
                Some(channel) => events.push(RawEvent {
                    channel,
                    timestamp,
                    text,
                }),
                None => {
                    tracing::trace!(color, "colour not in registry, skipped");
                    stats.unknown_color += 1;
                }
            }
        }

        let remainder = remainder_start(fragment, &spans)
            .map(|start| fragment[start..].to_string())
            .filter(|tail| {
                let fits = tail.len() <= MAX_REMAINDER_BYTES;
                if !fits {
                    tracing::debug!(bytes = tail.len(), "unpaired tail too large, dropped");
                }
                fits
            });

        Extraction {
            events,
            remainder,
            stats,
        }
    }
}

/// Byte offset where the unconsumed tail begins: the orphaned last span when
/// the span count is odd, otherwise the earlier of any unterminated `<font`
/// after the last complete span and a trailing `<` whose tag never closes
/// (a read can end inside the opener itself, e.g. `<fo`).
fn remainder_start(fragment: &str, spans: &[Span<'_>]) -> Option<usize> {
    if spans.len() % 2 == 1 {
        return spans.last().map(|span| span.start);
    }
    let search_from = spans.last().map_or(0, |span| span.end);
    let open_tag = OPEN_TAG_RE
        .find_at(fragment, search_from)
        .map(|m| m.start());
    let tail = &fragment[search_from..];
    let open_bracket = tail
        .rfind('<')
        .filter(|&at| !tail[at..].contains('>'))
        .map(|at| search_from + at);
    match (open_tag, open_bracket) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// Raw (un-normalised) colour attribute value, if present and non-empty.
fn color_attr(attrs: &str) -> Option<&str> {
    let caps = COLOR_ATTR_RE.captures(attrs)?;
    let value = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str()
        .trim();
    (!value.is_empty()).then_some(value)
}

/// Text content of a span: nested tags removed, character references decoded,
/// surrounding whitespace trimmed. Text with an unknown or unterminated
/// reference is kept as written.
fn inner_text(inner: &str) -> String {
    let stripped = TAG_RE.replace_all(inner, "");
    let decoded = match unescape_with(&stripped, resolve_entity) {
        Ok(text) => text,
        Err(e) => {
            tracing::trace!(error = %e, "character reference left undecoded");
            Cow::Borrowed(&*stripped)
        }
    };
    decoded.trim().to_string()
}

/// Named references the client emits. Numeric ones are handled by
/// `quick_xml` itself.
fn resolve_entity(name: &str) -> Option<&'static str> {
    match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        "nbsp" => Some("\u{a0}"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
