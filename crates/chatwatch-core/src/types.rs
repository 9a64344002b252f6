//! Core types for chatwatch-core.
//!
//! This module defines the fundamental data structures shared across the
//! pipeline: the extracted [`RawEvent`], its [`ChannelKind`], the normalised
//! [`ColorKey`] used to look channels up, and the [`Disposition`] computed by
//! the rule engine.

use serde::{Deserialize, Serialize};

/// A single chat line recovered from the source markup.
///
/// Produced once per extracted timestamp/message pair and never mutated
/// afterwards. Whether it is shown is decided at view time by
/// [`classify`](crate::rules::classify), not stored on the event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RawEvent {
    /// Channel the line was posted to, derived from the message colour.
    pub channel: ChannelKind,
    /// Timestamp exactly as the client wrote it. Display-only; never parsed.
    pub timestamp: String,
    /// Trimmed message text.
    pub text: String,
}

impl RawEvent {
    pub fn new(channel: ChannelKind, timestamp: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel,
            timestamp: timestamp.into(),
            text: text.into(),
        }
    }
}

/// Chat channel category. The set is closed and fixed at compile time.
///
/// Variant order is the canonical display order (see [`ChannelKind::ALL`]).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    General,
    Whisper,
    Team,
    Club,
    System,
    Shout,
}

impl ChannelKind {
    /// Every channel in canonical order.
    pub const ALL: [ChannelKind; 6] = [
        ChannelKind::General,
        ChannelKind::Whisper,
        ChannelKind::Team,
        ChannelKind::Club,
        ChannelKind::System,
        ChannelKind::Shout,
    ];

    /// Label the game client itself uses for the channel.
    pub fn label(self) -> &'static str {
        match self {
            ChannelKind::General => "一般",
            ChannelKind::Whisper => "耳打ち",
            ChannelKind::Team => "チーム",
            ChannelKind::Club => "クラブ",
            ChannelKind::System => "システム",
            ChannelKind::Shout => "叫ぶ",
        }
    }

    /// Suggested foreground colour for sinks that render the channel.
    pub fn display_color(self) -> &'static str {
        match self {
            ChannelKind::General => "white",
            ChannelKind::Whisper => "green",
            ChannelKind::Team => "orange",
            ChannelKind::Club => "cyan",
            ChannelKind::System => "#FFD56B",
            ChannelKind::Shout => "violet",
        }
    }

    /// Look a channel up by its lowercase config name (`"general"`, …).
    pub fn from_name(name: &str) -> Option<ChannelKind> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.to_string().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::General => write!(f, "general"),
            ChannelKind::Whisper => write!(f, "whisper"),
            ChannelKind::Team => write!(f, "team"),
            ChannelKind::Club => write!(f, "club"),
            ChannelKind::System => write!(f, "system"),
            ChannelKind::Shout => write!(f, "shout"),
        }
    }
}

/// A colour attribute normalised to lowercase `#rrggbb` form.
///
/// Several colours may map to the same [`ChannelKind`]; the key itself carries
/// no channel information.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorKey(String);

impl ColorKey {
    /// Normalise a raw attribute value. Surrounding whitespace and quotes are
    /// stripped, a missing `#` is added and hex digits are lowercased.
    ///
    /// Returns `None` unless the result is exactly `#` followed by six hex
    /// digits.
    pub fn parse(raw: &str) -> Option<ColorKey> {
        let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'');
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(ColorKey(format!("#{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ColorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of classifying one [`RawEvent`] against the current rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Disposition {
    /// The text contains an SP word. Shown regardless of NG words or channel
    /// visibility.
    ForcedVisible,
    /// The text contains an NG word and no SP word.
    Suppressed,
    /// Neither list matched; visibility follows the channel toggle.
    ChannelGated { visible: bool },
}

impl Disposition {
    /// Whether a sink should display the event.
    pub fn is_visible(self) -> bool {
        match self {
            Disposition::ForcedVisible => true,
            Disposition::Suppressed => false,
            Disposition::ChannelGated { visible } => visible,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
