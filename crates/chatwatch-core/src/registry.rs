//! Channel registry: maps message colours to [`ChannelKind`].
//!
//! The game client encodes the channel of each chat line only in the colour
//! attribute of the message span. [`ChannelRegistry::standard`] builds the
//! table from the compile-time [`STANDARD_COLORS`] map; custom registries can
//! be assembled with [`ChannelRegistry::with_entries`] for tests or other
//! clients. Either way the registry is built once and then shared read-only.

use crate::types::{ChannelKind, ColorKey};
use std::collections::HashMap;

/// Colour → channel table written by the client. Two legacy colours both
/// denote the general channel.
pub static STANDARD_COLORS: phf::Map<&'static str, ChannelKind> = phf::phf_map! {
    "#c8ffc8" => ChannelKind::General,
    "#ffffff" => ChannelKind::General,
    "#64ff64" => ChannelKind::Whisper,
    "#f7b73c" => ChannelKind::Team,
    "#94ddfa" => ChannelKind::Club,
    "#ff64ff" => ChannelKind::System,
    "#c896c8" => ChannelKind::Shout,
};

/// Immutable colour → channel lookup.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    by_color: HashMap<ColorKey, ChannelKind>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ChannelRegistry {
    /// The client's built-in colour table.
    pub fn standard() -> Self {
        Self::with_entries(
            STANDARD_COLORS
                .entries()
                .map(|(color, kind)| (*color, *kind)),
        )
    }

    /// Build a registry from arbitrary `(colour, channel)` pairs. Colours that
    /// do not normalise to `#rrggbb` are ignored.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, ChannelKind)>) -> Self {
        let by_color = entries
            .into_iter()
            .filter_map(|(color, kind)| ColorKey::parse(color).map(|key| (key, kind)))
            .collect();
        Self { by_color }
    }

    /// Channel for an already-normalised key.
    pub fn lookup(&self, color: &ColorKey) -> Option<ChannelKind> {
        self.by_color.get(color).copied()
    }

    /// Normalise a raw colour attribute and look it up.
    pub fn lookup_raw(&self, raw: &str) -> Option<ChannelKind> {
        ColorKey::parse(raw).and_then(|key| self.lookup(&key))
    }

    /// All colours mapped to `kind`, sorted.
    pub fn colors_for(&self, kind: ChannelKind) -> Vec<&ColorKey> {
        let mut colors: Vec<&ColorKey> = self
            .by_color
            .iter()
            .filter(|(_, k)| **k == kind)
            .map(|(color, _)| color)
            .collect();
        colors.sort();
        colors
    }

    /// Channels in canonical order. The order is fixed and independent of
    /// which colours are registered.
    pub fn channel_order(&self) -> &'static [ChannelKind] {
        &ChannelKind::ALL
    }

    pub fn len(&self) -> usize {
        self.by_color.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_color.is_empty()
    }
}
