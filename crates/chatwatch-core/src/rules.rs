//! Rule engine: NG (suppress) words, SP (force-show) words and per-channel
//! visibility.
//!
//! [`classify`] is a pure function of the event and the current [`RuleSet`].
//! There is no per-event memo, so re-running it over stored history after a
//! rule edit always agrees with classifying the same events from scratch.
//!
//! Precedence, highest first:
//!
//! 1. any SP word is a substring of the text → [`Disposition::ForcedVisible`]
//! 2. any NG word is a substring of the text → [`Disposition::Suppressed`]
//! 3. otherwise → [`Disposition::ChannelGated`] with the channel's toggle
//!
//! Matching is case-sensitive and unanchored. A word present in both lists
//! therefore always forces the message visible.

use crate::types::{ChannelKind, Disposition, RawEvent};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of a word-list or toggle edit. Edits never fail; no-ops are
/// reported so callers can tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleEdit {
    /// The rule set changed.
    Applied,
    /// Add of a word already in the list, or a toggle to its current value.
    AlreadyPresent,
    /// Remove of a word that is not in the list.
    NotPresent,
    /// The word was empty after trimming.
    Rejected,
}

impl RuleEdit {
    pub fn changed(self) -> bool {
        self == RuleEdit::Applied
    }
}

/// Which word list an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordList {
    Ng,
    Sp,
}

impl std::fmt::Display for WordList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WordList::Ng => write!(f, "NG"),
            WordList::Sp => write!(f, "SP"),
        }
    }
}

/// Mutable filter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    ng_words: BTreeSet<String>,
    sp_words: BTreeSet<String>,
    channel_enabled: BTreeMap<ChannelKind, bool>,
}

impl Default for RuleSet {
    /// No words, every channel visible.
    fn default() -> Self {
        Self {
            ng_words: BTreeSet::new(),
            sp_words: BTreeSet::new(),
            channel_enabled: ChannelKind::ALL.into_iter().map(|k| (k, true)).collect(),
        }
    }
}

impl RuleSet {
    /// Build a rule set from configured lists. Blank words are ignored; missing
    /// channels default to visible.
    pub fn new<I, J>(ng_words: I, sp_words: J, channels: impl IntoIterator<Item = (ChannelKind, bool)>) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        J: IntoIterator,
        J::Item: AsRef<str>,
    {
        let mut rules = RuleSet::default();
        for word in ng_words {
            rules.add_word(WordList::Ng, word.as_ref());
        }
        for word in sp_words {
            rules.add_word(WordList::Sp, word.as_ref());
        }
        for (kind, enabled) in channels {
            rules.channel_enabled.insert(kind, enabled);
        }
        rules
    }

    pub fn ng_words(&self) -> impl Iterator<Item = &str> {
        self.ng_words.iter().map(String::as_str)
    }

    pub fn sp_words(&self) -> impl Iterator<Item = &str> {
        self.sp_words.iter().map(String::as_str)
    }

    pub fn words(&self, list: WordList) -> impl Iterator<Item = &str> {
        self.list(list).iter().map(String::as_str)
    }

    pub fn contains_word(&self, list: WordList, word: &str) -> bool {
        self.list(list).contains(word.trim())
    }

    /// Add a trimmed word. Adding a duplicate is a no-op.
    pub fn add_word(&mut self, list: WordList, word: &str) -> RuleEdit {
        let word = word.trim();
        if word.is_empty() {
            return RuleEdit::Rejected;
        }
        if self.list_mut(list).insert(word.to_string()) {
            RuleEdit::Applied
        } else {
            RuleEdit::AlreadyPresent
        }
    }

    /// Remove a word. Removing an absent word is a no-op.
    pub fn remove_word(&mut self, list: WordList, word: &str) -> RuleEdit {
        let word = word.trim();
        if word.is_empty() {
            return RuleEdit::Rejected;
        }
        if self.list_mut(list).remove(word) {
            RuleEdit::Applied
        } else {
            RuleEdit::NotPresent
        }
    }

    /// Whether `channel` is shown when no word rule applies. Unknown entries
    /// default to visible.
    pub fn channel_enabled(&self, channel: ChannelKind) -> bool {
        self.channel_enabled.get(&channel).copied().unwrap_or(true)
    }

    pub fn set_channel_enabled(&mut self, channel: ChannelKind, enabled: bool) -> RuleEdit {
        if self.channel_enabled(channel) == enabled {
            return RuleEdit::AlreadyPresent;
        }
        self.channel_enabled.insert(channel, enabled);
        RuleEdit::Applied
    }

    /// Flip a channel toggle, returning the new value.
    pub fn toggle_channel(&mut self, channel: ChannelKind) -> bool {
        let enabled = !self.channel_enabled(channel);
        self.channel_enabled.insert(channel, enabled);
        enabled
    }

    /// Channel toggles in canonical order.
    pub fn channels(&self) -> impl Iterator<Item = (ChannelKind, bool)> + '_ {
        ChannelKind::ALL
            .into_iter()
            .map(|kind| (kind, self.channel_enabled(kind)))
    }

    fn list(&self, list: WordList) -> &BTreeSet<String> {
        match list {
            WordList::Ng => &self.ng_words,
            WordList::Sp => &self.sp_words,
        }
    }

    fn list_mut(&mut self, list: WordList) -> &mut BTreeSet<String> {
        match list {
            WordList::Ng => &mut self.ng_words,
            WordList::Sp => &mut self.sp_words,
        }
    }
}

/// Decide how `event` should be displayed under `rules`.
pub fn classify(event: &RawEvent, rules: &RuleSet) -> Disposition {
    if rules.sp_words.iter().any(|w| event.text.contains(w.as_str())) {
        return Disposition::ForcedVisible;
    }
    if rules.ng_words.iter().any(|w| event.text.contains(w.as_str())) {
        return Disposition::Suppressed;
    }
    Disposition::ChannelGated {
        visible: rules.channel_enabled(event.channel),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn event(text: &str) -> RawEvent {
        RawEvent::new(ChannelKind::General, "00:00:00", text)
    }

    #[rstest]
    #[case::ng_only(&["spam"], &[], "this is spam", Disposition::Suppressed)]
    #[case::sp_beats_ng(&["spam"], &["spam offer"], "spam offer today", Disposition::ForcedVisible)]
    #[case::same_word_both_lists(&["sale"], &["sale"], "big sale", Disposition::ForcedVisible)]
    #[case::case_sensitive(&["Spam"], &[], "spam", Disposition::ChannelGated { visible: true })]
    #[case::no_words(&[], &[], "hello", Disposition::ChannelGated { visible: true })]
    fn classification(
        #[case] ng: &[&str],
        #[case] sp: &[&str],
        #[case] text: &str,
        #[case] expected: Disposition,
    ) {
        let rules = RuleSet::new(ng.iter().copied(), sp.iter().copied(), []);
        assert_eq!(classify(&event(text), &rules), expected);
    }

    #[test]
    fn sp_overrides_disabled_channel() {
        let rules = RuleSet::new(Vec::<&str>::new(), ["guild war"], [(ChannelKind::General, false)]);
        assert_eq!(
            classify(&event("guild war at 9"), &rules),
            Disposition::ForcedVisible
        );
        assert_eq!(
            classify(&event("hello"), &rules),
            Disposition::ChannelGated { visible: false }
        );
    }

    #[test]
    fn add_and_remove_are_idempotent() {
        let mut rules = RuleSet::default();
        assert_eq!(rules.add_word(WordList::Ng, "spam"), RuleEdit::Applied);
        assert_eq!(rules.add_word(WordList::Ng, " spam "), RuleEdit::AlreadyPresent);
        assert_eq!(rules.ng_words().count(), 1);
        assert_eq!(rules.remove_word(WordList::Ng, "spam"), RuleEdit::Applied);
        assert_eq!(rules.remove_word(WordList::Ng, "spam"), RuleEdit::NotPresent);
        assert_eq!(rules.add_word(WordList::Sp, "   "), RuleEdit::Rejected);
    }

    #[test]
    fn channel_toggles_default_to_visible() {
        let mut rules = RuleSet::default();
        assert!(rules.channels().all(|(_, on)| on));
        assert_eq!(
            rules.set_channel_enabled(ChannelKind::Shout, true),
            RuleEdit::AlreadyPresent
        );
        assert!(!rules.toggle_channel(ChannelKind::Shout));
        assert!(!rules.channel_enabled(ChannelKind::Shout));
        assert!(rules.toggle_channel(ChannelKind::Shout));
    }
}
