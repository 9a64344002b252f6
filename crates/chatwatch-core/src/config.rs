//! Configuration types for chatwatch.
//!
//! [`Config::load`] reads `~/.config/chatwatch/config.toml`, creating it with
//! hardcoded defaults if it does not yet exist. [`Config::defaults`] returns
//! the same defaults without touching the filesystem (useful in tests).
//!
//! The core only reads configuration. Writing user edits back is the settings
//! layer's job.

use crate::error::Error;
use crate::extract::{NoiseFilter, NoisePrefix};
use crate::rules::RuleSet;
use crate::store::MessageStore;
use crate::types::ChannelKind;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[source]
folder              = 'C:\Nexon\TalesWeaver\ChatLog'
file_prefix         = "TWChatLog"
file_extension      = "html"
poll_interval_ms    = 1000
carry_partial_pairs = false

[store]
high_water  = 5000
evict_batch = 100

[rules]
ng_words = []
sp_words = []

[rules.channels]
general = true
whisper = true
team    = true
club    = true
system  = true
shout   = true

[[noise]]
prefix   = "経験値が"
label    = "取得経験値"
suppress = true

[[noise]]
prefix   = "ルーン経験値が"
label    = "取得ルーン経験値"
suppress = true

[[noise]]
prefix   = "[ELSO"
label    = "取得ELSO"
suppress = true

[[noise]]
prefix   = "ペットが"
label    = "ペット取得"
suppress = true
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration, loaded from `~/.config/chatwatch/config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default = "default_noise")]
    pub noise: Vec<NoisePrefix>,
}

/// `[source]` section: where the chat log lives and how often to poll it.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_folder")]
    pub folder: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Carry an unpaired trailing span into the next poll instead of dropping it.
    #[serde(default)]
    pub carry_partial_pairs: bool,
}

fn default_folder() -> PathBuf { PathBuf::from(r"C:\Nexon\TalesWeaver\ChatLog") }
fn default_file_prefix() -> String { "TWChatLog".to_string() }
fn default_file_extension() -> String { "html".to_string() }
fn default_poll_interval_ms() -> u64 { 1000 }

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            folder: default_folder(),
            file_prefix: default_file_prefix(),
            file_extension: default_file_extension(),
            poll_interval_ms: default_poll_interval_ms(),
            carry_partial_pairs: false,
        }
    }
}

impl SourceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_high_water")]
    pub high_water: usize,
    #[serde(default = "default_evict_batch")]
    pub evict_batch: usize,
}

fn default_high_water() -> usize { crate::store::DEFAULT_HIGH_WATER }
fn default_evict_batch() -> usize { crate::store::DEFAULT_EVICT_BATCH }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            high_water: default_high_water(),
            evict_batch: default_evict_batch(),
        }
    }
}

impl StoreConfig {
    pub fn build(&self) -> MessageStore {
        MessageStore::new(self.high_water, self.evict_batch)
    }
}

/// `[rules]` section. Channel keys are the lowercase channel names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub ng_words: Vec<String>,
    #[serde(default)]
    pub sp_words: Vec<String>,
    #[serde(default)]
    pub channels: BTreeMap<String, bool>,
}

impl RulesConfig {
    /// Build the initial [`RuleSet`]. Unknown channel names are rejected.
    pub fn build(&self) -> Result<RuleSet, Error> {
        let channels = self
            .channels
            .iter()
            .map(|(name, enabled)| {
                ChannelKind::from_name(name)
                    .map(|kind| (kind, *enabled))
                    .ok_or_else(|| Error::Config(format!("unknown channel {name:?} in [rules.channels]")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RuleSet::new(&self.ng_words, &self.sp_words, channels))
    }
}

fn default_noise() -> Vec<NoisePrefix> {
    NoiseFilter::standard().prefixes().to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load from `~/.config/chatwatch/config.toml`, layered on top of the
    /// built-in defaults. Creates the file with defaults if it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, DEFAULT_CONFIG.trim_start())?;
        }

        Self::from_file(&path)
    }

    /// Layer a specific file over the built-in defaults. The file must exist.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path).required(true))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Parse a TOML document layered over the built-in defaults.
    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(Into::into)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    pub fn noise_filter(&self) -> NoiseFilter {
        NoiseFilter::new(self.noise.clone())
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("chatwatch")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_load() {
        let cfg = Config::defaults();
        assert_eq!(cfg.source.file_prefix, "TWChatLog");
        assert_eq!(cfg.source.file_extension, "html");
        assert_eq!(cfg.source.poll_interval(), Duration::from_secs(1));
        assert!(!cfg.source.carry_partial_pairs);
        assert_eq!(cfg.store.high_water, 5000);
        assert_eq!(cfg.store.evict_batch, 100);
        assert_eq!(cfg.noise.len(), 4);
        assert!(cfg.noise.iter().all(|n| n.suppress));
    }

    #[test]
    fn default_rules_show_every_channel() {
        let rules = Config::defaults().rules.build().unwrap();
        assert!(rules.channels().all(|(_, on)| on));
        assert_eq!(rules.ng_words().count(), 0);
    }

    #[test]
    fn user_toml_overrides_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [source]
            folder = "/tmp/chat"

            [rules]
            ng_words = ["spam", "spam", "  "]
            sp_words = ["boss"]

            [rules.channels]
            shout = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.source.folder, PathBuf::from("/tmp/chat"));
        assert_eq!(cfg.source.file_prefix, "TWChatLog");

        let rules = cfg.rules.build().unwrap();
        assert_eq!(rules.ng_words().collect::<Vec<_>>(), vec!["spam"]);
        assert_eq!(rules.sp_words().collect::<Vec<_>>(), vec!["boss"]);
        assert!(!rules.channel_enabled(ChannelKind::Shout));
        assert!(rules.channel_enabled(ChannelKind::General));
    }

    #[test]
    fn unknown_channel_is_a_config_error() {
        let cfg = Config::from_toml_str("[rules.channels]\nguild = false\n").unwrap();
        assert!(matches!(cfg.rules.build(), Err(Error::Config(_))));
    }

    #[test]
    fn noise_entries_can_be_replaced() {
        let cfg = Config::from_toml_str(
            r#"
            [[noise]]
            prefix = "経験値が"
            suppress = false
            "#,
        )
        .unwrap();
        let filter = cfg.noise_filter();
        assert_eq!(filter.prefixes().len(), 1);
        assert!(!filter.is_noise("経験値が増加した"));
    }
}
