//! One schema entry.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ExtractionMode;

/// How many instances a per-count entry expands into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCount", into = "RawCount")]
pub enum Count {
    /// Indices `0..n`.
    Fixed(u32),
    /// The schema's `min_level..=max_level`.
    LevelRange,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawCount {
    Fixed(u32),
    Named(String),
}

impl TryFrom<RawCount> for Count {
    type Error = String;

    fn try_from(raw: RawCount) -> Result<Self, Self::Error> {
        match raw {
            RawCount::Fixed(n) => Ok(Count::Fixed(n)),
            RawCount::Named(s) if s.eq_ignore_ascii_case("level_range") => Ok(Count::LevelRange),
            RawCount::Named(s) => Err(format!("unrecognized count '{s}'")),
        }
    }
}

impl From<Count> for RawCount {
    fn from(count: Count) -> Self {
        match count {
            Count::Fixed(n) => RawCount::Fixed(n),
            Count::LevelRange => RawCount::Named("level_range".into()),
        }
    }
}

/// Which extraction modes an entry is enabled for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Enabled {
    /// All modes or none.
    Flag(bool),
    /// Only the listed modes.
    Modes(Vec<ExtractionMode>),
}

impl Default for Enabled {
    fn default() -> Self {
        Enabled::Flag(true)
    }
}

impl Enabled {
    #[must_use]
    pub fn includes(&self, mode: ExtractionMode) -> bool {
        match self {
            Enabled::Flag(flag) => *flag,
            Enabled::Modes(modes) => modes.contains(&mode),
        }
    }
}

/// Which count-filter strategy per-count instances use.
///
/// Table and filter names refer to lookups supplied to the loader, since a
/// schema file cannot carry closures or game-computed tables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum CountFilterConfig {
    /// Numeric field equals the count index.
    Level {
        #[serde(default = "default_level_key")]
        key: String,
    },
    /// Field mapped through a named table equals the count index.
    Mapped { key: String, table: String },
    /// User id mapped through a named table equals the count index.
    User { table: String },
    /// A named custom predicate.
    Named { name: String },
}

fn default_level_key() -> String {
    "level".into()
}

impl Default for CountFilterConfig {
    fn default() -> Self {
        CountFilterConfig::Level {
            key: default_level_key(),
        }
    }
}

/// Configuration of one feature or detector entry.
///
/// Keys the core does not interpret are kept in `args` for the
/// extractor's factory.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Catalog key of the implementation; defaults to the entry name.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub extractor_type: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub enabled: Enabled,

    /// Required for per-count entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Count>,

    /// Required for per-count entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Count filter for per-count entries; level matching when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per: Option<CountFilterConfig>,

    #[serde(flatten)]
    pub args: IndexMap<String, Value>,
}

impl ExtractorConfig {
    /// Entry backed by the catalog type `extractor_type`.
    pub fn new(extractor_type: impl Into<String>) -> Self {
        Self {
            extractor_type: Some(extractor_type.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: Enabled) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_count(mut self, count: Count) -> Self {
        self.count = Some(count);
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, per: CountFilterConfig) -> Self {
        self.per = Some(per);
        self
    }

    /// Add an extractor-specific argument (builder pattern).
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Catalog key, falling back to the entry name.
    #[must_use]
    pub fn type_name<'a>(&'a self, entry_name: &'a str) -> &'a str {
        self.extractor_type.as_deref().unwrap_or(entry_name)
    }
}
