//! Component frequency tables
//!
//! One corpus scan fills up to five tables (prefix, base word, suffix, shift
//! pattern, leet pattern). The tables are persisted as a single count
//! dictionary per country so distributions can be rebuilt without rescanning.

mod aggregator;
mod store;

pub use aggregator::{
    collect_corpus_files, CountAccumulator, CountAggregator, ShiftLabelPolicy, ALL_CAP_LABEL,
};
pub use store::{CountStore, COUNT_DICT_FILENAME, MODEL_SIZE_FILENAME};

use crate::error::ModelError;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which structural component a table counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Leading non-letter run
    Prefix,
    /// Case-folded, de-leeted base word
    BaseWord,
    /// Trailing non-letter run
    Suffix,
    /// Capitalization pattern of the base word
    ShiftPattern,
    /// Leet substitutions in the base word
    LeetPattern,
}

impl ComponentKind {
    pub fn all() -> &'static [ComponentKind] {
        &[
            ComponentKind::Prefix,
            ComponentKind::BaseWord,
            ComponentKind::Suffix,
            ComponentKind::ShiftPattern,
            ComponentKind::LeetPattern,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Prefix => "prefix",
            ComponentKind::BaseWord => "base_word",
            ComponentKind::Suffix => "suffix",
            ComponentKind::ShiftPattern => "shift_pattern",
            ComponentKind::LeetPattern => "leet_pattern",
        }
    }

    /// Name of the table in the persisted count dictionary.
    pub fn table_name(&self) -> &'static str {
        match self {
            ComponentKind::Prefix => "prefix_count",
            ComponentKind::BaseWord => "base_word_count",
            ComponentKind::Suffix => "suffix_count",
            ComponentKind::ShiftPattern => "shift_pattern_count",
            ComponentKind::LeetPattern => "leet_pattern_count",
        }
    }

    /// Stable 1-based position, used in distribution file names (`a1`..`a5`).
    pub fn index(&self) -> usize {
        match self {
            ComponentKind::Prefix => 1,
            ComponentKind::BaseWord => 2,
            ComponentKind::Suffix => 3,
            ComponentKind::ShiftPattern => 4,
            ComponentKind::LeetPattern => 5,
        }
    }

    pub fn from_table_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.table_name() == name)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ComponentKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|k| k.name() == normalized || k.table_name() == normalized)
            .ok_or_else(|| ModelError::UnknownComponent(s.to_string()))
    }
}

/// The set of component tables a scan should fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSet {
    enabled: [bool; 5],
}

impl ComponentSet {
    pub fn all() -> Self {
        Self { enabled: [true; 5] }
    }

    pub fn none() -> Self {
        Self {
            enabled: [false; 5],
        }
    }

    pub fn only(kinds: &[ComponentKind]) -> Self {
        let mut set = Self::none();
        for kind in kinds {
            set.enabled[kind.index() - 1] = true;
        }
        set
    }

    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.enabled[kind.index() - 1]
    }

    pub fn is_empty(&self) -> bool {
        !self.enabled.iter().any(|e| *e)
    }

    /// Enabled kinds in table order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        ComponentKind::all()
            .iter()
            .copied()
            .filter(|k| self.contains(*k))
    }
}

impl Default for ComponentSet {
    fn default() -> Self {
        Self::all()
    }
}

/// Occurrence counts per component key. Present keys always have a count >= 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    counts: FxHashMap<String, u64>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: &str) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: &str, count: u64) {
        if count == 0 {
            return;
        }
        if let Some(existing) = self.counts.get_mut(key) {
            *existing += count;
        } else {
            self.counts.insert(key.to_string(), count);
        }
    }

    /// Count for `key` (0 when absent).
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Drop keys with a zero count. Returns how many were removed.
    ///
    /// Only deserialized tables can hold them; `add` never inserts one.
    pub fn remove_zero_counts(&mut self) -> usize {
        let before = self.counts.len();
        self.counts.retain(|_, count| *count > 0);
        before - self.counts.len()
    }
}

impl FromIterator<(String, u64)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut table = FrequencyTable::new();
        for (key, count) in iter {
            table.add(&key, count);
        }
        table
    }
}

/// One table of the persisted count dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountEntry {
    /// Stable table name (e.g. `base_word_count`)
    pub name: String,
    /// Number of distinct keys in `data`
    pub total_size: usize,
    pub data: FrequencyTable,
}

impl CountEntry {
    pub fn new(kind: ComponentKind, data: FrequencyTable) -> Self {
        Self {
            name: kind.table_name().to_string(),
            total_size: data.len(),
            data,
        }
    }

    pub fn kind(&self) -> Option<ComponentKind> {
        ComponentKind::from_table_name(&self.name)
    }
}

/// All tables of one country plus the accepted/rejected totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountDictionaryBundle {
    pub entries: Vec<CountEntry>,
    /// Passwords that made it into the tables
    pub total_passwords: u64,
    /// Passwords rejected by the filters or unreadable
    pub illegal_passwords: u64,
}

impl CountDictionaryBundle {
    pub fn entry(&self, kind: ComponentKind) -> Option<&CountEntry> {
        self.entries.iter().find(|e| e.kind() == Some(kind))
    }

    pub fn table(&self, kind: ComponentKind) -> Option<&FrequencyTable> {
        self.entry(kind).map(|e| &e.data)
    }
}
