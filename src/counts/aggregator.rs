//! Corpus scan: records in, component counts out

use super::{ComponentKind, ComponentSet, CountDictionaryBundle, CountEntry, FrequencyTable};
use crate::error::{ModelError, Result};
use crate::password::{PasswordAnalyzer, PasswordRecord, ShiftPattern, StandardAnalyzer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Label for fully uppercase base words under [`ShiftLabelPolicy::AllCapSentinel`].
pub const ALL_CAP_LABEL: &str = "all-cap";

/// How shift patterns covering every character of the base word are labeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftLabelPolicy {
    /// Every pattern keeps its generic label, all-caps words included.
    /// Existing models were built this way.
    #[default]
    Verbatim,
    /// Fully uppercase base words are counted under [`ALL_CAP_LABEL`].
    AllCapSentinel,
}

/// Running state of one country scan.
#[derive(Debug, Clone, Default)]
pub struct CountAccumulator {
    tables: [Option<FrequencyTable>; 5],
    pub total_passwords: u64,
    pub illegal_passwords: u64,
}

impl CountAccumulator {
    /// Allocate only the enabled tables.
    pub fn new(components: ComponentSet) -> Self {
        let mut acc = Self::default();
        for kind in components.iter() {
            acc.tables[kind.index() - 1] = Some(FrequencyTable::new());
        }
        acc
    }

    fn table_mut(&mut self, kind: ComponentKind) -> Option<&mut FrequencyTable> {
        self.tables[kind.index() - 1].as_mut()
    }

    pub fn table(&self, kind: ComponentKind) -> Option<&FrequencyTable> {
        self.tables[kind.index() - 1].as_ref()
    }

    pub fn into_bundle(self) -> CountDictionaryBundle {
        let entries = ComponentKind::all()
            .iter()
            .zip(self.tables)
            .filter_map(|(kind, table)| table.map(|t| CountEntry::new(*kind, t)))
            .collect();
        CountDictionaryBundle {
            entries,
            total_passwords: self.total_passwords,
            illegal_passwords: self.illegal_passwords,
        }
    }
}

/// Builds a country's frequency tables from its corpus directory.
#[derive(Clone)]
pub struct CountAggregator {
    analyzer: Arc<dyn PasswordAnalyzer>,
    components: ComponentSet,
    shift_policy: ShiftLabelPolicy,
    corpus_suffix: String,
}

impl CountAggregator {
    pub const DEFAULT_CORPUS_SUFFIX: &'static str = ".json";

    pub fn new(analyzer: Arc<dyn PasswordAnalyzer>) -> Self {
        Self {
            analyzer,
            components: ComponentSet::all(),
            shift_policy: ShiftLabelPolicy::default(),
            corpus_suffix: Self::DEFAULT_CORPUS_SUFFIX.to_string(),
        }
    }

    /// Restrict the scan to some tables.
    pub fn with_components(mut self, components: ComponentSet) -> Self {
        self.components = components;
        self
    }

    pub fn with_shift_policy(mut self, policy: ShiftLabelPolicy) -> Self {
        self.shift_policy = policy;
        self
    }

    /// Only files whose name ends with `suffix` are read.
    pub fn with_corpus_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.corpus_suffix = suffix.into();
        self
    }

    pub fn components(&self) -> ComponentSet {
        self.components
    }

    pub fn accumulator(&self) -> CountAccumulator {
        CountAccumulator::new(self.components)
    }

    /// Scan every corpus file under `corpus_dir` (recursively).
    pub fn aggregate_dir(&self, corpus_dir: &Path) -> Result<CountDictionaryBundle> {
        let files = collect_corpus_files(corpus_dir, &self.corpus_suffix)?;
        let mut acc = self.accumulator();

        for file in &files {
            self.add_file(&mut acc, file)?;
        }

        info!(
            "Counted {} passwords ({} illegal) from {} files in {}",
            acc.total_passwords,
            acc.illegal_passwords,
            files.len(),
            corpus_dir.display()
        );

        Ok(acc.into_bundle())
    }

    /// Add one corpus file (a JSON array of records).
    ///
    /// A file that is not a JSON array fails the whole scan; a single
    /// unreadable record only counts as illegal.
    pub fn add_file(&self, acc: &mut CountAccumulator, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
        let records: Vec<serde_json::Value> =
            serde_json::from_str(&content).map_err(|source| ModelError::CorpusFormat {
                path: path.to_path_buf(),
                source,
            })?;

        let (before_total, before_illegal) = (acc.total_passwords, acc.illegal_passwords);
        for value in records {
            match serde_json::from_value::<PasswordRecord>(value) {
                Ok(record) => self.add_record(acc, &record),
                Err(e) => {
                    debug!("Unreadable record in {}: {}", path.display(), e);
                    acc.illegal_passwords += 1;
                }
            }
        }

        debug!(
            "{}: +{} passwords, +{} illegal",
            path.display(),
            acc.total_passwords - before_total,
            acc.illegal_passwords - before_illegal
        );
        Ok(())
    }

    pub fn add_record(&self, acc: &mut CountAccumulator, record: &PasswordRecord) {
        match record.password_text() {
            Some(password) => self.add_password(acc, &password),
            None => {
                debug!("Record without a readable password: {:?}", record.password);
                acc.illegal_passwords += 1;
            }
        }
    }

    /// Filter, decompose and count one password.
    pub fn add_password(&self, acc: &mut CountAccumulator, password: &str) {
        if !self.analyzer.accepts(password) {
            acc.illegal_passwords += 1;
            return;
        }

        let parts = self.analyzer.split(password);

        if let Some(table) = acc.table_mut(ComponentKind::Suffix) {
            table.increment(&parts.suffix);
        }
        if let Some(table) = acc.table_mut(ComponentKind::Prefix) {
            table.increment(&parts.prefix);
        }
        if self.components.contains(ComponentKind::ShiftPattern) {
            let pattern = self.analyzer.shift_pattern(&parts.base_word);
            let label = self.shift_label(&pattern, &parts.base_word);
            if let Some(table) = acc.table_mut(ComponentKind::ShiftPattern) {
                table.increment(&label);
            }
        }

        let needs_leet = self.components.contains(ComponentKind::LeetPattern)
            || self.components.contains(ComponentKind::BaseWord);
        if needs_leet {
            let (leet, plain_word) = self.analyzer.leet_pattern(&parts.base_word);
            if let Some(table) = acc.table_mut(ComponentKind::LeetPattern) {
                table.increment(&leet.to_string());
            }
            if let Some(table) = acc.table_mut(ComponentKind::BaseWord) {
                table.increment(&plain_word.to_lowercase());
            }
        }

        acc.total_passwords += 1;
    }

    fn shift_label(&self, pattern: &ShiftPattern, base_word: &str) -> String {
        let all_caps = !base_word.is_empty() && pattern.len() == base_word.chars().count();
        match self.shift_policy {
            ShiftLabelPolicy::AllCapSentinel if all_caps => ALL_CAP_LABEL.to_string(),
            _ => pattern.to_string(),
        }
    }
}

impl Default for CountAggregator {
    fn default() -> Self {
        Self::new(Arc::new(StandardAnalyzer))
    }
}

/// Corpus files under `dir` whose name ends with `suffix`, in walk order
/// (sorted by file name at every level).
pub fn collect_corpus_files(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ModelError::MissingCorpus(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            ModelError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .file_name()
            .to_str()
            .map(|name| name.ends_with(suffix))
            .unwrap_or(false);
        if matches {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counted(aggregator: &CountAggregator, passwords: &[&str]) -> CountDictionaryBundle {
        let mut acc = aggregator.accumulator();
        for p in passwords {
            aggregator.add_password(&mut acc, p);
        }
        acc.into_bundle()
    }

    #[test]
    fn test_components_counted_per_password() {
        let bundle = counted(&CountAggregator::default(), &["123Password!!", "password99"]);
        assert_eq!(bundle.total_passwords, 2);
        assert_eq!(bundle.illegal_passwords, 0);

        let prefix = bundle.table(ComponentKind::Prefix).unwrap();
        assert_eq!(prefix.get("123"), 1);
        assert_eq!(prefix.get(""), 1);

        let base = bundle.table(ComponentKind::BaseWord).unwrap();
        assert_eq!(base.get("password"), 2);
        assert_eq!(base.len(), 1);

        let suffix = bundle.table(ComponentKind::Suffix).unwrap();
        assert_eq!(suffix.get("!!"), 1);
        assert_eq!(suffix.get("99"), 1);

        let shift = bundle.table(ComponentKind::ShiftPattern).unwrap();
        assert_eq!(shift.get("[0]"), 1);
        assert_eq!(shift.get("[]"), 1);

        let leet = bundle.table(ComponentKind::LeetPattern).unwrap();
        assert_eq!(leet.get("[]"), 2);
    }

    #[test]
    fn test_base_words_are_case_folded() {
        let bundle = counted(
            &CountAggregator::default(),
            &["Sunshine1", "SUNSHINE1", "sunshine1"],
        );
        let base = bundle.table(ComponentKind::BaseWord).unwrap();
        assert_eq!(base.get("sunshine"), 3);
        assert_eq!(base.len(), 1);
        // the shift patterns still tell them apart
        assert_eq!(bundle.table(ComponentKind::ShiftPattern).unwrap().len(), 3);
    }

    #[test]
    fn test_base_word_is_de_leeted() {
        let bundle = counted(&CountAggregator::default(), &["P@ssw0rd2024"]);
        let base = bundle.table(ComponentKind::BaseWord).unwrap();
        assert_eq!(base.get("password"), 1);
        let leet = bundle.table(ComponentKind::LeetPattern).unwrap();
        assert_eq!(leet.get("[(1, '@', 'a'), (5, '0', 'o')]"), 1);
    }

    #[test]
    fn test_base_word_de_leeted_without_leet_table() {
        let aggregator = CountAggregator::default()
            .with_components(ComponentSet::only(&[ComponentKind::BaseWord]));
        let bundle = counted(&aggregator, &["P@ssw0rd2024"]);
        assert!(bundle.table(ComponentKind::LeetPattern).is_none());
        assert_eq!(bundle.table(ComponentKind::BaseWord).unwrap().get("password"), 1);
    }

    #[test]
    fn test_rejected_passwords_counted_as_illegal() {
        let bundle = counted(&CountAggregator::default(), &["abc123", "12345", "", "123456"]);
        assert_eq!(bundle.illegal_passwords, 3);
        assert_eq!(bundle.total_passwords, 1);
        assert_eq!(bundle.table(ComponentKind::BaseWord).unwrap().get("123456"), 1);
    }

    #[test]
    fn test_all_caps_verbatim_policy_never_uses_sentinel() {
        let bundle = counted(&CountAggregator::default(), &["PASSWORD1", "DRAGONFLY"]);
        let shift = bundle.table(ComponentKind::ShiftPattern).unwrap();
        assert_eq!(shift.get(ALL_CAP_LABEL), 0);
        assert_eq!(shift.get("[0, 1, 2, 3, 4, 5, 6, 7]"), 1);
        assert_eq!(shift.get("[0, 1, 2, 3, 4, 5, 6, 7, 8]"), 1);
    }

    #[test]
    fn test_all_caps_sentinel_policy() {
        let aggregator =
            CountAggregator::default().with_shift_policy(ShiftLabelPolicy::AllCapSentinel);
        let bundle = counted(&aggregator, &["PASSWORD1", "DRAGONFLY", "Password1"]);
        let shift = bundle.table(ComponentKind::ShiftPattern).unwrap();
        assert_eq!(shift.get(ALL_CAP_LABEL), 2);
        assert_eq!(shift.get("[0]"), 1);
    }

    #[test]
    fn test_disabled_components_are_skipped() {
        let aggregator = CountAggregator::default()
            .with_components(ComponentSet::only(&[ComponentKind::Suffix]));
        let bundle = counted(&aggregator, &["password1", "sunshine!"]);
        assert_eq!(bundle.entries.len(), 1);
        assert!(bundle.table(ComponentKind::BaseWord).is_none());
        assert_eq!(bundle.table(ComponentKind::Suffix).unwrap().len(), 2);
        assert_eq!(bundle.total_passwords, 2);
    }

    #[test]
    fn test_unreadable_records_counted_as_illegal() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Poland_0.json");
        std::fs::write(
            &file,
            r#"[{"password": "sunshine1"}, {"email": "x@y.pl"}, "not a record", {"password": 19901231}]"#,
        )
        .unwrap();

        let aggregator = CountAggregator::default();
        let mut acc = aggregator.accumulator();
        aggregator.add_file(&mut acc, &file).unwrap();
        assert_eq!(acc.total_passwords, 2);
        assert_eq!(acc.illegal_passwords, 2);
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "[{\"password\": ").unwrap();
        let err = CountAggregator::default().aggregate_dir(dir.path()).unwrap_err();
        assert!(matches!(err, ModelError::CorpusFormat { .. }));
    }

    #[test]
    fn test_missing_corpus_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = CountAggregator::default()
            .aggregate_dir(&dir.path().join("Narnia"))
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingCorpus(_)));
    }

    #[test]
    fn test_collect_corpus_files_recursive_with_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        std::fs::write(dir.path().join("a.json"), "[]").unwrap();
        std::fs::write(dir.path().join("b/nested/c.json"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = collect_corpus_files(dir.path(), ".json").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.json"));
        assert!(files[1].ends_with("b/nested/c.json"));
    }
}
