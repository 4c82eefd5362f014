//! Count dictionary persistence
//!
//! `count_dict.json` holds every table as `{name, total_size, data}`;
//! `model_size.txt` holds the password totals.

use super::{CountDictionaryBundle, CountEntry};
use crate::error::{ModelError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const COUNT_DICT_FILENAME: &str = "count_dict.json";
pub const MODEL_SIZE_FILENAME: &str = "model_size.txt";

/// Reads and writes the count artifacts of one country directory.
#[derive(Debug, Clone)]
pub struct CountStore {
    dir: PathBuf,
}

impl CountStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn count_dict_path(&self) -> PathBuf {
        self.dir.join(COUNT_DICT_FILENAME)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.dir.join(MODEL_SIZE_FILENAME)
    }

    /// Whether a count dictionary has been saved here.
    pub fn exists(&self) -> bool {
        self.count_dict_path().is_file()
    }

    /// Write the summary, and the count dictionary when `with_counts` is set.
    pub fn save(&self, bundle: &CountDictionaryBundle, with_counts: bool) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ModelError::io(&self.dir, e))?;

        if with_counts {
            let path = self.count_dict_path();
            let json = serde_json::to_string_pretty(&bundle.entries).map_err(|source| {
                ModelError::Serialize {
                    path: path.clone(),
                    source,
                }
            })?;
            std::fs::write(&path, json).map_err(|e| ModelError::io(&path, e))?;
            debug!("Saved {}", path.display());
        }

        let path = self.summary_path();
        let summary = format!(
            "Total passwords: {}\nIlegal passwords: {}",
            bundle.total_passwords, bundle.illegal_passwords
        );
        std::fs::write(&path, summary).map_err(|e| ModelError::io(&path, e))?;
        Ok(())
    }

    /// Load a previously saved bundle.
    pub fn load(&self) -> Result<CountDictionaryBundle> {
        let path = self.count_dict_path();
        let content = std::fs::read_to_string(&path).map_err(|e| ModelError::io(&path, e))?;
        let mut entries: Vec<CountEntry> =
            serde_json::from_str(&content).map_err(|e| ModelError::CountFormat {
                path: path.clone(),
                message: e.to_string(),
            })?;

        for entry in &mut entries {
            if entry.kind().is_none() {
                return Err(ModelError::CountFormat {
                    path,
                    message: format!("unknown table '{}'", entry.name),
                });
            }
            let zeros = entry.data.remove_zero_counts();
            if zeros > 0 {
                warn!(
                    "{}: dropped {} zero-count keys from table {}",
                    path.display(),
                    zeros,
                    entry.name
                );
            }
            if entry.total_size != entry.data.len() {
                warn!(
                    "{}: table {} declares {} keys but holds {}, using {}",
                    path.display(),
                    entry.name,
                    entry.total_size,
                    entry.data.len(),
                    entry.data.len()
                );
                entry.total_size = entry.data.len();
            }
        }

        let (total_passwords, illegal_passwords) = self.load_summary();
        Ok(CountDictionaryBundle {
            entries,
            total_passwords,
            illegal_passwords,
        })
    }

    /// Password totals from the summary file, if one was written.
    pub fn read_summary(&self) -> Option<(u64, u64)> {
        std::fs::read_to_string(self.summary_path())
            .ok()
            .map(|text| parse_summary(&text))
    }

    fn load_summary(&self) -> (u64, u64) {
        let path = self.summary_path();
        match std::fs::read_to_string(&path) {
            Ok(text) => parse_summary(&text),
            Err(e) => {
                warn!("No password totals at {}: {}", path.display(), e);
                (0, 0)
            }
        }
    }
}

/// Parse `model_size.txt` into `(total, illegal)`. Unparseable lines count as 0.
fn parse_summary(text: &str) -> (u64, u64) {
    let mut total = 0;
    let mut illegal = 0;
    for line in text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let value: u64 = value.trim().parse().unwrap_or(0);
        let label = label.trim().to_lowercase();
        if label.starts_with("total") {
            total = value;
        } else if label.starts_with("ilegal") || label.starts_with("illegal") {
            illegal = value;
        }
    }
    (total, illegal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counts::{ComponentKind, FrequencyTable};

    fn sample_bundle() -> CountDictionaryBundle {
        let tables = [
            (ComponentKind::Prefix, vec![("", 5), ("1", 2)]),
            (ComponentKind::BaseWord, vec![("password", 4), ("qwerty", 3)]),
            (ComponentKind::Suffix, vec![("123", 6), ("a\"b\\c", 1)]),
            (ComponentKind::ShiftPattern, vec![("[]", 6), ("[0]", 1)]),
            (ComponentKind::LeetPattern, vec![("[]", 7)]),
        ];
        let entries = tables
            .into_iter()
            .map(|(kind, data)| {
                let table: FrequencyTable =
                    data.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
                CountEntry::new(kind, table)
            })
            .collect();
        CountDictionaryBundle {
            entries,
            total_passwords: 7,
            illegal_passwords: 3,
        }
    }

    #[test]
    fn test_round_trip_preserves_tables() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountStore::new(dir.path().join("Japan"));
        let bundle = sample_bundle();

        store.save(&bundle, true).unwrap();
        assert!(store.exists());
        let loaded = store.load().unwrap();

        assert_eq!(loaded, bundle);
        assert_eq!(loaded.entry(ComponentKind::BaseWord).unwrap().total_size, 2);
    }

    #[test]
    fn test_document_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountStore::new(dir.path());
        store.save(&sample_bundle(), true).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.count_dict_path()).unwrap())
                .unwrap();
        let list = raw.as_array().unwrap();
        assert_eq!(list.len(), 5);
        assert_eq!(list[0]["name"], "prefix_count");
        assert_eq!(list[1]["total_size"], 2);
        assert_eq!(list[1]["data"]["password"], 4);
    }

    #[test]
    fn test_summary_only_without_counts() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountStore::new(dir.path());
        store.save(&sample_bundle(), false).unwrap();
        assert!(!store.exists());
        let summary = std::fs::read_to_string(store.summary_path()).unwrap();
        assert_eq!(summary, "Total passwords: 7\nIlegal passwords: 3");
    }

    #[test]
    fn test_total_size_corrected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountStore::new(dir.path());
        std::fs::write(
            store.count_dict_path(),
            r#"[{"name": "suffix_count", "total_size": 9, "data": {"1": 2, "!": 1}}]"#,
        )
        .unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.entries[0].total_size, 2);
        assert_eq!(loaded.total_passwords, 0);
    }

    #[test]
    fn test_zero_counts_dropped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountStore::new(dir.path());
        std::fs::write(
            store.count_dict_path(),
            r#"[{"name": "suffix_count", "total_size": 2, "data": {"1": 3, "!": 0}}]"#,
        )
        .unwrap();

        let loaded = store.load().unwrap();
        let suffix = loaded.table(ComponentKind::Suffix).unwrap();
        assert_eq!(suffix.len(), 1);
        assert_eq!(suffix.get("1"), 3);
        assert_eq!(loaded.entries[0].total_size, 1);
    }

    #[test]
    fn test_all_zero_table_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountStore::new(dir.path());
        std::fs::write(
            store.count_dict_path(),
            r#"[{"name": "prefix_count", "total_size": 2, "data": {"": 0, "1": 0}},
               {"name": "suffix_count", "total_size": 1, "data": {"1": 4}}]"#,
        )
        .unwrap();

        let loaded = store.load().unwrap();
        assert!(loaded.table(ComponentKind::Prefix).unwrap().is_empty());
        assert_eq!(loaded.entries[0].total_size, 0);
        assert_eq!(loaded.table(ComponentKind::Suffix).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_table_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = CountStore::new(dir.path());
        std::fs::write(
            store.count_dict_path(),
            r#"[{"name": "email_count", "total_size": 1, "data": {"x": 1}}]"#,
        )
        .unwrap();
        assert!(matches!(store.load(), Err(ModelError::CountFormat { .. })));
    }

    #[test]
    fn test_parse_summary() {
        assert_eq!(parse_summary("Total passwords: 10\nIlegal passwords: 4"), (10, 4));
        assert_eq!(parse_summary("Illegal passwords: 2"), (0, 2));
        assert_eq!(parse_summary("garbage"), (0, 0));
    }
}
