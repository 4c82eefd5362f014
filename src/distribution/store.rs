//! Distribution files
//!
//! ```text
//! <country>/
//!   distributions/
//!     a1.txt .. a5.txt            full tables
//!     500_a1.txt .. 500_a5.txt    truncated at ratio 500
//!   500_meta_data.json            [{name, n, retained_mass}, ...]
//! ```
//!
//! Table lines are `<key> <probability>`, sorted by key so two runs diff cleanly.

use super::{MetadataRecord, ProbabilityTable};
use crate::counts::ComponentKind;
use crate::error::{ModelError, Result};
use std::fmt::Write as _;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DISTRIBUTIONS_DIR: &str = "distributions";

/// Writes the distribution artifacts of one country directory.
#[derive(Debug, Clone)]
pub struct DistributionStore {
    root: PathBuf,
}

impl DistributionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn distributions_dir(&self) -> PathBuf {
        self.root.join(DISTRIBUTIONS_DIR)
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.distributions_dir().join(format!("{}.txt", name))
    }

    pub fn metadata_path(&self, ratio: u64) -> PathBuf {
        self.root.join(format!("{}_meta_data.json", ratio))
    }

    pub fn full_table_name(kind: ComponentKind) -> String {
        format!("a{}", kind.index())
    }

    pub fn truncated_table_name(kind: ComponentKind, ratio: u64) -> String {
        format!("{}_a{}", ratio, kind.index())
    }

    /// Write `table` sorted by key. Returns the file path.
    pub fn write_table(&self, name: &str, table: &ProbabilityTable) -> Result<PathBuf> {
        let dir = self.distributions_dir();
        std::fs::create_dir_all(&dir).map_err(|e| ModelError::io(&dir, e))?;

        let path = self.table_path(name);
        let file = std::fs::File::create(&path).map_err(|e| ModelError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        for (key, prob) in table.sorted_by_key() {
            writeln!(writer, "{} {}", escape_key(key), prob).map_err(|e| ModelError::io(&path, e))?;
        }
        writer.flush().map_err(|e| ModelError::io(&path, e))?;

        debug!("Wrote {} entries to {}", table.len(), path.display());
        Ok(path)
    }

    /// Delete the files of `kind`, full and truncated at any ratio.
    /// Returns how many were removed.
    pub fn remove_tables(&self, kind: ComponentKind) -> Result<usize> {
        let dir = self.distributions_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(ModelError::io(&dir, e)),
        };

        let full = Self::full_table_name(kind);
        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(|e| ModelError::io(&dir, e))?.path();
            let is_txt = path.extension().is_some_and(|ext| ext == "txt");
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if is_txt && is_table_file_of(stem, &full) {
                std::fs::remove_file(&path).map_err(|e| ModelError::io(&path, e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn write_metadata(&self, ratio: u64, records: &[MetadataRecord]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root).map_err(|e| ModelError::io(&self.root, e))?;
        let path = self.metadata_path(ratio);
        let json = serde_json::to_string_pretty(records).map_err(|source| ModelError::Serialize {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|e| ModelError::io(&path, e))?;
        Ok(path)
    }

    pub fn read_metadata(&self, ratio: u64) -> Result<Vec<MetadataRecord>> {
        let path = self.metadata_path(ratio);
        let content = std::fs::read_to_string(&path).map_err(|e| ModelError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| ModelError::CountFormat {
            path,
            message: e.to_string(),
        })
    }
}

/// `a{i}` itself or `{ratio}_a{i}`.
fn is_table_file_of(stem: &str, full: &str) -> bool {
    if stem == full {
        return true;
    }
    stem.strip_suffix(full)
        .and_then(|rest| rest.strip_suffix('_'))
        .is_some_and(|ratio| !ratio.is_empty() && ratio.bytes().all(|b| b.is_ascii_digit()))
}

/// Render a key the way it appears in distribution files: no surrounding
/// quotes, backslashes and control characters escaped.
///
/// A single quote is escaped only when the key also contains a double quote.
pub fn escape_key(key: &str) -> String {
    let escape_single = key.contains('\'') && key.contains('"');
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\'' if escape_single => out.push_str("\\'"),
            c if c.is_ascii_control() => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Read a distribution file back as `(key, probability)` pairs in file order.
///
/// Keys are returned as written (escaped). The key may contain spaces, so each
/// line is split at its last space.
pub fn read_distribution(path: &Path) -> Result<Vec<(String, f64)>> {
    let content = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
    let mut entries = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let parsed = line
            .rsplit_once(' ')
            .and_then(|(key, prob)| prob.parse::<f64>().ok().map(|p| (key.to_string(), p)));
        match parsed {
            Some(entry) => entries.push(entry),
            None => {
                return Err(ModelError::CountFormat {
                    path: path.to_path_buf(),
                    message: format!("line {}: expected '<key> <probability>'", number + 1),
                })
            }
        }
    }
    Ok(entries)
}
