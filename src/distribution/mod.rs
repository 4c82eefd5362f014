//! Probability distributions and their top-N truncations
//!
//! A full distribution divides every count by the table total, so its mass is 1.
//! A truncated distribution keeps the N most probable keys, where N shrinks with
//! the compression ratio, and reports how much mass survived.

mod store;

pub use store::{escape_key, read_distribution, DistributionStore, DISTRIBUTIONS_DIR};

use crate::counts::{ComponentKind, CountDictionaryBundle, FrequencyTable};
use crate::error::{ModelError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tracing::{info, warn};

/// Ratios applied to every country in a standard run.
pub const DEFAULT_RATIOS: &[u64] = &[1000, 500, 200, 100];

/// Every truncated table keeps at least this many keys.
pub const MIN_TRUNCATED_ENTRIES: usize = 2;

/// Key → probability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbabilityTable {
    probs: FxHashMap<String, f64>,
}

impl ProbabilityTable {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.probs.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.probs.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Sum of all probabilities.
    pub fn mass(&self) -> f64 {
        self.probs.values().sum()
    }

    /// Entries ordered by key, the order they are written to disk.
    pub fn sorted_by_key(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl FromIterator<(String, f64)> for ProbabilityTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            probs: iter.into_iter().collect(),
        }
    }
}

/// The top-N slice of a distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct TruncatedDistribution {
    pub table: ProbabilityTable,
    /// Requested size (the table holds fewer keys only if the source did)
    pub n: usize,
    /// Sum of the kept probabilities
    pub retained_mass: f64,
}

/// Bookkeeping for one truncated table, persisted per ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub name: String,
    pub n: usize,
    pub retained_mass: f64,
}

/// Metadata of every table truncated at one ratio.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioSummary {
    pub ratio: u64,
    pub records: Vec<MetadataRecord>,
}

/// p(k) = count(k) / Σ counts. Empty tables are rejected.
pub fn count_to_distribution(table: &FrequencyTable) -> Result<ProbabilityTable> {
    let total = table.total();
    if total == 0 {
        return Err(ModelError::EmptyTable);
    }
    let total = total as f64;
    Ok(table
        .iter()
        .map(|(key, count)| (key.to_string(), count as f64 / total))
        .collect())
}

/// How many keys survive truncation at `ratio`.
///
/// `distinct_keys / ratio` once the table has more than `2 * ratio` keys,
/// otherwise [`MIN_TRUNCATED_ENTRIES`].
pub fn truncation_size(distinct_keys: usize, ratio: u64) -> usize {
    let ratio = usize::try_from(ratio.max(1)).unwrap_or(usize::MAX);
    if distinct_keys > ratio.saturating_mul(2) {
        distinct_keys / ratio
    } else {
        MIN_TRUNCATED_ENTRIES
    }
}

/// Heap entry ordered by probability, then by key (smaller key ranks higher).
#[derive(Debug, Clone, Copy)]
struct Ranked<'a> {
    prob: f64,
    key: &'a str,
}

impl Ord for Ranked<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.prob
            .total_cmp(&other.prob)
            .then_with(|| other.key.cmp(self.key))
    }
}

impl PartialOrd for Ranked<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked<'_> {}

/// Keep the `n` most probable keys.
///
/// Runs a bounded min-heap over the table (O(len · log n)) instead of sorting
/// it. Ties on probability go to the lexicographically smaller key, so the
/// result does not depend on hash order.
pub fn top_n(table: &ProbabilityTable, n: usize) -> TruncatedDistribution {
    let mut heap: BinaryHeap<Reverse<Ranked<'_>>> = BinaryHeap::with_capacity(n + 1);

    if n > 0 {
        for (key, prob) in table.iter() {
            let candidate = Ranked { prob, key };
            if heap.len() < n {
                heap.push(Reverse(candidate));
                continue;
            }
            if let Some(mut weakest) = heap.peek_mut() {
                if candidate > weakest.0 {
                    *weakest = Reverse(candidate);
                }
            }
        }
    }

    // Most probable first, so the mass is summed in a fixed order.
    let kept: Vec<Ranked<'_>> = heap.into_sorted_vec().into_iter().map(|r| r.0).collect();
    let retained_mass = kept.iter().map(|r| r.prob).sum::<f64>();

    TruncatedDistribution {
        table: kept
            .into_iter()
            .map(|r| (r.key.to_string(), r.prob))
            .collect(),
        n,
        retained_mass,
    }
}

/// Build and persist the distributions of one country.
///
/// Full tables are written once as `a{i}`; each ratio above 1 adds
/// `{ratio}_a{i}` tables and a `{ratio}_meta_data.json` document. Empty
/// tables are skipped, and files left by earlier runs for skipped or
/// disabled components are removed.
pub fn build_distributions(
    bundle: &CountDictionaryBundle,
    ratios: &[u64],
    store: &DistributionStore,
) -> Result<Vec<RatioSummary>> {
    if let Some(bad) = ratios.iter().find(|r| **r == 0) {
        return Err(ModelError::InvalidRatio(*bad));
    }

    let mut summaries: Vec<RatioSummary> = ratios
        .iter()
        .filter(|r| **r > 1)
        .map(|r| RatioSummary {
            ratio: *r,
            records: Vec::new(),
        })
        .collect();

    let mut written = Vec::new();
    for entry in &bundle.entries {
        let Some(kind) = entry.kind() else {
            warn!("Skipping unknown table {}", entry.name);
            continue;
        };
        if entry.data.is_empty() {
            warn!("Skipping empty table {}", entry.name);
            continue;
        }

        let distribution = count_to_distribution(&entry.data)?;
        store.write_table(&DistributionStore::full_table_name(kind), &distribution)?;
        written.push(kind);

        for summary in &mut summaries {
            let n = truncation_size(entry.total_size, summary.ratio);
            let truncated = top_n(&distribution, n);
            store.write_table(
                &DistributionStore::truncated_table_name(kind, summary.ratio),
                &truncated.table,
            )?;
            summary.records.push(MetadataRecord {
                name: entry.name.clone(),
                n,
                retained_mass: truncated.retained_mass,
            });
        }
    }

    for kind in ComponentKind::all() {
        if written.contains(kind) {
            continue;
        }
        let removed = store.remove_tables(*kind)?;
        if removed > 0 {
            info!("Removed {} stale {} files", removed, kind.table_name());
        }
    }

    for summary in &summaries {
        store.write_metadata(summary.ratio, &summary.records)?;
        for record in &summary.records {
            info!(
                "  ratio {:>5} {:<20} n={:<6} mass={:.4}",
                summary.ratio, record.name, record.n, record.retained_mass
            );
        }
    }

    Ok(summaries)
}
