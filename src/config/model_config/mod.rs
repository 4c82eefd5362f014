//! Model build configuration
//!
//! Loaded from `pwdist.toml` in the working directory, or from the file given
//! with `--config`. Every key is optional.
//!
//! # Configuration Format
//!
//! ```toml
//! # pwdist.toml
//! corpus_root = "data/countries"
//! output_root = "models"
//! corpus_suffix = ".json"
//! countries = ["Poland", "Japan"]
//! ratios = [1000, 500, 200, 100]
//! components = ["prefix", "base_word", "suffix", "shift_pattern", "leet_pattern"]
//! all_cap_sentinel = false
//! save_counts = true
//! workers = 8
//! ```

use crate::counts::{ComponentKind, ComponentSet, CountAggregator, ShiftLabelPolicy};
use crate::distribution::DEFAULT_RATIOS;
use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_FILENAME: &str = "pwdist.toml";

/// Countries of the standard run.
pub const DEFAULT_COUNTRIES: &[&str] = &[
    "China",
    "Poland",
    "United Kingdom (common practice)",
    "Italy",
    "India",
    "France",
    "Germany",
    "Japan",
];

/// Written by `pwdist init`.
pub const CONFIG_TEMPLATE: &str = r#"# pwdist configuration

# One sub-directory per country, each holding JSON arrays of records
corpus_root = "data/countries"

# Models are written to <output_root>/<country>/
output_root = "models"

# Only corpus files ending with this suffix are read
corpus_suffix = ".json"

countries = [
    "China",
    "Poland",
    "United Kingdom (common practice)",
    "Italy",
    "India",
    "France",
    "Germany",
    "Japan",
]

# Compression ratios for the truncated distributions (1 = full tables only)
ratios = [1000, 500, 200, 100]

# Tables to count: prefix, base_word, suffix, shift_pattern, leet_pattern
components = ["prefix", "base_word", "suffix", "shift_pattern", "leet_pattern"]

# Count fully uppercase base words as "all-cap" instead of their index list.
# Existing models were built with this off.
all_cap_sentinel = false

# Keep count_dict.json so distributions can be rebuilt with --load-from-file
save_counts = true

# Parallel workers (default: number of CPUs)
# workers = 8
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub corpus_root: PathBuf,
    pub output_root: PathBuf,
    pub corpus_suffix: String,
    pub countries: Vec<String>,
    pub ratios: Vec<u64>,
    pub components: Vec<ComponentKind>,
    pub all_cap_sentinel: bool,
    pub save_counts: bool,
    pub workers: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            corpus_root: PathBuf::from("data/countries"),
            output_root: PathBuf::from("models"),
            corpus_suffix: CountAggregator::DEFAULT_CORPUS_SUFFIX.to_string(),
            countries: DEFAULT_COUNTRIES.iter().map(|c| c.to_string()).collect(),
            ratios: DEFAULT_RATIOS.to_vec(),
            components: ComponentKind::all().to_vec(),
            all_cap_sentinel: false,
            save_counts: true,
            workers: None,
        }
    }
}

impl ModelConfig {
    pub fn component_set(&self) -> ComponentSet {
        ComponentSet::only(&self.components)
    }

    pub fn shift_policy(&self) -> ShiftLabelPolicy {
        if self.all_cap_sentinel {
            ShiftLabelPolicy::AllCapSentinel
        } else {
            ShiftLabelPolicy::Verbatim
        }
    }

    /// Configured worker count, or the number of available CPUs.
    pub fn effective_workers(&self) -> usize {
        self.workers.filter(|w| *w > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    /// Output directory of one country.
    pub fn country_dir(&self, country: &str) -> PathBuf {
        self.output_root.join(country)
    }

    /// Corpus directory of one country.
    pub fn corpus_dir(&self, country: &str) -> PathBuf {
        self.corpus_root.join(country)
    }

    /// Aggregator configured from these settings.
    pub fn aggregator(&self) -> CountAggregator {
        CountAggregator::default()
            .with_components(self.component_set())
            .with_shift_policy(self.shift_policy())
            .with_corpus_suffix(self.corpus_suffix.clone())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self.ratios.iter().find(|r| **r == 0) {
            return Err(ModelError::InvalidRatio(*bad));
        }
        if self.components.is_empty() {
            return Err(ModelError::Config("no components enabled".to_string()));
        }
        if self.corpus_suffix.is_empty() {
            return Err(ModelError::Config("corpus_suffix must not be empty".to_string()));
        }
        for country in &self.countries {
            validate_country(country)?;
        }
        Ok(())
    }
}

/// A country name must be a single plain path component, so that
/// `corpus_root.join(country)` and `output_root.join(country)` stay inside
/// their roots.
pub fn validate_country(country: &str) -> Result<()> {
    let mut components = Path::new(country).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || country.contains('/') || country.contains('\\') {
        return Err(ModelError::Config(format!(
            "'{}' is not usable as a country directory name",
            country
        )));
    }
    Ok(())
}

/// Load the configuration.
///
/// An explicit path must exist and parse. Without one, `pwdist.toml` in
/// `working_dir` is used when present; a broken implicit file is reported
/// and the defaults are used instead.
pub fn load_model_config(explicit: Option<&Path>, working_dir: &Path) -> Result<ModelConfig> {
    if let Some(path) = explicit {
        let config = load_toml_config(path)?;
        debug!("Loaded config from {}", path.display());
        return Ok(config);
    }

    let implicit = working_dir.join(CONFIG_FILENAME);
    if implicit.exists() {
        match load_toml_config(&implicit) {
            Ok(config) => {
                debug!("Loaded config from {}", implicit.display());
                return Ok(config);
            }
            Err(e) => {
                warn!("Failed to load {}: {}", implicit.display(), e);
            }
        }
    }

    debug!("No config found, using defaults");
    Ok(ModelConfig::default())
}

fn load_toml_config(path: &Path) -> Result<ModelConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ModelError::io(path, e))?;
    toml::from_str(&content).map_err(|e| ModelError::Config(format!("{}: {}", path.display(), e)))
}
