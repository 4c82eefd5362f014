//! pwdist - per-country password structure models
//!
//! Reads leaked-password corpora, splits each password into prefix, base word,
//! suffix, capitalization pattern and leet pattern, counts every component per
//! country and turns the counts into probability distributions plus top-N
//! truncations.
//!
//! ```text
//! corpus/<country>/*.json
//!   → counts::CountAggregator      (filter + decompose + count)
//!   → counts::CountStore           (count_dict.json, model_size.txt)
//!   → distribution::build_distributions
//!   → distribution::DistributionStore  (distributions/*.txt, *_meta_data.json)
//! ```
//!
//! [`orchestrator::Orchestrator`] runs this for many countries, sequentially or
//! fanned out over a worker pool.

pub mod config;
pub mod counts;
pub mod distribution;
pub mod error;
pub mod orchestrator;
pub mod password;

pub use error::{ModelError, Result};
