//! Country orchestrator
//!
//! Drives the pipeline for a list of countries:
//!
//! ```text
//! Sequential:  country → aggregate → distributions → next country
//! Parallel:    phase 1  aggregate every country on a worker pool (persisted)
//!              phase 2  load counts → distributions, one country at a time
//! ```
//!
//! A failing country is recorded in the [`RunReport`] and never stops the
//! others.

mod launcher;

pub use launcher::{aggregate_and_persist, AggregationLauncher, InProcessLauncher, SubprocessLauncher};

use crate::config::{validate_country, ModelConfig};
use crate::counts::{CountDictionaryBundle, CountStore};
use crate::distribution::{build_distributions, DistributionStore};
use crate::error::{ModelError, Result};
use chrono::{DateTime, Local};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    Sequential,
    #[default]
    Parallel,
}

impl FromStr for ExecutionMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(ExecutionMode::Sequential),
            "parallel" | "async" => Ok(ExecutionMode::Parallel),
            other => Err(ModelError::Config(format!(
                "unknown mode '{}', expected 'parallel' or 'sequential'",
                other
            ))),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => f.write_str("sequential"),
            ExecutionMode::Parallel => f.write_str("parallel"),
        }
    }
}

/// Pipeline stage a country failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Aggregate,
    Distribute,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Aggregate => f.write_str("aggregate"),
            Stage::Distribute => f.write_str("distribute"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryFailure {
    pub country: String,
    pub stage: Stage,
    pub message: String,
}

/// Outcome of one orchestrator run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: String,
    pub completed: Vec<String>,
    pub failures: Vec<CountryFailure>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn failure(&self, country: &str) -> Option<&CountryFailure> {
        self.failures.iter().find(|f| f.country == country)
    }
}

/// Called as `(country, stage, done, total)` after each country finishes a stage.
pub type ProgressFn = Arc<dyn Fn(&str, Stage, usize, usize) + Send + Sync>;

pub struct Orchestrator {
    config: ModelConfig,
    mode: ExecutionMode,
    load_from_file: bool,
    launcher: Arc<dyn AggregationLauncher>,
    progress: Option<ProgressFn>,
}

impl Orchestrator {
    /// Parallel mode with in-process workers.
    pub fn new(config: ModelConfig) -> Self {
        let launcher = Arc::new(InProcessLauncher::new(config.clone()));
        Self {
            config,
            mode: ExecutionMode::default(),
            load_from_file: false,
            launcher,
            progress: None,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Skip aggregation and rebuild distributions from saved counts.
    pub fn with_load_from_file(mut self, load_from_file: bool) -> Self {
        self.load_from_file = load_from_file;
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn AggregationLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Run the pipeline for `countries`.
    ///
    /// Errors only on invalid configuration, an unusable country name, or
    /// when the worker pool cannot start; per-country failures land in the
    /// report.
    pub fn run(&self, countries: &[String]) -> Result<RunReport> {
        self.config.validate()?;
        for country in countries {
            validate_country(country)?;
        }

        let started_at = Local::now();
        info!(
            "start: {} ({} countries, {} mode{})",
            started_at.format("%Y-%m-%d %H:%M:%S"),
            countries.len(),
            self.mode,
            if self.load_from_file { ", counts from file" } else { "" }
        );

        let mut failures = Vec::new();
        let completed = match self.mode {
            ExecutionMode::Sequential => self.run_sequential(countries, &mut failures),
            ExecutionMode::Parallel => self.run_parallel(countries, &mut failures)?,
        };

        let finished_at = Local::now();
        info!(
            "end: {} ({} ok, {} failed, {}s)",
            finished_at.format("%Y-%m-%d %H:%M:%S"),
            completed.len(),
            failures.len(),
            (finished_at - started_at).num_seconds()
        );

        Ok(RunReport {
            mode: self.mode.to_string(),
            completed,
            failures,
            started_at,
            finished_at,
        })
    }

    fn run_sequential(&self, countries: &[String], failures: &mut Vec<CountryFailure>) -> Vec<String> {
        let total = countries.len();
        let mut completed = Vec::new();

        for (i, country) in countries.iter().enumerate() {
            let bundle = if self.load_from_file {
                self.load_counts(country)
            } else {
                aggregate_and_persist(&self.config, country, self.config.save_counts)
            };
            let bundle = match bundle {
                Ok(bundle) => bundle,
                Err(e) => {
                    failures.push(record_failure(country, Stage::Aggregate, e));
                    continue;
                }
            };
            self.report(country, Stage::Aggregate, i + 1, total);

            match self.distribute(country, &bundle) {
                Ok(()) => completed.push(country.clone()),
                Err(e) => failures.push(record_failure(country, Stage::Distribute, e)),
            }
            self.report(country, Stage::Distribute, i + 1, total);
        }

        completed
    }

    fn run_parallel(
        &self,
        countries: &[String],
        failures: &mut Vec<CountryFailure>,
    ) -> Result<Vec<String>> {
        let total = countries.len();

        let ready: Vec<&String> = if self.load_from_file {
            countries.iter().collect()
        } else {
            let workers = self.config.effective_workers().min(total.max(1));
            info!(
                "Aggregating {} countries on {} workers ({})",
                total,
                workers,
                self.launcher.name()
            );
            let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;
            let done = AtomicUsize::new(0);

            let results: Vec<(&String, Result<()>)> = pool.install(|| {
                countries
                    .par_iter()
                    .map(|country| {
                        let result = self.launcher.launch(country);
                        let n = done.fetch_add(1, Ordering::SeqCst) + 1;
                        self.report(country, Stage::Aggregate, n, total);
                        (country, result)
                    })
                    .collect()
            });

            let mut ready = Vec::new();
            for (country, result) in results {
                match result {
                    Ok(()) => ready.push(country),
                    Err(e) => failures.push(record_failure(country, Stage::Aggregate, e)),
                }
            }
            ready
        };

        let mut completed = Vec::new();
        for (i, country) in ready.into_iter().enumerate() {
            let result = self.load_counts(country);
            match result {
                Ok(bundle) => match self.distribute(country, &bundle) {
                    Ok(()) => completed.push(country.clone()),
                    Err(e) => failures.push(record_failure(country, Stage::Distribute, e)),
                },
                Err(e) => {
                    let stage = if self.load_from_file {
                        Stage::Aggregate
                    } else {
                        Stage::Distribute
                    };
                    failures.push(record_failure(country, stage, e));
                }
            }
            self.report(country, Stage::Distribute, i + 1, total);
        }

        Ok(completed)
    }

    fn load_counts(&self, country: &str) -> Result<CountDictionaryBundle> {
        CountStore::new(self.config.country_dir(country)).load()
    }

    fn distribute(&self, country: &str, bundle: &CountDictionaryBundle) -> Result<()> {
        info!("Building distributions for {}", country);
        let store = DistributionStore::new(self.config.country_dir(country));
        build_distributions(bundle, &self.config.ratios, &store)?;
        Ok(())
    }

    fn report(&self, country: &str, stage: Stage, done: usize, total: usize) {
        if let Some(progress) = &self.progress {
            progress(country, stage, done, total);
        }
    }
}

fn record_failure(country: &str, stage: Stage, e: ModelError) -> CountryFailure {
    error!("{} failed during {}: {}", country, stage, e);
    CountryFailure {
        country: country.to_string(),
        stage,
        message: e.to_string(),
    }
}
