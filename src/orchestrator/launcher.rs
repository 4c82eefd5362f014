//! Phase-one workers: count one country and persist the result

use crate::config::{validate_country, ModelConfig};
use crate::counts::{CountDictionaryBundle, CountStore};
use crate::error::{ModelError, Result};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Runs the aggregation of one country and leaves `count_dict.json` and
/// `model_size.txt` in the country's output directory.
pub trait AggregationLauncher: Send + Sync {
    fn launch(&self, country: &str) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Count one country and write its count files.
///
/// `with_counts` controls `count_dict.json`; the summary is always written.
pub fn aggregate_and_persist(
    config: &ModelConfig,
    country: &str,
    with_counts: bool,
) -> Result<CountDictionaryBundle> {
    validate_country(country)?;
    let corpus_dir = config.corpus_dir(country);
    info!("Aggregating {} from {}", country, corpus_dir.display());

    let bundle = config.aggregator().aggregate_dir(&corpus_dir)?;
    CountStore::new(config.country_dir(country)).save(&bundle, with_counts)?;
    Ok(bundle)
}

/// Aggregates on the calling thread.
#[derive(Debug, Clone)]
pub struct InProcessLauncher {
    config: ModelConfig,
}

impl InProcessLauncher {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }
}

impl AggregationLauncher for InProcessLauncher {
    fn launch(&self, country: &str) -> Result<()> {
        aggregate_and_persist(&self.config, country, true).map(|_| ())
    }

    fn name(&self) -> &'static str {
        "in-process"
    }
}

/// Aggregates in a child process running `<program> <args> aggregate --country <c>`.
///
/// A crash or out-of-memory kill in one country cannot take down the others.
#[derive(Debug, Clone)]
pub struct SubprocessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl SubprocessLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-run the current executable with `args` placed before the subcommand.
    pub fn current_exe(args: Vec<OsString>) -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|e| ModelError::io(PathBuf::from("<current executable>"), e))?;
        Ok(Self::new(program, args))
    }

    fn command(&self, country: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("aggregate")
            .arg("--country")
            .arg(country)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        command
    }
}

impl AggregationLauncher for SubprocessLauncher {
    fn launch(&self, country: &str) -> Result<()> {
        debug!("Spawning {} for {}", self.program.display(), country);
        let output = self
            .command(country)
            .output()
            .map_err(|e| ModelError::io(&self.program, e))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            debug!("[{}] {}", country, line);
        }
        Err(ModelError::Worker {
            country: country.to_string(),
            message: failure_message(&stderr, output.status),
        })
    }

    fn name(&self) -> &'static str {
        "subprocess"
    }
}

/// The child's reported error, or its exit status when it printed none.
fn failure_message(stderr: &str, status: std::process::ExitStatus) -> String {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    lines
        .iter()
        .find_map(|l| l.strip_prefix("Error: "))
        .or_else(|| lines.last().copied())
        .map(str::to_string)
        .unwrap_or_else(|| format!("worker exited with {}", status))
}
