//! CLI command definitions and handlers

mod aggregate;
mod init;
mod run;
mod status;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pwdist::config::{load_model_config, ModelConfig};
use pwdist::counts::ComponentKind;
use pwdist::orchestrator::ExecutionMode;
use std::ffi::OsString;
use std::path::PathBuf;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Parse a compression ratio (positive integer)
fn parse_ratio(s: &str) -> Result<u64, String> {
    match s.parse::<u64>() {
        Ok(0) => Err("ratio must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid ratio", s)),
    }
}

/// pwdist - per-country password structure models
#[derive(Parser, Debug)]
#[command(name = "pwdist")]
#[command(
    version,
    about = "Build per-country password structure models from leaked password corpora",
    long_about = "pwdist splits every password of a country's corpus into prefix, base word, \
suffix, capitalization pattern and leet pattern, counts each component, and turns \
the counts into probability tables plus top-N truncations for each compression ratio.",
    after_help = "\
Examples:
  pwdist init                                  Write a pwdist.toml template
  pwdist run                                   All configured countries, in parallel
  pwdist run --mode sequential --country Poland
  pwdist run --load-from-file                  Rebuild distributions from saved counts
  pwdist distribute --country Japan --ratio 50
  pwdist status                                Show what has been built"
)]
pub struct Cli {
    /// Config file (default: ./pwdist.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding one corpus sub-directory per country
    #[arg(long, global = true)]
    pub corpus_root: Option<PathBuf>,

    /// Directory models are written to
    #[arg(long, global = true)]
    pub output_root: Option<PathBuf>,

    /// Only read corpus files ending with this suffix
    #[arg(long, global = true)]
    pub corpus_suffix: Option<String>,

    /// Comma-separated component tables to count
    #[arg(long, global = true, value_delimiter = ',')]
    pub components: Option<Vec<ComponentKind>>,

    /// Count fully uppercase base words as "all-cap" (true/false)
    #[arg(long, global = true)]
    pub all_cap_sentinel: Option<bool>,

    /// Number of parallel workers (1-64)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a pwdist.toml config file with the default settings
    Init {
        /// Overwrite an existing pwdist.toml
        #[arg(long)]
        force: bool,
    },

    /// Build models for every configured country (or the ones given)
    #[command(after_help = "\
Examples:
  pwdist run                                   Parallel, one worker process per country
  pwdist run --mode sequential                 One country after another
  pwdist run --country Poland --country Italy  Only these countries
  pwdist run --load-from-file                  Skip counting, reuse count_dict.json")]
    Run {
        /// Execution mode: parallel or sequential
        #[arg(long, default_value = "parallel")]
        mode: ExecutionMode,

        /// Rebuild distributions from saved counts instead of the corpus
        #[arg(long)]
        load_from_file: bool,

        /// Country to process (repeatable; default: all configured)
        #[arg(long)]
        country: Vec<String>,

        /// Count on worker threads instead of child processes
        #[arg(long)]
        in_process: bool,
    },

    /// Count one country's corpus and save count_dict.json
    Aggregate {
        #[arg(long)]
        country: String,
    },

    /// Build distributions for one country from its saved counts
    Distribute {
        #[arg(long)]
        country: String,

        /// Compression ratio (repeatable; default: configured ratios)
        #[arg(long, value_parser = parse_ratio)]
        ratio: Vec<u64>,
    },

    /// Show which countries have counts and distributions
    Status,
}

/// Run the CLI command
pub fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Init { force } => init::run(*force),
        Commands::Run {
            mode,
            load_from_file,
            country,
            in_process,
        } => {
            let config = resolve_config(&cli)?;
            let opts = run::RunOptions {
                mode: *mode,
                load_from_file: *load_from_file,
                countries: country.clone(),
                in_process: *in_process,
                worker_args: worker_args(&cli, &config),
            };
            run::run(config, opts)
        }
        Commands::Aggregate { country } => {
            let config = resolve_config(&cli)?;
            aggregate::run_aggregate(&config, country)
        }
        Commands::Distribute { country, ratio } => {
            let mut config = resolve_config(&cli)?;
            if !ratio.is_empty() {
                config.ratios = ratio.clone();
            }
            aggregate::run_distribute(&config, country)
        }
        Commands::Status => {
            let config = resolve_config(&cli)?;
            status::run(&config)
        }
    }
}

/// Config file values with command-line overrides applied.
fn resolve_config(cli: &Cli) -> Result<ModelConfig> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let mut config = load_model_config(cli.config.as_deref(), &cwd)?;

    if let Some(root) = &cli.corpus_root {
        config.corpus_root = root.clone();
    }
    if let Some(root) = &cli.output_root {
        config.output_root = root.clone();
    }
    if let Some(suffix) = &cli.corpus_suffix {
        config.corpus_suffix = suffix.clone();
    }
    if let Some(components) = &cli.components {
        config.components = components.clone();
    }
    if let Some(all_cap) = cli.all_cap_sentinel {
        config.all_cap_sentinel = all_cap;
    }
    if let Some(workers) = cli.workers {
        config.workers = Some(workers);
    }

    config.validate()?;
    Ok(config)
}

/// Global flags for `pwdist aggregate` child processes, so they count with
/// exactly the settings this process resolved.
fn worker_args(cli: &Cli, config: &ModelConfig) -> Vec<OsString> {
    let components = config
        .components
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(",");

    let mut args: Vec<OsString> = Vec::new();
    if let Some(path) = &cli.config {
        args.push("--config".into());
        args.push(path.clone().into_os_string());
    }
    args.push("--corpus-root".into());
    args.push(config.corpus_root.clone().into_os_string());
    args.push("--output-root".into());
    args.push(config.output_root.clone().into_os_string());
    args.push("--corpus-suffix".into());
    args.push(config.corpus_suffix.clone().into());
    args.push("--components".into());
    args.push(components.into());
    args.push("--all-cap-sentinel".into());
    args.push(config.all_cap_sentinel.to_string().into());
    args.push("--log-level".into());
    args.push(cli.log_level.clone().into());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workers_bounds() {
        assert_eq!(parse_workers("8"), Ok(8));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("many").is_err());
    }

    #[test]
    fn test_parse_ratio() {
        assert_eq!(parse_ratio("500"), Ok(500));
        assert!(parse_ratio("0").is_err());
        assert!(parse_ratio("-1").is_err());
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "pwdist",
            "run",
            "--mode",
            "sequential",
            "--country",
            "Poland",
            "--country",
            "Italy",
            "--components",
            "prefix,base_word",
            "--all-cap-sentinel",
            "true",
        ])
        .unwrap();

        assert_eq!(
            cli.components,
            Some(vec![ComponentKind::Prefix, ComponentKind::BaseWord])
        );
        assert_eq!(cli.all_cap_sentinel, Some(true));
        match cli.command {
            Commands::Run { mode, country, .. } => {
                assert_eq!(mode, ExecutionMode::Sequential);
                assert_eq!(country, vec!["Poland".to_string(), "Italy".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_component_is_rejected() {
        let parsed = Cli::try_parse_from(["pwdist", "status", "--components", "email"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_worker_args_round_trip() {
        let cli = Cli::try_parse_from([
            "pwdist",
            "--output-root",
            "out",
            "--components",
            "suffix",
            "run",
        ])
        .unwrap();
        let config = ModelConfig {
            output_root: PathBuf::from("out"),
            components: vec![ComponentKind::Suffix],
            ..Default::default()
        };

        let mut argv: Vec<OsString> = vec!["pwdist".into()];
        argv.extend(worker_args(&cli, &config));
        argv.extend(["aggregate".into(), "--country".into(), "Poland".into()]);

        let child = Cli::try_parse_from(argv).unwrap();
        assert_eq!(child.output_root, Some(PathBuf::from("out")));
        assert_eq!(child.components, Some(vec![ComponentKind::Suffix]));
        assert_eq!(child.all_cap_sentinel, Some(false));
        assert!(matches!(child.command, Commands::Aggregate { ref country } if country == "Poland"));
    }
}
