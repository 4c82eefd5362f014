//! Run command - build models for a list of countries

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use pwdist::config::ModelConfig;
use pwdist::counts::CountStore;
use pwdist::orchestrator::{
    AggregationLauncher, ExecutionMode, InProcessLauncher, Orchestrator, RunReport, Stage,
    SubprocessLauncher,
};
use std::ffi::OsString;
use std::sync::Arc;

pub struct RunOptions {
    pub mode: ExecutionMode,
    pub load_from_file: bool,
    pub countries: Vec<String>,
    pub in_process: bool,
    pub worker_args: Vec<OsString>,
}

/// Create bar progress style
fn create_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ")
}

/// Run the build
pub fn run(config: ModelConfig, opts: RunOptions) -> Result<()> {
    let countries = if opts.countries.is_empty() {
        config.countries.clone()
    } else {
        opts.countries
    };
    if countries.is_empty() {
        anyhow::bail!("No countries to process. Set `countries` in pwdist.toml or pass --country");
    }

    println!(
        "\n{} Building {} {} ({} mode)\n",
        style("▶").cyan().bold(),
        style(countries.len()).bold(),
        if countries.len() == 1 { "country" } else { "countries" },
        opts.mode
    );

    let launcher: Arc<dyn AggregationLauncher> = if opts.in_process {
        Arc::new(InProcessLauncher::new(config.clone()))
    } else {
        Arc::new(SubprocessLauncher::current_exe(opts.worker_args)?)
    };

    let steps = if opts.load_from_file { 1 } else { 2 };
    let bar = ProgressBar::new((countries.len() * steps) as u64);
    bar.set_style(create_bar_style());
    let progress_bar = bar.clone();
    let load_from_file = opts.load_from_file;

    let orchestrator = Orchestrator::new(config.clone())
        .with_mode(opts.mode)
        .with_load_from_file(opts.load_from_file)
        .with_launcher(launcher)
        .with_progress(Arc::new(move |country: &str, stage: Stage, _done: usize, _total: usize| {
            // With saved counts the aggregate step is only a load
            if load_from_file && stage == Stage::Aggregate {
                return;
            }
            progress_bar.inc(1);
            progress_bar.set_message(format!("{} {}", stage, country));
        }));

    let report = orchestrator.run(&countries)?;
    bar.finish_and_clear();

    print_report(&config, &report);

    if !report.is_success() {
        anyhow::bail!(
            "{} of {} countries failed",
            report.failures.len(),
            countries.len()
        );
    }
    Ok(())
}

fn print_report(config: &ModelConfig, report: &RunReport) {
    for country in &report.completed {
        let totals = CountStore::new(config.country_dir(country)).read_summary();
        match totals {
            Some((total, illegal)) => println!(
                "  {} {:<34} {} passwords, {} illegal",
                style("✓").green(),
                country,
                style(total).cyan(),
                style(illegal).yellow()
            ),
            None => println!("  {} {}", style("✓").green(), country),
        }
    }
    for failure in &report.failures {
        println!(
            "  {} {:<34} {} failed: {}",
            style("✗").red(),
            failure.country,
            failure.stage,
            style(&failure.message).red()
        );
    }

    println!(
        "\n  Models in {}  ({:.1}s)\n",
        style(config.output_root.display()).cyan(),
        report.elapsed().num_milliseconds() as f64 / 1000.0
    );
}
