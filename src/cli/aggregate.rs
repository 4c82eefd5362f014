//! Aggregate and distribute commands - one country, one stage

use anyhow::{Context, Result};
use console::style;
use pwdist::config::{validate_country, ModelConfig};
use pwdist::counts::CountStore;
use pwdist::distribution::{build_distributions, DistributionStore};
use pwdist::orchestrator::aggregate_and_persist;

/// Count one country and save its count files.
///
/// Always writes `count_dict.json`: this is the worker entry of parallel runs,
/// whose distribution phase reads it back.
pub fn run_aggregate(config: &ModelConfig, country: &str) -> Result<()> {
    validate_country(country)?;
    let bundle = aggregate_and_persist(config, country, true)
        .with_context(|| format!("Aggregation failed for {}", country))?;

    println!(
        "{} {}: {} passwords, {} illegal",
        style("✓").green(),
        country,
        bundle.total_passwords,
        bundle.illegal_passwords
    );
    for entry in &bundle.entries {
        println!("    {:<20} {} distinct", entry.name, entry.total_size);
    }
    Ok(())
}

/// Build distributions from a country's saved counts.
pub fn run_distribute(config: &ModelConfig, country: &str) -> Result<()> {
    validate_country(country)?;
    let dir = config.country_dir(country);
    let bundle = CountStore::new(&dir).load().with_context(|| {
        format!(
            "No usable counts for {}. Run `pwdist aggregate --country \"{}\"` first",
            country, country
        )
    })?;

    let store = DistributionStore::new(&dir);
    let summaries = build_distributions(&bundle, &config.ratios, &store)
        .with_context(|| format!("Building distributions failed for {}", country))?;

    println!(
        "{} {}: distributions in {}",
        style("✓").green(),
        country,
        style(store.distributions_dir().display()).cyan()
    );
    for summary in &summaries {
        for record in &summary.records {
            println!(
                "    ratio {:>5}  {:<20} n={:<6} mass={:.4}",
                summary.ratio, record.name, record.n, record.retained_mass
            );
        }
    }
    Ok(())
}
