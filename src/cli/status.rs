//! Status command - show what has been built per country

use anyhow::Result;
use console::style;
use pwdist::config::ModelConfig;
use pwdist::counts::CountStore;
use pwdist::distribution::{read_distribution, DistributionStore};
use std::path::Path;

/// Run the status command
pub fn run(config: &ModelConfig) -> Result<()> {
    println!("\npwdist Status\n");
    println!("  Corpus: {}", style(config.corpus_root.display()).cyan());
    println!("  Models: {}", style(config.output_root.display()).cyan());
    println!();

    for country in &config.countries {
        print_country(config, country);
    }

    println!();
    Ok(())
}

fn print_country(config: &ModelConfig, country: &str) {
    let dir = config.country_dir(country);
    let counts = CountStore::new(&dir);
    let distributions = DistributionStore::new(&dir);

    let corpus = if config.corpus_dir(country).is_dir() {
        style("corpus").green()
    } else {
        style("no corpus").dim()
    };

    match counts.read_summary() {
        Some((total, illegal)) => println!(
            "  {} {:<34} {} passwords, {} illegal  [{}]",
            style("[OK]").green(),
            country,
            style(total).cyan(),
            style(illegal).yellow(),
            corpus
        ),
        None => {
            println!(
                "  {} {:<34} not built  [{}]",
                style("[--]").dim(),
                country,
                corpus
            );
            return;
        }
    }

    if !counts.count_dict_path().exists() {
        println!("      {}", style("count_dict.json not saved").dim());
    }

    let tables = count_tables(&distributions.distributions_dir());
    let ratios: Vec<String> = config
        .ratios
        .iter()
        .filter(|r| distributions.metadata_path(**r).exists())
        .map(|r| r.to_string())
        .collect();
    println!(
        "      {} distribution files, truncated at [{}]",
        style(tables).cyan(),
        ratios.join(", ")
    );

    let base_words = distributions.table_path("a2");
    if let Ok(entries) = read_distribution(&base_words) {
        if let Some((word, prob)) = entries.iter().max_by(|a, b| a.1.total_cmp(&b.1)) {
            println!("      top base word: {} ({:.4})", style(word).bold(), prob);
        }
    }
}

fn count_tables(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "txt"))
                .count()
        })
        .unwrap_or(0)
}
