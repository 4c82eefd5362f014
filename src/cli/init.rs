//! Init command - write a pwdist.toml template

use anyhow::{Context, Result};
use console::style;
use pwdist::config::{CONFIG_FILENAME, CONFIG_TEMPLATE};

/// Run the init command
pub fn run(force: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let config_path = cwd.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    println!("\n  Next: put corpora under data/countries/<country>/ and run {}\n", style("pwdist run").cyan());
    Ok(())
}
