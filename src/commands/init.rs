//! Init command - write a starter configuration file

use anyhow::{bail, Result};
use colored::*;
use std::path::PathBuf;

use catalog_search::core::config::{Config, DEFAULT_CONFIG_FILE};

pub fn run(path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    println!("{}", "catalog-search Configuration Generator".bold());
    println!("{}", "=".repeat(50));
    println!();

    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    let existed = config_path.exists();
    Config::default().save(&config_path)?;

    if existed {
        println!("{} Overwrote {}", "✓".green(), config_path.display());
    } else {
        println!("{} Created {}", "✓".green(), config_path.display());
    }

    println!();
    println!("Next steps:");
    println!(
        "  1. Export {} and {}",
        "OPENAI_API_KEY".yellow(),
        "PINECONE_API_KEY".yellow()
    );
    println!(
        "  2. Set {} / {} to your index hosts",
        "pinecone.property_host".cyan(),
        "pinecone.company_host".cyan()
    );
    println!(
        "     (or set {} to {} for an offline index)",
        "backend.index".cyan(),
        "\"local\"".cyan()
    );
    println!(
        "  3. {}",
        "catalog-search ingest properties listings.json".cyan()
    );

    Ok(())
}
