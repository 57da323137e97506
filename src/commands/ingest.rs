//! Ingest command - embed catalog records and upsert them into the index

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use catalog_search::catalog::{CompanyProfile, PropertyListing};
use catalog_search::core::config::Config;
use catalog_search::ingest::{load_records, IngestReport, Ingestor};
use catalog_search::search::{create_embedder, open_index, EntityKind};

pub fn run(kind: EntityKind, file: &Path, json: bool) -> Result<()> {
    let config = Config::load();
    let embedder = create_embedder(&config)?;
    let index = open_index(&config, kind)?;
    let ingestor = Ingestor::new(embedder, index, config.ingest.batch_size);

    if !json {
        println!(
            "{} Ingesting {} from {}...",
            "→".dimmed(),
            kind.plural(),
            file.display()
        );
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let report = match kind {
        EntityKind::Property => {
            let records: Vec<PropertyListing> = load_records(file)?;
            runtime.block_on(ingestor.ingest(&records))?
        }
        EntityKind::Company => {
            let records: Vec<CompanyProfile> = load_records(file)?;
            runtime.block_on(ingestor.ingest(&records))?
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &IngestReport) {
    println!();
    println!(
        "{} Upserted {} vectors into {} in {:.2}s",
        "✓".green().bold(),
        report.upserted.to_string().cyan(),
        report.index,
        report.duration_ms as f64 / 1000.0
    );
    if report.skipped > 0 {
        println!(
            "  {} {} records skipped (missing name)",
            "→".dimmed(),
            report.skipped
        );
    }
    if report.failed > 0 {
        println!(
            "  {} {} records failed to embed",
            "✗".red(),
            report.failed.to_string().red()
        );
    }
}
