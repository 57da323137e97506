//! Stats command - vector index statistics

use anyhow::Result;
use colored::Colorize;

use catalog_search::core::config::Config;
use catalog_search::search::{open_index, EntityKind, VectorIndex};

pub fn run(kind: EntityKind, json: bool) -> Result<()> {
    let config = Config::load();
    let index = open_index(&config, kind)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let stats = runtime.block_on(index.stats())?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "index": kind.plural(),
                "backend": index.name(),
                "stats": stats,
            }))?
        );
        return Ok(());
    }

    println!("{}", format!("Index: {} ({})", kind.plural(), index.name()).bold());
    println!("{}", "=".repeat(50));
    println!("  Vectors:    {}", stats.total_vectors.to_string().cyan());
    match stats.dimension {
        Some(dim) => println!("  Dimension:  {}", dim),
        None => println!("  Dimension:  {}", "(empty)".dimmed()),
    }
    if let Some(fullness) = stats.index_fullness {
        println!("  Fullness:   {:.1}%", fullness * 100.0);
    }
    for (namespace, count) in &stats.namespaces {
        let name = if namespace.is_empty() { "(default)" } else { namespace };
        println!("  Namespace {}: {}", name.yellow(), count);
    }

    Ok(())
}
