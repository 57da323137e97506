mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use catalog_search::search::EntityKind;

#[derive(Parser)]
#[command(name = "catalog-search")]
#[command(about = "Semantic search over property listings and company profiles, as an MCP server or CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    // ===== MCP Server (also default) =====
    /// Start MCP server
    #[cfg(feature = "mcp")]
    Mcp {
        #[arg(long, help = "Show MCP client configuration instructions")]
        install: bool,
    },

    // ===== Setup =====
    /// Write a starter config file
    Init {
        #[arg(help = "Config file path (default: catalog-search.json)")]
        path: Option<PathBuf>,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },

    // ===== Catalog =====
    /// Semantic search over a catalog
    Search {
        #[arg(value_parser = parse_kind, help = "properties or companies")]
        kind: EntityKind,
        query: String,
        #[arg(long, short = 'k', help = "Number of results (default: 5)")]
        top_k: Option<usize>,
        #[arg(
            long = "filter",
            short = 'f',
            help = "Metadata filter, repeatable (e.g. price<=1000000, location=Austin)"
        )]
        filters: Vec<String>,
        #[arg(long, short, help = "Explain why each result matches")]
        reasoning: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Embed and upsert records from a JSON file
    Ingest {
        #[arg(value_parser = parse_kind, help = "properties or companies")]
        kind: EntityKind,
        file: PathBuf,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show vector index statistics
    Stats {
        #[arg(value_parser = parse_kind, help = "properties or companies")]
        kind: EntityKind,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
}

fn parse_kind(s: &str) -> Result<EntityKind, String> {
    EntityKind::parse(s).ok_or_else(|| format!("unknown kind '{}': expected properties or companies", s))
}

fn main() -> anyhow::Result<()> {
    // stdout carries MCP frames and JSON output; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("catalog_search=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        // Default: run MCP server
        None => {
            #[cfg(feature = "mcp")]
            {
                run_mcp_server()
            }
            #[cfg(not(feature = "mcp"))]
            {
                eprintln!("MCP feature not enabled. Build with --features mcp");
                std::process::exit(1);
            }
        }

        // MCP Server
        #[cfg(feature = "mcp")]
        Some(Commands::Mcp { install }) => {
            if install {
                print_mcp_install_instructions();
                Ok(())
            } else {
                run_mcp_server()
            }
        }

        Some(Commands::Init { path, force }) => commands::init::run(path, force),

        Some(Commands::Search {
            kind,
            query,
            top_k,
            filters,
            reasoning,
            json,
        }) => commands::search::run(commands::search::SearchArgs {
            kind,
            query,
            top_k,
            filters,
            reasoning,
            json,
        }),
        Some(Commands::Ingest { kind, file, json }) => commands::ingest::run(kind, &file, json),
        Some(Commands::Stats { kind, json }) => commands::stats::run(kind, json),
    }
}

#[cfg(feature = "mcp")]
fn run_mcp_server() -> anyhow::Result<()> {
    let config = catalog_search::core::config::Config::load();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(catalog_search::mcp::run_mcp_server(config))
}

#[cfg(feature = "mcp")]
fn print_mcp_install_instructions() {
    use catalog_search::core::config::{Config, CONFIG_ENV, DEFAULT_CONFIG_FILE};
    use colored::Colorize;

    let config_path = Config::config_path()
        .and_then(|p| std::fs::canonicalize(p).ok())
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    println!("{}", "catalog-search MCP Server Installation Guide".bold().cyan());
    println!();
    println!("{}", "Configuration Priority:".bold());
    println!("  1. {} environment variable", CONFIG_ENV.yellow());
    println!("  2. {} in the working directory", DEFAULT_CONFIG_FILE.yellow());
    println!("  3. Built-in defaults");
    println!(
        "  {} and {} always override the file",
        "OPENAI_API_KEY".yellow(),
        "PINECONE_API_KEY".yellow()
    );
    println!();
    println!("{}", "For an MCP client config (e.g. .mcp.json):".dimmed());
    println!(
        r#"{{
  "mcpServers": {{
    "catalog-search": {{
      "command": "catalog-search",
      "args": ["mcp"],
      "env": {{
        "{}": "{}",
        "OPENAI_API_KEY": "sk-...",
        "PINECONE_API_KEY": "..."
      }}
    }}
  }}
}}"#,
        CONFIG_ENV, config_path
    );
    println!();
    println!("{}", "Available tools:".bold());
    println!(
        "  • {} - Semantic search over property listings",
        "search_properties".green()
    );
    println!(
        "  • {} - Semantic search over company profiles, with optional reasoning",
        "search_companies".green()
    );
    println!("  • {} - Vector index statistics", "index_stats".green());
}
