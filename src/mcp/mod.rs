//! MCP server for catalog search
//!
//! Exposes property and company retrieval as tools over stdio.

mod params;
mod server;

pub use server::{run_mcp_server, CatalogService};
