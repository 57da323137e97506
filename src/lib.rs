//! Semantic retrieval over property listings and company profiles

pub mod catalog;
pub mod core;
pub mod error;
pub mod ingest;
#[cfg(feature = "mcp")]
pub mod mcp;
pub mod search;
