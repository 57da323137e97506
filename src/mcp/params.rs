//! Parameter structures for MCP tools

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Parameters for search_properties and search_companies
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    /// Natural language search query (e.g., "3 bedroom house near the beach")
    #[schemars(description = "Natural language search query")]
    pub query: String,
    /// Number of results to return (default: 5, max: 100)
    #[schemars(description = "Number of results (default: 5, max: 100)")]
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Metadata filters keyed by field name
    #[schemars(
        description = "Metadata filters keyed by field. A plain value means equality; an object uses one operator: eq, gt, gte, lt, lte, in (e.g., {\"price\": {\"lte\": 1000000}})"
    )]
    #[serde(default)]
    pub filters: Option<Map<String, Value>>,
    /// Attach a short explanation to each result
    #[schemars(description = "Explain why each result matches the query (default: false)")]
    #[serde(default)]
    pub with_reasoning: bool,
}

pub fn default_top_k() -> usize {
    crate::search::DEFAULT_TOP_K
}

/// Parameters for index_stats
#[derive(Debug, Deserialize, JsonSchema)]
pub struct StatsParams {
    #[schemars(description = "Catalog to inspect: 'properties' or 'companies'")]
    pub kind: String,
}
