//! Catalog MCP Server implementation

use anyhow::Result;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerInfo},
    tool, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use std::sync::Arc;
use tracing::info;

use super::params::{SearchParams, StatsParams};
use crate::core::config::Config;
use crate::error::SearchError;
use crate::search::{
    open_engine, open_index, EntityKind, FieldFilters, FilterInput, RetrievalEngine, VectorIndex,
};

/// Catalog MCP Service
#[derive(Clone)]
pub struct CatalogService {
    config: Arc<Config>,
    tool_router: ToolRouter<Self>,
}

impl CatalogService {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            tool_router: Self::tool_router(),
        }
    }

    fn get_engine(&self, kind: EntityKind) -> Result<RetrievalEngine, McpError> {
        open_engine(&self.config, kind).map_err(|e| {
            McpError::internal_error(format!("Failed to open {} engine: {}", kind.singular(), e), None)
        })
    }

    async fn run_search(&self, kind: EntityKind, params: SearchParams) -> Result<String, McpError> {
        let engine = self.get_engine(kind)?;
        let filters: FieldFilters = params
            .filters
            .unwrap_or_default()
            .into_iter()
            .map(|(field, value)| (field, FilterInput::Raw(value)))
            .collect();

        let result = if params.with_reasoning {
            engine
                .search_with_reasoning(&params.query, params.top_k, &filters)
                .await
        } else {
            engine.search(&params.query, params.top_k, &filters).await
        }
        .map_err(to_mcp_error)?;

        serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(format!("JSON serialization failed: {}", e), None))
    }

    async fn run_stats(&self, kind: &str) -> Result<String, McpError> {
        let kind = EntityKind::parse(kind).ok_or_else(|| {
            McpError::invalid_params(
                format!("Unknown kind '{}': expected 'properties' or 'companies'", kind),
                None,
            )
        })?;
        let index = open_index(&self.config, kind).map_err(|e| {
            McpError::internal_error(format!("Failed to open {} index: {}", kind.plural(), e), None)
        })?;
        let stats = index
            .stats()
            .await
            .map_err(|e| McpError::internal_error(format!("Stats failed: {}", e), None))?;

        let output = serde_json::json!({
            "kind": kind.plural(),
            "backend": index.name(),
            "stats": stats,
        });
        serde_json::to_string_pretty(&output)
            .map_err(|e| McpError::internal_error(format!("JSON serialization failed: {}", e), None))
    }
}

fn to_mcp_error(err: SearchError) -> McpError {
    if err.is_input_error() {
        McpError::invalid_params(err.to_string(), None)
    } else {
        McpError::internal_error(format!("Search failed: {}", err), None)
    }
}

#[tool_router]
impl CatalogService {
    /// Search property listings
    #[tool(
        description = "Search property listings by meaning. Filterable fields: price, location, bedrooms, size, property_type, view. Returns ranked listings with similarity scores and a summary."
    )]
    async fn search_properties(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(query = %params.0.query, "search_properties");
        let output = self.run_search(EntityKind::Property, params.0).await?;
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    /// Search company profiles
    #[tool(
        description = "Search company profiles by meaning. Filterable fields: industry, location, revenue, employees. With with_reasoning=true each company gets an LLM explanation of the match."
    )]
    async fn search_companies(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        info!(query = %params.0.query, "search_companies");
        let output = self.run_search(EntityKind::Company, params.0).await?;
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    /// Vector index statistics
    #[tool(description = "Show vector count, dimension and namespaces of a catalog index.")]
    async fn index_stats(&self, params: Parameters<StatsParams>) -> Result<CallToolResult, McpError> {
        let output = self.run_stats(&params.0.kind).await?;
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }
}

#[rmcp::tool_handler]
impl ServerHandler for CatalogService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Catalog Search MCP Server. Semantic search over property listings and company profiles with metadata filters.".to_string()
            ),
            ..Default::default()
        }
    }
}

/// Run the MCP server
pub async fn run_mcp_server(config: Config) -> Result<()> {
    use tokio::io::{stdin, stdout};

    let service = CatalogService::new(config);
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
