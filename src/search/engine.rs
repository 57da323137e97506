//! Retrieval engine
//!
//! One engine serves both catalogs; the [`EntitySchema`] decides which filter
//! fields exist and what gets projected. A search validates its input, embeds
//! the query once, issues a single index query and hands the matches, in the
//! index's order, to the projector.

use std::sync::Arc;
use tracing::{debug, info};

use super::embedder::Embedder;
use super::filter::FieldFilters;
use super::index::{IndexStats, RankedMatch, VectorIndex};
use super::projector::{project, SearchResult};
use super::reasoning::{ReasoningAugmenter, ReasoningProvider};
use super::schema::{EntityKind, EntitySchema, NormalizedFilters};
use crate::core::config::SearchSettings;
use crate::error::{Result, SearchError};

/// Results per search when the caller does not say otherwise
pub const DEFAULT_TOP_K: usize = 5;

pub struct RetrievalEngine {
    schema: &'static EntitySchema,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    reasoner: Option<Arc<dyn ReasoningProvider>>,
    settings: SearchSettings,
}

impl RetrievalEngine {
    pub fn new(kind: EntityKind, embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            schema: kind.schema(),
            embedder,
            index,
            reasoner: None,
            settings: SearchSettings::default(),
        }
    }

    pub fn with_reasoner(mut self, reasoner: Arc<dyn ReasoningProvider>) -> Self {
        self.reasoner = Some(reasoner);
        self
    }

    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.schema.kind
    }

    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    /// Input checks; everything here runs before any network call
    fn prepare(&self, query: &str, top_k: usize, filters: &FieldFilters) -> Result<NormalizedFilters> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("query text must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(SearchError::InvalidTopK);
        }
        self.schema.normalize_filters(filters)
    }

    async fn query_index(
        &self,
        query: &str,
        top_k: usize,
        filters: &NormalizedFilters,
    ) -> Result<Vec<RankedMatch>> {
        let vector = self.embedder.embed(query).await?;
        debug!(
            embedder = self.embedder.name(),
            dims = vector.len(),
            "query embedded"
        );

        let limit = top_k.min(self.settings.max_top_k.max(1));
        let matches = self
            .index
            .query(&vector, limit, filters.predicate.as_ref())
            .await?;

        debug!(
            index = self.index.name(),
            top_k = limit,
            filtered = filters.predicate.is_some(),
            returned = matches.len(),
            "index queried"
        );
        Ok(matches)
    }

    /// Raw ranked matches for a query, in the index's descending-score order
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filters: &FieldFilters,
    ) -> Result<Vec<RankedMatch>> {
        let normalized = self.prepare(query, top_k, filters)?;
        self.query_index(query, top_k, &normalized).await
    }

    pub async fn search(&self, query: &str, top_k: usize, filters: &FieldFilters) -> Result<SearchResult> {
        let normalized = self.prepare(query, top_k, filters)?;
        let matches = self.query_index(query, top_k, &normalized).await?;
        let result = project(self.schema, &matches, query, top_k, &normalized.applied);

        info!(
            kind = self.schema.kind.plural(),
            top_k,
            filters = result.filters_applied.len(),
            found = result.total_found,
            "search complete"
        );
        Ok(result)
    }

    /// Search, then attach a reasoning string to every record.
    ///
    /// Reasoning is best-effort and never fails the search.
    pub async fn search_with_reasoning(
        &self,
        query: &str,
        top_k: usize,
        filters: &FieldFilters,
    ) -> Result<SearchResult> {
        let mut result = self.search(query, top_k, filters).await?;
        let augmenter =
            ReasoningAugmenter::new(self.reasoner.clone(), self.settings.reasoning_concurrency);
        augmenter
            .augment(self.schema.kind, query, &mut result.records)
            .await;
        Ok(result)
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        Ok(self.index.stats().await?)
    }
}
