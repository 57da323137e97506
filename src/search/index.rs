//! Vector index contract
//!
//! The index owns all durable state: vectors, their metadata, and the ranking.
//! Matches come back ordered by descending cosine score.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use super::filter::{Metadata, Predicate};
use crate::error::IndexError;

/// A vector and its metadata, as written by ingestion
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Metadata,
}

/// One similarity hit returned by the index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedMatch {
    pub id: String,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub total_vectors: u64,
    pub dimension: Option<usize>,
    /// Pinecone pod fullness; absent for the local index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_fullness: Option<f64>,
    /// Vector count per namespace
    pub namespaces: BTreeMap<String, u64>,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace records by id
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, IndexError>;

    /// Top-k nearest records satisfying the predicate, by descending score
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Predicate>,
    ) -> Result<Vec<RankedMatch>, IndexError>;

    async fn stats(&self) -> Result<IndexStats, IndexError>;

    /// Backend name for logs
    fn name(&self) -> &str;
}
