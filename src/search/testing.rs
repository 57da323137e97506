//! Test doubles for the search collaborators

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::embedder::Embedder;
use super::embedding::{cosine_similarity, EmbeddingModel, EMBEDDING_DIM};
use super::filter::{Metadata, Predicate};
use super::index::{IndexStats, RankedMatch, VectorIndex, VectorRecord};
use super::reasoning::{ReasoningPrompt, ReasoningProvider};
use crate::error::{EmbeddingError, IndexError, ReasoningError};

/// HTP-backed embedder that counts calls and can be told to fail
#[derive(Default)]
pub struct ScriptedEmbedder {
    model: EmbeddingModel,
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EmbeddingError::Api {
                status: 429,
                body: "quota exceeded".to_string(),
            });
        }
        Ok(self.model.embed(text))
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// In-memory index that evaluates predicates locally
#[derive(Default)]
pub struct MemoryIndex {
    records: Mutex<Vec<VectorRecord>>,
    queries: AtomicUsize,
    last_top_k: AtomicUsize,
    fail: bool,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn last_top_k(&self) -> usize {
        self.last_top_k.load(Ordering::SeqCst)
    }

    /// Seed with records embedded by the HTP model
    pub fn seed(&self, items: Vec<(String, String, Metadata)>) {
        let model = EmbeddingModel::new();
        let mut records = self.records.lock().unwrap();
        for (id, text, metadata) in items {
            records.retain(|r| r.id != id);
            records.push(VectorRecord {
                id,
                values: model.embed(&text),
                metadata,
            });
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, IndexError> {
        let count = records.len();
        let mut stored = self.records.lock().unwrap();
        for record in records {
            stored.retain(|r| r.id != record.id);
            stored.push(record);
        }
        Ok(count)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Predicate>,
    ) -> Result<Vec<RankedMatch>, IndexError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.last_top_k.store(top_k, Ordering::SeqCst);
        if self.fail {
            return Err(IndexError::Transport("connection reset".to_string()));
        }

        let records = self.records.lock().unwrap();
        let mut matches: Vec<RankedMatch> = records
            .iter()
            .filter(|r| filter.map_or(true, |p| p.matches(&r.metadata)))
            .map(|r| RankedMatch {
                id: r.id.clone(),
                score: cosine_similarity(vector, &r.values),
                metadata: r.metadata.clone(),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn stats(&self) -> Result<IndexStats, IndexError> {
        let total = self.records.lock().unwrap().len() as u64;
        Ok(IndexStats {
            total_vectors: total,
            dimension: Some(EMBEDDING_DIM),
            ..Default::default()
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Reasoner answering "<name> fits the query", failing for listed names
#[derive(Default)]
pub struct ScriptedReasoner {
    failing: Vec<String>,
    calls: AtomicUsize,
    seen: Mutex<HashMap<String, usize>>,
}

impl ScriptedReasoner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// How many prompts named this company
    pub fn calls_for(&self, name: &str) -> usize {
        self.seen.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedReasoner {
    async fn generate(&self, prompt: &ReasoningPrompt) -> Result<String, ReasoningError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = prompt
            .user
            .lines()
            .find_map(|line| line.strip_prefix("- Name: "))
            .unwrap_or("")
            .to_string();
        *self.seen.lock().unwrap().entry(name.clone()).or_default() += 1;

        if self.failing.contains(&name) {
            return Err(ReasoningError::Api {
                status: 500,
                body: "upstream error".to_string(),
            });
        }
        Ok(format!("{} fits the query", name))
    }
}
