//! Catalog ingestion
//!
//! Reads catalog records, builds each record's description text, embeds it
//! and upserts the vectors in batches. Ids are the record's own `id` when
//! present, otherwise its position in the source.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::catalog::CatalogRecord;
use crate::error::IndexError;
use crate::search::{Embedder, VectorIndex, VectorRecord};

/// Outcome of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub index: String,
    pub started_at: DateTime<Utc>,
    pub upserted: usize,
    /// Records without a name
    pub skipped: usize,
    /// Records whose embedding failed
    pub failed: usize,
    pub duration_ms: u128,
}

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, batch_size: usize) -> Self {
        Self {
            embedder,
            index,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed and upsert every record; index errors abort the run
    pub async fn ingest<T: CatalogRecord>(&self, records: &[T]) -> Result<IngestReport, IndexError> {
        let start = Instant::now();
        let mut report = IngestReport {
            index: format!("{}:{}", self.index.name(), T::KIND.plural()),
            started_at: Utc::now(),
            ..Default::default()
        };

        let eligible: Vec<(String, &T)> = records
            .iter()
            .enumerate()
            .filter_map(|(position, record)| {
                if record.display_name().trim().is_empty() {
                    warn!(position, "skipping record without a name");
                    report.skipped += 1;
                    return None;
                }
                let id = record
                    .record_id()
                    .map(str::to_string)
                    .unwrap_or_else(|| position.to_string());
                Some((id, record))
            })
            .collect();

        for (batch_no, batch) in eligible.chunks(self.batch_size).enumerate() {
            let vectors = self.embed_batch(batch, &mut report).await;
            let upserted = self.index.upsert(vectors).await?;
            report.upserted += upserted;
            info!(
                batch = batch_no + 1,
                upserted,
                failed = report.failed,
                "batch ingested"
            );
        }

        report.duration_ms = start.elapsed().as_millis();
        Ok(report)
    }

    /// Embed one batch; on a batch failure each record is retried alone so
    /// only the records that really fail are dropped
    async fn embed_batch<T: CatalogRecord>(
        &self,
        batch: &[(String, &T)],
        report: &mut IngestReport,
    ) -> Vec<VectorRecord> {
        let texts: Vec<String> = batch.iter().map(|(_, r)| r.embedding_text()).collect();

        let embeddings: Vec<Option<Vec<f32>>> = match self.embedder.embed_batch(&texts).await {
            Ok(all) => all.into_iter().map(Some).collect(),
            Err(e) => {
                warn!(error = %e, size = batch.len(), "batch embedding failed; embedding records one by one");
                let mut each = Vec::with_capacity(texts.len());
                for (text, (id, _)) in texts.iter().zip(batch) {
                    match self.embedder.embed(text).await {
                        Ok(v) => each.push(Some(v)),
                        Err(e) => {
                            warn!(id = %id, error = %e, "embedding failed");
                            each.push(None);
                        }
                    }
                }
                each
            }
        };

        batch
            .iter()
            .zip(embeddings)
            .filter_map(|((id, record), embedding)| match embedding {
                Some(values) => Some(VectorRecord {
                    id: id.clone(),
                    values,
                    metadata: record.metadata(),
                }),
                None => {
                    report.failed += 1;
                    None
                }
            })
            .collect()
    }
}

/// Read a JSON array of catalog records
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse records from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CompanyProfile, PropertyListing};
    use crate::error::EmbeddingError;
    use crate::search::testing::{MemoryIndex, ScriptedEmbedder};
    use crate::search::{EntityKind, FieldFilters, HtpEmbedder, LocalIndex, RetrievalEngine};
    use async_trait::async_trait;
    use serde_json::json;

    fn listings() -> Vec<PropertyListing> {
        serde_json::from_value(json!([
            {"property_name": "Villa Sol", "bedrooms": 4, "location": "Miami, FL",
             "size_sqft": 2400, "price_usd": 850000, "view": "ocean view"},
            {"property_name": "  ", "bedrooms": 1, "location": "Nowhere",
             "size_sqft": 400, "price_usd": 100000},
            {"id": "pent-23", "property_name": "Penthouse #23", "bedrooms": 5,
             "location": "\"Palm Springs, CA\"", "size_sqft": 2349, "price_usd": 2206633}
        ]))
        .unwrap()
    }

    /// Fails whole batches and any text mentioning "Penthouse"
    struct FlakyEmbedder(HtpEmbedder);

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.contains("Penthouse") {
                return Err(EmbeddingError::Transport("timeout".to_string()));
            }
            self.0.embed(text).await
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Err(EmbeddingError::Transport("batch rejected".to_string()))
        }

        fn dimension(&self) -> usize {
            self.0.dimension()
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_ingest_properties() {
        let index = Arc::new(MemoryIndex::new());
        let ingestor = Ingestor::new(Arc::new(ScriptedEmbedder::new()), index.clone(), 1);

        let report = ingestor.ingest(&listings()).await.unwrap();
        assert_eq!(report.upserted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.index, "memory:properties");

        let engine = RetrievalEngine::new(EntityKind::Property, Arc::new(ScriptedEmbedder::new()), index);
        let matches = engine.retrieve("penthouse", 5, &FieldFilters::new()).await.unwrap();
        let mut ids: Vec<_> = matches.iter().map(|m| m.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["0", "pent-23"]);
    }

    #[tokio::test]
    async fn test_embedding_failures_counted() {
        let index = Arc::new(MemoryIndex::new());
        let ingestor = Ingestor::new(Arc::new(FlakyEmbedder(HtpEmbedder::new())), index.clone(), 10);

        let report = ingestor.ingest(&listings()).await.unwrap();
        assert_eq!(report.upserted, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_reingest_replaces_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(LocalIndex::open(&dir.path().join("companies.db")).unwrap());
        let ingestor = Ingestor::new(Arc::new(HtpEmbedder::new()), index.clone(), 50);

        let companies: Vec<CompanyProfile> = serde_json::from_value(json!([{
            "company_name": "DataPeak",
            "basic_info": {"industry": "SaaS", "headquarters": "Austin, TX", "revenue": "$120M", "employees": 450},
            "deal_analysis": {"business_model": "Subscriptions", "strategic_priorities": [],
                              "ideal_op_profile": {"industry": "Software"}}
        }]))
        .unwrap();

        ingestor.ingest(&companies).await.unwrap();
        ingestor.ingest(&companies).await.unwrap();
        assert_eq!(index.stats().await.unwrap().total_vectors, 1);
    }

    #[test]
    fn test_load_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.json");
        std::fs::write(&path, serde_json::to_string(&listings()).unwrap()).unwrap();

        let loaded: Vec<PropertyListing> = load_records(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[2].id.as_deref(), Some("pent-23"));

        std::fs::write(&path, "{not json").unwrap();
        assert!(load_records::<PropertyListing>(&path).is_err());
    }
}
