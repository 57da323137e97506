//! Pinecone data-plane client
//!
//! Talks to one serverless/pod index over REST: `/query`, `/vectors/upsert`
//! and `/describe_index_stats`. Predicates are rendered in Pinecone's metadata
//! filter language and evaluated server-side.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use super::filter::{Metadata, Predicate};
use super::index::{IndexStats, RankedMatch, VectorIndex, VectorRecord};
use crate::core::config::Config;
use crate::error::IndexError;
use crate::search::EntityKind;

const API_VERSION: &str = "2024-07";

pub struct PineconeIndex {
    client: reqwest::Client,
    host: String,
    api_key: String,
    namespace: String,
}

// ===== Wire types =====

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a Metadata,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<UpsertVector<'a>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeStatsResponse {
    #[serde(default)]
    namespaces: BTreeMap<String, NamespaceSummary>,
    #[serde(default)]
    dimension: Option<usize>,
    #[serde(default)]
    index_fullness: Option<f64>,
    #[serde(default)]
    total_vector_count: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceSummary {
    #[serde(default)]
    vector_count: u64,
}

impl PineconeIndex {
    pub fn new(host: &str, api_key: String, namespace: String) -> Self {
        let host = host.trim_end_matches('/');
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        Self {
            client: reqwest::Client::new(),
            host,
            api_key,
            namespace,
        }
    }

    pub fn from_config(config: &Config, kind: EntityKind) -> Result<Self, IndexError> {
        let pinecone = &config.pinecone;
        let api_key = pinecone
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| IndexError::Config("PINECONE_API_KEY is not set".to_string()))?;
        let host = pinecone.host_for(kind).ok_or_else(|| {
            IndexError::Config(format!("pinecone.{}_host is not configured", kind.singular()))
        })?;

        Ok(Self::new(host, api_key, pinecone.namespace.clone()))
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, IndexError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| IndexError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| IndexError::Decode(e.to_string()))
    }
}

fn into_matches(response: QueryResponse) -> Vec<RankedMatch> {
    response
        .matches
        .into_iter()
        .map(|m| RankedMatch {
            id: m.id,
            score: m.score,
            metadata: m.metadata.unwrap_or_default(),
        })
        .collect()
}

fn into_stats(response: DescribeStatsResponse) -> IndexStats {
    IndexStats {
        total_vectors: response.total_vector_count,
        dimension: response.dimension,
        index_fullness: response.index_fullness,
        namespaces: response
            .namespaces
            .into_iter()
            .map(|(name, summary)| (name, summary.vector_count))
            .collect(),
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, IndexError> {
        if records.is_empty() {
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors: records
                .iter()
                .map(|r| UpsertVector {
                    id: &r.id,
                    values: &r.values,
                    metadata: &r.metadata,
                })
                .collect(),
            namespace: &self.namespace,
        };

        let response: UpsertResponse = self.post("/vectors/upsert", &request).await?;
        Ok(response.upserted_count)
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Predicate>,
    ) -> Result<Vec<RankedMatch>, IndexError> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            filter: filter.map(Predicate::to_pinecone),
            namespace: &self.namespace,
        };

        let response: QueryResponse = self.post("/query", &request).await?;
        let matches = into_matches(response);
        debug!(host = %self.host, returned = matches.len(), "pinecone query");
        Ok(matches)
    }

    async fn stats(&self) -> Result<IndexStats, IndexError> {
        let response: DescribeStatsResponse = self
            .post("/describe_index_stats", &serde_json::json!({}))
            .await?;
        Ok(into_stats(response))
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::filter::{FieldPredicate, FilterClause};
    use serde_json::json;

    #[test]
    fn test_host_normalization() {
        let index = PineconeIndex::new("props-abc.svc.pinecone.io/", "k".to_string(), String::new());
        assert_eq!(index.host, "https://props-abc.svc.pinecone.io");

        let index = PineconeIndex::new("http://localhost:5080", "k".to_string(), String::new());
        assert_eq!(index.host, "http://localhost:5080");
    }

    #[test]
    fn test_query_request_body() {
        let predicate = Predicate::all(vec![FieldPredicate {
            key: "price_usd".to_string(),
            clause: FilterClause::Lte(1000000i64.into()),
        }]);
        let request = QueryRequest {
            vector: &[0.5, 0.25],
            top_k: 3,
            include_metadata: true,
            include_values: false,
            filter: predicate.as_ref().map(Predicate::to_pinecone),
            namespace: "",
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "vector": [0.5, 0.25],
                "topK": 3,
                "includeMetadata": true,
                "includeValues": false,
                "filter": {"price_usd": {"$lte": 1000000}}
            })
        );
    }

    #[test]
    fn test_query_response_parsing() {
        let response: QueryResponse = serde_json::from_value(json!({
            "matches": [
                {"id": "3", "score": 0.91, "metadata": {"property_name": "Villa Sol"}},
                {"id": "7", "score": 0.85}
            ],
            "namespace": ""
        }))
        .unwrap();

        let matches = into_matches(response);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "3");
        assert_eq!(matches[0].metadata["property_name"], json!("Villa Sol"));
        assert!(matches[1].metadata.is_empty());
    }

    #[test]
    fn test_stats_parsing() {
        let response: DescribeStatsResponse = serde_json::from_value(json!({
            "namespaces": {"": {"vectorCount": 120}},
            "dimension": 3072,
            "indexFullness": 0.0,
            "totalVectorCount": 120
        }))
        .unwrap();

        let stats = into_stats(response);
        assert_eq!(stats.total_vectors, 120);
        assert_eq!(stats.dimension, Some(3072));
        assert_eq!(stats.namespaces[""], 120);
    }

    #[test]
    fn test_from_config_requires_host() {
        let mut config = Config::default();
        config.pinecone.api_key = Some("pc-key".to_string());
        let err = PineconeIndex::from_config(&config, EntityKind::Company)
            .err()
            .unwrap();
        assert!(matches!(err, IndexError::Config(_)));
    }
}
