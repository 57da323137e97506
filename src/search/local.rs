//! Local vector index backed by SQLite
//!
//! Vectors are stored as little-endian f32 blobs next to their JSON metadata.
//! Queries are a brute-force cosine scan with the predicate evaluated per
//! record, which is fine for catalogs of a few thousand entries.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::embedding::cosine_similarity;
use super::filter::{Metadata, Predicate};
use super::index::{IndexStats, RankedMatch, VectorIndex, VectorRecord};
use crate::error::IndexError;

const DIMENSION_KEY: &str = "dimension";

pub struct LocalIndex {
    conn: Mutex<Connection>,
}

impl LocalIndex {
    /// Open or create a local index file
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                IndexError::Config(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    /// Create with in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, IndexError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, IndexError> {
        let index = Self {
            conn: Mutex::new(conn),
        };
        index.init_schema()?;
        Ok(index)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<(), IndexError> {
        self.conn().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS vectors (
                id TEXT PRIMARY KEY,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS index_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn dimension(conn: &Connection) -> Result<Option<usize>, IndexError> {
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                [DIMENSION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|v| {
                v.parse::<usize>()
                    .map_err(|_| IndexError::Decode(format!("bad stored dimension '{}'", v)))
            })
            .transpose()
    }
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, IndexError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn();
        let expected = match Self::dimension(&conn)? {
            Some(dim) => dim,
            None => records[0].values.len(),
        };
        if let Some(bad) = records.iter().find(|r| r.values.len() != expected) {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: bad.values.len(),
            });
        }

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO index_meta (key, value) VALUES (?1, ?2)",
            params![DIMENSION_KEY, expected.to_string()],
        )?;
        let now = chrono::Utc::now().timestamp();
        for record in &records {
            let metadata = serde_json::to_string(&record.metadata)
                .map_err(|e| IndexError::Decode(e.to_string()))?;
            tx.execute(
                r#"
                INSERT INTO vectors (id, embedding, metadata, updated_at) VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    embedding = excluded.embedding,
                    metadata = excluded.metadata,
                    updated_at = excluded.updated_at
                "#,
                params![record.id, embedding_to_bytes(&record.values), metadata, now],
            )?;
        }
        tx.commit()?;

        Ok(records.len())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&Predicate>,
    ) -> Result<Vec<RankedMatch>, IndexError> {
        let conn = self.conn();
        match Self::dimension(&conn)? {
            Some(dim) if dim != vector.len() => {
                return Err(IndexError::DimensionMismatch {
                    expected: dim,
                    actual: vector.len(),
                })
            }
            Some(_) => {}
            None => return Ok(Vec::new()),
        }

        let mut stmt = conn.prepare("SELECT id, embedding, metadata FROM vectors")?;
        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                let metadata: String = row.get(2)?;
                Ok((id, blob, metadata))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut matches = Vec::new();
        for (id, blob, metadata) in rows {
            let metadata: Metadata = serde_json::from_str(&metadata)
                .map_err(|e| IndexError::Decode(format!("metadata of '{}': {}", id, e)))?;
            if filter.is_some_and(|p| !p.matches(&metadata)) {
                continue;
            }
            let score = cosine_similarity(vector, &bytes_to_embedding(&blob));
            matches.push(RankedMatch {
                id,
                score,
                metadata,
            });
        }

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);

        debug!(returned = matches.len(), "local index query");
        Ok(matches)
    }

    async fn stats(&self) -> Result<IndexStats, IndexError> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM vectors", [], |row| row.get(0))?;
        let total = count.max(0) as u64;

        let mut stats = IndexStats {
            total_vectors: total,
            dimension: Self::dimension(&conn)?,
            ..Default::default()
        };
        stats.namespaces.insert(String::new(), total);
        Ok(stats)
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Convert f32 vector to bytes for storage
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes back to f32 vector
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
