//! Semantic retrieval over the property and company catalogs
//!
//! query text -> embedder -> filter normalization -> vector index ->
//! projection -> optional reasoning

pub mod embedder;
pub mod embedding;
pub mod engine;
pub mod filter;
pub mod index;
pub mod local;
pub mod pinecone;
pub mod projector;
pub mod reasoning;
pub mod schema;
pub mod summary;

#[cfg(test)]
pub mod testing;

use std::sync::Arc;

pub use embedder::{create_embedder, Embedder, HtpEmbedder, OpenAiEmbedder};
pub use engine::{RetrievalEngine, DEFAULT_TOP_K};
pub use filter::{FieldFilters, FilterClause, FilterInput, FilterValue, Metadata, Predicate};
pub use index::{IndexStats, RankedMatch, VectorIndex, VectorRecord};
pub use local::LocalIndex;
pub use pinecone::PineconeIndex;
pub use projector::{ProjectedRecord, SearchResult};
pub use reasoning::{OpenAiReasoner, ReasoningProvider, REASONING_FALLBACK};
pub use schema::{EntityKind, EntitySchema};

use crate::core::config::{Config, IndexBackend};
use crate::error::{IndexError, SearchError};

/// Open the configured vector index for an entity kind
pub fn open_index(config: &Config, kind: EntityKind) -> Result<Arc<dyn VectorIndex>, IndexError> {
    match config.backend.index {
        IndexBackend::Pinecone => Ok(Arc::new(PineconeIndex::from_config(config, kind)?)),
        IndexBackend::Local => Ok(Arc::new(LocalIndex::open(
            &config.backend.local_index_path(kind),
        )?)),
    }
}

/// Build a fully wired engine from configuration.
///
/// The OpenAI reasoner is attached when an API key is available; without one,
/// company reasoning falls back to [`REASONING_FALLBACK`].
pub fn open_engine(config: &Config, kind: EntityKind) -> Result<RetrievalEngine, SearchError> {
    let embedder = create_embedder(config)?;
    let index = open_index(config, kind)?;

    let mut engine = RetrievalEngine::new(kind, embedder, index).with_settings(config.search.clone());
    if let Some(reasoner) = OpenAiReasoner::from_config(config) {
        engine = engine.with_reasoner(Arc::new(reasoner));
    }
    Ok(engine)
}
