//! Query-time retrieval across both persisted collections.

use crate::corpus::{Collection, Corpus, CorpusStore};
use crate::embedder::{l2_normalize, TextEmbedder};
use crate::error::{RagError, Result};

/// Rank-ordered chunks retrieved for one query, best match first.
///
/// Scores stay internal to the index; callers only see chunk text.
#[derive(Debug, Default)]
pub struct RetrievedContexts {
    /// Top matches from the best-practices collection.
    pub best_practices: Vec<String>,
    /// Top matches from the code collection.
    pub code: Vec<String>,
}

/// Embeds queries and searches whichever collections are present on disk.
pub struct Retriever<'a> {
    embedder: &'a dyn TextEmbedder,
    store: &'a CorpusStore,
}

impl<'a> Retriever<'a> {
    /// Builds a retriever over the given provider and store. The embedder
    /// must be the same provider/model identity used at ingestion time;
    /// the store enforces this when loading.
    pub fn new(embedder: &'a dyn TextEmbedder, store: &'a CorpusStore) -> Self {
        Self { embedder, store }
    }

    /// Retrieves the top `k_best_practices` / `k_code` chunks per collection.
    ///
    /// An absent collection yields an empty list, not an error; inconsistent
    /// or model-mismatched artifacts degrade the same way after a warning.
    pub fn retrieve(
        &self,
        query: &str,
        k_best_practices: usize,
        k_code: usize,
    ) -> Result<RetrievedContexts> {
        let mut vectors = self.embedder.embed(&[query])?;
        if vectors.is_empty() {
            return Err(RagError::EmbeddingProvider(
                "provider returned no vector for the query".into(),
            ));
        }
        l2_normalize(&mut vectors);
        let query_vector = &vectors[0];

        let mut contexts = RetrievedContexts::default();
        if let Some(corpus) = self.load_or_absent(Collection::BestPractices)? {
            contexts.best_practices = top_chunks(&corpus, query_vector, k_best_practices)?;
        }
        if let Some(corpus) = self.load_or_absent(Collection::Code)? {
            contexts.code = top_chunks(&corpus, query_vector, k_code)?;
        }
        Ok(contexts)
    }

    /// Loads a collection, degrading inconsistent or stale artifacts to
    /// "absent" so one bad collection never blocks the whole query.
    fn load_or_absent(&self, collection: Collection) -> Result<Option<Corpus>> {
        match self.store.load(collection, self.embedder.model()) {
            Ok(corpus) => Ok(corpus),
            Err(err @ (RagError::StorageInconsistency { .. } | RagError::ModelMismatch { .. })) => {
                log::warn!("treating collection '{}' as absent: {err}", collection.label());
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

fn top_chunks(corpus: &Corpus, query_vector: &[f32], k: usize) -> Result<Vec<String>> {
    let hits = corpus.index.search(query_vector, k)?;
    Ok(map_hits(&hits, &corpus.chunks))
}

/// Maps ranked index hits back into chunk text, silently discarding any
/// index outside the chunk list (should not occur while the parity
/// invariant holds).
fn map_hits(hits: &[(usize, f32)], chunks: &[String]) -> Vec<String> {
    hits.iter()
        .filter_map(|&(idx, _)| chunks.get(idx).cloned())
        .collect()
}
