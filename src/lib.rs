#![warn(missing_docs)]
//! Retrieval core for the ragpilot copilot.
//!
//! The pipeline is deliberately synchronous and single-threaded: chunking,
//! embedding (one provider call per text), indexing, and retrieval all run
//! to completion or fail outright, which keeps ordering deterministic and
//! stays friendly to provider rate limits.

pub mod chunker;
pub mod corpus;
pub mod embedder;
pub mod error;
pub mod index;
pub mod ingest;
pub mod prompt;
pub mod retriever;

pub use chunker::{chunk_code, split_text, ChunkConfig};
pub use corpus::{Collection, Corpus, CorpusStore};
pub use embedder::{l2_normalize, GeminiEmbedder, TextEmbedder};
pub use error::{RagError, Result};
pub use index::FlatIpIndex;
pub use ingest::{ingest_best_practices, ingest_code_dir, parse_extensions, IngestReport};
pub use retriever::{RetrievedContexts, Retriever};
