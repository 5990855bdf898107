//! Durable storage for the paired (index, chunk list) of each collection.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::index::FlatIpIndex;

/// Bumped whenever the artifact layout changes; there is no migration
/// scheme, an unexpected version requires a full reset.
pub const ARTIFACT_SCHEMA_VERSION: u32 = 1;

/// The two independent collections a session retrieves from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    /// Free-text engineering guidelines.
    BestPractices,
    /// Chunked source files with provenance headers.
    Code,
}

impl Collection {
    /// Both collections, in a fixed order.
    pub const ALL: [Collection; 2] = [Collection::BestPractices, Collection::Code];

    /// Stable identifier used in logs and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::BestPractices => "best-practices",
            Self::Code => "code",
        }
    }

    fn file_stem(self) -> &'static str {
        match self {
            Self::BestPractices => "bp",
            Self::Code => "code",
        }
    }
}

/// An index plus its parallel chunk list, loaded as a unit.
///
/// Invariant: `index.len() == chunks.len()`; index position `i` addresses
/// chunk position `i`. The store refuses to persist or load a pair that
/// violates this.
#[derive(Debug)]
pub struct Corpus {
    /// Vector index over the collection's chunks.
    pub index: FlatIpIndex,
    /// Chunks in the exact order their vectors were added.
    pub chunks: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct IndexArtifact {
    schema_version: u32,
    /// Embedding model that produced the stored vectors; checked on load so
    /// a session never searches vectors from a different embedding space.
    model: String,
    index: FlatIpIndex,
}

#[derive(Serialize, Deserialize)]
struct ChunksArtifact {
    schema_version: u32,
    chunks: Vec<String>,
}

/// Persists and restores corpora under a fixed per-collection layout.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    dir: PathBuf,
}

impl CorpusStore {
    /// Creates a store rooted at `dir`. The directory is created lazily on
    /// the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the vector-index artifact for `collection`.
    pub fn index_path(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}_index.json", collection.file_stem()))
    }

    /// Path of the chunk-list artifact for `collection`.
    pub fn chunks_path(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}_chunks.json", collection.file_stem()))
    }

    /// Atomically replaces `collection` with the given index and chunks.
    ///
    /// Both artifacts are first written to temp files in the same directory
    /// and only then renamed over the previous generation, so a reader never
    /// observes an index whose size disagrees with its chunk list.
    pub fn save(
        &self,
        collection: Collection,
        model: &str,
        index: &FlatIpIndex,
        chunks: &[String],
    ) -> Result<()> {
        if index.len() != chunks.len() {
            return Err(RagError::StorageInconsistency {
                collection: collection.label(),
                reason: format!("{} vectors vs {} chunks", index.len(), chunks.len()),
            });
        }
        fs::create_dir_all(&self.dir)?;

        let index_artifact = IndexArtifact {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            model: model.to_string(),
            index: index.clone(),
        };
        let chunks_artifact = ChunksArtifact {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            chunks: chunks.to_vec(),
        };

        let index_path = self.index_path(collection);
        let chunks_path = self.chunks_path(collection);
        let index_tmp = index_path.with_extension("json.tmp");
        let chunks_tmp = chunks_path.with_extension("json.tmp");

        fs::write(&index_tmp, serde_json::to_vec(&index_artifact)?)?;
        fs::write(&chunks_tmp, serde_json::to_vec(&chunks_artifact)?)?;
        fs::rename(&index_tmp, &index_path)?;
        fs::rename(&chunks_tmp, &chunks_path)?;

        log::info!(
            "saved collection '{}' ({} chunks, dim {})",
            collection.label(),
            chunks.len(),
            index.dimension()
        );
        Ok(())
    }

    /// Loads `collection`, returning `None` when either artifact is missing.
    ///
    /// A size disagreement between the pair, an unsupported schema version,
    /// or vectors embedded with a different model all fail the load; callers
    /// decide whether to degrade or abort.
    pub fn load(&self, collection: Collection, model: &str) -> Result<Option<Corpus>> {
        let index_bytes = match fs::read(self.index_path(collection)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let chunk_bytes = match fs::read(self.chunks_path(collection)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let index_artifact: IndexArtifact = serde_json::from_slice(&index_bytes)?;
        let chunks_artifact: ChunksArtifact = serde_json::from_slice(&chunk_bytes)?;

        for version in [index_artifact.schema_version, chunks_artifact.schema_version] {
            if version != ARTIFACT_SCHEMA_VERSION {
                return Err(RagError::StorageInconsistency {
                    collection: collection.label(),
                    reason: format!(
                        "schema_version {version} (expected {ARTIFACT_SCHEMA_VERSION})"
                    ),
                });
            }
        }
        if index_artifact.model != model {
            return Err(RagError::ModelMismatch {
                expected: model.to_string(),
                found: index_artifact.model,
            });
        }
        if index_artifact.index.len() != chunks_artifact.chunks.len() {
            return Err(RagError::StorageInconsistency {
                collection: collection.label(),
                reason: format!(
                    "{} vectors vs {} chunks",
                    index_artifact.index.len(),
                    chunks_artifact.chunks.len()
                ),
            });
        }

        Ok(Some(Corpus {
            index: index_artifact.index,
            chunks: chunks_artifact.chunks,
        }))
    }

    /// Removes every persisted artifact for both collections, including any
    /// temp file stranded by a save interrupted between write and rename.
    /// Missing files are not an error, so reset is idempotent.
    pub fn reset(&self) -> Result<()> {
        for collection in Collection::ALL {
            for path in [self.index_path(collection), self.chunks_path(collection)] {
                remove_if_present(&path.with_extension("json.tmp"))?;
                remove_if_present(&path)?;
            }
        }
        log::info!("removed all persisted artifacts under {:?}", self.dir);
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MODEL: &str = "test-embedding-001";

    fn sample_corpus() -> (FlatIpIndex, Vec<String>) {
        let mut index = FlatIpIndex::new(2);
        index
            .add(vec![vec![1.0, 0.0], vec![0.0, 1.0]])
            .unwrap();
        (index, vec!["first".to_string(), "second".to_string()])
    }

    #[test]
    fn save_then_load_roundtrips_the_pair() {
        let tmp = TempDir::new().unwrap();
        let store = CorpusStore::new(tmp.path());
        let (index, chunks) = sample_corpus();

        store.save(Collection::BestPractices, MODEL, &index, &chunks).unwrap();
        let corpus = store
            .load(Collection::BestPractices, MODEL)
            .unwrap()
            .expect("corpus present");
        assert_eq!(corpus.chunks, chunks);
        assert_eq!(corpus.index.len(), corpus.chunks.len());
    }

    #[test]
    fn missing_artifacts_load_as_absent() {
        let tmp = TempDir::new().unwrap();
        let store = CorpusStore::new(tmp.path());
        assert!(store.load(Collection::Code, MODEL).unwrap().is_none());

        // only one artifact present: still absent, never a partial load
        let (index, chunks) = sample_corpus();
        store.save(Collection::Code, MODEL, &index, &chunks).unwrap();
        std::fs::remove_file(store.chunks_path(Collection::Code)).unwrap();
        assert!(store.load(Collection::Code, MODEL).unwrap().is_none());
    }

    #[test]
    fn model_mismatch_fails_the_load() {
        let tmp = TempDir::new().unwrap();
        let store = CorpusStore::new(tmp.path());
        let (index, chunks) = sample_corpus();
        store.save(Collection::Code, MODEL, &index, &chunks).unwrap();

        let err = store.load(Collection::Code, "other-model").unwrap_err();
        assert!(matches!(err, RagError::ModelMismatch { .. }));
    }

    #[test]
    fn size_disagreement_is_reported() {
        let tmp = TempDir::new().unwrap();
        let store = CorpusStore::new(tmp.path());
        let (index, mut chunks) = sample_corpus();
        chunks.push("extra".to_string());

        let err = store
            .save(Collection::BestPractices, MODEL, &index, &chunks)
            .unwrap_err();
        assert!(matches!(err, RagError::StorageInconsistency { .. }));
    }

    #[test]
    fn reset_is_idempotent_and_leaves_both_collections_absent() {
        let tmp = TempDir::new().unwrap();
        let store = CorpusStore::new(tmp.path());
        let (index, chunks) = sample_corpus();
        store.save(Collection::BestPractices, MODEL, &index, &chunks).unwrap();
        store.save(Collection::Code, MODEL, &index, &chunks).unwrap();

        store.reset().unwrap();
        store.reset().unwrap();
        for collection in Collection::ALL {
            assert!(store.load(collection, MODEL).unwrap().is_none());
        }
    }

    #[test]
    fn reset_sweeps_stranded_temp_files() {
        let tmp = TempDir::new().unwrap();
        let store = CorpusStore::new(tmp.path());

        // a save interrupted between write and rename leaves these behind
        let stranded = [
            store.index_path(Collection::BestPractices).with_extension("json.tmp"),
            store.chunks_path(Collection::Code).with_extension("json.tmp"),
        ];
        for path in &stranded {
            std::fs::write(path, b"{}").unwrap();
        }

        store.reset().unwrap();
        for path in &stranded {
            assert!(!path.exists(), "{path:?} should be gone after reset");
        }
    }
}
