//! Ingestion pipelines: source text in, persisted corpus out.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::chunker::{chunk_code, split_text, ChunkConfig};
use crate::corpus::{Collection, CorpusStore};
use crate::embedder::{l2_normalize, TextEmbedder};
use crate::error::{RagError, Result};
use crate::index::FlatIpIndex;

/// A source file that could not be read during code ingestion.
#[derive(Debug)]
pub struct SkippedFile {
    /// Path of the unreadable file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: String,
}

/// Summary of a completed ingestion run.
#[derive(Debug)]
pub struct IngestReport {
    /// Collection that was replaced.
    pub collection: Collection,
    /// Number of chunks embedded and indexed.
    pub chunk_count: usize,
    /// Number of files that contributed chunks.
    pub files_indexed: usize,
    /// Files skipped because they could not be read. One unreadable file
    /// never aborts ingestion of the rest.
    pub skipped: Vec<SkippedFile>,
}

/// Ingests a best-practices text file into the best-practices collection.
///
/// The previous corpus is only overwritten after chunking, embedding, and
/// indexing have all succeeded; any earlier failure leaves it untouched.
pub fn ingest_best_practices(
    embedder: &dyn TextEmbedder,
    store: &CorpusStore,
    path: &Path,
    config: ChunkConfig,
) -> Result<IngestReport> {
    if !path.is_file() {
        return Err(RagError::InvalidInput(format!(
            "best-practices file not found: {}",
            path.display()
        )));
    }
    let text = read_lossy(path)?;
    let chunks = split_text(&text, config);
    if chunks.is_empty() {
        return Err(RagError::InvalidInput(format!(
            "no chunks produced from {}",
            path.display()
        )));
    }

    let index = build_index(embedder, &chunks)?;
    store.save(Collection::BestPractices, embedder.model(), &index, &chunks)?;
    Ok(IngestReport {
        collection: Collection::BestPractices,
        chunk_count: chunks.len(),
        files_indexed: 1,
        skipped: Vec::new(),
    })
}

/// Ingests every file under `dir` with a matching extension into the code
/// collection. Files are visited in a stable sorted order so repeated runs
/// over the same tree produce identical corpora.
pub fn ingest_code_dir(
    embedder: &dyn TextEmbedder,
    store: &CorpusStore,
    dir: &Path,
    extensions: &[String],
    config: ChunkConfig,
) -> Result<IngestReport> {
    if !dir.is_dir() {
        return Err(RagError::InvalidInput(format!(
            "not a directory: {}",
            dir.display()
        )));
    }
    let files = collect_code_files(dir, extensions);
    if files.is_empty() {
        return Err(RagError::InvalidInput(format!(
            "no files matching {:?} under {}",
            extensions,
            dir.display()
        )));
    }

    let mut chunks = Vec::new();
    let mut skipped = Vec::new();
    let mut files_indexed = 0usize;
    for file in files {
        let content = match read_lossy(&file) {
            Ok(content) => content,
            Err(err) => {
                log::warn!("skipping unreadable file {:?}: {err}", file);
                skipped.push(SkippedFile {
                    path: file,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        let relative = file
            .strip_prefix(dir)
            .unwrap_or(&file)
            .to_string_lossy()
            .into_owned();
        chunks.extend(chunk_code(&content, &relative, config));
        files_indexed += 1;
    }
    if chunks.is_empty() {
        return Err(RagError::InvalidInput(format!(
            "no code chunks produced from {}",
            dir.display()
        )));
    }

    let index = build_index(embedder, &chunks)?;
    store.save(Collection::Code, embedder.model(), &index, &chunks)?;
    Ok(IngestReport {
        collection: Collection::Code,
        chunk_count: chunks.len(),
        files_indexed,
        skipped,
    })
}

/// Parses a comma-separated extension list, lowercasing and dot-prefixing
/// each entry (`"py, RS"` becomes `[".py", ".rs"]`).
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ext| !ext.is_empty())
        .map(|ext| {
            let ext = ext.to_lowercase();
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            }
        })
        .collect()
}

/// Embeds every chunk, normalizes the vectors, and builds a flat index whose
/// dimension is taken from the first embedding of the batch.
fn build_index(embedder: &dyn TextEmbedder, chunks: &[String]) -> Result<FlatIpIndex> {
    log::info!("embedding {} chunks with '{}'", chunks.len(), embedder.model());
    let texts: Vec<&str> = chunks.iter().map(String::as_str).collect();
    let mut vectors = embedder.embed(&texts)?;
    if vectors.len() != chunks.len() {
        return Err(RagError::EmbeddingProvider(format!(
            "provider returned {} vectors for {} chunks",
            vectors.len(),
            chunks.len()
        )));
    }
    l2_normalize(&mut vectors);

    let dimension = vectors.first().map(Vec::len).unwrap_or(0);
    let mut index = FlatIpIndex::new(dimension);
    index.add(vectors)?;
    Ok(index)
}

fn collect_code_files(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_matching_extension(path, extensions))
        .collect()
}

fn has_matching_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    let dotted = format!(".{}", ext.to_lowercase());
    extensions.iter().any(|wanted| *wanted == dotted)
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_normalized() {
        assert_eq!(parse_extensions("py, RS,.md"), vec![".py", ".rs", ".md"]);
        assert_eq!(parse_extensions(" , "), Vec::<String>::new());
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let exts = parse_extensions(".py,.md");
        assert!(has_matching_extension(Path::new("a/b/mod.PY"), &exts));
        assert!(has_matching_extension(Path::new("README.md"), &exts));
        assert!(!has_matching_extension(Path::new("main.rs"), &exts));
        assert!(!has_matching_extension(Path::new("Makefile"), &exts));
    }
}
