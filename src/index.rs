//! Exact brute-force inner-product index over unit vectors.

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Flat nearest-neighbor index scored by inner product.
///
/// Stored and query vectors are expected to be L2-normalized by the caller,
/// which makes inner-product rank order equal to cosine-similarity rank
/// order; the index itself never normalizes. Rows are addressed purely by
/// insertion order and cannot be deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIpIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIpIndex {
    /// Creates an empty index bound to a fixed dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    /// Dimension every stored vector must match.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// True when no vectors have been added yet.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Appends rows in order. The whole batch is validated before any row is
    /// stored, so a width mismatch never leaves a partial append behind.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()> {
        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(RagError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }
        self.vectors.extend(vectors);
        Ok(())
    }

    /// Returns up to `k` (insertion index, score) pairs ranked by descending
    /// inner product, ties broken by lowest index. When fewer than `k`
    /// vectors are stored, every stored row is returned; there is no padding.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, vector)| (idx, dot(query, vector)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Writes the index to `path` as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = serde_json::to_vec(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Reads an index previously written by [`FlatIpIndex::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn unit(values: &[f32]) -> Vec<f32> {
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        values.iter().map(|v| v / norm).collect()
    }

    #[test]
    fn search_ranks_by_descending_inner_product() {
        let mut index = FlatIpIndex::new(2);
        index
            .add(vec![unit(&[1.0, 0.0]), unit(&[0.0, 1.0]), unit(&[1.0, 1.0])])
            .unwrap();
        let hits = index.search(&unit(&[1.0, 0.2]), 3).unwrap();
        let order: Vec<usize> = hits.iter().map(|(idx, _)| *idx).collect();
        assert_eq!(order, vec![0, 2, 1]);
        assert!(hits.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn ties_break_toward_lowest_index() {
        let mut index = FlatIpIndex::new(2);
        let same = unit(&[1.0, 0.0]);
        index.add(vec![same.clone(), same.clone(), same]).unwrap();
        let hits = index.search(&unit(&[1.0, 0.0]), 2).unwrap();
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 1);
    }

    #[test]
    fn small_store_returns_everything_without_padding() {
        let mut index = FlatIpIndex::new(3);
        index.add(vec![unit(&[1.0, 2.0, 3.0])]).unwrap();
        let hits = index.search(&unit(&[1.0, 0.0, 0.0]), 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn dimension_mismatch_is_rejected_whole_batch() {
        let mut index = FlatIpIndex::new(2);
        let err = index
            .add(vec![unit(&[1.0, 0.0]), vec![1.0, 2.0, 3.0]])
            .unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(index.len(), 0);

        assert!(index.search(&[1.0], 1).is_err());
    }

    #[test]
    fn save_then_load_reproduces_search_results() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("index.json");

        let mut index = FlatIpIndex::new(3);
        index
            .add(vec![
                unit(&[0.2, 0.9, 0.1]),
                unit(&[0.8, 0.1, 0.4]),
                unit(&[0.5, 0.5, 0.5]),
            ])
            .unwrap();
        index.save(&path).unwrap();

        let loaded = FlatIpIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), index.len());
        assert_eq!(loaded.dimension(), index.dimension());

        for query in [unit(&[1.0, 0.0, 0.0]), unit(&[0.1, 0.9, 0.3])] {
            assert_eq!(
                index.search(&query, 3).unwrap(),
                loaded.search(&query, 3).unwrap()
            );
        }
    }
}
