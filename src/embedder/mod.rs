//! Embedding provider seam plus vector post-processing.

pub mod gemini;

pub use gemini::GeminiEmbedder;

use crate::error::Result;

/// Guards against division by zero when normalizing degenerate vectors.
const NORM_EPSILON: f32 = 1e-12;

/// Trait implemented by concrete embedding providers.
///
/// Implementations must issue one provider call per input text, strictly in
/// order, so that the output rows line up with the input sequence. Failures
/// are fatal for the whole batch and are not retried here.
pub trait TextEmbedder {
    /// Embeds each text into a fixed-dimension vector, one row per input.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Model identifier pinned for this session.
    fn model(&self) -> &str;
}

/// Scales each vector to unit L2 norm so inner product equals cosine
/// similarity. Applied by callers after embedding, never by the adapter.
pub fn l2_normalize(vectors: &mut [Vec<f32>]) {
    for vector in vectors.iter_mut() {
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt() + NORM_EPSILON;
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(vector: &[f32]) -> f32 {
        vector.iter().map(|v| v * v).sum::<f32>().sqrt()
    }

    #[test]
    fn normalized_vectors_have_unit_norm() {
        let mut vectors = vec![vec![3.0, 4.0], vec![0.5, 0.5], vec![-2.0, 0.0]];
        l2_normalize(&mut vectors);
        for vector in &vectors {
            assert!((norm(vector) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn zero_vector_does_not_divide_by_zero() {
        let mut vectors = vec![vec![0.0, 0.0, 0.0]];
        l2_normalize(&mut vectors);
        assert!(vectors[0].iter().all(|v| v.is_finite()));
    }
}
