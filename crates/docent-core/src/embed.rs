//! Embedder trait and vector utilities.
//!
//! [`Embedder`] is the seam between the pipeline and whatever produces
//! embedding vectors. Concrete backends (OpenAI, Ollama, fastembed) live
//! in the `docent` app crate; tests plug in deterministic stubs.
//!
//! The helper functions serialize vectors to SQLite BLOBs and score
//! them; both ends of that round trip live here so the encoding has a
//! single owner.

use async_trait::async_trait;

use crate::error::Result;

/// An embedding backend.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, recorded alongside each stored vector.
    fn model_name(&self) -> &str;

    /// Dimensionality of the vectors this backend produces.
    fn dims(&self) -> usize;

    /// Embed a batch of texts, one vector per input in the same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        Ok(vectors.pop().unwrap_or_default())
    }
}

/// Serialize a vector as little-endian f32 bytes, 4 bytes per value.
pub fn vec_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Inverse of [`vec_to_blob`]. Trailing bytes that do not make up a full
/// f32 are ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` when the vectors are empty, have different lengths, or
/// either has (near-)zero magnitude, so mismatched rows rank last rather
/// than poisoning the sort with NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_roundtrip() {
        let vector = vec![0.5f32, -1.25, 2.0, 0.0, 3.75];
        assert_eq!(blob_to_vec(&vec_to_blob(&vector)), vector);
    }

    #[test]
    fn test_blob_ignores_trailing_bytes() {
        let mut blob = vec_to_blob(&[1.0f32, 2.0]);
        blob.push(0xFF);
        assert_eq!(blob_to_vec(&blob), vec![1.0f32, 2.0]);
    }

    #[test]
    fn test_cosine_identical_vectors() {
        let v = vec![0.3, 0.4, 0.5];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_vectors() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite_vectors() {
        let a = vec![2.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
