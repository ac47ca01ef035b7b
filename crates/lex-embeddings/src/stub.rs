//! Deterministic test embedder.

use sha2::{Digest, Sha256};

use crate::error::EmbeddingError;
use crate::{Embedder, check_output};

/// Hashed bag-of-characters embedder.
///
/// Each character is hashed into one of `dim` buckets; the bucket-count
/// vector is L2-normalized. Deterministic across runs and platforms, and
/// texts sharing characters score higher under cosine than unrelated texts,
/// which is enough signal for retrieval tests without any model download.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    /// Create an embedder producing `dim`-dimensional vectors.
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dim];
        for c in text.chars() {
            let mut buf = [0_u8; 4];
            let digest = Sha256::digest(c.encode_utf8(&mut buf).as_bytes());
            let bucket = usize::from(digest[0]) << 8 | usize::from(digest[1]);
            vector[bucket % self.dim] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let expected = texts.len();
        let vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.embed_text(t)).collect();
        check_output(self.dim, expected, &vectors)?;
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
    }

    #[tokio::test]
    async fn deterministic_and_order_preserving() {
        let embedder = HashEmbedder::new(64);
        let texts = vec!["第 7 條".to_string(), "第 8 條".to_string()];
        let a = embedder.embed_batch(texts.clone()).await.unwrap();
        let b = embedder.embed_batch(texts).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert!(a.iter().all(|v| v.len() == 64));
        assert_ne!(a[0], a[1]);
    }

    #[tokio::test]
    async fn shared_characters_raise_cosine() {
        let embedder = HashEmbedder::new(64);
        let vectors = embedder
            .embed_batch(vec![
                "第7條".to_string(),
                "第 7 條 懲罰之種類".to_string(),
                "entirely unrelated latin text".to_string(),
            ])
            .await
            .unwrap();
        let related = cosine(&vectors[0], &vectors[1]);
        let unrelated = cosine(&vectors[0], &vectors[2]);
        assert!(related > unrelated, "related {related} vs unrelated {unrelated}");
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let embedder = HashEmbedder::new(16);
        let vector = embedder.embed_one(String::new()).await.unwrap();
        assert!(vector.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn embed_one_matches_batch() {
        let embedder = HashEmbedder::new(32);
        let single = embedder.embed_one("降級".to_string()).await.unwrap();
        let batch = embedder.embed_batch(vec!["降級".to_string()]).await.unwrap();
        assert_eq!(single, batch[0]);
    }
}
