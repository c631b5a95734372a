//! Dense embeddings and vector arithmetic.
//!
//! [`HashedEmbedder`] produces fixed-length vectors from sanitized terms by
//! hashing whole words and their character trigrams into signed buckets,
//! weighted by inverse document frequency. Training means fitting that idf
//! table on the corpus.

use serde::{Deserialize, Serialize};

use crate::tfidf::TfIdf;

/// What the ranking engine needs from an embedding model.
pub trait EmbeddingProvider: Send + Sync {
    /// Length of every vector returned by [`embed`](Self::embed).
    fn dimension(&self) -> usize;

    /// Dense embedding of `text`. Same model state and text give the same
    /// vector.
    fn embed(&self, text: &str) -> Vec<f32>;

    /// Variable-length lexical frequency vector of `text`.
    fn lexical_frequency_vector(&self, text: &str) -> Vec<f32>;
}

/// Bring `vector` to exactly `target` elements.
///
/// Longer input is averaged in contiguous buckets of `len / target`
/// elements; the trailing remainder is dropped. Shorter input is padded with
/// zeros on the right.
pub fn normalize(vector: &[f32], target: usize) -> Vec<f32> {
    use std::cmp::Ordering;

    match vector.len().cmp(&target) {
        Ordering::Equal => vector.to_vec(),
        Ordering::Less => {
            let mut out = vector.to_vec();
            out.resize(target, 0.0);
            out
        }
        Ordering::Greater => {
            let group = vector.len() / target;
            (0..target)
                .map(|i| {
                    let start = i * group;
                    let end = ((i + 1) * group).min(vector.len());
                    vector[start..end].iter().sum::<f32>() / group as f32
                })
                .collect()
        }
    }
}

/// Cosine similarity in `[-1, 1]`.
///
/// A zero-norm operand scores 0. Operands of different length are compared
/// as if the shorter one were zero-padded.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// Weight of all trigrams of a word relative to the whole word.
const SUBWORD_WEIGHT: f32 = 0.5;

/// Feature-hashing embedder over words and character trigrams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashedEmbedder {
    dimension: usize,
    weights: TfIdf,
}

impl HashedEmbedder {
    /// An embedder with no corpus statistics; every term weighs the same.
    pub fn untrained(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            weights: TfIdf::default(),
        }
    }

    pub fn train<I, D, S>(dimension: usize, corpus: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            dimension: dimension.max(1),
            weights: TfIdf::fit(corpus),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn documents(&self) -> u64 {
        self.weights.documents()
    }

    /// Embed a list of sanitized terms. No terms gives the zero vector.
    pub fn embed_terms(&self, terms: &[&str]) -> Vec<f32> {
        let mut out = vec![0.0; self.dimension];
        for term in terms {
            let idf = self.weights.idf(term);
            self.add_feature(&mut out, format!("w:{term}").as_bytes(), idf);

            let padded: Vec<char> = std::iter::once('<')
                .chain(term.chars())
                .chain(std::iter::once('>'))
                .collect();
            if padded.len() < 3 {
                continue;
            }
            let grams = padded.len() - 2;
            let weight = SUBWORD_WEIGHT * idf / grams as f32;
            for window in padded.windows(3) {
                let gram: String = window.iter().collect();
                let feature = format!("g:{gram}");
                self.add_feature(&mut out, feature.as_bytes(), weight);
            }
        }
        l2_normalize(&mut out);
        out
    }

    fn add_feature(&self, out: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let index = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 1 { -1.0 } else { 1.0 };
        out[index] += sign * weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_aggregates_longer_vectors() {
        let v = vec![2.0; 10];
        assert_eq!(normalize(&v, 5), vec![2.0; 5]);
    }

    #[test]
    fn normalize_pads_shorter_vectors() {
        assert_eq!(
            normalize(&[1.0, 2.0, 3.0], 5),
            vec![1.0, 2.0, 3.0, 0.0, 0.0]
        );
    }

    #[test]
    fn normalize_passes_equal_length_through() {
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(normalize(&v, 3), v);
    }

    #[test]
    fn normalize_drops_remainder() {
        // 7 elements into 3 buckets of 2; the seventh is dropped.
        let v = [1.0, 3.0, 5.0, 7.0, 9.0, 11.0, 100.0];
        assert_eq!(normalize(&v, 3), vec![2.0, 6.0, 10.0]);
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = [0.3, -1.2, 4.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_and_opposite() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        let opposite = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]);
        assert!((opposite + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn cosine_is_symmetric() {
        let a = [0.5, 1.5, -2.0, 0.1];
        let b = [1.0, -0.5, 0.25, 3.0];
        let (ab, ba) = (cosine_similarity(&a, &b), cosine_similarity(&b, &a));
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn embedding_is_deterministic_and_unit_length() {
        let embedder =
            HashedEmbedder::train(64, [vec!["cat", "sat"], vec!["dog", "ran"]]);
        let a = embedder.embed_terms(&["cat", "sat"]);
        let b = embedder.embed_terms(&["cat", "sat"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn no_terms_embeds_to_zero() {
        let embedder = HashedEmbedder::untrained(16);
        assert!(embedder.embed_terms(&[]).iter().all(|x| *x == 0.0));
    }

    #[test]
    fn shared_subwords_raise_similarity() {
        let embedder = HashedEmbedder::untrained(256);
        let cat = embedder.embed_terms(&["cat"]);
        let cats = embedder.embed_terms(&["catalog"]);
        let dog = embedder.embed_terms(&["dog"]);
        assert!(cosine_similarity(&cat, &cats) > cosine_similarity(&cat, &dog));
    }
}
