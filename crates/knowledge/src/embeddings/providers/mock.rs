//! Deterministic hashed-trigram embeddings.

use crate::embeddings::provider::EmbeddingProvider;
use manualqa_core::AppResult;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Model name reported by the mock provider.
pub const MOCK_MODEL: &str = "trigram-v1";

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "but", "with", "from", "this", "that", "have",
    "has", "had", "its", "their", "they", "them", "which", "what", "does", "how",
];

/// Offline provider for tests and runs without an embedding server.
///
/// Vectors are deterministic and content-dependent: word trigrams and whole
/// words are hashed into buckets, then normalized. Machine names and
/// technical terms shared by a query and a chunk raise their similarity.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
    batches: AtomicUsize,
}

/// Lowercased content words, hyphens split, punctuation trimmed.
fn terms(text: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for word in text.replace('-', " ").to_lowercase().split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric());
        if word.chars().count() > 2 && !STOP_WORDS.contains(&word) {
            *counts.entry(word.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

fn bucket(bytes: impl Iterator<Item = u8>, seed: u64, dimensions: usize) -> usize {
    let hash = bytes.fold(seed, |acc, b| acc.wrapping_mul(seed).wrapping_add(u64::from(b)));
    (hash % dimensions as u64) as usize
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            batches: AtomicUsize::new(0),
        }
    }

    /// Number of `embed_batch` calls served so far.
    pub fn batch_calls(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        for (word, count) in terms(text) {
            let weight = count as f32;
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                vector[bucket(trigram.bytes(), 37, self.dimensions)] += weight.sqrt();
            }
            vector[bucket(word.bytes(), 31, self.dimensions)] += weight;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        MOCK_MODEL
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|text| self.vector(text)).collect())
    }
}
