//! Character-code embeddings
//!
//! Deterministic placeholder vectors derived from the characters of each
//! word. No model dependencies; swap in a trained model through [`Embedder`].

use crate::config::SearchConfig;
use crate::error::{RankError, Result};

/// Vector type shared by documents and queries.
pub type Vector = Vec<f32>;

/// Pluggable embedding backend interface
pub trait Embedder: Send + Sync {
    /// Embed `text` together with extra context words (domain, category,
    /// user interests) into a vector of [`Embedder::dims`] components.
    fn embed(&self, text: &str, context_words: &[String]) -> Vector;
    fn dims(&self) -> usize;
    fn name(&self) -> &'static str;
}

/// Build an embedder from search config.
pub fn build_embedder(config: &SearchConfig) -> Result<Box<dyn Embedder>> {
    let backend = config.embedding_backend.trim().to_lowercase();
    if config.dimensions == 0 {
        return Err(RankError::Config(
            "search.dimensions must be greater than 0".to_string(),
        ));
    }

    match backend.as_str() {
        "" | "char-code" | "charcode" => Ok(Box::new(CharCodeEmbedder::new(config.dimensions))),
        other => Err(RankError::Config(format!(
            "unknown embedding backend: {other}"
        ))),
    }
}

/// Reference embedder: `v[i] = code(word[i]) / 255`, summed over words.
#[derive(Debug, Clone)]
pub struct CharCodeEmbedder {
    dim: usize,
}

impl Default for CharCodeEmbedder {
    fn default() -> Self {
        Self { dim: 300 }
    }
}

impl CharCodeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn accumulate_word(&self, embedding: &mut [f32], word: &str) {
        for (slot, ch) in embedding.iter_mut().zip(word.chars()) {
            *slot += u32::from(ch) as f32 / 255.0;
        }
    }
}

impl Embedder for CharCodeEmbedder {
    fn embed(&self, text: &str, context_words: &[String]) -> Vector {
        let mut embedding = vec![0.0; self.dim];
        if self.dim == 0 {
            return embedding;
        }

        let words = tokenize(text)
            .into_iter()
            .chain(context_words.iter().flat_map(|w| tokenize(w)));
        for word in words {
            self.accumulate_word(&mut embedding, &word);
        }

        l2_normalize(&mut embedding);
        embedding
    }

    fn dims(&self) -> usize {
        self.dim
    }

    fn name(&self) -> &'static str {
        "char-code"
    }
}

/// Lowercase word split used by the embedder and the analyzer.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|token| !token.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Scale `vec` to unit length in place; the zero vector stays zero.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm = magnitude(vec);
    if norm > 0.0 {
        for value in vec.iter_mut() {
            *value /= norm;
        }
    }
}

pub fn magnitude(vec: &[f32]) -> f32 {
    vec.iter().map(|x| x * x).sum::<f32>().sqrt()
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Cosine similarity; 0 when lengths differ or either side is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a = magnitude(a);
    let norm_b = magnitude(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot_product(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
