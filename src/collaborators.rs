//! External collaborator interfaces (`spec.md` §6).
//!
//! The embedding model, the vector store, and persistence are out of
//! scope for THE CORE — they are consumed only through these traits.
//! Both are blocking-call boundaries (`spec.md` §5): the core itself
//! never performs I/O, so whatever an implementor does inside `encode`
//! or `search_top_k` (an HTTP call, a local ONNX session, a disk read)
//! is opaque to, and blocks, the calling thread.

use crate::error::CoreError;

/// Produces a deterministic, unit-norm embedding for a piece of text.
/// Mirrors the shape of the teacher's `EmbeddingService` consumer API
/// (`encode(text) -> vector`), minus the concrete backend.
pub trait Embedder: Send + Sync {
    /// Encode `text` into a unit-norm vector of length [`Embedder::dim`].
    fn encode(&self, text: &str) -> Result<Vec<f32>, CoreError>;

    /// The embedding dimensionality this embedder produces.
    fn dim(&self) -> usize;
}

/// A single semantic match returned by a vector-store top-k search.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticMatch {
    pub tool_id: String,
    /// Cosine similarity in `[0, 1]`.
    pub score: f32,
}

/// Consumed vector store: cosine top-k search over `tool_embedding`.
/// Must be consistent with the embedder's output norm (`spec.md` §6).
pub trait VectorStore: Send + Sync {
    fn search_top_k(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&str>,
    ) -> Result<Vec<SemanticMatch>, CoreError>;
}

/// An in-memory `VectorStore` useful for tests and as a reference
/// implementation — not a production backend.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVectorStore {
    entries: Vec<(String, Vec<f32>)>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tool_id: impl Into<String>, embedding: Vec<f32>) {
        self.entries.push((tool_id.into(), embedding));
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if na <= f32::EPSILON || nb <= f32::EPSILON {
            0.0
        } else {
            dot / (na * nb)
        }
    }
}

impl VectorStore for InMemoryVectorStore {
    fn search_top_k(
        &self,
        query: &[f32],
        k: usize,
        _filter: Option<&str>,
    ) -> Result<Vec<SemanticMatch>, CoreError> {
        let mut scored: Vec<SemanticMatch> = self
            .entries
            .iter()
            .map(|(id, emb)| SemanticMatch {
                tool_id: id.clone(),
                score: Self::cosine(query, emb),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}
