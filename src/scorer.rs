//! K-head capability scorer (`spec.md` §4.4 — component C4): scores a
//! query embedding against every capability's forward-pass embedding,
//! with an optional dual-path blend against structural features.

use crate::hypergraph::Capability;
use crate::params::{xavier_init, Matrix};
use rand::SeedableRng;
use std::collections::HashMap;

/// Gates the dual-path blend between the structurally-propagated
/// ("str") score and the original-embedding ("sem") score (`spec.md`
/// §4.4). Disabled by default — enabling it is an explicit opt-in, not
/// a redesign (`spec.md` §8 Open Question: scorer stays single-path
/// unless configured otherwise). `graph_path_weight` weights the
/// structural term; `(1 - graph_path_weight)` weights the semantic one.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DualPathConfig {
    pub enabled: bool,
    pub graph_path_weight: f32,
}

impl Default for DualPathConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            graph_path_weight: 0.3,
        }
    }
}

/// A single scored capability.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityScore {
    pub capability_id: String,
    pub score: f32,
    pub head_weights: Vec<f32>,
}

/// Controls how per-head scores are combined into the final score
/// (`spec.md` §4.4). `fusion_weights`, when present, is a fixed convex
/// combination that overrides the unweighted mean; `active_heads`
/// excludes the listed head indices from both the numerator and the
/// normalising count. Learned (MLP) fusion is not implemented — no
/// architecture for it is specified beyond the name, so this falls back
/// to the unweighted mean unless `fusion_weights` is set.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadFusionConfig {
    pub active_heads: Option<Vec<usize>>,
    pub fusion_weights: Option<Vec<f32>>,
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// K independent query/key projections, one per head, scoring a query
/// against a capability embedding via scaled dot-product attention
/// (the same primitive as `engine::attention`, specialised to a single
/// scalar output instead of an aggregated vector).
#[derive(Debug, Clone)]
pub struct KHeadScorer {
    num_heads: usize,
    hidden_dim: usize,
    w_query: Vec<Matrix>,
    w_key: Vec<Matrix>,
    /// Keys the "sem" path against a capability's raw, `embedding_dim`-
    /// wide stored embedding rather than its `hidden_dim`-wide
    /// forward-pass-propagated one (`spec.md` §4.4 dual-path scoring).
    w_key_semantic: Vec<Matrix>,
}

impl KHeadScorer {
    pub fn new(embedding_dim: usize, hidden_dim: usize, num_heads: usize, seed: u64) -> Self {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let w_query = (0..num_heads)
            .map(|_| xavier_init(hidden_dim, embedding_dim, &mut rng))
            .collect();
        let w_key = (0..num_heads)
            .map(|_| xavier_init(hidden_dim, hidden_dim, &mut rng))
            .collect();
        let w_key_semantic = (0..num_heads)
            .map(|_| xavier_init(hidden_dim, embedding_dim, &mut rng))
            .collect();
        Self {
            num_heads,
            hidden_dim,
            w_query,
            w_key,
            w_key_semantic,
        }
    }

    /// Raw semantic-path score in `(0, 1)` for one capability embedding
    /// (already `hidden_dim`-wide, as produced by the forward pass).
    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    pub fn hidden_dim(&self) -> usize {
        self.hidden_dim
    }

    pub fn query_weight(&self, head: usize) -> &Matrix {
        &self.w_query[head]
    }

    pub fn key_weight(&self, head: usize) -> &Matrix {
        &self.w_key[head]
    }

    /// Applies an in-place SGD step to head `head`'s query/key weights.
    /// Gradients are expected pre-clipped by the caller (`trainer::`).
    pub fn apply_gradient_step(&mut self, head: usize, grad_wq: &Matrix, grad_wk: &Matrix, lr: f32) {
        for (w, g) in self.w_query[head].data.iter_mut().zip(&grad_wq.data) {
            *w -= lr * g;
        }
        for (w, g) in self.w_key[head].data.iter_mut().zip(&grad_wk.data) {
            *w -= lr * g;
        }
    }

    /// Per-head scaled dot-product attention scores `s_h = σ(Q_h·K_h /
    /// √hiddenDim)`, before fusion (`spec.md` §4.4).
    pub fn per_head_scores(&self, query: &[f32], capability_embedding: &[f32]) -> Vec<f32> {
        let scale = (self.hidden_dim as f32).sqrt().max(1.0);
        (0..self.num_heads)
            .map(|h| {
                let q = self.w_query[h].mat_vec(query);
                let k = self.w_key[h].mat_vec(capability_embedding);
                let dot: f32 = q.iter().zip(&k).map(|(a, b)| a * b).sum();
                sigmoid(dot / scale)
            })
            .collect()
    }

    /// Per-head scaled dot-product attention scores against a
    /// capability's raw, `embedding_dim`-wide stored embedding — the
    /// "sem" half of the dual-path blend, independent of whatever the
    /// forward pass propagated structurally.
    pub fn per_head_scores_semantic(&self, query: &[f32], capability_embedding: &[f32]) -> Vec<f32> {
        let scale = (self.hidden_dim as f32).sqrt().max(1.0);
        (0..self.num_heads)
            .map(|h| {
                let q = self.w_query[h].mat_vec(query);
                let k = self.w_key_semantic[h].mat_vec(capability_embedding);
                let dot: f32 = q.iter().zip(&k).map(|(a, b)| a * b).sum();
                sigmoid(dot / scale)
            })
            .collect()
    }

    /// Raw semantic-path score in `(0, 1)`, fused with the unweighted
    /// mean over all heads.
    pub fn score_semantic(&self, query: &[f32], capability_embedding: &[f32]) -> f32 {
        let head_scores = self.per_head_scores_semantic(query, capability_embedding);
        self.fuse_heads(&head_scores, &HeadFusionConfig::default())
    }

    /// Combines per-head scores per `fusion` (`spec.md` §4.4): an
    /// unweighted mean over the active heads, or the fixed convex
    /// combination given by `fusion_weights` when present.
    pub fn fuse_heads(&self, head_scores: &[f32], fusion: &HeadFusionConfig) -> f32 {
        let active: Vec<usize> = fusion
            .active_heads
            .clone()
            .unwrap_or_else(|| (0..head_scores.len()).collect());
        match &fusion.fusion_weights {
            Some(weights) => {
                let mut numerator = 0.0;
                let mut denominator = 0.0;
                for &h in &active {
                    if let (Some(&w), Some(&s)) = (weights.get(h), head_scores.get(h)) {
                        numerator += w * s;
                        denominator += w;
                    }
                }
                if denominator > 0.0 {
                    numerator / denominator
                } else {
                    0.0
                }
            }
            None => {
                let sum: f32 = active.iter().filter_map(|&h| head_scores.get(h)).sum();
                sum / active.len().max(1) as f32
            }
        }
    }

    /// Raw semantic-path score in `(0, 1)`, fused with the unweighted
    /// mean over all heads.
    pub fn score_embedding(&self, query: &[f32], capability_embedding: &[f32]) -> f32 {
        let head_scores = self.per_head_scores(query, capability_embedding);
        self.fuse_heads(&head_scores, &HeadFusionConfig::default())
    }

    /// Scores `query` against every capability's forward-pass
    /// ("str") embedding. When `dual_path.enabled`, blends it against
    /// the "sem" score — the same query scored against the
    /// capability's original, `embedding_dim`-wide stored embedding —
    /// by `graph_path_weight` on the structural term (`spec.md` §4.4).
    /// Results are sorted by score descending, ties broken by
    /// capability id ascending for determinism. Checks `deadline` once
    /// per candidate, aborting with `CoreError::Cancelled` before
    /// scoring the rest of the batch.
    pub fn score_all_capabilities(
        &self,
        query: &[f32],
        capabilities: &HashMap<String, Capability>,
        capability_embeddings: &HashMap<String, Vec<f32>>,
        dual_path: &DualPathConfig,
        head_fusion: &HeadFusionConfig,
        deadline: &crate::deadline::Deadline,
    ) -> Result<Vec<CapabilityScore>, crate::error::CoreError> {
        let mut scores: Vec<CapabilityScore> = Vec::with_capacity(capability_embeddings.len());
        for (id, emb) in capability_embeddings {
            if deadline.is_expired() {
                return Err(crate::error::CoreError::Cancelled);
            }
            let head_weights = self.per_head_scores(query, emb);
            let structural = self.fuse_heads(&head_weights, head_fusion);
            let score = if dual_path.enabled {
                match capabilities.get(id) {
                    Some(cap) => {
                        let semantic = self.score_semantic(query, &cap.embedding);
                        let w = dual_path.graph_path_weight;
                        w * structural + (1.0 - w) * semantic
                    }
                    None => structural,
                }
            } else {
                structural
            };
            scores.push(CapabilityScore {
                capability_id: id.clone(),
                score,
                head_weights,
            });
        }
        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.capability_id.cmp(&b.capability_id))
        });
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypergraph::Member;

    fn capability(id: &str, success_rate: f32) -> Capability {
        Capability {
            id: id.to_string(),
            embedding: vec![1.0, 0.0],
            members: vec![Member::Tool { id: "t".into() }],
            hierarchy_level_hint: None,
            success_rate,
        }
    }

    #[test]
    fn identical_embeddings_score_higher_than_orthogonal() {
        let scorer = KHeadScorer::new(4, 8, 2, 1);
        let query = vec![1.0, 0.0, 0.0, 0.0];
        let aligned = vec![1.0; 8];
        let orthogonal = vec![0.0; 8];
        let s_aligned = scorer.score_embedding(&query, &aligned);
        let s_orthogonal = scorer.score_embedding(&query, &orthogonal);
        assert!(s_aligned >= s_orthogonal);
    }

    #[test]
    fn ties_break_by_capability_id_ascending() {
        let scorer = KHeadScorer::new(2, 4, 1, 1);
        let mut caps = HashMap::new();
        caps.insert("zz".to_string(), capability("zz", 0.5));
        caps.insert("aa".to_string(), capability("aa", 0.5));
        let mut embeddings = HashMap::new();
        embeddings.insert("zz".to_string(), vec![1.0, 0.0, 0.0, 0.0]);
        embeddings.insert("aa".to_string(), vec![1.0, 0.0, 0.0, 0.0]);
        let query = vec![1.0, 0.0];
        let scores = scorer
            .score_all_capabilities(
                &query,
                &caps,
                &embeddings,
                &DualPathConfig::default(),
                &HeadFusionConfig::default(),
                &crate::deadline::Deadline::none(),
            )
            .unwrap();
        assert_eq!(scores[0].capability_id, "aa");
        assert_eq!(scores[1].capability_id, "zz");
    }

    #[test]
    fn dual_path_weight_one_is_pure_structural() {
        let scorer = KHeadScorer::new(2, 4, 1, 1);
        let mut caps = HashMap::new();
        caps.insert("a".to_string(), capability("a", 1.0));
        let mut embeddings = HashMap::new();
        embeddings.insert("a".to_string(), vec![0.0, 0.0, 0.0, 0.0]);
        let query = vec![1.0, 0.0];
        let dual_path = DualPathConfig {
            enabled: true,
            graph_path_weight: 1.0,
        };
        let scores = scorer
            .score_all_capabilities(
                &query,
                &caps,
                &embeddings,
                &dual_path,
                &HeadFusionConfig::default(),
                &crate::deadline::Deadline::none(),
            )
            .unwrap();
        let structural = scorer.score_embedding(&query, &embeddings["a"]);
        // graph_path_weight = 1.0 means the blended score is exactly
        // the structural score, regardless of the semantic embedding.
        assert!((scores[0].score - structural).abs() < 1e-6);
    }

    #[test]
    fn dual_path_weight_zero_is_pure_semantic() {
        let scorer = KHeadScorer::new(2, 4, 1, 1);
        let mut caps = HashMap::new();
        caps.insert("a".to_string(), capability("a", 1.0));
        let mut embeddings = HashMap::new();
        embeddings.insert("a".to_string(), vec![0.0, 0.0, 0.0, 0.0]);
        let query = vec![1.0, 0.0];
        let dual_path = DualPathConfig {
            enabled: true,
            graph_path_weight: 0.0,
        };
        let scores = scorer
            .score_all_capabilities(
                &query,
                &caps,
                &embeddings,
                &dual_path,
                &HeadFusionConfig::default(),
                &crate::deadline::Deadline::none(),
            )
            .unwrap();
        let semantic = scorer.score_semantic(&query, &caps["a"].embedding);
        assert!((scores[0].score - semantic).abs() < 1e-6);
    }

    #[test]
    fn inactive_heads_are_excluded_from_fusion() {
        let scorer = KHeadScorer::new(2, 4, 2, 1);
        let head_scores = vec![0.2, 0.8];
        let all = scorer.fuse_heads(&head_scores, &HeadFusionConfig::default());
        assert!((all - 0.5).abs() < 1e-6);

        let only_second = HeadFusionConfig {
            active_heads: Some(vec![1]),
            fusion_weights: None,
        };
        let filtered = scorer.fuse_heads(&head_scores, &only_second);
        assert!((filtered - 0.8).abs() < 1e-6);
    }

    #[test]
    fn fixed_fusion_weights_override_the_unweighted_mean() {
        let scorer = KHeadScorer::new(2, 4, 2, 1);
        let head_scores = vec![0.0, 1.0];
        let weighted = HeadFusionConfig {
            active_heads: None,
            fusion_weights: Some(vec![0.25, 0.75]),
        };
        let fused = scorer.fuse_heads(&head_scores, &weighted);
        assert!((fused - 0.75).abs() < 1e-6);
    }
}
