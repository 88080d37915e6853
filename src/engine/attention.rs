//! Shared K-head attention kernels used by both the upward (V -> E) and
//! downward (E -> V) passes (`spec.md` §4.3 — component C3).
//!
//! Both directions reduce to the same primitive: project every source
//! vector through a head's weight matrix, attend each target's sources
//! against a caller-supplied query (a projection of the target's own
//! stored embedding through `w_parent`, `spec.md` §4.2), softmax per
//! target, and fall back to a caller-supplied default when a target has
//! no sources at all. An optional per-edge additive bias (`logit_bias`)
//! lets a caller enrich the raw attention logit before the nonlinearity,
//! e.g. co-occurrence enrichment (`spec.md` §4.3 step 4).

use crate::params::Matrix;

const LEAKY_RELU_SLOPE: f32 = 0.2;

pub fn leaky_relu(x: f32) -> f32 {
    if x >= 0.0 {
        x
    } else {
        LEAKY_RELU_SLOPE * x
    }
}

/// Numerically stable softmax; returns a uniform distribution for an
/// empty input's caller to special-case, and never produces `NaN`.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum <= f32::EPSILON {
        let uniform = 1.0 / logits.len() as f32;
        return vec![uniform; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

pub fn project_all(w: &Matrix, feats: &[Vec<f32>]) -> Vec<Vec<f32>> {
    feats.iter().map(|f| w.mat_vec(f)).collect()
}

fn concat(a: &[f32], b: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// For every target in `0..num_targets`, attends `projected_sources`
/// over the indices `members_of(target)` using attention vector `a`
/// (length `2 * hidden_dim`) against the query `query_of(target)`
/// (the target's own `w_parent`-projected embedding). `logit_bias(target,
/// source_idx)` is added to each raw logit before `leaky_relu`, letting a
/// caller enrich attention with a non-embedding signal (zero for
/// callers with none). Targets with no members get `fallback(target)`
/// instead — callers pass a zero vector (upward, where a member-less
/// hyperedge cannot occur structurally but is handled defensively) or
/// an L2-renormalised projection of the target's own prior features
/// (downward isolated-row pass-through, `spec.md` §4.3 invariant).
///
/// Returns, per target, its aggregated vector and the per-member
/// attention weights (summing to 1 +/- 1e-4) in the same order as
/// `members_of(target)` — the latter is kept by callers that need
/// per-edge weights for path/rationale extraction.
pub fn attend_to_targets(
    projected_sources: &[Vec<f32>],
    num_targets: usize,
    hidden_dim: usize,
    a: &[f32],
    members_of: impl Fn(usize) -> Vec<usize>,
    query_of: impl Fn(usize) -> Vec<f32>,
    logit_bias: impl Fn(usize, usize) -> f32,
    fallback: impl Fn(usize) -> Vec<f32>,
) -> (Vec<Vec<f32>>, Vec<Vec<f32>>) {
    let mut outputs = Vec::with_capacity(num_targets);
    let mut weights = Vec::with_capacity(num_targets);
    for target in 0..num_targets {
        let members = members_of(target);
        if members.is_empty() {
            outputs.push(fallback(target));
            weights.push(Vec::new());
            continue;
        }
        let member_feats: Vec<&Vec<f32>> = members.iter().map(|&i| &projected_sources[i]).collect();
        let query = query_of(target);
        let logits: Vec<f32> = members
            .iter()
            .zip(member_feats.iter())
            .map(|(&src, feat)| leaky_relu(dot(a, &concat(feat, &query)) + logit_bias(target, src)))
            .collect();
        let alpha = softmax(&logits);
        let mut out = vec![0.0; hidden_dim];
        for (w, feat) in alpha.iter().zip(member_feats.iter()) {
            for (o, x) in out.iter_mut().zip(feat.iter()) {
                *o += w * x;
            }
        }
        outputs.push(out);
        weights.push(alpha);
    }
    (outputs, weights)
}
