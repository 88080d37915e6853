//! Per-level, per-head attention parameters.

use rand::Rng;

use super::xavier::{xavier_init, xavier_init_vec};
use super::Matrix;

/// Upward (V -> E) and downward (E -> V) attention parameters for a
/// single hierarchy level, one entry per head.
///
/// Upward projects child node features (dimension `in_dim`) into
/// `hidden_dim`; downward re-projects the resulting hyperedge features
/// (already `hidden_dim`) back onto the parent. Both follow the GAT
/// convention: `e_ij = LeakyReLU(a^T [W h_i || W h_j])`. `w_parent`
/// projects an entity's own raw (`embedding_dim`-wide) stored embedding
/// into `hidden_dim` space, used as the attention query for both
/// passes and as the downward residual baseline — never as part of the
/// aggregated output value itself (`spec.md` §4.2).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LevelParams {
    pub num_heads: usize,
    pub hidden_dim: usize,
    pub w_up: Vec<Matrix>,
    pub a_up: Vec<Vec<f32>>,
    pub w_down: Vec<Matrix>,
    pub a_down: Vec<Vec<f32>>,
    pub w_parent: Vec<Matrix>,
}

impl LevelParams {
    pub fn new(
        in_dim: usize,
        embedding_dim: usize,
        hidden_dim: usize,
        num_heads: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let w_up = (0..num_heads)
            .map(|_| xavier_init(hidden_dim, in_dim, rng))
            .collect();
        let a_up = (0..num_heads)
            .map(|_| xavier_init_vec(2 * hidden_dim, rng))
            .collect();
        let w_down = (0..num_heads)
            .map(|_| xavier_init(hidden_dim, hidden_dim, rng))
            .collect();
        let a_down = (0..num_heads)
            .map(|_| xavier_init_vec(2 * hidden_dim, rng))
            .collect();
        let w_parent = (0..num_heads)
            .map(|_| xavier_init(hidden_dim, embedding_dim, rng))
            .collect();
        Self {
            num_heads,
            hidden_dim,
            w_up,
            a_up,
            w_down,
            a_down,
            w_parent,
        }
    }

    /// Closed-form parameter count for this level, used to cross-check
    /// persisted shapes without walking every matrix.
    pub fn param_count(in_dim: usize, embedding_dim: usize, hidden_dim: usize, num_heads: usize) -> usize {
        let up = hidden_dim * in_dim + 2 * hidden_dim;
        let down = hidden_dim * hidden_dim + 2 * hidden_dim;
        let parent = hidden_dim * embedding_dim;
        num_heads * (up + down + parent)
    }

    pub fn total_params(&self) -> usize {
        self.w_up.iter().map(|m| m.data.len()).sum::<usize>()
            + self.a_up.iter().map(|v| v.len()).sum::<usize>()
            + self.w_down.iter().map(|m| m.data.len()).sum::<usize>()
            + self.a_down.iter().map(|v| v.len()).sum::<usize>()
            + self.w_parent.iter().map(|m| m.data.len()).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn total_params_matches_closed_form() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let level = LevelParams::new(16, 16, 32, 4, &mut rng);
        assert_eq!(
            level.total_params(),
            LevelParams::param_count(16, 16, 32, 4)
        );
    }
}
