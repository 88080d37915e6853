//! Xavier/Glorot-uniform initialisation (`spec.md` §4.2).

use rand::Rng;

use super::Matrix;

/// Fills a `rows x cols` matrix with draws from
/// `Uniform(-limit, limit)`, `limit = sqrt(6 / (rows + cols))`.
pub fn xavier_init(rows: usize, cols: usize, rng: &mut impl Rng) -> Matrix {
    let limit = (6.0 / (rows + cols) as f32).sqrt();
    let data = (0..rows * cols)
        .map(|_| rng.gen_range(-limit..=limit))
        .collect();
    Matrix { rows, cols, data }
}

/// Xavier init for a flat attention vector of length `len` (treated as
/// a `1 x len` fan-in/fan-out pair, matching the GAT convention of
/// initialising `a` the same way as a weight matrix).
pub fn xavier_init_vec(len: usize, rng: &mut impl Rng) -> Vec<f32> {
    xavier_init(1, len, rng).data
}
