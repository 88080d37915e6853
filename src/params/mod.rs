//! Per-level attention parameters (`spec.md` §4.2 — component C2):
//! Xavier-initialised weight matrices and attention vectors, one set
//! per hierarchy level, shared across every call into that level's
//! forward pass.

mod level;
mod store;
mod xavier;

pub use level::LevelParams;
pub use store::LevelParamStore;
pub use xavier::xavier_init;

/// A dense row-major matrix. Deliberately hand-rolled rather than
/// pulling in a linear-algebra crate: every matrix here is small
/// (`hidden_dim` square at most) and participates in the same
/// attention kernels as `engine::attention`, which already owns the
/// per-head fan-out.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn from_rows(rows: Vec<Vec<f32>>) -> Self {
        let r = rows.len();
        let c = rows.first().map_or(0, |row| row.len());
        let mut data = Vec::with_capacity(r * c);
        for row in rows {
            debug_assert_eq!(row.len(), c, "ragged matrix rows");
            data.extend(row);
        }
        Self { rows: r, cols: c, data }
    }

    pub fn row(&self, r: usize) -> &[f32] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn get(&self, r: usize, c: usize) -> f32 {
        self.data[r * self.cols + c]
    }

    /// `self * v`, where `v` has length `self.cols`; result has length
    /// `self.rows`.
    pub fn mat_vec(&self, v: &[f32]) -> Vec<f32> {
        debug_assert_eq!(v.len(), self.cols);
        (0..self.rows)
            .map(|r| self.row(r).iter().zip(v).map(|(a, b)| a * b).sum())
            .collect()
    }
}
