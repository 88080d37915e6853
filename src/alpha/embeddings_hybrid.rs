//! Embeddings-Hybrides alpha (`spec.md` §4.6): correlates a node's
//! recent semantic-match history against its structural-score history
//! via Pearson correlation, then maps the correlation directly onto
//! alpha.

/// Pearson correlation coefficient, `0.0` for degenerate input (fewer
/// than 2 points or a zero-variance series).
pub fn pearson_correlation(xs: &[f32], ys: &[f32]) -> f32 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let xs = &xs[..n];
    let ys = &ys[..n];
    let mean_x = xs.iter().sum::<f32>() / n as f32;
    let mean_y = ys.iter().sum::<f32>() / n as f32;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..n {
        let dx = xs[i] - mean_x;
        let dy = ys[i] - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= f32::EPSILON || var_y <= f32::EPSILON {
        return 0.0;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

/// `alpha = 1 - 0.5*max(r, 0)` (`spec.md` §4.6): positive correlation
/// between semantic and structural history pulls alpha down toward
/// 0.5 (structure is corroborating semantics, so lean on both); zero or
/// negative correlation leaves alpha at 1.0 (trust semantics alone).
/// Fewer than 2 history points on either side is a cold start — alpha
/// is 1.0 before any correlation is even attempted.
pub fn compute(semantic_history: &[f32], structural_history: &[f32]) -> f32 {
    if semantic_history.len() < 2 || structural_history.len() < 2 {
        return 1.0;
    }
    let r = pearson_correlation(semantic_history, structural_history);
    1.0 - 0.5 * r.max(0.0)
}
