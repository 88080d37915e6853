//! Bayesian cold-start alpha (`spec.md` §4.6): linear warm-up from
//! `prior_alpha` to `target_alpha` as observations accumulate, the
//! fallback for nodes too new to trust structural signal.

use super::config::ColdStartConfig;

/// `observations` is the node's total accept/reject count seen so far.
/// Below `threshold` the result interpolates linearly; at or above it,
/// `target_alpha` is returned outright.
pub fn compute(config: &ColdStartConfig, observations: u32) -> f32 {
    if observations >= config.threshold {
        return config.target_alpha;
    }
    let t = observations as f32 / config.threshold as f32;
    config.prior_alpha + (config.target_alpha - config.prior_alpha) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_observations_gives_the_prior() {
        let cfg = ColdStartConfig::default();
        assert_eq!(compute(&cfg, 0), cfg.prior_alpha);
    }

    #[test]
    fn at_threshold_gives_the_target() {
        let cfg = ColdStartConfig::default();
        assert_eq!(compute(&cfg, cfg.threshold), cfg.target_alpha);
    }

    #[test]
    fn warms_up_monotonically() {
        let cfg = ColdStartConfig::default();
        let a = compute(&cfg, 1);
        let b = compute(&cfg, 2);
        assert!(b >= a);
    }
}
