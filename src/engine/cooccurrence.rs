//! Optional vertex-to-vertex co-occurrence enrichment (`spec.md` §4.3):
//! an additive attention-logit bias between tools that have been
//! observed used together, on top of the embedding-driven attention
//! score.

use crate::hypergraph::Features;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooccurrenceConfig {
    pub enabled: bool,
    /// Bias weight applied to the average of the two tools' normalised
    /// co-occurrence features.
    pub weight: f32,
}

impl Default for CooccurrenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            weight: 0.15,
        }
    }
}

/// Additive bias for an attention logit between `source` and its
/// target aggregate, derived from each tool's co-occurrence feature.
/// Zero (a no-op bias) when disabled or either side lacks the feature.
pub fn bias(config: &CooccurrenceConfig, source: &Features, target_mean: f32) -> f32 {
    if !config.enabled {
        return 0.0;
    }
    config.weight * (source.cooccurrence + target_mean) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_contributes_nothing() {
        let cfg = CooccurrenceConfig {
            enabled: false,
            weight: 1.0,
        };
        let f = Features {
            cooccurrence: 1.0,
            ..Features::default()
        };
        assert_eq!(bias(&cfg, &f, 1.0), 0.0);
    }

    #[test]
    fn enabled_config_scales_by_weight() {
        let cfg = CooccurrenceConfig {
            enabled: true,
            weight: 0.5,
        };
        let f = Features {
            cooccurrence: 0.4,
            ..Features::default()
        };
        assert!((bias(&cfg, &f, 0.6) - 0.25).abs() < 1e-6);
    }
}
