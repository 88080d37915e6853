//! Confidence and rationale derivation (`spec.md` §4.9 — component
//! C9): a hop-count confidence map and an alpha-interpolated weight
//! blend between the hybrid score, PageRank, and path-length terms.

/// Piecewise hop-count -> confidence map. Hops `<= 0` (malformed) or
/// `>= 4` both fall back to the same floor value.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HopConfidenceConfig {
    pub hop1: f32,
    pub hop2: f32,
    pub hop3: f32,
    pub hop_default: f32,
}

impl Default for HopConfidenceConfig {
    fn default() -> Self {
        Self {
            hop1: 0.95,
            hop2: 0.80,
            hop3: 0.65,
            hop_default: 0.45,
        }
    }
}

impl HopConfidenceConfig {
    pub fn confidence_for_hops(&self, hops: i32) -> f32 {
        match hops {
            1 => self.hop1,
            2 => self.hop2,
            3 => self.hop3,
            _ => self.hop_default,
        }
    }
}

/// Base `(hybrid, pagerank, path)` weight triple at `alpha = alpha_min`,
/// plus one independent scale constant per term applied against
/// `(alpha - 0.5) / 0.5`. A single shared scale cannot reproduce the
/// worked example in `spec.md` §4.9 (base `(0.55, 0.30, 0.15)` moving to
/// `(0.85, 0.05, 0.10)` at `alpha = 1.0`: deltas of `+0.30, -0.25,
/// -0.05`), so each term gets its own.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagWeightsConfig {
    pub base_hybrid: f32,
    pub base_pagerank: f32,
    pub base_path: f32,
    pub hybrid_scale: f32,
    pub pagerank_scale: f32,
    pub path_scale: f32,
}

impl Default for DagWeightsConfig {
    fn default() -> Self {
        Self {
            base_hybrid: 0.55,
            base_pagerank: 0.30,
            base_path: 0.15,
            hybrid_scale: 0.30,
            pagerank_scale: 0.25,
            path_scale: 0.05,
        }
    }
}

/// Resolved weights for one query, always summing to 1.0 by
/// construction (the three scale deltas sum to zero).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedWeights {
    pub hybrid_weight: f32,
    pub pagerank_weight: f32,
    pub path_weight: f32,
}

impl DagWeightsConfig {
    pub fn resolve(&self, alpha: f32) -> ResolvedWeights {
        let factor = ((alpha - 0.5) / 0.5).clamp(0.0, 1.0);
        ResolvedWeights {
            hybrid_weight: self.base_hybrid + factor * self.hybrid_scale,
            pagerank_weight: self.base_pagerank - factor * self.pagerank_scale,
            path_weight: self.base_path - factor * self.path_scale,
        }
    }
}

/// Full C9 configuration.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagConfig {
    pub hop_confidence: HopConfidenceConfig,
    pub weights: DagWeightsConfig,
    pub max_confidence: f32,
    /// Capabilities below this PageRank are flagged as low-centrality in
    /// the rationale string rather than silently scored.
    pub pagerank_threshold: f32,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            hop_confidence: HopConfidenceConfig::default(),
            weights: DagWeightsConfig::default(),
            max_confidence: 0.95,
            pagerank_threshold: 0.05,
        }
    }
}

/// Names the algorithm/path that produced a suggested candidate, each
/// formatted with its own fixed rationale template (`spec.md` §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionSource {
    Community,
    Cooccurrence,
    Capability,
    Alternative,
}

/// Inputs to the base rationale segment, gathered by the suggester for
/// the top candidate. `semantic`/`graph` are omitted from the string
/// when `None`; `pagerank` is omitted when below `pagerankThreshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RationaleInputs {
    pub top_hybrid: f32,
    pub semantic: Option<f32>,
    pub graph: Option<f32>,
    pub pagerank: f32,
    pub total_deps: usize,
    pub direct_deps: usize,
}

impl DagConfig {
    /// Hybrid confidence (`spec.md` §4.9): the alpha-interpolated weight
    /// blend applied to the top hybrid score, the mean PageRank of the
    /// top 3 candidates, and the mean path confidence, capped at
    /// `maxConfidence`. Missing components are passed as `0.0` by the
    /// caller and contribute `0` with no renormalisation.
    pub fn confidence(&self, alpha: f32, top_hybrid: f32, mean_top3_pagerank: f32, mean_path_confidence: f32) -> f32 {
        let weights = self.weights.resolve(alpha);
        let blended = weights.hybrid_weight * top_hybrid
            + weights.pagerank_weight * mean_top3_pagerank
            + weights.path_weight * mean_path_confidence;
        blended.min(self.max_confidence)
    }

    fn base_segment(&self, inputs: &RationaleInputs) -> String {
        let mut rationale = format!("hybrid search ({:.0}%)", inputs.top_hybrid * 100.0);
        if let Some(semantic) = inputs.semantic {
            rationale.push_str(&format!(", semantic: {:.0}%", semantic * 100.0));
        }
        if let Some(graph) = inputs.graph {
            rationale.push_str(&format!(", graph: {:.0}%", graph * 100.0));
        }
        if inputs.pagerank >= self.pagerank_threshold {
            rationale.push_str(&format!(", PageRank: {:.0}%", inputs.pagerank * 100.0));
        }
        rationale.push_str(&format!(", {} deps ({} direct)", inputs.total_deps, inputs.direct_deps));
        rationale
    }

    /// Builds the deterministic rationale string for one suggestion.
    /// `None` falls back to the "unknown prediction source" template
    /// (`spec.md` §4.9 edge case); each known source prepends its own
    /// fixed descriptor in front of the shared base segment.
    pub fn rationale(&self, source: Option<PredictionSource>, inputs: &RationaleInputs) -> String {
        let Some(source) = source else {
            return "Unknown prediction source".to_string();
        };
        let base = self.base_segment(inputs);
        match source {
            PredictionSource::Community => format!("Community-linked capability via {base}"),
            PredictionSource::Cooccurrence => format!("Co-occurrence pattern via {base}"),
            PredictionSource::Capability => format!("Capability match via {base}"),
            PredictionSource::Alternative => format!("Alternative candidate via {base}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hop_confidence_matches_the_piecewise_map() {
        let cfg = HopConfidenceConfig::default();
        assert_eq!(cfg.confidence_for_hops(1), 0.95);
        assert_eq!(cfg.confidence_for_hops(2), 0.80);
        assert_eq!(cfg.confidence_for_hops(3), 0.65);
        assert_eq!(cfg.confidence_for_hops(4), 0.45);
        assert_eq!(cfg.confidence_for_hops(0), 0.45);
        assert_eq!(cfg.confidence_for_hops(-1), 0.45);
    }

    #[test]
    fn weights_match_the_worked_example_at_alpha_one() {
        let cfg = DagWeightsConfig::default();
        let w = cfg.resolve(1.0);
        assert!((w.hybrid_weight - 0.85).abs() < 1e-6);
        assert!((w.pagerank_weight - 0.05).abs() < 1e-6);
        assert!((w.path_weight - 0.10).abs() < 1e-6);
    }

    #[test]
    fn weights_always_sum_to_one() {
        let cfg = DagWeightsConfig::default();
        for alpha in [0.5, 0.6, 0.75, 0.9, 1.0] {
            let w = cfg.resolve(alpha);
            let sum = w.hybrid_weight + w.pagerank_weight + w.path_weight;
            assert!((sum - 1.0).abs() < 1e-6, "alpha={alpha} sum={sum}");
        }
    }

    fn inputs(pagerank: f32) -> RationaleInputs {
        RationaleInputs {
            top_hybrid: 0.8,
            semantic: Some(0.9),
            graph: Some(0.6),
            pagerank,
            total_deps: 3,
            direct_deps: 1,
        }
    }

    #[test]
    fn missing_prediction_source_falls_back_to_unknown() {
        let cfg = DagConfig::default();
        assert_eq!(cfg.rationale(None, &inputs(0.5)), "Unknown prediction source");
    }

    #[test]
    fn low_pagerank_is_omitted_from_rationale() {
        let cfg = DagConfig::default();
        let rationale = cfg.rationale(Some(PredictionSource::Capability), &inputs(0.01));
        assert!(!rationale.contains("PageRank"));
    }

    #[test]
    fn high_pagerank_is_included_in_rationale() {
        let cfg = DagConfig::default();
        let rationale = cfg.rationale(Some(PredictionSource::Community), &inputs(0.5));
        assert!(rationale.contains("PageRank: 50%"));
    }

    #[test]
    fn confidence_matches_the_weighted_sum_at_alpha_half() {
        let cfg = DagConfig::default();
        // at alpha=0.5 the resolved weights are exactly the base triple.
        let confidence = cfg.confidence(0.5, 1.0, 1.0, 1.0);
        assert!((confidence - 0.95).abs() < 1e-6); // 0.55+0.30+0.15=1.0, capped at max_confidence.
    }

    #[test]
    fn confidence_ignores_missing_components_with_no_renormalisation() {
        let cfg = DagConfig::default();
        let confidence = cfg.confidence(0.5, 1.0, 0.0, 0.0);
        assert!((confidence - 0.55).abs() < 1e-6);
    }
}
