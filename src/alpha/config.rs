//! Configuration for the Local Adaptive Alpha calculator (C6).
//!
//! Every numeric field here is validated at load time the way
//! `search::vector::VectorIndexConfig` validates dimensions against the
//! index it is paired with — except here the check happens once, up
//! front, rather than on every call.

use crate::error::ConfigError;

/// Bayesian cold-start fallback: used while a node has fewer than
/// `threshold` observations.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColdStartConfig {
    pub threshold: u32,
    pub prior_alpha: f32,
    pub target_alpha: f32,
}

impl Default for ColdStartConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            prior_alpha: 1.0,
            target_alpha: 0.7,
        }
    }
}

/// Heat-Diffusion weights: intrinsic (own feature) vs. neighbour heat.
/// Must sum to 1.0 (`spec.md` §4.6/§6).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatDiffusionConfig {
    pub intrinsic_weight: f32,
    pub neighbor_weight: f32,
}

impl Default for HeatDiffusionConfig {
    fn default() -> Self {
        Self {
            intrinsic_weight: 0.6,
            neighbor_weight: 0.4,
        }
    }
}

/// Heat-Hierarchical inheritance fractions: how much of a parent's /
/// child's heat is inherited across a hierarchy level.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatInheritanceConfig {
    pub meta_to_capability: f32,
    pub capability_to_tool: f32,
}

impl Default for HeatInheritanceConfig {
    fn default() -> Self {
        Self {
            meta_to_capability: 0.5,
            capability_to_tool: 0.5,
        }
    }
}

/// Per-node-type `(intrinsic, neighbour, hierarchy)` weight triple, each
/// summing to 1.0 +/- 1e-2 (`spec.md` §4.6 config validation).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyWeightTriple {
    pub intrinsic: f32,
    pub neighbor: f32,
    pub hierarchy: f32,
}

impl HierarchyWeightTriple {
    fn sum(&self) -> f32 {
        self.intrinsic + self.neighbor + self.hierarchy
    }
}

/// `hierarchy.{tool,capability,meta}.{intrinsic,neighbor,hierarchy}`.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyWeights {
    pub tool: HierarchyWeightTriple,
    pub capability: HierarchyWeightTriple,
    pub meta: HierarchyWeightTriple,
}

impl Default for HierarchyWeights {
    fn default() -> Self {
        let tool = HierarchyWeightTriple {
            intrinsic: 0.45,
            neighbor: 0.40,
            hierarchy: 0.15,
        };
        let capability = HierarchyWeightTriple {
            intrinsic: 0.3,
            neighbor: 0.3,
            hierarchy: 0.4,
        };
        let meta = HierarchyWeightTriple {
            intrinsic: 0.2,
            neighbor: 0.2,
            hierarchy: 0.6,
        };
        Self {
            tool,
            capability,
            meta,
        }
    }
}

/// Which of the four dispatchable algorithms `LocalAlphaCalculator`
/// uses to resolve alpha for a node (`spec.md` §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AlphaAlgorithm {
    BayesianColdStart,
    EmbeddingsHybrid,
    HeatDiffusion,
    HeatHierarchical,
}

/// Full Local Alpha configuration (`spec.md` §4.6 + §6).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAlphaConfig {
    pub algorithm: AlphaAlgorithm,
    pub alpha_min: f32,
    pub alpha_max: f32,
    pub cold_start: ColdStartConfig,
    pub heat_diffusion: HeatDiffusionConfig,
    pub heat_inheritance: HeatInheritanceConfig,
    pub hierarchy: HierarchyWeights,
    /// Exponential decay rate applied to each context node's shortest
    /// distance when computing path heat (`spec.md` §4.6 Heat-Diffusion
    /// / Heat-Hierarchical, third term).
    pub path_heat_decay: f32,
    /// Cache capacity for the (mode, nodeId, nodeType, contextSignature)
    /// -> alpha LRU cache.
    pub cache_capacity: usize,
}

impl Default for LocalAlphaConfig {
    fn default() -> Self {
        Self {
            algorithm: AlphaAlgorithm::BayesianColdStart,
            alpha_min: 0.5,
            alpha_max: 1.0,
            cold_start: ColdStartConfig::default(),
            heat_diffusion: HeatDiffusionConfig::default(),
            heat_inheritance: HeatInheritanceConfig::default(),
            hierarchy: HierarchyWeights::default(),
            path_heat_decay: 0.5,
            cache_capacity: 4096,
        }
    }
}

fn check_probability(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::NotAProbability { field, value });
    }
    Ok(())
}

fn check_triple_sum(field: &'static str, triple: &HierarchyWeightTriple) -> Result<(), ConfigError> {
    let sum = triple.sum();
    if (sum - 1.0).abs() > 1e-2 {
        return Err(ConfigError::WeightTripleNotNormalized { field, sum });
    }
    Ok(())
}

impl LocalAlphaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alpha_min > self.alpha_max {
            return Err(ConfigError::AlphaRangeInverted {
                alpha_min: self.alpha_min,
                alpha_max: self.alpha_max,
            });
        }
        check_probability("alphaMin", self.alpha_min)?;
        check_probability("alphaMax", self.alpha_max)?;
        check_probability("coldStart.priorAlpha", self.cold_start.prior_alpha)?;
        check_probability("coldStart.targetAlpha", self.cold_start.target_alpha)?;
        if self.cold_start.threshold < 1 {
            return Err(ConfigError::ColdStartThresholdTooSmall(
                self.cold_start.threshold,
            ));
        }

        let heat_sum = self.heat_diffusion.intrinsic_weight + self.heat_diffusion.neighbor_weight;
        if (heat_sum - 1.0).abs() > 1e-2 {
            return Err(ConfigError::HeatWeightsNotNormalized(heat_sum));
        }

        check_triple_sum("hierarchy.tool", &self.hierarchy.tool)?;
        check_triple_sum("hierarchy.capability", &self.hierarchy.capability)?;
        check_triple_sum("hierarchy.meta", &self.hierarchy.meta)?;

        check_probability("pathHeatDecay", self.path_heat_decay)?;

        check_probability(
            "heatInheritance.metaToCapability",
            self.heat_inheritance.meta_to_capability,
        )?;
        check_probability(
            "heatInheritance.capabilityToTool",
            self.heat_inheritance.capability_to_tool,
        )?;

        Ok(())
    }
}
