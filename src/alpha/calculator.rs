//! `LocalAlphaCalculator` (`spec.md` §4.6 — component C6): dispatches
//! to one of the four alpha algorithms, clamps into
//! `[alpha_min, alpha_max]`, and caches the result behind an LRU keyed
//! by `(mode, node id, node type, context signature)`.

use lru::LruCache;
use std::num::NonZeroUsize;

use super::bayesian;
use super::config::{AlphaAlgorithm, LocalAlphaConfig};
use super::embeddings_hybrid;
use super::heat;
use crate::thompson::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Tool,
    Capability,
    Meta,
}

/// Everything an algorithm might need, gathered by the caller (the
/// suggester) before asking for alpha. Unused fields for the selected
/// algorithm are simply ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaContext {
    pub observations: u32,
    pub own_heat: f32,
    pub neighbor_heats: Vec<f32>,
    pub parent_heat: Option<f32>,
    pub semantic_history: Vec<f32>,
    pub structural_history: Vec<f32>,
    /// Shortest-path hop distance from each context node to the node
    /// being scored, feeding the path-heat term (`spec.md` §4.6).
    pub context_distances: Vec<u32>,
}

/// A coarse, hashable summary of `AlphaContext` used as part of the
/// cache key — full float vectors are deliberately not hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ContextSignature {
    observations: u32,
    own_heat_milli: i64,
    history_len: usize,
}

impl From<&AlphaContext> for ContextSignature {
    fn from(ctx: &AlphaContext) -> Self {
        Self {
            observations: ctx.observations,
            own_heat_milli: (ctx.own_heat * 1000.0).round() as i64,
            history_len: ctx.semantic_history.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    mode: ModeKey,
    node_id_hash: u64,
    node_type: NodeType,
    signature: ContextSignature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ModeKey {
    ActiveSearch,
    PassiveSuggestion,
    Speculation,
}

impl From<Mode> for ModeKey {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::ActiveSearch => ModeKey::ActiveSearch,
            Mode::PassiveSuggestion => ModeKey::PassiveSuggestion,
            Mode::Speculation => ModeKey::Speculation,
        }
    }
}

fn hash_id(id: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

pub struct LocalAlphaCalculator {
    config: LocalAlphaConfig,
    cache: LruCache<CacheKey, f32>,
}

impl LocalAlphaCalculator {
    pub fn new(config: LocalAlphaConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity.max(1)).expect("capacity is at least 1");
        Self {
            config,
            cache: LruCache::new(capacity),
        }
    }

    fn weight_triple(&self, node_type: NodeType) -> &super::config::HierarchyWeightTriple {
        match node_type {
            NodeType::Tool => &self.config.hierarchy.tool,
            NodeType::Capability => &self.config.hierarchy.capability,
            NodeType::Meta => &self.config.hierarchy.meta,
        }
    }

    fn dispatch(&self, node_type: NodeType, ctx: &AlphaContext) -> f32 {
        match self.config.algorithm {
            AlphaAlgorithm::BayesianColdStart => bayesian::compute(&self.config.cold_start, ctx.observations),
            AlphaAlgorithm::EmbeddingsHybrid => {
                embeddings_hybrid::compute(&ctx.semantic_history, &ctx.structural_history)
            }
            AlphaAlgorithm::HeatDiffusion => {
                let local = heat::diffusion(&self.config.heat_diffusion, ctx.own_heat, &ctx.neighbor_heats);
                let path = heat::path_heat(&ctx.context_distances, self.config.path_heat_decay);
                let triple = self.weight_triple(node_type);
                let heat_value = (1.0 - triple.hierarchy) * local + triple.hierarchy * path;
                1.0 - heat_value
            }
            AlphaAlgorithm::HeatHierarchical => {
                let neighbor_heat = if ctx.neighbor_heats.is_empty() {
                    ctx.own_heat
                } else {
                    ctx.neighbor_heats.iter().sum::<f32>() / ctx.neighbor_heats.len() as f32
                };
                let path = heat::path_heat(&ctx.context_distances, self.config.path_heat_decay);
                let hierarchy_heat = match ctx.parent_heat {
                    Some(parent) => {
                        let inherited = heat::inherit_from_parent(
                            &self.config.heat_inheritance,
                            ctx.own_heat,
                            parent,
                            node_type != NodeType::Tool,
                        );
                        0.5 * inherited + 0.5 * path
                    }
                    None => path,
                };
                let heat_value =
                    heat::hierarchical(self.weight_triple(node_type), ctx.own_heat, neighbor_heat, hierarchy_heat);
                1.0 - heat_value
            }
        }
    }

    /// Returns the cached or freshly computed alpha for `node_id`,
    /// clamped into `[alpha_min, alpha_max]`.
    pub fn compute(&mut self, mode: Mode, node_id: &str, node_type: NodeType, ctx: &AlphaContext) -> f32 {
        let key = CacheKey {
            mode: mode.into(),
            node_id_hash: hash_id(node_id),
            node_type,
            signature: ContextSignature::from(ctx),
        };
        if let Some(&cached) = self.cache.get(&key) {
            return cached;
        }
        let raw = self.dispatch(node_type, ctx);
        let clamped = raw.clamp(self.config.alpha_min, self.config.alpha_max);
        self.cache.put(key, clamped);
        clamped
    }

    /// Drops every cached entry. Called whenever the hypergraph is
    /// re-committed, since structural context (neighbor sets, heat)
    /// may have changed under an unchanged context signature.
    pub fn invalidate(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> AlphaContext {
        AlphaContext {
            observations: 10,
            own_heat: 0.5,
            neighbor_heats: vec![0.5],
            parent_heat: None,
            semantic_history: vec![],
            structural_history: vec![],
            context_distances: vec![],
        }
    }

    #[test]
    fn result_is_clamped_into_configured_range() {
        let mut config = LocalAlphaConfig::default();
        config.algorithm = AlphaAlgorithm::BayesianColdStart;
        config.alpha_min = 0.6;
        config.alpha_max = 0.9;
        config.cold_start.target_alpha = 1.0; // would exceed alpha_max unclamped
        let mut calc = LocalAlphaCalculator::new(config);
        let alpha = calc.compute(Mode::ActiveSearch, "n1", NodeType::Tool, &ctx());
        assert!((0.6..=0.9).contains(&alpha));
    }

    #[test]
    fn repeated_calls_with_identical_context_hit_the_cache() {
        let mut calc = LocalAlphaCalculator::new(LocalAlphaConfig::default());
        let a = calc.compute(Mode::ActiveSearch, "n1", NodeType::Tool, &ctx());
        let b = calc.compute(Mode::ActiveSearch, "n1", NodeType::Tool, &ctx());
        assert_eq!(a, b);
    }

    #[test]
    fn invalidate_clears_cache() {
        let mut calc = LocalAlphaCalculator::new(LocalAlphaConfig::default());
        calc.compute(Mode::ActiveSearch, "n1", NodeType::Tool, &ctx());
        assert_eq!(calc.cache.len(), 1);
        calc.invalidate();
        assert_eq!(calc.cache.len(), 0);
    }

    #[test]
    fn heat_diffusion_is_inverted_before_clamping() {
        let mut config = LocalAlphaConfig::default();
        config.algorithm = AlphaAlgorithm::HeatDiffusion;
        config.alpha_min = 0.0;
        config.alpha_max = 1.0;
        config.hierarchy.tool.hierarchy = 0.0;
        config.hierarchy.tool.intrinsic = 0.6;
        config.hierarchy.tool.neighbor = 0.4;
        let mut calc = LocalAlphaCalculator::new(config);
        let mut context = ctx();
        context.own_heat = 1.0;
        context.neighbor_heats = vec![1.0];
        let alpha = calc.compute(Mode::ActiveSearch, "n1", NodeType::Tool, &context);
        // local diffusion heat is 1.0 (fully hot), so inverted alpha is 0.0.
        assert!((alpha - 0.0).abs() < 1e-6);
    }

    #[test]
    fn heat_diffusion_path_heat_term_lowers_alpha_with_nearby_context() {
        let mut config = LocalAlphaConfig::default();
        config.algorithm = AlphaAlgorithm::HeatDiffusion;
        config.hierarchy.tool.hierarchy = 1.0;
        config.hierarchy.tool.intrinsic = 0.0;
        config.hierarchy.tool.neighbor = 0.0;
        config.path_heat_decay = 0.5;
        let mut calc = LocalAlphaCalculator::new(config);

        let mut near = ctx();
        near.own_heat = 0.0;
        near.neighbor_heats = vec![];
        near.context_distances = vec![1];
        let mut far = ctx();
        far.own_heat = 0.0;
        far.neighbor_heats = vec![];
        far.context_distances = vec![5];

        let alpha_near = calc.compute(Mode::ActiveSearch, "near", NodeType::Tool, &near);
        let alpha_far = calc.compute(Mode::ActiveSearch, "far", NodeType::Tool, &far);
        // closer context nodes contribute more path heat, which inverts to a lower alpha.
        assert!(alpha_near < alpha_far);
    }

    #[test]
    fn heat_hierarchical_falls_back_to_path_heat_without_a_parent() {
        let mut config = LocalAlphaConfig::default();
        config.algorithm = AlphaAlgorithm::HeatHierarchical;
        config.hierarchy.tool.hierarchy = 1.0;
        config.hierarchy.tool.intrinsic = 0.0;
        config.hierarchy.tool.neighbor = 0.0;
        let mut calc = LocalAlphaCalculator::new(config);
        let mut context = ctx();
        context.parent_heat = None;
        context.context_distances = vec![1];
        let alpha = calc.compute(Mode::ActiveSearch, "n1", NodeType::Tool, &context);
        let expected = 1.0 - heat::path_heat(&[1], 0.5);
        assert!((alpha - expected).abs() < 1e-6);
    }
}
