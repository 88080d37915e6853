//! Heat-Diffusion and Heat-Hierarchical alpha (`spec.md` §4.6): treat
//! recency/usage as a diffusing "heat" quantity, either averaged with a
//! node's immediate neighbors or inherited down the hierarchy.

use super::config::{HeatDiffusionConfig, HeatInheritanceConfig, HierarchyWeightTriple};

/// `own_heat` blended with the mean of `neighbor_heats` by the
/// configured intrinsic/neighbor split.
pub fn diffusion(config: &HeatDiffusionConfig, own_heat: f32, neighbor_heats: &[f32]) -> f32 {
    let neighbor_mean = if neighbor_heats.is_empty() {
        own_heat
    } else {
        neighbor_heats.iter().sum::<f32>() / neighbor_heats.len() as f32
    };
    config.intrinsic_weight * own_heat + config.neighbor_weight * neighbor_mean
}

/// Propagates heat one hierarchy step: a capability's heat from its
/// meta-capability parent, or a tool's heat from its owning capability.
pub fn inherit_from_parent(config: &HeatInheritanceConfig, own_heat: f32, parent_heat: f32, is_meta_to_capability: bool) -> f32 {
    let fraction = if is_meta_to_capability {
        config.meta_to_capability
    } else {
        config.capability_to_tool
    };
    (1.0 - fraction) * own_heat + fraction * parent_heat
}

/// Heat-Hierarchical alpha: combines a node's own heat, its neighbor
/// heat, and its inherited hierarchy heat using the node-type-specific
/// `(intrinsic, neighbor, hierarchy)` weight triple.
pub fn hierarchical(triple: &HierarchyWeightTriple, own_heat: f32, neighbor_heat: f32, hierarchy_heat: f32) -> f32 {
    triple.intrinsic * own_heat + triple.neighbor * neighbor_heat + triple.hierarchy * hierarchy_heat
}

/// Mean exponential-decay heat contributed by each context node's
/// shortest distance to the node being scored, `exp(-decay*distance)`
/// (`spec.md` §4.6, the third Heat-Diffusion/Heat-Hierarchical term).
/// `0.0` for an empty context, matching "no path heat without any
/// context nodes" rather than an undefined mean.
pub fn path_heat(context_distances: &[u32], decay: f32) -> f32 {
    if context_distances.is_empty() {
        return 0.0;
    }
    context_distances
        .iter()
        .map(|&d| (-decay * d as f32).exp())
        .sum::<f32>()
        / context_distances.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diffusion_with_no_neighbors_returns_own_heat() {
        let cfg = HeatDiffusionConfig::default();
        assert!((diffusion(&cfg, 0.7, &[]) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn diffusion_blends_toward_neighbor_mean() {
        let cfg = HeatDiffusionConfig {
            intrinsic_weight: 0.5,
            neighbor_weight: 0.5,
        };
        let result = diffusion(&cfg, 1.0, &[0.0, 0.0]);
        assert!((result - 0.5).abs() < 1e-6);
    }

    #[test]
    fn inherit_from_parent_moves_toward_parent_by_fraction() {
        let cfg = HeatInheritanceConfig {
            meta_to_capability: 0.25,
            capability_to_tool: 0.25,
        };
        let result = inherit_from_parent(&cfg, 0.0, 1.0, true);
        assert!((result - 0.25).abs() < 1e-6);
    }

    #[test]
    fn hierarchical_triple_is_a_convex_combination() {
        let triple = HierarchyWeightTriple {
            intrinsic: 0.3,
            neighbor: 0.3,
            hierarchy: 0.4,
        };
        let result = hierarchical(&triple, 1.0, 1.0, 1.0);
        assert!((result - 1.0).abs() < 1e-6);
    }

    #[test]
    fn path_heat_with_no_context_is_zero() {
        assert_eq!(path_heat(&[], 0.5), 0.0);
    }

    #[test]
    fn path_heat_decays_with_distance() {
        let near = path_heat(&[1], 0.5);
        let far = path_heat(&[5], 0.5);
        assert!(near > far);
        assert!((near - (-0.5f32).exp()).abs() < 1e-6);
    }
}
