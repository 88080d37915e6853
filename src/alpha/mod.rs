//! Local Adaptive Alpha: four dispatchable per-query convex-blend
//! algorithms plus the LRU-cached calculator that selects between them
//! (`spec.md` §4.6 — component C6).

mod bayesian;
mod calculator;
mod config;
mod embeddings_hybrid;
mod heat;

pub use calculator::{AlphaContext, LocalAlphaCalculator, NodeType};
pub use config::{
    AlphaAlgorithm, ColdStartConfig, HeatDiffusionConfig, HeatInheritanceConfig, HierarchyWeightTriple,
    HierarchyWeights, LocalAlphaConfig,
};

pub mod algorithms {
    pub use super::bayesian::compute as bayesian_cold_start;
    pub use super::embeddings_hybrid::{compute as embeddings_hybrid, pearson_correlation};
    pub use super::heat::{
        diffusion as heat_diffusion, hierarchical as heat_hierarchical, inherit_from_parent, path_heat,
    };
}
