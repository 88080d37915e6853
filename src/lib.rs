//! # shgat-core
//!
//! SuperHyperGraph Attention Network core for agentic tool/capability
//! retrieval: a multi-level hypergraph attention network over a
//! Tool/Capability hierarchy, a Local Adaptive Alpha calculator that
//! blends semantic and structural signal per query, and a Thompson
//! Sampling arbiter that gates acceptance by mode and risk.
//!
//! The core is synchronous and CPU-bound. The only blocking boundary is
//! whatever the caller's [`collaborators::Embedder`] and
//! [`collaborators::VectorStore`] implementations do; persistence,
//! capability discovery, and configuration loading are all out of
//! scope and left to the embedder.

pub mod alpha;
pub mod collaborators;
pub mod config;
pub mod confidence;
pub mod deadline;
pub mod engine;
pub mod error;
pub mod hypergraph;
pub mod params;
pub mod persistence;
pub mod scorer;
pub mod suggester;
pub mod thompson;
pub mod trainer;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports for embedding `shgat-core` into an agent runtime.
pub mod prelude {
    pub use crate::alpha::{AlphaAlgorithm, AlphaContext, LocalAlphaCalculator, LocalAlphaConfig, NodeType};
    pub use crate::collaborators::{Embedder, InMemoryVectorStore, SemanticMatch, VectorStore};
    pub use crate::config::Config;
    pub use crate::confidence::{DagConfig, PredictionSource, RationaleInputs};
    pub use crate::deadline::Deadline;
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::hypergraph::{Capability, Features, Hypergraph, Member, Tool};
    pub use crate::params::LevelParamStore;
    pub use crate::scorer::{CapabilityScore, DualPathConfig, HeadFusionConfig, KHeadScorer};
    pub use crate::suggester::{
        AlternativeCandidate, DagStructure, DependencyPath, Suggester, SuggesterConfig, Suggestion,
    };
    pub use crate::thompson::{classify_risk, Mode, Risk, ThompsonArbiter, ThompsonConfig};
}
