//! Top-level `Config`: aggregates every sub-config and cross-validates
//! the shared dimensional invariants (`spec.md` §6).

use crate::alpha::LocalAlphaConfig;
use crate::confidence::DagConfig;
use crate::engine::CooccurrenceConfig;
use crate::error::ConfigError;
use crate::scorer::{DualPathConfig, HeadFusionConfig};
use crate::thompson::ThompsonConfig;
use crate::trainer::TrainerConfig;

/// Full model + component configuration. Loading this from a file or
/// environment is out of scope for the core (`spec.md` §1 Non-goals);
/// callers construct it however suits their embedding and call
/// [`Config::validate`] once before first use.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub num_heads: usize,
    pub hidden_dim: usize,
    pub embedding_dim: usize,
    /// RNG seed for Xavier initialisation; fixed so parameter
    /// export/import is reproducible from a clean init.
    pub init_seed: u64,

    pub local_alpha: LocalAlphaConfig,
    pub thompson: ThompsonConfig,
    pub dag: DagConfig,
    pub trainer: TrainerConfig,
    pub dual_path: DualPathConfig,
    pub cooccurrence: CooccurrenceConfig,
    pub head_fusion: HeadFusionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_heads: 4,
            hidden_dim: 64,
            embedding_dim: 384,
            init_seed: 0,
            local_alpha: LocalAlphaConfig::default(),
            thompson: ThompsonConfig::default(),
            dag: DagConfig::default(),
            trainer: TrainerConfig::default(),
            dual_path: DualPathConfig::default(),
            cooccurrence: CooccurrenceConfig::default(),
            head_fusion: HeadFusionConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_heads == 0 || self.num_heads % 2 != 0 {
            return Err(ConfigError::OddHeadCount(self.num_heads));
        }
        if self.hidden_dim % self.num_heads != 0 {
            return Err(ConfigError::HiddenDimNotDivisible {
                hidden_dim: self.hidden_dim,
                num_heads: self.num_heads,
            });
        }
        self.local_alpha.validate()
    }
}
