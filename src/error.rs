//! Error taxonomy
//!
//! One enum per failure boundary (config load, graph mutation, query),
//! plus a top-level [`CoreError`] that query-facing APIs return. Mirrors
//! the teacher's single `StorageError` enum wrapping heterogeneous
//! causes with `#[from]`, rather than a generic `anyhow`/`eyre` catch-all.

use thiserror::Error;

/// Invalid configuration at load time. Fatal; never recovered from.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("numHeads must be even, got {0}")]
    OddHeadCount(usize),

    #[error("hiddenDim {hidden_dim} is not divisible by numHeads {num_heads}")]
    HiddenDimNotDivisible { hidden_dim: usize, num_heads: usize },

    #[error("alphaMin ({alpha_min}) must be <= alphaMax ({alpha_max})")]
    AlphaRangeInverted { alpha_min: f32, alpha_max: f32 },

    #[error("{field} weight triple must sum to 1.0 +/- 1e-2, got {sum}")]
    WeightTripleNotNormalized { field: &'static str, sum: f32 },

    #[error("heatDiffusion intrinsic+neighbor must sum to 1.0 +/- 1e-2, got {0}")]
    HeatWeightsNotNormalized(f32),

    #[error("coldStart.threshold must be >= 1, got {0}")]
    ColdStartThresholdTooSmall(u32),

    #[error("{field} must be a probability in [0,1], got {value}")]
    NotAProbability { field: &'static str, value: f32 },

    #[error("unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Cycle / membership errors returned synchronously from `commit()`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphError {
    #[error("cycle detected in member relation: {path:?}")]
    CycleDetected { path: Vec<String> },

    #[error("unknown member referenced: {id}")]
    UnknownMember { id: String },

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Bad query input; surfaced to the caller with no state change.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryError {
    #[error("intent vector dimension mismatch: expected {expected}, got {got}")]
    BadIntentDimension { expected: usize, got: usize },

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("forward pass requested before incidence was built")]
    GraphNotBuilt,

    #[error("{invalid} of {total} training examples were invalid, exceeding the abort threshold")]
    TooManyInvalidTrainingExamples { invalid: usize, total: usize },
}

/// Parameter export/import errors (`persistence::`).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PersistenceError {
    #[error("unsupported parameter format version: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },

    #[error(
        "shape mismatch: expected heads={expected_heads} hidden={expected_hidden} \
         embedding={expected_embedding}, got heads={got_heads} hidden={got_hidden} \
         embedding={got_embedding}"
    )]
    ShapeMismatch {
        expected_heads: usize,
        expected_hidden: usize,
        expected_embedding: usize,
        got_heads: usize,
        got_hidden: usize,
        got_embedding: usize,
    },

    #[error("failed to decode parameter bytes: {0}")]
    Decode(String),
}

/// Top-level error returned by every fallible query-time / mutation-time
/// entry point.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Deadline exceeded. No state change; external side effects (e.g.
    /// Thompson outcome recording) are never performed for a cancelled
    /// query.
    #[error("query cancelled: deadline exceeded")]
    Cancelled,

    /// The vector store (or another external collaborator) is
    /// unavailable. The suggester retries with bounded exponential
    /// backoff before surfacing this.
    #[error("transient backend error: {0}")]
    TransientBackend(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
