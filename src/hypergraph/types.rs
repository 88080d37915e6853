//! Hypergraph data model (`spec.md` §3): `Tool`, `Capability`,
//! `Member`, `Features`.
//!
//! Serde-derived with `camelCase` field names, the way the teacher's
//! `KnowledgeNode` is shaped to cross a storage/ingestion boundary —
//! here the boundary is whatever out-of-scope bootstrap loader hands
//! registered schemas to `Hypergraph::register_tool`/`register_capability`.

use serde::{Deserialize, Serialize};

/// A discriminated reference to either a terminal tool or a child
/// capability — the "runtime-typed member tags" anti-pattern replaced
/// by a sum type (`spec.md` §9).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Member {
    Tool { id: String },
    Capability { id: String },
}

impl Member {
    pub fn id(&self) -> &str {
        match self {
            Member::Tool { id } => id,
            Member::Capability { id } => id,
        }
    }

    pub fn is_capability(&self) -> bool {
        matches!(self, Member::Capability { .. })
    }
}

/// Per-tool structural features, each monotone-normalised into the
/// documented range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    /// PageRank in `[0, 1]`.
    pub page_rank: f32,
    pub louvain_community: i64,
    pub adamic_adar: f32,
    pub cooccurrence: f32,
    /// Recency in `[0, 1]`, 1 = most recently used.
    pub recency: f32,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            page_rank: 0.0,
            louvain_community: -1,
            adamic_adar: 0.0,
            cooccurrence: 0.0,
            recency: 0.0,
        }
    }
}

/// A terminal, externally-invokable action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    /// Unit vector of dimension D (`‖·‖₂ ≈ 1`).
    pub embedding: Vec<f32>,
    pub features: Features,
}

/// A named abstraction owning an ordered set of members, each either a
/// `Tool` or a child `Capability`. A `Capability` whose members are all
/// `Capability`s is a meta-capability — there is no separate type, only
/// a higher `hierarchy_level` (`spec.md` §3 Meta-Capability).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capability {
    pub id: String,
    pub embedding: Vec<f32>,
    pub members: Vec<Member>,
    /// Caller-supplied hint; `build_incidence` recomputes and validates
    /// this against `1 + max(hierarchyLevel(child))` (0 if no capability
    /// children).
    pub hierarchy_level_hint: Option<usize>,
    /// Success rate in `[0, 1]`.
    pub success_rate: f32,
}

impl Capability {
    pub fn is_leaf(&self) -> bool {
        self.members.iter().all(|m| !m.is_capability())
    }
}
