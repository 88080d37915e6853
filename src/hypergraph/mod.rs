//! Hypergraph data model and derived incidence structure (`spec.md` §3,
//! §4.1 — component C1).

mod graph;
mod incidence;
mod types;

pub use graph::{CommitStats, Hypergraph};
pub use incidence::{build_incidence, IncidenceMatrix, IncidencePlan};
pub use types::{Capability, Features, Member, Tool};
