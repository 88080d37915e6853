//! Multi-level hypergraph attention forward pass (`spec.md` §4.3-4.4 —
//! components C3/C4).

mod attention;
mod cooccurrence;
mod forward;

pub use attention::{attend_to_targets, l2_normalize, leaky_relu, project_all, softmax};
pub use cooccurrence::CooccurrenceConfig;
pub use forward::{forward, ForwardCache, ForwardOutput};
