//! `Hypergraph`: the registered tool/capability store plus its derived,
//! committed incidence plan (`spec.md` §3, §4.1, §8 idempotence).

use std::collections::HashMap;
use std::sync::Arc;

use super::incidence::{build_incidence, IncidencePlan};
use super::types::{Capability, Tool};
use crate::error::GraphError;

/// Summary returned by [`Hypergraph::commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitStats {
    pub num_tools: usize,
    pub num_capabilities: usize,
    pub max_level: usize,
}

/// Owns the registered tool/capability tables and, once committed, the
/// derived per-level incidence matrices consumed by the forward pass.
///
/// Registration is append/replace-only; nothing is derived until
/// [`Hypergraph::commit`] runs the cycle check and builds the incidence
/// plan. Re-committing with no intervening registration is a no-op: the
/// previous `Arc<IncidencePlan>` is returned unchanged rather than
/// rebuilt (`spec.md` §8 idempotence property).
#[derive(Debug, Default)]
pub struct Hypergraph {
    tools: HashMap<String, Tool>,
    capabilities: HashMap<String, Capability>,
    plan: Option<Arc<IncidencePlan>>,
    dirty: bool,
}

impl Hypergraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_tool(&mut self, tool: Tool) {
        self.tools.insert(tool.id.clone(), tool);
        self.dirty = true;
        self.plan = None;
    }

    pub fn register_capability(&mut self, capability: Capability) {
        self.capabilities.insert(capability.id.clone(), capability);
        self.dirty = true;
        self.plan = None;
    }

    pub fn tool(&self, id: &str) -> Option<&Tool> {
        self.tools.get(id)
    }

    pub fn capability(&self, id: &str) -> Option<&Capability> {
        self.capabilities.get(id)
    }

    pub fn tools(&self) -> &HashMap<String, Tool> {
        &self.tools
    }

    pub fn capabilities(&self) -> &HashMap<String, Capability> {
        &self.capabilities
    }

    /// Current incidence plan, if `commit` has run since the last
    /// registration.
    pub fn plan(&self) -> Option<&Arc<IncidencePlan>> {
        self.plan.as_ref()
    }

    /// Validates the member graph (cycle + unknown-member checks),
    /// builds per-level incidence matrices, and caches the result. A
    /// second call with no intervening `register_*` returns the cached
    /// plan without recomputation.
    pub fn commit(&mut self) -> Result<(Arc<IncidencePlan>, CommitStats), GraphError> {
        if !self.dirty {
            if let Some(plan) = &self.plan {
                let stats = CommitStats {
                    num_tools: self.tools.len(),
                    num_capabilities: self.capabilities.len(),
                    max_level: plan.max_level,
                };
                return Ok((Arc::clone(plan), stats));
            }
        }

        let plan = build_incidence(&self.tools, &self.capabilities)?;
        let stats = CommitStats {
            num_tools: self.tools.len(),
            num_capabilities: self.capabilities.len(),
            max_level: plan.max_level,
        };
        let plan = Arc::new(plan);
        self.plan = Some(Arc::clone(&plan));
        self.dirty = false;
        Ok((plan, stats))
    }
}
