//! Sparse per-level incidence matrices + cycle detection
//! (`spec.md` §4.1).
//!
//! Capabilities store member ids, never pointers (`spec.md` §9 design
//! note: "arena plus topological DAG"); hot paths index into the dense
//! row/col arrays built here rather than walking the member graph
//! again.

use std::collections::HashMap;

use super::types::{Capability, Member, Tool};
use crate::error::GraphError;

/// Three-state DFS coloring used for both cycle detection and
/// hierarchy-level computation (post-order: a node's level is only
/// final once it turns Black).
#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// A sparse `{0,1}` incidence matrix for one hierarchy level: rows are
/// children (tools at level 0, capabilities at level ℓ-1 otherwise),
/// columns are parent capabilities at level ℓ. Stored as a row-grouped
/// edge list (CSR without the redundant value array, since every
/// nonzero entry is 1).
#[derive(Debug, Clone, Default)]
pub struct IncidenceMatrix {
    pub row_ids: Vec<String>,
    pub col_ids: Vec<String>,
    row_index: HashMap<String, usize>,
    col_index: HashMap<String, usize>,
    /// `edges[row]` is the sorted list of column indices with a 1 entry.
    /// A child referenced by two parents at this level (a diamond)
    /// naturally has two entries here against one row — rows are never
    /// duplicated, only column entries are (`spec.md` §4.1).
    edges: Vec<Vec<usize>>,
}

impl IncidenceMatrix {
    fn new(row_ids: Vec<String>, col_ids: Vec<String>) -> Self {
        let row_index = row_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let col_index = col_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let edges = vec![Vec::new(); row_ids.len()];
        Self {
            row_ids,
            col_ids,
            row_index,
            col_index,
            edges,
        }
    }

    fn add_edge(&mut self, child_id: &str, parent_id: &str) {
        if let (Some(&r), Some(&c)) = (self.row_index.get(child_id), self.col_index.get(parent_id))
        {
            if !self.edges[r].contains(&c) {
                self.edges[r].push(c);
            }
        }
    }

    pub fn num_rows(&self) -> usize {
        self.row_ids.len()
    }

    pub fn num_cols(&self) -> usize {
        self.col_ids.len()
    }

    /// Column indices with a 1 entry for `row`.
    pub fn children_of_col(&self, col: usize) -> Vec<usize> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(row, cols)| cols.contains(&col).then_some(row))
            .collect()
    }

    /// Row indices that have no parent in this level's column domain —
    /// passed through as L2-renormalised input, never zeroed
    /// (`spec.md` §4.3 invariant).
    pub fn isolated_rows(&self) -> Vec<usize> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(row, cols)| cols.is_empty().then_some(row))
            .collect()
    }

    /// Column indices with a 1 entry for `row` (its parents).
    pub fn edges_for_row(&self, row: usize) -> Vec<usize> {
        self.edges[row].clone()
    }

    pub fn row_index_of(&self, id: &str) -> Option<usize> {
        self.row_index.get(id).copied()
    }

    pub fn col_index_of(&self, id: &str) -> Option<usize> {
        self.col_index.get(id).copied()
    }
}

/// Result of `build_incidence`: one matrix per level plus the resolved
/// hierarchy level of every capability.
#[derive(Debug, Clone, Default)]
pub struct IncidencePlan {
    /// `levels[0]` connects tools -> level-0 capabilities; `levels[l]`
    /// (l>0) connects level-(l-1) capabilities -> level-l capabilities.
    pub levels: Vec<IncidenceMatrix>,
    pub capability_level: HashMap<String, usize>,
    pub max_level: usize,
}

struct Resolver<'a> {
    capabilities: &'a HashMap<String, Capability>,
    colors: HashMap<String, Color>,
    levels: HashMap<String, usize>,
    stack: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn new(capabilities: &'a HashMap<String, Capability>) -> Self {
        Self {
            capabilities,
            colors: HashMap::new(),
            levels: HashMap::new(),
            stack: Vec::new(),
        }
    }

    fn resolve(&mut self, id: &str) -> Result<usize, GraphError> {
        match self.colors.get(id) {
            Some(Color::Black) => return Ok(self.levels[id]),
            Some(Color::Gray) => {
                let start = self.stack.iter().position(|x| x == id).unwrap_or(0);
                let mut path: Vec<String> = self.stack[start..].to_vec();
                path.push(id.to_string());
                return Err(GraphError::CycleDetected { path });
            }
            _ => {}
        }

        let cap = self
            .capabilities
            .get(id)
            .ok_or_else(|| GraphError::UnknownMember { id: id.to_string() })?;

        self.colors.insert(id.to_string(), Color::Gray);
        self.stack.push(id.to_string());

        let mut max_child_level: Option<usize> = None;
        for member in &cap.members {
            match member {
                // Tool existence was already checked by build_incidence;
                // tools never contribute to hierarchy level.
                Member::Tool { .. } => {}
                Member::Capability { id: child_id } => {
                    if child_id == id {
                        // Self-loop: a capability listing itself is a cycle
                        // of length 1.
                        self.stack.pop();
                        self.colors.insert(id.to_string(), Color::Black);
                        return Err(GraphError::CycleDetected {
                            path: vec![id.to_string(), id.to_string()],
                        });
                    }
                    let child_level = self.resolve(child_id)?;
                    max_child_level = Some(max_child_level.map_or(child_level, |m: usize| m.max(child_level)));
                }
            }
        }

        self.stack.pop();
        self.colors.insert(id.to_string(), Color::Black);
        let level = max_child_level.map_or(0, |m| m + 1);
        self.levels.insert(id.to_string(), level);
        Ok(level)
    }
}

/// Builds per-level incidence matrices and resolves every capability's
/// hierarchy level via DFS with three-state coloring. Fails with
/// `CycleDetected` (including self-loops) or `UnknownMember`.
pub fn build_incidence(
    tools: &HashMap<String, Tool>,
    capabilities: &HashMap<String, Capability>,
) -> Result<IncidencePlan, GraphError> {
    // Validate every member reference exists before computing levels, so
    // `UnknownMember` is reported even for capabilities unreachable from
    // any cycle.
    for cap in capabilities.values() {
        for member in &cap.members {
            match member {
                Member::Tool { id } if !tools.contains_key(id) => {
                    return Err(GraphError::UnknownMember { id: id.clone() });
                }
                Member::Capability { id } if !capabilities.contains_key(id) => {
                    return Err(GraphError::UnknownMember { id: id.clone() });
                }
                _ => {}
            }
        }
    }

    let mut resolver = Resolver::new(capabilities);
    let mut ids: Vec<&String> = capabilities.keys().collect();
    ids.sort(); // deterministic traversal order
    for id in ids {
        resolver.resolve(id)?;
    }
    let capability_level = resolver.levels;
    let max_level = capability_level.values().copied().max().unwrap_or(0);

    let mut levels_by_height: Vec<Vec<&Capability>> = vec![Vec::new(); max_level + 1];
    for cap in capabilities.values() {
        let lvl = capability_level[&cap.id];
        levels_by_height[lvl].push(cap);
    }
    for bucket in levels_by_height.iter_mut() {
        bucket.sort_by(|a, b| a.id.cmp(&b.id));
    }

    let mut levels = Vec::with_capacity(max_level + 1);

    // Level 0: tools -> level-0 (leaf) capabilities.
    let level0_caps = &levels_by_height[0];
    let mut tool_ids: Vec<String> = level0_caps
        .iter()
        .flat_map(|c| c.members.iter().filter_map(|m| match m {
            Member::Tool { id } => Some(id.clone()),
            _ => None,
        }))
        .collect();
    tool_ids.sort();
    tool_ids.dedup();
    let col_ids: Vec<String> = level0_caps.iter().map(|c| c.id.clone()).collect();
    let mut m0 = IncidenceMatrix::new(tool_ids, col_ids);
    for cap in level0_caps {
        for member in &cap.members {
            if let Member::Tool { id } = member {
                m0.add_edge(id, &cap.id);
            }
        }
    }
    levels.push(m0);

    for lvl in 1..=max_level {
        let row_ids: Vec<String> = levels_by_height[lvl - 1].iter().map(|c| c.id.clone()).collect();
        let col_ids: Vec<String> = levels_by_height[lvl].iter().map(|c| c.id.clone()).collect();
        let mut matrix = IncidenceMatrix::new(row_ids, col_ids);
        for cap in &levels_by_height[lvl] {
            for member in &cap.members {
                if let Member::Capability { id } = member {
                    matrix.add_edge(id, &cap.id);
                }
            }
        }
        levels.push(matrix);
    }

    Ok(IncidencePlan {
        levels,
        capability_level,
        max_level,
    })
}
