//! Multi-level forward pass: upward (V -> E) then downward (E -> V)
//! message passing across every hierarchy level, producing final,
//! L2-normalised tool and capability embeddings (`spec.md` §4.3).

use std::collections::HashMap;
use std::sync::Arc;

use super::attention::{attend_to_targets, l2_normalize, project_all};
use super::cooccurrence::{self, CooccurrenceConfig};
use crate::deadline::Deadline;
use crate::error::{CoreError, QueryError};
use crate::hypergraph::{Capability, IncidencePlan, Tool};
use crate::params::LevelParamStore;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Downward-pass residual weight: the final per-row representation is
/// `RESIDUAL_ALPHA * original + (1 - RESIDUAL_ALPHA) * propagated`
/// (`spec.md` §4.3 step 3).
const RESIDUAL_ALPHA: f32 = 0.3;

/// Final output of a full forward pass.
#[derive(Debug, Clone, Default)]
pub struct ForwardOutput {
    pub tool_embeddings: HashMap<String, Vec<f32>>,
    pub capability_embeddings: HashMap<String, Vec<f32>>,
}

/// Caches the last forward pass keyed by the `IncidencePlan` pointer it
/// was computed from, so repeated queries against an unchanged graph
/// skip recomputation (`spec.md` §4.3, mirroring the C1 commit
/// idempotence property).
#[derive(Debug, Clone, Default)]
pub struct ForwardCache {
    plan: Option<Arc<IncidencePlan>>,
    output: Option<ForwardOutput>,
}

impl ForwardCache {
    pub fn get_or_compute(
        &mut self,
        tools: &HashMap<String, Tool>,
        capabilities: &HashMap<String, Capability>,
        plan: &Arc<IncidencePlan>,
        params: &LevelParamStore,
        cooccurrence: &CooccurrenceConfig,
        deadline: &Deadline,
    ) -> Result<&ForwardOutput, CoreError> {
        let stale = match &self.plan {
            Some(cached) => !Arc::ptr_eq(cached, plan),
            None => true,
        };
        if stale || self.output.is_none() {
            let output = forward(tools, capabilities, plan, params, cooccurrence, deadline)?;
            self.plan = Some(Arc::clone(plan));
            self.output = Some(output);
        }
        Ok(self.output.as_ref().expect("just computed"))
    }
}

fn average_heads(per_head: Vec<Vec<Vec<f32>>>, count: usize, hidden_dim: usize) -> Vec<Vec<f32>> {
    let mut out = vec![vec![0.0f32; hidden_dim]; count];
    let num_heads = per_head.len().max(1) as f32;
    for head in per_head {
        for (dst, src) in out.iter_mut().zip(head.iter()) {
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                *d += s / num_heads;
            }
        }
    }
    out
}

/// Runs the full upward-then-downward pass over every level and
/// returns the final per-tool, per-capability embeddings.
pub fn forward(
    tools: &HashMap<String, Tool>,
    capabilities: &HashMap<String, Capability>,
    plan: &IncidencePlan,
    params: &LevelParamStore,
    cooccurrence: &CooccurrenceConfig,
    deadline: &Deadline,
) -> Result<ForwardOutput, CoreError> {
    if plan.levels.is_empty() {
        return Err(CoreError::Query(QueryError::GraphNotBuilt));
    }

    let hidden_dim = params.hidden_dim;
    let mut tool_embeddings = HashMap::new();
    let mut capability_embeddings = HashMap::new();

    // Level-0 row input: tool embeddings in the order fixed by the
    // level-0 incidence matrix's row domain.
    let mut row_input: Vec<Vec<f32>> = plan.levels[0]
        .row_ids
        .iter()
        .map(|id| tools.get(id).map(|t| t.embedding.clone()).unwrap_or_default())
        .collect();

    for (level_idx, incidence) in plan.levels.iter().enumerate() {
        if deadline.is_expired() {
            return Err(CoreError::Cancelled);
        }

        let level_params = &params.levels[level_idx];
        let num_cols = incidence.num_cols();
        let num_rows = incidence.num_rows();

        // Column queries: each target capability's own stored embedding,
        // projected through this level's `w_parent` (`spec.md` §4.2) —
        // not the mean of its members, so a hyperedge's attention is
        // driven by the capability it actually is, not an average of
        // what feeds it.
        let col_embeddings: Vec<Vec<f32>> = incidence
            .col_ids
            .iter()
            .map(|id| capabilities.get(id).map(|c| c.embedding.clone()).unwrap_or_default())
            .collect();

        // Co-occurrence enrichment only applies at level 0, where rows
        // are tools and therefore carry `Features.cooccurrence`;
        // capabilities (level > 0 rows) have no such feature.
        let col_target_mean: Vec<f32> = if level_idx == 0 {
            (0..num_cols)
                .map(|col| {
                    let children = incidence.children_of_col(col);
                    if children.is_empty() {
                        0.0
                    } else {
                        children
                            .iter()
                            .map(|&r| {
                                tools
                                    .get(&incidence.row_ids[r])
                                    .map_or(0.0, |t| t.features.cooccurrence)
                            })
                            .sum::<f32>()
                            / children.len() as f32
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        // Upward: project rows, attend per column against the column's
        // own `w_parent`-projected embedding, biased by co-occurrence
        // at level 0.
        let head_outputs: Vec<(Vec<Vec<f32>>, Vec<Vec<f32>>)> = run_heads(level_params.w_up.len(), |h| {
            let projected = project_all(&level_params.w_up[h], &row_input);
            let queries = project_all(&level_params.w_parent[h], &col_embeddings);
            attend_to_targets(
                &projected,
                num_cols,
                hidden_dim,
                &level_params.a_up[h],
                |col| incidence.children_of_col(col),
                |col| queries[col].clone(),
                |target, src| {
                    if level_idx == 0 {
                        tools
                            .get(&incidence.row_ids[src])
                            .map_or(0.0, |t| cooccurrence::bias(cooccurrence, &t.features, col_target_mean[target]))
                    } else {
                        0.0
                    }
                },
                |_| vec![0.0; hidden_dim],
            )
        });
        let mut col_features = average_heads(
            head_outputs.into_iter().map(|(out, _)| out).collect(),
            num_cols,
            hidden_dim,
        );
        for feat in col_features.iter_mut() {
            l2_normalize(feat);
        }

        // Row queries / residual baseline: each row's own stored
        // embedding (tool at level 0, capability above it) projected
        // through `w_parent[0]` — head-invariant, the same way the
        // pre-`w_parent` baseline was always projected through a single
        // head's `w_up`. Doubles as the isolated-row fallback: a row
        // with no parent at this level has nothing to attend over, so
        // it keeps this unchanged (`spec.md` §4.3 invariant — the
        // residual blend degenerates to 100% original).
        let row_embeddings: Vec<Vec<f32>> = incidence
            .row_ids
            .iter()
            .map(|id| {
                if level_idx == 0 {
                    tools.get(id).map(|t| t.embedding.clone()).unwrap_or_default()
                } else {
                    capabilities.get(id).map(|c| c.embedding.clone()).unwrap_or_default()
                }
            })
            .collect();
        let original_projected = project_all(&level_params.w_parent[0], &row_embeddings);

        // Downward: project cols, attend per row over its parents
        // against the row's own `w_parent`-projected embedding.
        let head_outputs: Vec<(Vec<Vec<f32>>, Vec<Vec<f32>>)> = run_heads(level_params.w_down.len(), |h| {
            let projected_cols = project_all(&level_params.w_down[h], &col_features);
            let queries = project_all(&level_params.w_parent[h], &row_embeddings);
            attend_to_targets(
                &projected_cols,
                num_rows,
                hidden_dim,
                &level_params.a_down[h],
                |row| incidence.edges_for_row(row),
                |row| queries[row].clone(),
                |_, _| 0.0,
                |row| original_projected[row].clone(),
            )
        });
        let propagated = average_heads(
            head_outputs.into_iter().map(|(out, _)| out).collect(),
            num_rows,
            hidden_dim,
        );
        // Residual blend (`spec.md` §4.3 step 3), then final L2-norm.
        let mut refined_rows: Vec<Vec<f32>> = original_projected
            .iter()
            .zip(propagated.iter())
            .map(|(orig, prop)| {
                orig.iter()
                    .zip(prop.iter())
                    .map(|(o, p)| RESIDUAL_ALPHA * o + (1.0 - RESIDUAL_ALPHA) * p)
                    .collect()
            })
            .collect();
        for feat in refined_rows.iter_mut() {
            l2_normalize(feat);
        }

        // Record outputs for this level's row domain (tools at level 0,
        // capabilities at higher levels) and this level's col domain
        // (capabilities), so a root capability that is never refined
        // downward still gets its upward feature as final.
        if level_idx == 0 {
            for (id, feat) in incidence.row_ids.iter().zip(refined_rows.iter()) {
                tool_embeddings.insert(id.clone(), feat.clone());
            }
        } else {
            for (id, feat) in incidence.row_ids.iter().zip(refined_rows.iter()) {
                capability_embeddings.insert(id.clone(), feat.clone());
            }
        }
        for (id, feat) in incidence.col_ids.iter().zip(col_features.iter()) {
            capability_embeddings.entry(id.clone()).or_insert_with(|| feat.clone());
        }

        row_input = refined_rows;
    }

    // Tools never selected as a level-0 row (no leaf-capability parent)
    // have no incidence edge to refine them through, but every other
    // tool embedding leaving this function is hidden_dim wide, so these
    // still get projected through `w_parent` rather than left in raw,
    // embedding_dim-wide space — the "no-parent" case gets exactly the
    // orphan-row rule of `spec.md` §4.3, not a separate dimension.
    //
    // Every capability, by contrast, is already populated above: every
    // capability appears as a column at exactly one level (its resolved
    // hierarchy height), so no capability ever reaches this point
    // unpopulated.
    let level0 = &params.levels[0];
    for (id, tool) in tools {
        if !tool_embeddings.contains_key(id) {
            let mut projected = average_heads(
                (0..level0.w_parent.len())
                    .map(|h| vec![level0.w_parent[h].mat_vec(&tool.embedding)])
                    .collect(),
                1,
                hidden_dim,
            )
            .remove(0);
            l2_normalize(&mut projected);
            tool_embeddings.insert(id.clone(), projected);
        }
    }

    Ok(ForwardOutput {
        tool_embeddings,
        capability_embeddings,
    })
}

#[cfg(feature = "parallel")]
fn run_heads<T: Send>(num_heads: usize, f: impl Fn(usize) -> T + Sync) -> Vec<T> {
    (0..num_heads).into_par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn run_heads<T>(num_heads: usize, f: impl Fn(usize) -> T) -> Vec<T> {
    (0..num_heads).map(f).collect()
}
