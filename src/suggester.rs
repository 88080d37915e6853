//! `Suggester`: the single synchronous entry point orchestrating
//! semantic search, per-candidate alpha, blended scoring, path
//! extraction, confidence/rationale, and the optional Thompson
//! accept/reject gate (`spec.md` §4.8 — component C8).

use std::collections::{HashSet, VecDeque};
use std::thread::sleep;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::alpha::{AlphaContext, LocalAlphaCalculator, NodeType};
use crate::collaborators::{Embedder, VectorStore};
use crate::config::Config;
use crate::confidence::{PredictionSource, RationaleInputs};
use crate::deadline::Deadline;
use crate::engine::ForwardCache;
use crate::error::CoreError;
use crate::hypergraph::{Hypergraph, Member};
use crate::params::LevelParamStore;
use crate::scorer::KHeadScorer;
use crate::thompson::{classify_risk, Decision, Mode, ThompsonArbiter};

/// Orchestration-level knobs not owned by any single component.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggesterConfig {
    pub top_k: usize,
    pub max_hops: i32,
    /// Weight on raw PageRank in the blended candidate score:
    /// `alpha*semantic + (1-alpha)*graphAffinity + beta*pageRank`.
    pub pagerank_beta: f32,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    /// Below this mean semantic-match score, `suggest()` returns `None`
    /// outright rather than a low-confidence suggestion (`spec.md` §4.8
    /// point 7).
    pub suggestion_reject_floor: f32,
    /// Below this confidence, `suggest()` still returns `Some`, but the
    /// suggestion carries a mandatory `warning`.
    pub suggestion_floor: f32,
}

impl Default for SuggesterConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_hops: 4,
            pagerank_beta: 0.2,
            retry_max_attempts: 3,
            retry_base_delay_ms: 10,
            suggestion_reject_floor: 0.1,
            suggestion_floor: 0.5,
        }
    }
}

/// Secondary rerank pass over already-scored candidates: blends a
/// final score against raw PageRank by `weight`, which can reorder
/// candidates when a lower-scoring capability sits on a much more
/// central tool (`spec.md` §8 seed scenario).
pub fn blend_with_pagerank(final_score: f32, pagerank: f32, weight: f32) -> f32 {
    (1.0 - weight) * final_score + weight * pagerank
}

/// Shortest-path hop count between two capabilities in the membership
/// tree (`spec.md` §4.8 point 4).
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyPath {
    pub from: String,
    pub to: String,
    pub hops: i32,
}

/// The top capability plus the full candidate set it was chosen from.
#[derive(Debug, Clone, PartialEq)]
pub struct DagStructure {
    pub top_capability_id: String,
    pub candidate_ids: Vec<String>,
}

/// A runner-up candidate, carried alongside the top suggestion rather
/// than discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeCandidate {
    pub capability_id: String,
    pub blended_score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub dag_structure: DagStructure,
    pub confidence: f32,
    pub dependency_paths: Vec<DependencyPath>,
    pub alternatives: Vec<AlternativeCandidate>,
    pub rationale: String,
    /// Mandatory whenever `confidence < suggestionFloor`; describes a
    /// cold-start or low-confidence state (`spec.md` §4.8 point 7).
    pub warning: Option<String>,
    /// `Some` only when the caller asked for Thompson gating.
    pub thompson: Option<Decision>,
}

struct ScoredCandidate {
    capability_id: String,
    blended_score: f32,
    hops: i32,
    pagerank: f32,
    alpha: f32,
    semantic: f32,
    graph_affinity: f32,
    observations: u32,
}

pub struct Suggester {
    pub graph: Hypergraph,
    config: Config,
    suggester_config: SuggesterConfig,
    params: LevelParamStore,
    scorer: KHeadScorer,
    forward_cache: ForwardCache,
    alpha_calculator: LocalAlphaCalculator,
    thompson: ThompsonArbiter,
    rng: StdRng,
}

impl Suggester {
    pub fn new(
        graph: Hypergraph,
        config: Config,
        suggester_config: SuggesterConfig,
        params: LevelParamStore,
        scorer: KHeadScorer,
    ) -> Self {
        let alpha_calculator = LocalAlphaCalculator::new(config.local_alpha);
        let thompson = ThompsonArbiter::new(config.thompson);
        Self {
            graph,
            config,
            suggester_config,
            params,
            scorer,
            forward_cache: ForwardCache::default(),
            alpha_calculator,
            thompson,
            rng: StdRng::seed_from_u64(config.init_seed),
        }
    }

    fn encode_with_retry(&self, embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, CoreError> {
        self.with_retry(|| embedder.encode(text))
    }

    fn search_with_retry(
        &self,
        store: &dyn VectorStore,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<crate::collaborators::SemanticMatch>, CoreError> {
        self.with_retry(|| store.search_top_k(query, k, None))
    }

    /// Bounded exponential backoff over `TransientBackend` errors only;
    /// every other error propagates immediately (`spec.md` §6).
    fn with_retry<T>(&self, mut op: impl FnMut() -> Result<T, CoreError>) -> Result<T, CoreError> {
        let mut attempt = 0;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(CoreError::TransientBackend(msg)) => {
                    attempt += 1;
                    if attempt >= self.suggester_config.retry_max_attempts {
                        return Err(CoreError::TransientBackend(msg));
                    }
                    let delay = self.suggester_config.retry_base_delay_ms * (1 << (attempt - 1));
                    sleep(Duration::from_millis(delay));
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Minimum number of membership hops from `target_id` down to any
    /// tool in `matched_tool_ids`, capped at `max_hops` via BFS over the
    /// membership tree (guaranteed acyclic by `commit()`). Returns
    /// `max_hops + 1` (treated as the confidence floor) when no matched
    /// tool is reachable.
    fn hops_to_nearest_match(&self, target_id: &str, matched_tool_ids: &HashSet<String>, max_hops: i32) -> i32 {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back((target_id.to_string(), 0i32));
        visited.insert(target_id.to_string());

        while let Some((id, depth)) = queue.pop_front() {
            if depth > max_hops {
                continue;
            }
            let Some(cap) = self.graph.capability(&id) else {
                continue;
            };
            for member in &cap.members {
                match member {
                    Member::Tool { id: tool_id } => {
                        if matched_tool_ids.contains(tool_id) {
                            return depth + 1;
                        }
                    }
                    Member::Capability { id: child_id } => {
                        if visited.insert(child_id.clone()) {
                            queue.push_back((child_id.clone(), depth + 1));
                        }
                    }
                }
            }
        }
        max_hops + 1
    }

    /// Shortest number of membership hops between two capabilities,
    /// searching only `Member::Capability` edges (`spec.md` §4.8 point
    /// 4). `None` when `to_id` is unreachable within `max_hops`.
    fn shortest_capability_hops(&self, from_id: &str, to_id: &str, max_hops: i32) -> Option<i32> {
        if from_id == to_id {
            return Some(0);
        }
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back((from_id.to_string(), 0i32));
        visited.insert(from_id.to_string());
        while let Some((id, depth)) = queue.pop_front() {
            if depth >= max_hops {
                continue;
            }
            let Some(cap) = self.graph.capability(&id) else {
                continue;
            };
            for member in &cap.members {
                if let Member::Capability { id: child_id } = member {
                    if child_id == to_id {
                        return Some(depth + 1);
                    }
                    if visited.insert(child_id.clone()) {
                        queue.push_back((child_id.clone(), depth + 1));
                    }
                }
            }
        }
        None
    }

    /// Shortest dependency path between every ordered pair of
    /// `candidate_ids` (`spec.md` §4.8 point 4, plural `dependencyPaths`).
    fn all_pairs_dependency_paths(&self, candidate_ids: &[String], max_hops: i32) -> Vec<DependencyPath> {
        let mut paths = Vec::new();
        for from_id in candidate_ids {
            for to_id in candidate_ids {
                if from_id == to_id {
                    continue;
                }
                if let Some(hops) = self.shortest_capability_hops(from_id, to_id, max_hops) {
                    paths.push(DependencyPath {
                        from: from_id.clone(),
                        to: to_id.clone(),
                        hops,
                    });
                }
            }
        }
        paths
    }

    /// Runs the full suggestion pipeline for `query_text`. Returns
    /// `None` when no semantic match clears `suggestionRejectFloor`;
    /// otherwise returns the single top suggestion, which carries the
    /// full candidate set, all-pairs dependency paths, and a mandatory
    /// `warning` when its confidence falls below `suggestionFloor`
    /// (`spec.md` §4.8 point 7). When `apply_thompson` is set, the top
    /// suggestion additionally carries a Thompson accept/reject
    /// decision.
    pub fn suggest(
        &mut self,
        embedder: &dyn Embedder,
        vector_store: &dyn VectorStore,
        query_text: &str,
        mode: Mode,
        apply_thompson: bool,
        deadline: &Deadline,
    ) -> Result<Option<Suggestion>, CoreError> {
        let (plan, _stats) = self.graph.commit()?;
        let forward = self.forward_cache.get_or_compute(
            self.graph.tools(),
            self.graph.capabilities(),
            &plan,
            &self.params,
            &self.config.cooccurrence,
            deadline,
        )?;

        let query_vec = self.encode_with_retry(embedder, query_text)?;
        let semantic_matches =
            self.search_with_retry(vector_store, &query_vec, self.suggester_config.top_k.max(8))?;
        let passing_matches: Vec<_> = semantic_matches
            .iter()
            .filter(|m| m.score >= self.suggester_config.suggestion_reject_floor)
            .collect();
        if passing_matches.is_empty() {
            return Ok(None);
        }
        let matched_tool_ids: HashSet<String> = passing_matches.iter().map(|m| m.tool_id.clone()).collect();
        let mean_semantic: f32 =
            passing_matches.iter().map(|m| m.score).sum::<f32>() / passing_matches.len() as f32;

        let cap_scores = self.scorer.score_all_capabilities(
            &query_vec,
            self.graph.capabilities(),
            &forward.capability_embeddings,
            &self.config.dual_path,
            &self.config.head_fusion,
            deadline,
        )?;

        let mut scored = Vec::new();
        for candidate in cap_scores {
            let Some(capability) = self.graph.capability(&candidate.capability_id) else {
                continue;
            };
            let graph_affinity = mean_semantic.max(capability.success_rate);
            let pagerank = capability
                .members
                .iter()
                .filter_map(|m| match m {
                    Member::Tool { id } => self.graph.tool(id).map(|t| t.features.page_rank),
                    Member::Capability { .. } => None,
                })
                .fold(0.0f32, f32::max);

            let observations = self
                .thompson
                .posterior(&candidate.capability_id)
                .map_or(0, |p| p.observations(&self.config.thompson) as u32);
            let ctx = AlphaContext {
                observations,
                own_heat: capability.success_rate,
                neighbor_heats: vec![mean_semantic],
                parent_heat: None,
                semantic_history: vec![candidate.score],
                structural_history: vec![graph_affinity],
                context_distances: vec![],
            };
            let node_type = if capability.is_leaf() {
                NodeType::Capability
            } else {
                NodeType::Meta
            };
            let alpha = self.alpha_calculator.compute(mode, &candidate.capability_id, node_type, &ctx);

            let blended = alpha * candidate.score
                + (1.0 - alpha) * graph_affinity
                + self.suggester_config.pagerank_beta * pagerank;

            let hops = self.hops_to_nearest_match(
                &candidate.capability_id,
                &matched_tool_ids,
                self.suggester_config.max_hops,
            );

            scored.push(ScoredCandidate {
                capability_id: candidate.capability_id,
                blended_score: blended,
                hops,
                pagerank,
                alpha,
                semantic: candidate.score,
                graph_affinity,
                observations,
            });
        }

        scored.sort_by(|a, b| {
            b.blended_score
                .partial_cmp(&a.blended_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.capability_id.cmp(&b.capability_id))
        });

        let Some(top) = scored.first() else {
            return Ok(None);
        };

        let candidate_ids: Vec<String> = scored
            .iter()
            .take(self.suggester_config.top_k)
            .map(|s| s.capability_id.clone())
            .collect();
        let alternatives: Vec<AlternativeCandidate> = scored
            .iter()
            .skip(1)
            .take(self.suggester_config.top_k.saturating_sub(1))
            .map(|s| AlternativeCandidate {
                capability_id: s.capability_id.clone(),
                blended_score: s.blended_score,
            })
            .collect();

        let dependency_paths = self.all_pairs_dependency_paths(&candidate_ids, self.suggester_config.max_hops);

        let top3 = &scored[..scored.len().min(3)];
        let mean_top3_pagerank = top3.iter().map(|s| s.pagerank).sum::<f32>() / top3.len() as f32;
        let path_window = &scored[..scored.len().min(self.suggester_config.top_k)];
        let mean_path_confidence = path_window
            .iter()
            .map(|s| self.config.dag.hop_confidence.confidence_for_hops(s.hops))
            .sum::<f32>()
            / path_window.len() as f32;

        let confidence = self
            .config
            .dag
            .confidence(top.alpha, top.semantic, mean_top3_pagerank, mean_path_confidence);

        let source = if matched_tool_ids.is_empty() {
            None
        } else {
            Some(PredictionSource::Capability)
        };
        let rationale_inputs = RationaleInputs {
            top_hybrid: top.blended_score,
            semantic: Some(top.semantic),
            graph: Some(top.graph_affinity),
            pagerank: top.pagerank,
            total_deps: dependency_paths.len(),
            direct_deps: dependency_paths.iter().filter(|p| p.hops == 1).count(),
        };
        let rationale = self.config.dag.rationale(source, &rationale_inputs);

        let warning = if confidence < self.suggester_config.suggestion_floor {
            Some(if top.observations == 0 {
                format!(
                    "cold start: \"{}\" has no recorded outcomes yet (confidence {confidence:.2})",
                    top.capability_id
                )
            } else {
                format!(
                    "low confidence ({confidence:.2}) for \"{}\"; review before use",
                    top.capability_id
                )
            })
        } else {
            None
        };

        let thompson_decision = if apply_thompson {
            let risk = classify_risk(&top.capability_id);
            Some(self.thompson.make_decision(
                &top.capability_id,
                top.blended_score,
                risk,
                mode,
                None,
                &mut self.rng,
            ))
        } else {
            None
        };

        Ok(Some(Suggestion {
            dag_structure: DagStructure {
                top_capability_id: top.capability_id.clone(),
                candidate_ids,
            },
            confidence,
            dependency_paths,
            alternatives,
            rationale,
            warning,
            thompson: thompson_decision,
        }))
    }

    pub fn record_outcome(&mut self, capability_id: &str, success: bool) {
        self.thompson.record_outcome(capability_id, success);
        self.alpha_calculator.invalidate();
    }
}
