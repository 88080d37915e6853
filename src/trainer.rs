//! Minibatch BCE training over the K-head scorer (`spec.md` §4.5 —
//! component C5): analytical backward pass through the per-head dot
//! product and sigmoid, SGD with gradient-norm clipping. Not autodiff
//! and not straight-through — every gradient here is hand-derived.

use std::collections::HashMap;

use tracing::warn;

use crate::deadline::Deadline;
use crate::error::{CoreError, QueryError};
use crate::params::Matrix;
use crate::scorer::KHeadScorer;

/// One *(intent, candidate, outcome)* training episode. The candidate
/// is looked up by id in the caller-supplied `capability_embeddings`
/// map — the hidden-dim embedding SHGAT's forward pass produced for it
/// (`spec.md` §4.5: "Forward the model once on the full graph
/// (cached)"; only `KHeadScorer`'s weights are trained here, not the
/// level parameters).
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub query: Vec<f32>,
    pub candidate_id: String,
    /// Binary label in `{0.0, 1.0}`.
    pub label: f32,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainerConfig {
    pub learning_rate: f32,
    pub clip_norm: f32,
    pub batch_size: usize,
    /// Abort the whole call if more than this fraction of examples are
    /// malformed (wrong dimension, unresolvable candidate, or a label
    /// outside `[0, 1]`).
    pub max_invalid_fraction: f32,
    /// Number of passes over the valid examples.
    pub epochs: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            clip_norm: 5.0,
            batch_size: 32,
            max_invalid_fraction: 0.5,
            epochs: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainingReport {
    pub examples_seen: usize,
    pub examples_skipped: usize,
    pub final_batch_loss: f32,
    /// Fraction of valid examples whose final-epoch prediction
    /// (thresholded at 0.5) matches its label.
    pub final_accuracy: f32,
}

fn resolve_embedding<'a>(
    example: &TrainingExample,
    capability_embeddings: &'a HashMap<String, Vec<f32>>,
) -> Option<&'a Vec<f32>> {
    capability_embeddings.get(&example.candidate_id)
}

fn is_valid(example: &TrainingExample, embedding: Option<&Vec<f32>>, embedding_dim: usize, hidden_dim: usize) -> bool {
    example.query.len() == embedding_dim
        && embedding.is_some_and(|e| e.len() == hidden_dim)
        && (0.0..=1.0).contains(&example.label)
}

/// Zeroed gradient accumulator for one head's query/key weights.
struct HeadGrad {
    wq: Matrix,
    wk: Matrix,
}

impl HeadGrad {
    fn zeros(wq: &Matrix, wk: &Matrix) -> Self {
        Self {
            wq: Matrix::zeros(wq.rows, wq.cols),
            wk: Matrix::zeros(wk.rows, wk.cols),
        }
    }

    fn clip(&mut self, clip_norm: f32) {
        let norm = (self.wq.data.iter().chain(self.wk.data.iter()).map(|g| g * g).sum::<f32>()).sqrt();
        if norm > clip_norm && norm > f32::EPSILON {
            let scale = clip_norm / norm;
            for g in self.wq.data.iter_mut().chain(self.wk.data.iter_mut()) {
                *g *= scale;
            }
        }
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Trains `scorer` in place over `config.epochs` passes through
/// `episodes`, each processed in `config.batch_size`-sized minibatches.
/// Invalid examples (bad dimension, unresolvable candidate id, or an
/// out-of-range label) are skipped with a `tracing::warn!`; if the
/// invalid fraction exceeds `config.max_invalid_fraction` the call
/// aborts before touching any weights. The deadline is checked at each
/// batch boundary, surfacing `CoreError::Cancelled` with no further
/// weight mutation for that call (`spec.md` §5).
pub fn train_shgat_on_episodes(
    scorer: &mut KHeadScorer,
    episodes: &[TrainingExample],
    capability_embeddings: &HashMap<String, Vec<f32>>,
    config: &TrainerConfig,
    deadline: &Deadline,
) -> Result<TrainingReport, CoreError> {
    let embedding_dim = scorer.query_weight(0).cols;
    let hidden_dim = scorer.hidden_dim();

    if episodes.is_empty() {
        return Ok(TrainingReport::default());
    }

    let invalid = episodes
        .iter()
        .filter(|e| !is_valid(e, resolve_embedding(e, capability_embeddings), embedding_dim, hidden_dim))
        .count();
    let invalid_fraction = invalid as f32 / episodes.len() as f32;
    if invalid_fraction > config.max_invalid_fraction {
        return Err(CoreError::Query(QueryError::TooManyInvalidTrainingExamples {
            invalid,
            total: episodes.len(),
        }));
    }

    let valid: Vec<(&TrainingExample, &Vec<f32>)> = episodes
        .iter()
        .filter_map(|e| {
            let embedding = resolve_embedding(e, capability_embeddings);
            let ok = is_valid(e, embedding, embedding_dim, hidden_dim);
            if !ok {
                warn!("skipping malformed training example");
                return None;
            }
            embedding.map(|emb| (e, emb))
        })
        .collect();

    let num_heads = scorer.num_heads();
    let mut report = TrainingReport {
        examples_seen: valid.len(),
        examples_skipped: invalid,
        final_batch_loss: 0.0,
        final_accuracy: 0.0,
    };

    for _epoch in 0..config.epochs.max(1) {
        for batch in valid.chunks(config.batch_size.max(1)) {
            if deadline.is_expired() {
                return Err(CoreError::Cancelled);
            }
            let mut grads: Vec<HeadGrad> = (0..num_heads)
                .map(|h| HeadGrad::zeros(scorer.query_weight(h), scorer.key_weight(h)))
                .collect();
            let mut batch_loss = 0.0f32;

            for (example, capability_embedding) in batch {
                // Forward must match `KHeadScorer::score_embedding`'s
                // default (unweighted-mean) fusion: sigmoid is applied
                // per head, then averaged, not the other way around.
                let scale = (hidden_dim as f32).sqrt().max(1.0);
                let mut per_head_s = Vec::with_capacity(num_heads);
                let mut per_head_q = Vec::with_capacity(num_heads);
                let mut per_head_k = Vec::with_capacity(num_heads);
                for h in 0..num_heads {
                    let q = scorer.query_weight(h).mat_vec(&example.query);
                    let k = scorer.key_weight(h).mat_vec(capability_embedding);
                    let dot: f32 = q.iter().zip(&k).map(|(a, b)| a * b).sum::<f32>() / scale;
                    per_head_s.push(sigmoid(dot));
                    per_head_q.push(q);
                    per_head_k.push(k);
                }
                let y_hat = per_head_s.iter().sum::<f32>() / num_heads as f32;
                let eps = 1e-7;
                batch_loss += -(example.label * (y_hat + eps).ln()
                    + (1.0 - example.label) * (1.0 - y_hat + eps).ln());

                // dL/dy_hat for BCE, then chained back through the mean
                // and each head's own sigmoid (y_hat is an average of
                // per-head sigmoids here, not a single sigmoid of an
                // averaged logit, so the usual `y_hat - label` shortcut
                // does not apply).
                let d_y_hat = (y_hat - example.label) / (y_hat * (1.0 - y_hat) + eps);

                for h in 0..num_heads {
                    let q = &per_head_q[h];
                    let k = &per_head_k[h];
                    let s_h = per_head_s[h];
                    let d_dot = d_y_hat * (s_h * (1.0 - s_h)) / num_heads as f32 / scale;
                    let wq = scorer.query_weight(h);
                    let wk = scorer.key_weight(h);
                    for i in 0..wq.rows {
                        for j in 0..wq.cols {
                            // d(dot)/d(Wq[i,j]) = query[j] * k[i]
                            grads[h].wq.data[i * wq.cols + j] += d_dot * example.query[j] * k[i];
                        }
                    }
                    for i in 0..wk.rows {
                        for j in 0..wk.cols {
                            // d(dot)/d(Wk[i,j]) = capability_embedding[j] * q[i]
                            grads[h].wk.data[i * wk.cols + j] += d_dot * capability_embedding[j] * q[i];
                        }
                    }
                }
            }

            let batch_len = batch.len().max(1) as f32;
            for h in 0..num_heads {
                for g in grads[h].wq.data.iter_mut().chain(grads[h].wk.data.iter_mut()) {
                    *g /= batch_len;
                }
                grads[h].clip(config.clip_norm);
                scorer.apply_gradient_step(h, &grads[h].wq, &grads[h].wk, config.learning_rate);
            }
            report.final_batch_loss = batch_loss / batch_len;
        }
    }

    let correct = valid
        .iter()
        .filter(|(example, capability_embedding)| {
            let y_hat = scorer.score_embedding(&example.query, capability_embedding);
            let predicted = if y_hat >= 0.5 { 1.0 } else { 0.0 };
            (predicted - example.label).abs() < f32::EPSILON
        })
        .count();
    report.final_accuracy = if valid.is_empty() {
        0.0
    } else {
        correct as f32 / valid.len() as f32
    };

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(label: f32) -> TrainingExample {
        TrainingExample {
            query: vec![1.0, 0.0],
            candidate_id: "cap-1".into(),
            label,
        }
    }

    fn embeddings() -> HashMap<String, Vec<f32>> {
        HashMap::from([("cap-1".to_string(), vec![1.0, 0.0, 0.0, 0.0])])
    }

    #[test]
    fn training_reduces_bce_loss_on_a_repeated_example() {
        let mut scorer = KHeadScorer::new(2, 4, 1, 1);
        let episodes = vec![example(1.0); 8];
        let capability_embeddings = embeddings();
        let config = TrainerConfig {
            learning_rate: 0.5,
            ..TrainerConfig::default()
        };
        let embedding = &capability_embeddings["cap-1"];
        let before = scorer.score_embedding(&episodes[0].query, embedding);
        train_shgat_on_episodes(&mut scorer, &episodes, &capability_embeddings, &config, &Deadline::none()).unwrap();
        let after = scorer.score_embedding(&episodes[0].query, embedding);
        assert!(after >= before);
    }

    #[test]
    fn multiple_epochs_train_further_than_a_single_pass() {
        let mut scorer_one_epoch = KHeadScorer::new(2, 4, 1, 1);
        let mut scorer_many_epochs = KHeadScorer::new(2, 4, 1, 1);
        let episodes = vec![example(1.0); 4];
        let capability_embeddings = embeddings();
        let embedding = &capability_embeddings["cap-1"];

        let one_epoch_config = TrainerConfig {
            learning_rate: 0.2,
            epochs: 1,
            ..TrainerConfig::default()
        };
        let many_epoch_config = TrainerConfig {
            learning_rate: 0.2,
            epochs: 5,
            ..TrainerConfig::default()
        };
        train_shgat_on_episodes(
            &mut scorer_one_epoch,
            &episodes,
            &capability_embeddings,
            &one_epoch_config,
            &Deadline::none(),
        )
        .unwrap();
        train_shgat_on_episodes(
            &mut scorer_many_epochs,
            &episodes,
            &capability_embeddings,
            &many_epoch_config,
            &Deadline::none(),
        )
        .unwrap();

        let one_epoch_score = scorer_one_epoch.score_embedding(&episodes[0].query, embedding);
        let many_epoch_score = scorer_many_epochs.score_embedding(&episodes[0].query, embedding);
        assert!(many_epoch_score >= one_epoch_score);
    }

    #[test]
    fn majority_invalid_examples_abort_without_mutating_weights() {
        let mut scorer = KHeadScorer::new(2, 4, 1, 1);
        let mut episodes = vec![example(1.0)];
        for _ in 0..9 {
            episodes.push(TrainingExample {
                query: vec![1.0], // wrong dimension
                candidate_id: "cap-1".into(),
                label: 1.0,
            });
        }
        let before = scorer.query_weight(0).data.clone();
        let err = train_shgat_on_episodes(
            &mut scorer,
            &episodes,
            &embeddings(),
            &TrainerConfig::default(),
            &Deadline::none(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Query(QueryError::TooManyInvalidTrainingExamples { .. })
        ));
        assert_eq!(scorer.query_weight(0).data, before);
    }

    #[test]
    fn minority_invalid_examples_are_skipped_not_aborted() {
        let mut scorer = KHeadScorer::new(2, 4, 1, 1);
        let mut episodes = vec![example(1.0); 9];
        episodes.push(TrainingExample {
            query: vec![1.0],
            candidate_id: "cap-1".into(),
            label: 1.0,
        });
        let report = train_shgat_on_episodes(
            &mut scorer,
            &episodes,
            &embeddings(),
            &TrainerConfig::default(),
            &Deadline::none(),
        )
        .unwrap();
        assert_eq!(report.examples_skipped, 1);
        assert_eq!(report.examples_seen, 9);
    }

    #[test]
    fn final_accuracy_reflects_correct_predictions() {
        let mut scorer = KHeadScorer::new(2, 4, 1, 1);
        let episodes = vec![example(1.0); 20];
        let report = train_shgat_on_episodes(
            &mut scorer,
            &episodes,
            &embeddings(),
            &TrainerConfig {
                learning_rate: 0.5,
                epochs: 10,
                ..TrainerConfig::default()
            },
            &Deadline::none(),
        )
        .unwrap();
        assert!(report.final_accuracy > 0.0);
    }

    #[test]
    fn unresolvable_candidate_id_counts_as_invalid() {
        let mut scorer = KHeadScorer::new(2, 4, 1, 1);
        let episodes = vec![
            example(1.0),
            TrainingExample {
                query: vec![1.0, 0.0],
                candidate_id: "missing".into(),
                label: 1.0,
            },
        ];
        let report =
            train_shgat_on_episodes(&mut scorer, &episodes, &embeddings(), &TrainerConfig::default(), &Deadline::none())
                .unwrap();
        assert_eq!(report.examples_skipped, 1);
        assert_eq!(report.examples_seen, 1);
    }
}
