use shgat_core::collaborators::{Embedder, InMemoryVectorStore};
use shgat_core::config::Config;
use shgat_core::deadline::Deadline;
use shgat_core::engine::CooccurrenceConfig;
use shgat_core::error::{CoreError, GraphError};
use shgat_core::hypergraph::{Capability, Features, Hypergraph, Member, Tool};
use shgat_core::params::LevelParamStore;
use shgat_core::scorer::KHeadScorer;
use shgat_core::suggester::{Suggester, SuggesterConfig};
use shgat_core::thompson::Mode;

struct EchoEmbedder {
    dim: usize,
}

impl Embedder for EchoEmbedder {
    fn encode(&self, _text: &str) -> Result<Vec<f32>, CoreError> {
        let mut v = vec![0.0; self.dim];
        v[0] = 1.0;
        Ok(v)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

#[test]
fn three_cycle_is_rejected_with_the_full_path() {
    let mut graph = Hypergraph::new();
    graph.register_capability(Capability {
        id: "A".into(),
        embedding: vec![1.0],
        members: vec![Member::Capability { id: "B".into() }],
        hierarchy_level_hint: None,
        success_rate: 0.0,
    });
    graph.register_capability(Capability {
        id: "B".into(),
        embedding: vec![1.0],
        members: vec![Member::Capability { id: "C".into() }],
        hierarchy_level_hint: None,
        success_rate: 0.0,
    });
    graph.register_capability(Capability {
        id: "C".into(),
        embedding: vec![1.0],
        members: vec![Member::Capability { id: "A".into() }],
        hierarchy_level_hint: None,
        success_rate: 0.0,
    });

    let err = graph.commit().unwrap_err();
    match err {
        GraphError::CycleDetected { path } => {
            assert_eq!(path.first(), path.last());
            assert!(path.contains(&"A".to_string()));
            assert!(path.contains(&"B".to_string()));
            assert!(path.contains(&"C".to_string()));
        }
        other => panic!("expected CycleDetected, got {other:?}"),
    }
}

#[test]
fn single_tool_single_capability_forward_pass_head_attention_sums_to_one() {
    let mut graph = Hypergraph::new();
    graph.register_tool(Tool {
        id: "t1".into(),
        embedding: vec![1.0, 0.0, 0.0, 0.0],
        features: Features::default(),
    });
    graph.register_capability(Capability {
        id: "c1".into(),
        embedding: vec![1.0, 0.0, 0.0, 0.0],
        members: vec![Member::Tool { id: "t1".into() }],
        hierarchy_level_hint: None,
        success_rate: 0.9,
    });
    let (plan, stats) = graph.commit().unwrap();
    assert_eq!(stats.num_tools, 1);
    assert_eq!(stats.num_capabilities, 1);

    let params = LevelParamStore::initialize(plan.max_level, 4, 8, 2, 7);
    let cooccurrence = CooccurrenceConfig::default();
    let output = shgat_core::engine::forward(
        graph.tools(),
        graph.capabilities(),
        &plan,
        &params,
        &cooccurrence,
        &Deadline::none(),
    )
    .unwrap();

    let tool_embedding = output.tool_embeddings.get("t1").unwrap();
    let norm: f32 = tool_embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-3);

    let cap_embedding = output.capability_embeddings.get("c1").unwrap();
    let scorer = KHeadScorer::new(4, 8, 2, 7);
    let score = scorer.score_embedding(&[1.0, 0.0, 0.0, 0.0], cap_embedding);
    assert!(score > 0.5, "a colinear single-member capability should score above the midpoint, got {score}");
}

#[test]
fn alpha_stays_within_a_configured_range() {
    let mut config = Config::default();
    config.local_alpha.alpha_min = 0.6;
    config.local_alpha.alpha_max = 0.9;
    config.local_alpha.cold_start.target_alpha = 1.0;
    let mut calculator = shgat_core::alpha::LocalAlphaCalculator::new(config.local_alpha);
    let ctx = shgat_core::alpha::AlphaContext {
        observations: 100,
        own_heat: 0.5,
        neighbor_heats: vec![],
        parent_heat: None,
        semantic_history: vec![],
        structural_history: vec![],
        context_distances: vec![],
    };
    let alpha = calculator.compute(Mode::ActiveSearch, "n1", shgat_core::alpha::NodeType::Tool, &ctx);
    assert!((0.6..=0.9).contains(&alpha));
}

#[test]
fn cold_start_suggestion_for_an_unrelated_intent_returns_none() {
    let mut graph = Hypergraph::new();
    graph.register_tool(Tool {
        id: "unrelated-tool".into(),
        embedding: vec![0.0, 1.0],
        features: Features::default(),
    });
    graph.register_capability(Capability {
        id: "unrelated-cap".into(),
        embedding: vec![0.0, 1.0],
        members: vec![Member::Tool { id: "unrelated-tool".into() }],
        hierarchy_level_hint: None,
        success_rate: 0.1,
    });

    let config = Config {
        embedding_dim: 2,
        hidden_dim: 4,
        num_heads: 2,
        ..Config::default()
    };
    let params = LevelParamStore::initialize(0, 2, 4, 2, 3);
    let scorer = KHeadScorer::new(2, 4, 2, 3);
    let mut suggester = Suggester::new(graph, config, SuggesterConfig::default(), params, scorer);

    let embedder = EchoEmbedder { dim: 2 };
    let store = InMemoryVectorStore::new(); // empty: nothing semantically close

    let suggestion = suggester
        .suggest(
            &embedder,
            &store,
            "totally unrelated intent",
            Mode::PassiveSuggestion,
            false,
            &Deadline::none(),
        )
        .unwrap();

    // With no semantic matches at all, no candidate clears the
    // suggestionReject floor, so suggest() returns None rather than a
    // confident fallback (`spec.md` §4.8 point 7).
    assert!(suggestion.is_none());
}
