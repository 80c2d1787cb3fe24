//! End-to-end pipeline: train, flush, reload, query.

use std::path::PathBuf;

use tempfile::TempDir;
use test_macros::timed_test;

use hunl_cfr_core::abstraction::centroids::CentroidTrainer;
use hunl_cfr_core::artifact::{StrategyArtifact, Variant};
use hunl_cfr_core::cards::parse_cards;
use hunl_cfr_core::config::TrainingConfig;
use hunl_cfr_core::query::{Advisor, LiveState};
use hunl_cfr_core::Trainer;

fn preflop_config(output_path: PathBuf) -> TrainingConfig {
    TrainingConfig {
        iterations: 300,
        batches: 2,
        samples: 100,
        seed: 21,
        stack_depth: 20,
        output_path,
        ..TrainingConfig::preflop_default()
    }
}

#[timed_test(300)]
fn preflop_train_save_load_query() {
    let dir = TempDir::new().unwrap();
    let artifact_path = dir.path().join("preflop.bin");

    let mut trainer = Trainer::new(preflop_config(artifact_path.clone())).unwrap();
    let trained = trainer.train().unwrap();
    assert_eq!(trained.header.trained_iterations, 600);

    // The flushed file round-trips losslessly.
    let loaded = StrategyArtifact::load(&artifact_path).unwrap();
    assert_eq!(loaded, trained);
    assert_eq!(loaded.header.variant, Variant::Preflop);
    assert!(loaded.len() > 10, "only {} info sets trained", loaded.len());

    // Strategy sums stay non-negative through the whole run.
    for (key, set) in loaded.clone().into_entries() {
        for &s in &set.strategy_sum {
            assert!(s >= 0.0, "negative strategy sum at {key}");
        }
        let avg_total: f64 = set.average_strategy().iter().sum();
        assert!((avg_total - 1.0).abs() < 1e-9);
    }

    // Queries against the loaded artifact are deterministic.
    let mut advisor = Advisor::new().with_samples(500);
    advisor.load_artifact(&artifact_path).unwrap();

    let hole = parse_cards("AhAd").unwrap();
    let state = LiveState {
        hole: [hole[0], hole[1]],
        board: Vec::new(),
        pot: 3,
        to_call: 1,
        hero_stack: 39,
        villain_stack: 38,
        history: String::new(),
    };

    let first = advisor.recommend(&state).unwrap();
    let second = advisor.recommend(&state).unwrap();
    assert_eq!(first.action, second.action);
    assert_eq!(first.distribution, second.distribution);

    let mass: f64 = first.distribution.iter().map(|(_, p)| p).sum();
    assert!((mass - 1.0).abs() < 1e-9, "distribution sums to {mass}");
}

#[timed_test(300)]
fn postflop_train_reaches_showdowns_and_flushes() {
    let dir = TempDir::new().unwrap();
    let artifact_path = dir.path().join("postflop.bin");
    let centroid_path = dir.path().join("centroids.bin");

    // A deliberately tiny abstraction so the test stays quick.
    let centroids = CentroidTrainer {
        flop_buckets: 5,
        turn_buckets: 5,
        river_buckets: 3,
        samples_per_street: 40,
        rollouts: 15,
        samples_per_rollout: 15,
        seed: 5,
    }
    .generate();
    centroids.save(&centroid_path).unwrap();

    let config = TrainingConfig {
        variant: Variant::Postflop,
        iterations: 60,
        batches: 1,
        samples: 20,
        seed: 5,
        stack_depth: 10,
        output_path: artifact_path.clone(),
        centroid_path: Some(centroid_path.clone()),
        flop_buckets: 5,
        turn_buckets: 5,
        river_buckets: 3,
    };

    let mut trainer = Trainer::new(config).unwrap();
    let artifact = trainer.train().unwrap();

    assert_eq!(artifact.header.variant, Variant::Postflop);
    assert_eq!(artifact.header.abstraction_checksum, centroids.checksum());
    assert!(!artifact.is_empty());

    // Keys span multiple streets: flop always, and the tree must have
    // reached at least one later street in 60 iterations.
    let loaded = StrategyArtifact::load(&artifact_path).unwrap();
    let entries = loaded.into_entries();
    assert!(entries.iter().any(|(k, _)| k.starts_with("1|")));
    assert!(entries.iter().any(|(k, _)| k.starts_with("2|") || k.starts_with("3|")));

    // A postflop query with the same centroids resolves a key or falls
    // back cleanly; either way it must not error.
    let mut advisor = Advisor::new().with_samples(300);
    advisor.load_artifact(&artifact_path).unwrap();
    advisor.load_centroids(&centroid_path).unwrap();

    let hole = parse_cards("KhKd").unwrap();
    let state = LiveState {
        hole: [hole[0], hole[1]],
        board: parse_cards("Ks9d4c").unwrap(),
        pot: 4,
        to_call: 0,
        hero_stack: 18,
        villain_stack: 18,
        history: String::new(),
    };
    let rec = advisor.recommend(&state).unwrap();
    let mass: f64 = rec.distribution.iter().map(|(_, p)| p).sum();
    assert!((mass - 1.0).abs() < 1e-9);
}

#[timed_test(300)]
fn corrupt_artifact_degrades_to_fallback() {
    let dir = TempDir::new().unwrap();
    let artifact_path = dir.path().join("strategy.bin");
    std::fs::write(&artifact_path, b"garbage").unwrap();

    let mut advisor = Advisor::new().with_samples(300);
    assert!(advisor.load_artifact(&artifact_path).is_err());

    // The advisor still answers from the equity heuristic.
    let hole = parse_cards("AhAd").unwrap();
    let rec = advisor
        .recommend(&LiveState {
            hole: [hole[0], hole[1]],
            board: Vec::new(),
            pot: 3,
            to_call: 1,
            hero_stack: 199,
            villain_stack: 198,
            history: String::new(),
        })
        .unwrap();
    assert!(rec.equity > 0.7);
}
