use std::time::Duration;

use semrank::RankError;
use semrank::config::Config;
use semrank::search::{DocumentInput, SearchContext, SearchEngine, SearchOptions};

#[test]
fn project_config_in_root_is_layered() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        "[search]\nmax_results = 2\n\n[persistence]\ncheckpoint_interval = \"45s\"\n",
    )
    .unwrap();

    let config = Config::load(None, dir.path()).unwrap();
    assert_eq!(config.search.max_results, 2);
    assert_eq!(config.persistence.checkpoint_interval, Duration::from_secs(45));
    assert_eq!(config.cache.capacity, 256);
}

#[test]
fn disabled_cache_never_hits() {
    let config = Config::from_toml_str("[cache]\nenabled = false\n").unwrap();
    let engine = SearchEngine::new(config).unwrap();
    engine.add_document(DocumentInput::new("database").id("a")).unwrap();

    let options = SearchOptions::new().threshold(0.0);
    for _ in 0..3 {
        let response = engine.search("database", &SearchContext::default(), &options);
        assert!(!response.metrics.cache_hit);
    }
    assert_eq!(engine.cache_stats().entries, 0);
    assert_eq!(engine.health_status().cache_hit_rate, 0.0);
}

#[test]
fn configured_max_results_is_the_default_limit() {
    let config = Config::from_toml_str("[search]\nmax_results = 2\n").unwrap();
    let engine = SearchEngine::new(config).unwrap();
    for i in 0..5 {
        engine
            .add_document(DocumentInput::new(format!("database {i}")).id(format!("d{i}")))
            .unwrap();
    }

    let response = engine.search(
        "database",
        &SearchContext::default(),
        &SearchOptions::new().threshold(0.0),
    );
    assert_eq!(response.results.len(), 2);
    assert_eq!(response.metrics.total_matches, 5);
}

#[test]
fn small_dimension_engine_still_ranks() {
    let config = Config::from_toml_str("[search]\ndimensions = 8\n").unwrap();
    let engine = SearchEngine::new(config).unwrap();
    engine.add_document(DocumentInput::new("network routing").id("n")).unwrap();

    let response = engine.search(
        "network",
        &SearchContext::default(),
        &SearchOptions::new().threshold(0.0),
    );
    assert_eq!(response.document_ids(), vec!["n"]);
    assert_eq!(engine.index().dims(), 8);
}

#[test]
fn unknown_embedding_backend_is_rejected() {
    let config = Config::from_toml_str("[search]\nembedding_backend = \"word2vec\"\n").unwrap();
    let err = SearchEngine::new(config).err().unwrap();
    assert!(matches!(err, RankError::Config(_)));
    assert!(err.to_string().contains("word2vec"));
}
