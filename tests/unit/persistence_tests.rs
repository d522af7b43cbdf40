use std::sync::Arc;
use std::time::Duration;

use semrank::config::Config;
use semrank::search::{DocumentInput, IndexState, SearchContext, SearchEngine, SearchOptions};
use semrank::storage::{JsonFileStore, PersistenceWorker, SnapshotStore};

const WAIT: Duration = Duration::from_secs(5);

fn boot(config: &Config, store: &Arc<JsonFileStore>) -> (Arc<SearchEngine>, semrank::storage::PersistenceHandle) {
    let engine = Arc::new(SearchEngine::new(config.clone()).unwrap());
    let handle = PersistenceWorker::spawn(
        Arc::clone(&engine),
        Arc::clone(store) as Arc<dyn SnapshotStore>,
        Duration::ZERO,
    )
    .unwrap();
    assert_eq!(handle.wait_ready(WAIT).unwrap(), IndexState::Ready);
    (engine, handle)
}

#[test]
fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("snapshot.json")));
    let config = Config::default();
    let options = SearchOptions::new().threshold(0.0);

    let (engine, handle) = boot(&config, &store);
    engine
        .add_document(DocumentInput::new("distributed consensus with raft").id("raft"))
        .unwrap();
    engine.relate("raft", "consensus").unwrap();
    engine.search("raft consensus", &SearchContext::new().user("u1"), &options);
    let report = handle.shutdown().unwrap();
    assert_eq!(report.saves, 1);
    assert!(store.path().exists());

    let (restored, handle) = boot(&config, &store);
    assert!(restored.get_document("raft").is_some());
    assert!(restored.index().graph().neighbors("raft").is_some());
    let profile = restored.user_profile("u1").unwrap();
    assert_eq!(profile.recent_searches.len(), 1);

    let health = restored.health_status();
    assert_eq!(health.indexed_document_count, 1);
    assert_eq!(health.history_count, 1);
    assert_eq!(health.total_searches, 1);

    let response = restored.search("raft consensus", &SearchContext::default(), &options);
    assert_eq!(response.document_ids(), vec!["raft"]);
    let response = restored.search("raft", &SearchContext::default(), &options);
    assert!(response.results[0].sub_scores.relationship_relevance > 0.0);
    handle.shutdown().unwrap();
}

#[test]
fn vectors_with_other_dimensions_are_recomputed() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("snapshot.json")));

    let small = SearchEngine::new(Config::from_toml_str("[search]\ndimensions = 16\n").unwrap()).unwrap();
    small
        .add_document(DocumentInput::new("memory allocator design").id("alloc"))
        .unwrap();
    store.save(&small.snapshot()).unwrap();

    let (engine, handle) = boot(&Config::default(), &store);
    let response = engine.search(
        "memory allocator",
        &SearchContext::default(),
        &SearchOptions::new().threshold(0.0),
    );
    assert!(response.error.is_none());
    assert_eq!(response.document_ids(), vec!["alloc"]);
    handle.shutdown().unwrap();

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.dimensions, 300);
    assert_eq!(saved.vectors["alloc"].len(), 300);
}

#[test]
fn corrupt_snapshot_is_not_overwritten_without_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, "{\"version\": ").unwrap();
    let store = Arc::new(JsonFileStore::new(&path));

    let mut config = Config::default();
    config.persistence.fallback_to_empty = false;
    let engine = Arc::new(SearchEngine::new(config).unwrap());
    let handle = PersistenceWorker::spawn(
        Arc::clone(&engine),
        Arc::clone(&store) as Arc<dyn SnapshotStore>,
        Duration::ZERO,
    )
    .unwrap();
    assert_eq!(handle.wait_ready(WAIT).unwrap(), IndexState::Disabled);
    assert!(engine.add_document(DocumentInput::new("anything")).is_err());
    handle.shutdown().unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"version\": ");
}
