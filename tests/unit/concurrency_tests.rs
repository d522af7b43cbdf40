use std::sync::Arc;
use std::thread;

use semrank::config::Config;
use semrank::search::{DocumentInput, SearchContext, SearchEngine, SearchOptions};

#[test]
fn searches_run_alongside_writes() {
    let engine = Arc::new(SearchEngine::new(Config::default()).unwrap());
    for i in 0..50 {
        engine
            .add_document(DocumentInput::new(format!("database shard {i}")).id(format!("seed-{i}")))
            .unwrap();
    }

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..100 {
                engine
                    .add_document(
                        DocumentInput::new(format!("database replica {i}")).id(format!("new-{i}")),
                    )
                    .unwrap();
                if i % 10 == 0 && i < 50 {
                    engine.remove_document(&format!("seed-{i}")).unwrap();
                }
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|reader| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let ctx = SearchContext::new().user(format!("reader-{reader}"));
                let options = SearchOptions::new().threshold(0.1).max_results(20);
                for _ in 0..50 {
                    let response = engine.search("database replica", &ctx, &options);
                    assert!(response.error.is_none());
                    assert!(response.results.len() <= 20);
                    assert!(response.results.iter().all(|r| r.relevance_score >= 0.1));
                    assert!(
                        response
                            .results
                            .windows(2)
                            .all(|pair| pair[0].relevance_score >= pair[1].relevance_score)
                    );
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let health = engine.health_status();
    assert_eq!(health.indexed_document_count, 145);
    assert_eq!(health.total_searches, 200);
    assert_eq!(health.user_pattern_count, 4);
    assert_eq!(health.history_count, 100);
    assert!(engine.get_document("seed-0").is_none());
}

#[test]
fn search_after_write_sees_the_write() {
    let engine = Arc::new(SearchEngine::new(Config::default()).unwrap());
    let options = SearchOptions::new().threshold(0.0);
    let ctx = SearchContext::default();

    assert!(engine.search("kernel scheduler", &ctx, &options).results.is_empty());
    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            engine
                .add_document(DocumentInput::new("kernel scheduler internals").id("k"))
                .unwrap();
        })
    };
    writer.join().unwrap();

    let response = engine.search("kernel scheduler", &ctx, &options);
    assert!(!response.metrics.cache_hit);
    assert_eq!(response.document_ids(), vec!["k"]);
    assert!(response.results[0].sub_scores.semantic_similarity > 0.0);
}
