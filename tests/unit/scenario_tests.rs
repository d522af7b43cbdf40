use chrono::{TimeDelta, Utc};

use semrank::config::Config;
use semrank::search::{
    DocumentInput, Intent, QueryAnalyzer, RelationshipGraph, SearchContext, SearchEngine,
    SearchOptions, UserPreferences,
};

fn engine() -> SearchEngine {
    SearchEngine::new(Config::default()).unwrap()
}

#[test]
fn domain_match_clears_default_threshold() {
    let engine = engine();
    engine
        .add_document(
            DocumentInput::new("graph database index optimization")
                .id("d1")
                .domain("technical"),
        )
        .unwrap();

    let response = engine.search(
        "database optimization",
        &SearchContext::new().domain("technical"),
        &SearchOptions::default(),
    );

    assert!(response.error.is_none());
    let hit = &response.results[0];
    assert_eq!(hit.document_id, "d1");
    assert!(hit.relevance_score >= 0.7, "score {}", hit.relevance_score);
    assert!(
        hit.match_reasons
            .iter()
            .any(|reason| reason == "domain match: technical")
    );
}

#[test]
fn fresher_document_ranks_first() {
    let engine = engine();
    let now = Utc::now();
    engine
        .add_document(
            DocumentInput::new("database replication guide")
                .id("old")
                .timestamp(now - TimeDelta::days(40)),
        )
        .unwrap();
    engine
        .add_document(
            DocumentInput::new("database replication guide")
                .id("fresh")
                .timestamp(now - TimeDelta::days(1)),
        )
        .unwrap();

    let response = engine.search(
        "database replication",
        &SearchContext::default(),
        &SearchOptions::new().threshold(0.0),
    );

    assert_eq!(response.document_ids(), vec!["fresh", "old"]);
    let (fresh, old) = (&response.results[0], &response.results[1]);
    assert!(fresh.relevance_score > old.relevance_score);
    assert_eq!(
        fresh.sub_scores.semantic_similarity,
        old.sub_scores.semantic_similarity
    );
    assert_eq!(old.sub_scores.recency, 0.0);
}

#[test]
fn how_to_query_is_a_tutorial() {
    let analyzer = QueryAnalyzer::new(&RelationshipGraph::with_defaults());
    let analysis = analyzer.analyze("how to optimize a database", &SearchContext::default());
    assert_eq!(analysis.intent, Intent::Tutorial);
    assert!(analysis.concepts.contains("database"));
}

#[test]
fn repeated_query_is_served_from_cache_faster() {
    let engine = engine();
    let inputs = (0..300)
        .map(|i| {
            DocumentInput::new(format!("database tuning notes volume {i} on query planning"))
                .id(format!("doc-{i:03}"))
        })
        .collect();
    for result in engine.add_documents(inputs).unwrap() {
        result.unwrap();
    }

    let ctx = SearchContext::new().domain("technical");
    let options = SearchOptions::new().threshold(0.0);
    let first = engine.search("database tuning", &ctx, &options);
    let second = engine.search("database tuning", &ctx, &options);

    assert!(!first.metrics.cache_hit);
    assert!(second.metrics.cache_hit);
    assert_eq!(first.results, second.results);
    assert!(
        second.metrics.search_time_ms < first.metrics.search_time_ms,
        "cached {}ms vs computed {}ms",
        second.metrics.search_time_ms,
        first.metrics.search_time_ms
    );
}

#[test]
fn force_refresh_recomputes() {
    let engine = engine();
    engine
        .add_document(DocumentInput::new("network latency troubleshooting").id("n1"))
        .unwrap();
    let ctx = SearchContext::default();
    let options = SearchOptions::new().threshold(0.0);

    let warm = engine.search("network latency", &ctx, &options);
    assert!(!warm.metrics.cache_hit);
    let refreshed = engine.search("network latency", &ctx, &options.clone().force_refresh(true));
    assert!(!refreshed.metrics.cache_hit);
    assert_eq!(refreshed.document_ids(), warm.document_ids());
}

#[test]
fn synonym_suggestions_for_analyze() {
    let response = engine().search(
        "analyze the results",
        &SearchContext::default(),
        &SearchOptions::default(),
    );
    let replacements = ["examine", "study", "investigate", "review"];
    assert!(
        response.suggestions.iter().any(|suggestion| {
            replacements
                .iter()
                .any(|word| suggestion == &format!("{word} the results"))
        }),
        "suggestions: {:?}",
        response.suggestions
    );
    assert!(response.suggestions.len() <= 5);
}

#[test]
fn removed_document_never_returned_from_warm_cache() {
    let engine = engine();
    engine
        .add_document(DocumentInput::new("security audit checklist").id("s1"))
        .unwrap();
    engine
        .add_document(DocumentInput::new("security incident response").id("s2"))
        .unwrap();
    let ctx = SearchContext::default();
    let options = SearchOptions::new().threshold(0.0);

    let warm = engine.search("security", &ctx, &options);
    assert_eq!(warm.results.len(), 2);

    engine.remove_document("s1").unwrap();
    let after = engine.search("security", &ctx, &options);
    assert_eq!(after.document_ids(), vec!["s2"]);
    assert!(engine.get_document("s1").is_none());
}

#[test]
fn results_respect_threshold_and_order() {
    let engine = engine();
    for (id, content) in [
        ("a", "database indexing strategies"),
        ("b", "database"),
        ("c", "cooking pasta at home"),
        ("d", "index tuning for a relational database"),
    ] {
        engine.add_document(DocumentInput::new(content).id(id)).unwrap();
    }

    let threshold = 0.2;
    let response = engine.search(
        "database index",
        &SearchContext::default(),
        &SearchOptions::new().threshold(threshold),
    );

    assert!(response.results.iter().all(|r| r.relevance_score >= threshold));
    assert!(
        response
            .results
            .windows(2)
            .all(|pair| pair[0].relevance_score >= pair[1].relevance_score)
    );
    assert!(response.results.len() <= engine.config().search.max_results);
}

#[test]
fn stored_preferences_personalize_ranking() {
    let engine = engine();
    engine
        .add_document(DocumentInput::new("database backup plan").id("hard").difficulty("advanced"))
        .unwrap();
    engine
        .add_document(DocumentInput::new("database backup plan").id("easy").difficulty("beginner"))
        .unwrap();

    let prefs = UserPreferences {
        preferred_difficulty: Some("beginner".to_string()),
        ..Default::default()
    };
    let options = SearchOptions::new().threshold(0.0);
    engine.search("warmup", &SearchContext::new().user("u1").preferences(prefs), &options);

    // Later searches without explicit preferences still use the stored profile.
    let response = engine.search("database backup", &SearchContext::new().user("u1"), &options);
    assert_eq!(response.document_ids(), vec!["easy", "hard"]);
    assert!(
        response.results[0].sub_scores.personalization
            > response.results[1].sub_scores.personalization
    );
}

#[test]
fn new_relation_reaches_scoring_and_suggestions() {
    let engine = engine();
    engine
        .add_document(DocumentInput::new("distributed consensus with raft").id("r1"))
        .unwrap();
    let options = SearchOptions::new().threshold(0.0);

    let before = engine.search("raft", &SearchContext::default(), &options);
    assert_eq!(before.results[0].sub_scores.relationship_relevance, 0.0);

    engine.relate("raft", "consensus").unwrap();
    let concepts = engine.get_document("r1").unwrap().concepts;
    assert!(concepts.contains("raft") && concepts.contains("consensus"));

    let after = engine.search("raft", &SearchContext::default(), &options);
    assert!(!after.metrics.cache_hit);
    assert!(after.results[0].sub_scores.relationship_relevance > 0.0);
    assert!(after.related_queries.contains(&"raft consensus".to_string()));
    assert!(engine.analyze("raft elections", &SearchContext::default()).concepts.contains("raft"));
}

#[test]
fn cache_hit_reports_the_callers_query() {
    let engine = engine();
    engine
        .add_document(DocumentInput::new("database optimization handbook").id("d1"))
        .unwrap();
    let ctx = SearchContext::new().user("u1");
    let options = SearchOptions::new().threshold(0.0);

    let first = engine.search("Database  Optimization", &ctx, &options);
    let second = engine.search("database optimization", &ctx, &options);

    assert!(!first.metrics.cache_hit);
    assert!(second.metrics.cache_hit);
    assert_eq!(first.query, "Database  Optimization");
    assert_eq!(second.query, "database optimization");
    assert_eq!(engine.history().last().unwrap().query, "database optimization");
    let profile = engine.user_profile("u1").unwrap();
    assert_eq!(
        profile.recent_searches.back().unwrap().query,
        "database optimization"
    );
}
