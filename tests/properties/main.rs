//! Property-based tests for the ranking math and its bookkeeping.

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use proptest::prelude::*;

use semrank::config::ScoringConfig;
use semrank::search::embeddings::{l2_normalize, magnitude};
use semrank::search::scoring::rank;
use semrank::search::{
    CacheKey, CharCodeEmbedder, Embedder, HistoryEntry, ScoredDocument, ScoringEngine,
    SearchContext, SearchHistory, SubScores, cosine_similarity,
};

fn arb_vector(len: usize) -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(-10.0f32..10.0, len)
}

fn arb_sub_scores() -> impl Strategy<Value = SubScores> {
    (
        0.0f32..=1.0,
        0.0f32..=1.0,
        0.0f32..=1.0,
        0.0f32..=1.0,
        0.0f32..=1.0,
        0.0f32..=1.0,
    )
        .prop_map(
            |(semantic_similarity, context_relevance, entity_matches, relationship_relevance, personalization, recency)| {
                SubScores {
                    semantic_similarity,
                    context_relevance,
                    entity_matches,
                    relationship_relevance,
                    personalization,
                    recency,
                }
            },
        )
}

fn arb_candidates() -> impl Strategy<Value = Vec<ScoredDocument>> {
    prop::collection::vec((0.0f32..=1.0, 0.0f32..=1.0), 0..40).prop_map(|scores| {
        scores
            .into_iter()
            .enumerate()
            .map(|(i, (relevance_score, recency))| ScoredDocument {
                document_id: format!("doc-{i:02}"),
                relevance_score,
                sub_scores: SubScores {
                    recency,
                    ..SubScores::default()
                },
                match_reasons: Vec::new(),
            })
            .collect()
    })
}

fn history_entry(i: usize) -> HistoryEntry {
    HistoryEntry {
        query: format!("q{i}"),
        user_id: None,
        timestamp: Utc::now(),
        result_count: 0,
        search_time_ms: 0.0,
        cache_hit: false,
    }
}

proptest! {
    #[test]
    fn cosine_is_symmetric_and_bounded((a, b) in (1usize..32).prop_flat_map(|n| (arb_vector(n), arb_vector(n)))) {
        let ab = cosine_similarity(&a, &b);
        let ba = cosine_similarity(&b, &a);
        prop_assert!((ab - ba).abs() < 1e-5);
        prop_assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn normalized_vectors_have_unit_length(mut v in (1usize..64).prop_flat_map(arb_vector)) {
        let was_zero = v.iter().all(|x| *x == 0.0);
        l2_normalize(&mut v);
        if was_zero {
            prop_assert!(v.iter().all(|x| *x == 0.0));
        } else {
            prop_assert!((magnitude(&v) - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn orthogonal_axes_have_zero_similarity(len in 2usize..64, i in 0usize..64, j in 0usize..64) {
        let (i, j) = (i % len, j % len);
        prop_assume!(i != j);
        let mut a = vec![0.0; len];
        let mut b = vec![0.0; len];
        a[i] = 1.0;
        b[j] = 2.5;
        prop_assert_eq!(cosine_similarity(&a, &b), 0.0);
        prop_assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn embedded_text_is_self_similar(text in "[a-z]{1,12}( [a-z]{1,12}){0,6}") {
        let embedder = CharCodeEmbedder::new(64);
        let vector = embedder.embed(&text, &[]);
        prop_assert_eq!(vector.len(), 64);
        prop_assert!((cosine_similarity(&vector, &vector) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn relevance_stays_in_unit_range(scores in arb_sub_scores()) {
        let engine = ScoringEngine::new(ScoringConfig::default());
        let relevance = engine.combine(&scores);
        prop_assert!((0.0..=1.0).contains(&relevance));
    }

    #[test]
    fn recency_decays_monotonically(younger in 0i64..90, extra in 0i64..90) {
        let engine = ScoringEngine::new(ScoringConfig {
            max_age: Duration::from_secs(30 * 24 * 3600),
            ..ScoringConfig::default()
        });
        let now = Utc::now();
        let fresh = engine.recency(Some(now - TimeDelta::days(younger)), now);
        let stale = engine.recency(Some(now - TimeDelta::days(younger + extra)), now);
        prop_assert!(fresh >= stale);
        prop_assert!((0.0..=1.0).contains(&stale));
        if younger + extra >= 30 {
            prop_assert_eq!(stale, 0.0);
        }
    }

    #[test]
    fn ranking_filters_sorts_and_bounds(
        candidates in arb_candidates(),
        threshold in 0.0f32..=1.0,
        max_results in 1usize..50,
    ) {
        let eligible = candidates.iter().filter(|c| c.relevance_score >= threshold).count();
        let ranked = rank(candidates, threshold, max_results);

        prop_assert_eq!(ranked.len(), eligible.min(max_results));
        prop_assert!(ranked.iter().all(|r| r.relevance_score >= threshold));
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(
                a.relevance_score > b.relevance_score
                    || (a.relevance_score == b.relevance_score && a.sub_scores.recency >= b.sub_scores.recency)
            );
        }
    }

    #[test]
    fn history_keeps_newest_entries(capacity in 1usize..20, pushes in 0usize..60) {
        let mut history = SearchHistory::new(capacity);
        for i in 0..pushes {
            history.push(history_entry(i));
        }
        prop_assert_eq!(history.len(), pushes.min(capacity));
        if pushes > 0 {
            let newest = history.iter().next_back().map(|e| e.query.clone());
            prop_assert_eq!(newest, Some(format!("q{}", pushes - 1)));
        }
    }

    #[test]
    fn cache_key_ignores_case_and_spacing(words in prop::collection::vec("[a-z]{1,8}", 1..6)) {
        let ctx = SearchContext::default();
        let plain = words.join(" ");
        let noisy = format!("  {}  ", words.join("   ").to_uppercase());
        let a = CacheKey::new(&plain, &ctx, 10, 0.7).unwrap();
        let b = CacheKey::new(&noisy, &ctx, 10, 0.7).unwrap();
        prop_assert_eq!(a, b);
        let other_limit = CacheKey::new(&plain, &ctx, 5, 0.7).unwrap();
        prop_assert_ne!(CacheKey::new(&plain, &ctx, 10, 0.7).unwrap(), other_limit);
    }
}
