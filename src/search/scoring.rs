//! Relevance scoring
//!
//! Six sub-scores, each in `[0, 1]`, combined as a weighted normalized sum:
//!
//! | Factor                 | Default weight |
//! |------------------------|----------------|
//! | semantic similarity    | 0.4            |
//! | context relevance      | 0.3            |
//! | personalization        | 0.2            |
//! | recency                | 0.1            |
//! | entity matches         | 1.2            |
//! | relationship relevance | 1.1            |

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analyzer::QueryAnalysis;
use super::context::{SearchContext, UserPreferences};
use super::embeddings::{Embedder, Vector, cosine_similarity};
use super::graph::RelationshipGraph;
use super::index::Document;
use crate::config::{ScoringConfig, ScoringWeights};
use crate::error::{RankError, Result};

/// Breakdown of individual score components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub semantic_similarity: f32,
    pub context_relevance: f32,
    pub entity_matches: f32,
    pub relationship_relevance: f32,
    pub personalization: f32,
    pub recency: f32,
}

/// A document with its relevance score and breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document_id: String,
    /// Overall relevance score (0.0-1.0)
    pub relevance_score: f32,
    pub sub_scores: SubScores,
    pub match_reasons: Vec<String>,
}

/// Query-side inputs computed once per search and shared across the scan.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    pub query_vector: Vector,
    pub entities: BTreeSet<String>,
    pub concepts: BTreeSet<String>,
    pub domain: Option<String>,
    pub preferences: UserPreferences,
    /// Vectors of the trailing conversation messages
    pub history_vectors: Vec<Vector>,
    /// Vectors of the user's most recent searches
    pub recent_vectors: Vec<Vector>,
    pub now: DateTime<Utc>,
}

impl ScoringContext {
    pub fn dims(&self) -> usize {
        self.query_vector.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.config.weights
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Vectorize the query side of a search.
    ///
    /// `preferences` is the merged view of context-supplied and stored
    /// preferences; `recent_queries` is oldest first.
    pub fn prepare(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        analysis: &QueryAnalysis,
        context: &SearchContext,
        preferences: UserPreferences,
        recent_queries: &[String],
    ) -> ScoringContext {
        let history_vectors = context
            .history_window(self.config.conversation_window)
            .iter()
            .map(|message| embedder.embed(message, &[]))
            .collect();

        let skip = recent_queries
            .len()
            .saturating_sub(self.config.recent_search_window);
        let recent_vectors = recent_queries[skip..]
            .iter()
            .map(|q| embedder.embed(q, &[]))
            .collect();

        // Stored interests join the request's own context words.
        let mut context_words = context.context_words();
        for interest in &preferences.interests {
            if !context_words.contains(interest) {
                context_words.push(interest.clone());
            }
        }

        ScoringContext {
            query_vector: embedder.embed(query, &context_words),
            entities: analysis.entity_set(),
            concepts: analysis.concepts.clone(),
            domain: context.domain.clone(),
            preferences,
            history_vectors,
            recent_vectors,
            now: Utc::now(),
        }
    }

    /// Score one candidate. A vector of the wrong dimension is an error so
    /// the scan can skip that document.
    pub fn score(
        &self,
        ctx: &ScoringContext,
        document: &Document,
        vector: &[f32],
        graph: &RelationshipGraph,
    ) -> Result<ScoredDocument> {
        if vector.len() != ctx.dims() {
            return Err(RankError::VectorDimensionMismatch {
                document_id: document.id.clone(),
                expected: ctx.dims(),
                actual: vector.len(),
            });
        }

        let mut reasons = Vec::new();
        let sub_scores = SubScores {
            semantic_similarity: semantic_similarity(ctx, vector, &mut reasons),
            context_relevance: context_relevance(ctx, document, &mut reasons),
            entity_matches: entity_matches(ctx, document, &mut reasons),
            relationship_relevance: relationship_relevance(ctx, document, graph, &mut reasons),
            personalization: personalization(ctx, document),
            recency: self.recency(document.timestamp, ctx.now),
        };
        if document.timestamp.is_some() && sub_scores.recency >= 0.9 {
            reasons.push("recent document".to_string());
        }

        Ok(ScoredDocument {
            document_id: document.id.clone(),
            relevance_score: self.combine(&sub_scores),
            sub_scores,
            match_reasons: reasons,
        })
    }

    /// Weighted normalized sum, clamped to `[0, 1]`.
    pub fn combine(&self, s: &SubScores) -> f32 {
        let w = &self.config.weights;
        let total = w.total();
        if total <= 0.0 {
            return 0.0;
        }
        let sum = s.semantic_similarity * w.similarity
            + s.context_relevance * w.context
            + s.entity_matches * w.entity_boost
            + s.relationship_relevance * w.relationship_boost
            + s.personalization * w.personalization
            + s.recency * w.recency;
        (sum / total).clamp(0.0, 1.0)
    }

    /// `max(0, 1 - age / max_age)`; 0.5 with no timestamp, 1.0 when the
    /// timestamp is in the future.
    pub fn recency(&self, timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f32 {
        let Some(timestamp) = timestamp else {
            return 0.5;
        };
        let age = now.signed_duration_since(timestamp);
        let Ok(age) = age.to_std() else {
            return 1.0;
        };
        let max_age = self.config.max_age.as_secs_f64();
        if max_age <= 0.0 {
            return if age.is_zero() { 1.0 } else { 0.0 };
        }
        (1.0 - age.as_secs_f64() / max_age).max(0.0) as f32
    }
}

/// Drop candidates below `threshold`, sort, and truncate.
///
/// Order is relevance desc, recency desc, then document id asc.
pub fn rank(
    mut candidates: Vec<ScoredDocument>,
    threshold: f32,
    max_results: usize,
) -> Vec<ScoredDocument> {
    candidates.retain(|c| c.relevance_score >= threshold);
    candidates.sort_by(compare_ranked);
    candidates.truncate(max_results);
    candidates
}

pub fn compare_ranked(a: &ScoredDocument, b: &ScoredDocument) -> Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then_with(|| b.sub_scores.recency.total_cmp(&a.sub_scores.recency))
        .then_with(|| a.document_id.cmp(&b.document_id))
}

fn semantic_similarity(ctx: &ScoringContext, vector: &[f32], reasons: &mut Vec<String>) -> f32 {
    let similarity = cosine_similarity(&ctx.query_vector, vector).clamp(0.0, 1.0);
    if similarity > 0.0 {
        reasons.push(format!("semantic similarity {similarity:.2}"));
    }
    similarity
}

fn average_similarity(query: &[f32], others: &[Vector]) -> f32 {
    if others.is_empty() {
        return 0.0;
    }
    let sum: f32 = others
        .iter()
        .map(|v| cosine_similarity(query, v).max(0.0))
        .sum();
    sum / others.len() as f32
}

fn prefers_category(ctx: &ScoringContext, document: &Document) -> bool {
    document
        .category
        .as_ref()
        .is_some_and(|c| ctx.preferences.preferred_categories.iter().any(|p| p.eq_ignore_ascii_case(c)))
}

fn context_relevance(ctx: &ScoringContext, document: &Document, reasons: &mut Vec<String>) -> f32 {
    let mut score = 0.5;
    if let (Some(doc_domain), Some(domain)) = (&document.domain, &ctx.domain) {
        if doc_domain.eq_ignore_ascii_case(domain) {
            score += 0.2;
            reasons.push(format!("domain match: {domain}"));
        }
    }
    if prefers_category(ctx, document) {
        score += 0.2;
        if let Some(category) = &document.category {
            reasons.push(format!("preferred category: {category}"));
        }
    }
    score += 0.1 * average_similarity(&ctx.query_vector, &ctx.history_vectors);
    f32::min(score, 1.0)
}

fn entity_matches(ctx: &ScoringContext, document: &Document, reasons: &mut Vec<String>) -> f32 {
    if ctx.entities.is_empty() {
        return 0.0;
    }
    let shared: Vec<&str> = ctx
        .entities
        .intersection(&document.entities)
        .map(String::as_str)
        .collect();
    if !shared.is_empty() {
        reasons.push(format!("shared entities: {}", shared.join(", ")));
    }
    shared.len() as f32 / ctx.entities.len() as f32
}

fn relationship_relevance(
    ctx: &ScoringContext,
    document: &Document,
    graph: &RelationshipGraph,
    reasons: &mut Vec<String>,
) -> f32 {
    if ctx.concepts.is_empty() {
        return 0.0;
    }
    let related: Vec<&str> = ctx
        .concepts
        .iter()
        .filter(|concept| graph.connects(concept, &document.concepts))
        .map(String::as_str)
        .collect();
    if !related.is_empty() {
        reasons.push(format!("related concepts: {}", related.join(", ")));
    }
    related.len() as f32 / ctx.concepts.len() as f32
}

fn personalization(ctx: &ScoringContext, document: &Document) -> f32 {
    let mut score = 0.5;
    if prefers_category(ctx, document) {
        score += 0.2;
    }
    if let (Some(difficulty), Some(preferred)) =
        (&document.difficulty, &ctx.preferences.preferred_difficulty)
    {
        if difficulty.eq_ignore_ascii_case(preferred) {
            score += 0.1;
        }
    }
    score += 0.2 * average_similarity(&ctx.query_vector, &ctx.recent_vectors);
    f32::min(score, 1.0)
}
