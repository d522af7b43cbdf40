//! Query suggestions
//!
//! Contextual refinements and synonym variations of the query, plus
//! related queries built from concept-graph neighbors.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::analyzer::QueryAnalysis;
use super::context::SearchContext;
use super::graph::RelationshipGraph;

const MAX_SUGGESTIONS: usize = 5;
const MAX_RELATED: usize = 5;

const SYNONYMS: &[(&str, &[&str])] = &[
    ("analyze", &["examine", "study", "investigate", "review"]),
    ("analyse", &["examine", "study", "investigate", "review"]),
    ("optimize", &["improve", "tune", "speed up"]),
    ("improve", &["enhance", "optimize"]),
    ("fix", &["repair", "resolve", "debug"]),
    ("error", &["failure", "bug", "issue"]),
    ("create", &["build", "make", "set up"]),
    ("build", &["create", "construct"]),
    ("learn", &["understand", "study"]),
    ("explain", &["describe", "clarify"]),
    ("find", &["search", "locate"]),
    ("fast", &["quick", "efficient"]),
    ("slow", &["sluggish", "laggy"]),
    ("use", &["apply", "utilize"]),
    ("compare", &["contrast", "evaluate"]),
    ("results", &["outcomes", "findings"]),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    pub suggestions: Vec<String>,
    pub related_queries: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestionGenerator;

impl SuggestionGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn suggest(
        &self,
        query: &str,
        analysis: &QueryAnalysis,
        context: &SearchContext,
        graph: &RelationshipGraph,
    ) -> Suggestions {
        let query = query.split_whitespace().collect::<Vec<_>>().join(" ");
        if query.is_empty() {
            return Suggestions::default();
        }

        let candidates = contextual(&query, context).into_iter().chain(synonym_variations(&query));
        let suggestions = dedup_capped(&query, candidates, MAX_SUGGESTIONS);

        let base = query.as_str();
        let related = analysis.concepts.iter().flat_map(move |concept| {
            graph
                .neighbors(concept)
                .into_iter()
                .flatten()
                .filter(move |neighbor| !analysis.concepts.contains(*neighbor))
                .map(move |neighbor| format!("{base} {neighbor}"))
        });
        let related_queries = dedup_capped(&query, related, MAX_RELATED);

        Suggestions {
            suggestions,
            related_queries,
        }
    }
}

fn contextual(query: &str, context: &SearchContext) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(domain) = context.domain.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push(format!("{query} for {domain}"));
    }
    if let Some(difficulty) = context.difficulty.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push(format!("{query} {difficulty} level"));
    }
    out
}

/// One variation per synonym of each dictionary word in the query.
fn synonym_variations(query: &str) -> Vec<String> {
    let words: Vec<&str> = query.split(' ').collect();
    let mut out = Vec::new();
    for (position, word) in words.iter().enumerate() {
        let bare = word
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        let Some((_, synonyms)) = SYNONYMS.iter().find(|(key, _)| *key == bare) else {
            continue;
        };
        for &synonym in *synonyms {
            let mut replaced = words.clone();
            replaced[position] = synonym;
            out.push(replaced.join(" "));
        }
    }
    out
}

fn dedup_capped(query: &str, candidates: impl Iterator<Item = String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    seen.insert(query.to_lowercase());
    candidates
        .filter(|c| seen.insert(c.to_lowercase()))
        .take(cap)
        .collect()
}
