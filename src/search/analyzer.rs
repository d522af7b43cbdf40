//! Query analysis
//!
//! Classifies intent and urgency with ordered rule tables, extracts
//! entities, keywords and concepts, and estimates query complexity.
//! Pure and deterministic: no I/O, no shared state.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::context::SearchContext;
use super::embeddings::tokenize;
use super::graph::RelationshipGraph;
use crate::error::{RankError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Tutorial,
    Definition,
    Comparison,
    Recommendation,
    Example,
    Troubleshooting,
    General,
}

impl Intent {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tutorial => "tutorial",
            Self::Definition => "definition",
            Self::Comparison => "comparison",
            Self::Recommendation => "recommendation",
            Self::Example => "example",
            Self::Troubleshooting => "troubleshooting",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

/// A single predicate in a rule table.
#[derive(Debug, Clone, Copy)]
pub enum Pattern {
    /// Substring of the lowercased query
    Phrase(&'static str),
    /// Whole token of the query
    Word(&'static str),
}

impl Pattern {
    fn matches(&self, lowered: &str, tokens: &[String]) -> bool {
        match self {
            Self::Phrase(phrase) => lowered.contains(phrase),
            Self::Word(word) => tokens.iter().any(|t| t == word),
        }
    }
}

/// Ordered `(patterns, label)` table; the first rule with a matching
/// pattern wins.
pub type RuleTable<L> = &'static [(&'static [Pattern], L)];

use Pattern::{Phrase, Word};

/// Intent triggers match anywhere in the query, so "redefine" and
/// "bestselling" count.
pub const INTENT_RULES: RuleTable<Intent> = &[
    (
        &[Phrase("how to"), Phrase("how do i"), Phrase("tutorial"), Phrase("step by step"), Phrase("guide"), Phrase("walkthrough")],
        Intent::Tutorial,
    ),
    (
        &[Phrase("what is"), Phrase("what are"), Phrase("define"), Phrase("definition"), Phrase("meaning of")],
        Intent::Definition,
    ),
    (
        &[Phrase("compare"), Phrase("comparison"), Phrase("difference between"), Phrase("vs"), Phrase("versus")],
        Intent::Comparison,
    ),
    (
        &[Phrase("best"), Phrase("recommend"), Phrase("should i"), Phrase("top")],
        Intent::Recommendation,
    ),
    (
        &[Phrase("example"), Phrase("sample"), Phrase("demo"), Phrase("show me")],
        Intent::Example,
    ),
    (
        &[Phrase("not working"), Phrase("troubleshoot"), Phrase("fix"), Phrase("error"), Phrase("broken")],
        Intent::Troubleshooting,
    ),
];

pub const URGENCY_RULES: RuleTable<Urgency> = &[
    (
        &[Word("urgent"), Word("urgently"), Word("asap"), Word("immediately"), Word("emergency")],
        Urgency::High,
    ),
    (&[Word("soon"), Word("quickly"), Word("quick")], Urgency::Medium),
];

/// Evaluate a rule table against a query.
pub fn classify<L: Copy>(rules: RuleTable<L>, query: &str, fallback: L) -> L {
    let lowered = query.to_lowercase();
    let tokens = tokenize(query);
    rules
        .iter()
        .find(|(patterns, _)| patterns.iter().any(|p| p.matches(&lowered, &tokens)))
        .map_or(fallback, |(_, label)| *label)
}

const TECHNOLOGY_VOCABULARY: &[&str] = &[
    "rust", "python", "javascript", "typescript", "java", "kotlin", "swift", "c++", "c#",
    "sql", "nosql", "postgresql", "postgres", "mysql", "sqlite", "mongodb", "redis", "kafka",
    "docker", "kubernetes", "react", "vue", "angular", "linux", "git", "aws", "azure", "gcp",
    "graphql", "rest", "http", "tcp", "json", "database", "tensorflow", "pytorch", "spark",
    "hadoop", "elasticsearch", "wasm", "webassembly", "tokio",
];

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "of", "to", "in", "on", "at", "for", "with", "by",
    "from", "is", "are", "was", "were", "be", "been", "it", "this", "that", "these", "those",
    "how", "what", "which", "who", "why", "when", "where", "do", "does", "did", "i", "me",
    "my", "we", "you", "your", "can", "should", "would", "could", "about", "into", "as",
];

static PERSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+\b").expect("person pattern")
});

static ORGANIZATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:[A-Z][\w&]*\s+)+(?:Inc|Corp|Corporation|LLC|Ltd|Labs|Foundation|University|Institute|Group|Technologies)\b",
    )
    .expect("organization pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Organization,
    Technology,
    Concept,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Lowercased surface text, used for matching
    pub text: String,
    pub kind: EntityKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub intent: Intent,
    pub entities: Vec<Entity>,
    pub keywords: Vec<String>,
    pub concepts: BTreeSet<String>,
    /// 0.0 - 1.0
    pub complexity: f32,
    pub urgency: Urgency,
    /// Set when analysis failed and the raw query became the only keyword
    #[serde(default)]
    pub fallback: bool,
}

impl QueryAnalysis {
    /// Degraded analysis: the whole query is one keyword.
    pub fn fallback(query: &str) -> Self {
        let trimmed = query.trim();
        Self {
            intent: Intent::General,
            entities: Vec::new(),
            keywords: if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_lowercase()]
            },
            concepts: BTreeSet::new(),
            complexity: 0.0,
            urgency: Urgency::Low,
            fallback: true,
        }
    }

    /// Entity texts as a set for overlap scoring.
    pub fn entity_set(&self) -> BTreeSet<String> {
        self.entities.iter().map(|e| e.text.clone()).collect()
    }
}

/// Extracts entities and concepts for both queries and documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAnalyzer {
    vocabulary: BTreeSet<String>,
}

impl Default for QueryAnalyzer {
    fn default() -> Self {
        Self::new(&RelationshipGraph::with_defaults())
    }
}

impl QueryAnalyzer {
    /// Build an analyzer whose concept vocabulary is the graph's concepts.
    pub fn new(graph: &RelationshipGraph) -> Self {
        Self {
            vocabulary: graph.edges().keys().cloned().collect(),
        }
    }

    /// Analyze a query; failures degrade to [`QueryAnalysis::fallback`].
    pub fn analyze(&self, query: &str, context: &SearchContext) -> QueryAnalysis {
        match self.try_analyze(query, context) {
            Ok(analysis) => analysis,
            Err(err) => {
                warn!(error = %err, "query analysis failed, using raw query as keyword");
                QueryAnalysis::fallback(query)
            }
        }
    }

    pub fn try_analyze(&self, query: &str, context: &SearchContext) -> Result<QueryAnalysis> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Err(RankError::Analysis(format!(
                "query {query:?} has no analyzable words"
            )));
        }

        let keywords: Vec<String> = tokens
            .iter()
            .filter(|t| !STOPWORDS.contains(&t.as_str()))
            .cloned()
            .collect();

        let mut concepts = self.extract_concepts(query);
        if concepts.is_empty() {
            // Domain hints stand in when the query names no concept itself.
            for hint in [&context.domain, &context.category].into_iter().flatten() {
                concepts.extend(self.extract_concepts(hint));
            }
        }

        Ok(QueryAnalysis {
            intent: classify(INTENT_RULES, query, Intent::General),
            entities: self.extract_entities(query),
            keywords,
            concepts,
            complexity: complexity(query, tokens.len()),
            urgency: classify(URGENCY_RULES, query, Urgency::Low),
            fallback: false,
        })
    }

    /// Concept-vocabulary words appearing in `text` (plural-insensitive).
    pub fn extract_concepts(&self, text: &str) -> BTreeSet<String> {
        tokenize(text)
            .into_iter()
            .filter_map(|token| self.concept_for(&token))
            .collect()
    }

    fn concept_for(&self, token: &str) -> Option<String> {
        if self.vocabulary.contains(token) {
            return Some(token.to_string());
        }
        let singular = token.strip_suffix('s')?;
        self.vocabulary
            .contains(singular)
            .then(|| singular.to_string())
    }

    /// Entities of every lexical class, deduplicated by text and kind.
    pub fn extract_entities(&self, text: &str) -> Vec<Entity> {
        let mut entities = BTreeSet::new();

        for m in ORGANIZATION_RE.find_iter(text) {
            entities.insert(Entity {
                text: m.as_str().to_lowercase(),
                kind: EntityKind::Organization,
            });
        }

        for m in PERSON_RE.find_iter(text) {
            let candidate = m.as_str();
            let first = candidate.split_whitespace().next().unwrap_or_default();
            if STOPWORDS.contains(&first.to_lowercase().as_str()) {
                continue;
            }
            let lowered = candidate.to_lowercase();
            if entities.iter().any(|e: &Entity| e.text.contains(&lowered)) {
                continue;
            }
            entities.insert(Entity {
                text: lowered,
                kind: EntityKind::Person,
            });
        }

        for token in tokenize(text) {
            if TECHNOLOGY_VOCABULARY.contains(&token.as_str()) {
                entities.insert(Entity {
                    text: token.clone(),
                    kind: EntityKind::Technology,
                });
            }
            if let Some(concept) = self.concept_for(&token) {
                entities.insert(Entity {
                    text: concept,
                    kind: EntityKind::Concept,
                });
            }
        }

        entities.into_iter().collect()
    }
}

/// `min(1, words / 20 + sentences / 2)`
pub fn complexity(query: &str, word_count: usize) -> f32 {
    let sentences = query
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    (word_count as f32 / 20.0 + sentences as f32 / 2.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(query: &str) -> QueryAnalysis {
        QueryAnalyzer::default().analyze(query, &SearchContext::default())
    }

    #[test]
    fn tutorial_intent() {
        assert_eq!(analyze("how to optimize a database").intent, Intent::Tutorial);
        assert_eq!(analyze("rust tutorial").intent, Intent::Tutorial);
    }

    #[test]
    fn intent_rules_in_order() {
        let cases = [
            ("what is a b-tree", Intent::Definition),
            ("define latency", Intent::Definition),
            ("compare postgres and mysql", Intent::Comparison),
            ("rust vs go", Intent::Comparison),
            ("best database for analytics", Intent::Recommendation),
            ("example of a graph traversal", Intent::Example),
            ("fix connection error", Intent::Troubleshooting),
            ("database internals", Intent::General),
            // Tutorial rule precedes comparison.
            ("how to compare indexes", Intent::Tutorial),
        ];
        for (query, expected) in cases {
            assert_eq!(analyze(query).intent, expected, "query: {query}");
        }
    }

    #[test]
    fn intent_triggers_match_inside_words() {
        assert_eq!(analyze("redefine the schema").intent, Intent::Definition);
        assert_eq!(analyze("bestselling database books").intent, Intent::Recommendation);
        assert_eq!(analyze("postgres vs. mysql").intent, Intent::Comparison);
        assert_eq!(analyze("canvas rendering").intent, Intent::General);
    }

    #[test]
    fn urgency_markers_are_whole_words() {
        assert_eq!(analyze("quicksort explained").urgency, Urgency::Low);
        assert_eq!(analyze("quick sort explained").urgency, Urgency::Medium);
    }

    #[test]
    fn vocabulary_follows_the_graph() {
        let mut graph = RelationshipGraph::with_defaults();
        let before = QueryAnalyzer::new(&graph);
        assert!(before.extract_concepts("raft elections").is_empty());

        graph.relate("raft", "consensus");
        let after = QueryAnalyzer::new(&graph);
        assert_ne!(before, after);
        assert!(after.extract_concepts("raft elections").contains("raft"));
    }

    #[test]
    fn urgency_levels() {
        assert_eq!(analyze("need this asap").urgency, Urgency::High);
        assert_eq!(analyze("Urgent: database down").urgency, Urgency::High);
        assert_eq!(analyze("respond soon please").urgency, Urgency::Medium);
        assert_eq!(analyze("database design").urgency, Urgency::Low);
    }

    #[test]
    fn complexity_formula() {
        // 5 words, 1 sentence: 0.25 + 0.5
        assert!((analyze("how to optimize a database").complexity - 0.75).abs() < 1e-6);
        let long = "word ".repeat(30);
        assert!((analyze(&long).complexity - 1.0).abs() < 1e-6);
        // 4 words, 2 sentences: 0.2 + 1.0 capped
        assert!((complexity("one two. three four.", 4) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn keywords_drop_stopwords() {
        assert_eq!(
            analyze("how to optimize a database").keywords,
            vec!["optimize", "database"]
        );
    }

    #[test]
    fn concepts_from_vocabulary() {
        let analysis = analyze("database optimization for graphs");
        let expected: BTreeSet<String> = ["database", "optimization", "graph"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(analysis.concepts, expected);
    }

    #[test]
    fn domain_hint_concepts_only_when_query_has_none() {
        let analyzer = QueryAnalyzer::default();
        let ctx = SearchContext::new().domain("security");
        let hinted = analyzer.analyze("hardening checklist", &ctx);
        assert!(hinted.concepts.contains("security"));
        let explicit = analyzer.analyze("database tuning", &ctx);
        assert!(!explicit.concepts.contains("security"));
    }

    #[test]
    fn entity_classes() {
        let analysis = analyze("Grace Hopper joined Acme Labs to build rust tooling");
        let kinds: Vec<(String, EntityKind)> = analysis
            .entities
            .iter()
            .map(|e| (e.text.clone(), e.kind))
            .collect();
        assert!(kinds.contains(&("grace hopper".to_string(), EntityKind::Person)));
        assert!(kinds.contains(&("acme labs".to_string(), EntityKind::Organization)));
        assert!(kinds.contains(&("rust".to_string(), EntityKind::Technology)));
    }

    #[test]
    fn sentence_initial_stopword_is_not_a_person() {
        let analysis = analyze("The Database");
        assert!(analysis.entities.iter().all(|e| e.kind != EntityKind::Person));
    }

    #[test]
    fn empty_query_falls_back() {
        let analyzer = QueryAnalyzer::default();
        assert!(analyzer.try_analyze("   ", &SearchContext::default()).is_err());
        let analysis = analyzer.analyze("?!", &SearchContext::default());
        assert!(analysis.fallback);
        assert_eq!(analysis.intent, Intent::General);
        assert_eq!(analysis.keywords, vec!["?!"]);
    }

    #[test]
    fn entity_set_is_lowercase_text() {
        let set = analyze("database optimization").entity_set();
        assert!(set.contains("database"));
        assert!(set.contains("optimization"));
    }
}
