//! Concept relationship graph
//!
//! Maps a concept to the set of concepts related to it. Used for
//! relationship relevance and related-query suggestions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Built-in relations. Each pair is inserted in both directions.
const DEFAULT_RELATIONS: &[(&str, &[&str])] = &[
    ("database", &["index", "query", "storage", "schema", "optimization", "transaction"]),
    ("optimization", &["performance", "algorithm", "efficiency", "index", "caching"]),
    ("algorithm", &["complexity", "data", "graph", "sorting"]),
    ("performance", &["latency", "throughput", "caching", "profiling"]),
    ("security", &["encryption", "authentication", "vulnerability", "privacy"]),
    ("network", &["protocol", "latency", "routing", "security"]),
    ("graph", &["node", "edge", "network", "traversal"]),
    ("search", &["index", "ranking", "query", "relevance"]),
    ("learning", &["model", "training", "data", "prediction"]),
    ("testing", &["quality", "automation", "debugging", "coverage"]),
    ("design", &["architecture", "pattern", "interface"]),
    ("architecture", &["scalability", "pattern", "microservices"]),
    ("data", &["analysis", "storage", "visualization", "statistics"]),
    ("api", &["interface", "protocol", "integration", "endpoint"]),
    ("concurrency", &["threads", "locking", "parallelism", "async"]),
    ("memory", &["allocation", "caching", "storage"]),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl RelationshipGraph {
    /// Empty graph with no concepts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph seeded with the built-in technical vocabulary.
    pub fn with_defaults() -> Self {
        let mut graph = Self::new();
        for (concept, related) in DEFAULT_RELATIONS {
            for other in *related {
                graph.relate(concept, other);
            }
        }
        graph
    }

    pub fn from_edges(edges: BTreeMap<String, BTreeSet<String>>) -> Self {
        let mut graph = Self::new();
        for (concept, related) in edges {
            for other in related {
                graph.relate(&concept, &other);
            }
        }
        graph
    }

    /// Record a symmetric relation between two concepts.
    pub fn relate(&mut self, a: &str, b: &str) {
        let a = a.trim().to_lowercase();
        let b = b.trim().to_lowercase();
        if a.is_empty() || b.is_empty() || a == b {
            return;
        }
        self.edges.entry(a.clone()).or_default().insert(b.clone());
        self.edges.entry(b).or_default().insert(a);
    }

    pub fn neighbors(&self, concept: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(concept).filter(|set| !set.is_empty())
    }

    /// Whether `word` is part of the concept vocabulary.
    pub fn is_concept(&self, word: &str) -> bool {
        self.edges.contains_key(word)
    }

    /// True when any neighbor of `concept` is in `targets`.
    pub fn connects(&self, concept: &str, targets: &BTreeSet<String>) -> bool {
        self.neighbors(concept)
            .is_some_and(|related| related.iter().any(|r| targets.contains(r)))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edges(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.edges
    }
}
