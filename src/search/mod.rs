//! Semantic search and ranking
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                  query + SearchContext                         │
//! └────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//!                ┌───────────────────────────────┐   hit
//!                │   ResultCache (cache.rs)      │ ──────► response
//!                └───────────────────────────────┘
//!                                │ miss
//!                                ▼
//! ┌──────────────────────────────┐  ┌──────────────────────────────┐
//! │  QueryAnalyzer (analyzer.rs) │  │  Embedder (embeddings.rs)    │
//! └──────────────────────────────┘  └──────────────────────────────┘
//!                     │                          │
//!                     └──────────┬───────────────┘
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │ DocumentIndex scan (index.rs) │
//!                │ + ScoringEngine (scoring.rs)  │
//!                └───────────────────────────────┘
//!                                │
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │ SuggestionGenerator           │
//!                └───────────────────────────────┘
//!                                │
//!                                ▼
//!                     ranked SearchResponse
//! ```

pub mod analyzer;
pub mod cache;
pub mod context;
pub mod embeddings;
pub mod engine;
pub mod graph;
pub mod history;
pub mod index;
pub mod scoring;
pub mod suggestions;

// Re-export main types
pub use analyzer::{Entity, EntityKind, Intent, QueryAnalysis, QueryAnalyzer, Urgency};
pub use cache::{CacheKey, CacheStats, ResultCache};
pub use context::{CancelToken, SearchContext, SearchOptions, UserPreferences};
pub use embeddings::{CharCodeEmbedder, Embedder, Vector, build_embedder, cosine_similarity};
pub use engine::{
    HealthStatus, IndexState, ResponseMetrics, SearchEngine, SearchFailure, SearchResponse,
    SearchStage,
};
pub use graph::RelationshipGraph;
pub use history::{HistoryEntry, PerformanceMetrics, RecentSearch, SearchHistory, UserSearchProfile};
pub use index::{Document, DocumentId, DocumentIndex, DocumentInput, DocumentPatch, RestoreReport};
pub use scoring::{ScoredDocument, ScoringContext, ScoringEngine, SubScores};
pub use suggestions::{SuggestionGenerator, Suggestions};
