//! Search orchestration
//!
//! [`SearchEngine`] owns the index, cache, history and user profiles and runs
//! one request through the pipeline:
//!
//! ```text
//! Received -> CacheCheck -> (hit) Completed
//!                        -> (miss) Analyzing -> Vectorizing -> Scanning
//!                           -> Scoring -> Ranking -> Suggesting -> Caching
//!                           -> Completed
//! ```
//!
//! Query-path failures never reach the caller: the response comes back
//! empty with [`SearchResponse::error`] set.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::analyzer::QueryAnalysis;
use super::cache::{CacheKey, CacheStats, ResultCache};
use super::context::{SearchContext, SearchOptions, UserPreferences};
use super::embeddings::{Embedder, build_embedder};
use super::graph::RelationshipGraph;
use super::history::{HistoryEntry, PerformanceMetrics, SearchHistory, UserProfiles, UserSearchProfile};
use super::index::{Document, DocumentId, DocumentIndex, DocumentInput, DocumentPatch, RestoreReport};
use super::scoring::{ScoredDocument, ScoringEngine, rank};
use super::suggestions::SuggestionGenerator;
use crate::config::Config;
use crate::error::{ErrorCode, RankError, Result};
use crate::storage::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    /// Waiting for the startup snapshot
    Loading,
    Ready,
    /// Startup load failed with no fallback; searches return nothing
    Disabled,
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Disabled => "disabled",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStage {
    Received,
    CacheCheck,
    Analyzing,
    Vectorizing,
    Scanning,
    Scoring,
    Ranking,
    Suggesting,
    Caching,
    Completed,
}

impl SearchStage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::CacheCheck => "cache_check",
            Self::Analyzing => "analyzing",
            Self::Vectorizing => "vectorizing",
            Self::Scanning => "scanning",
            Self::Scoring => "scoring",
            Self::Ranking => "ranking",
            Self::Suggesting => "suggesting",
            Self::Caching => "caching",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for SearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a search came back empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFailure {
    pub code: ErrorCode,
    pub stage: SearchStage,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetrics {
    pub search_time_ms: f64,
    /// Candidates at or above threshold, before truncation to `max_results`
    pub total_matches: usize,
    pub average_relevance: f32,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<ScoredDocument>,
    pub metrics: ResponseMetrics,
    pub suggestions: Vec<String>,
    pub related_queries: Vec<String>,
    /// Scan stopped early on timeout or cancellation
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SearchFailure>,
}

impl SearchResponse {
    fn empty(query: &str) -> Self {
        Self {
            query: query.to_string(),
            results: Vec::new(),
            metrics: ResponseMetrics::default(),
            suggestions: Vec::new(),
            related_queries: Vec::new(),
            truncated: false,
            error: None,
        }
    }

    pub fn document_ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.document_id.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: IndexState,
    pub indexed_document_count: usize,
    pub history_count: usize,
    pub user_pattern_count: usize,
    pub average_search_time_ms: f64,
    pub cache_hit_rate: f64,
    pub cache_entries: usize,
    pub total_searches: u64,
    pub errors: u64,
}

/// Result of the cache-miss stages.
struct PipelineOutput {
    results: Vec<ScoredDocument>,
    total_matches: usize,
    truncated: bool,
    suggestions: Vec<String>,
    related_queries: Vec<String>,
}

pub struct SearchEngine {
    config: Config,
    embedder: Arc<dyn Embedder>,
    index: DocumentIndex,
    scorer: ScoringEngine,
    suggester: SuggestionGenerator,
    cache: ResultCache<SearchResponse>,
    history: Mutex<SearchHistory>,
    profiles: RwLock<UserProfiles>,
    metrics: Mutex<PerformanceMetrics>,
    state: RwLock<IndexState>,
}

impl SearchEngine {
    /// Engine with an empty index, ready to serve.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_graph(config, RelationshipGraph::with_defaults())
    }

    pub fn with_graph(config: Config, graph: RelationshipGraph) -> Result<Self> {
        config.validate()?;
        let embedder: Arc<dyn Embedder> = Arc::from(build_embedder(&config.search)?);
        Ok(Self {
            index: DocumentIndex::new(Arc::clone(&embedder), graph),
            embedder,
            scorer: ScoringEngine::new(config.scoring.clone()),
            suggester: SuggestionGenerator::new(),
            cache: ResultCache::new(&config.cache),
            history: Mutex::new(SearchHistory::new(config.history.max_entries)),
            profiles: RwLock::new(UserProfiles::new()),
            metrics: Mutex::new(PerformanceMetrics::default()),
            state: RwLock::new(IndexState::Ready),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    pub fn state(&self) -> IndexState {
        *self.state.read()
    }

    pub fn set_state(&self, state: IndexState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            info!(from = %previous, to = %state, "index state changed");
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn analyze(&self, query: &str, context: &SearchContext) -> QueryAnalysis {
        self.index.analyzer().analyze(query, context)
    }

    pub fn get_document(&self, id: &str) -> Option<Document> {
        self.index.get(id)
    }

    pub fn user_profile(&self, user_id: &str) -> Option<UserSearchProfile> {
        self.profiles.read().get(user_id).cloned()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().to_vec()
    }

    pub fn add_document(&self, input: DocumentInput) -> Result<DocumentId> {
        self.ensure_ready()?;
        let id = self.index.add(input)?;
        self.cache.clear();
        Ok(id)
    }

    /// Index many inputs; results line up with `inputs`.
    pub fn add_documents(&self, inputs: Vec<DocumentInput>) -> Result<Vec<Result<DocumentId>>> {
        self.ensure_ready()?;
        let results = self.index.add_batch(inputs);
        self.cache.clear();
        Ok(results)
    }

    pub fn update_document(&self, id: &str, patch: DocumentPatch) -> Result<()> {
        self.ensure_ready()?;
        self.index.update(id, patch)?;
        self.cache.clear();
        Ok(())
    }

    pub fn remove_document(&self, id: &str) -> Result<Document> {
        self.ensure_ready()?;
        let removed = self.index.remove(id)?;
        self.cache.clear();
        Ok(removed)
    }

    pub fn relate(&self, a: &str, b: &str) -> Result<()> {
        self.ensure_ready()?;
        self.index.relate(a, b);
        self.cache.clear();
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state() {
            IndexState::Ready => Ok(()),
            state => Err(RankError::IndexUnavailable(format!("index is {state}"))),
        }
    }

    /// Primary entry point. Never fails; see [`SearchResponse::error`].
    pub fn search(
        &self,
        query: &str,
        context: &SearchContext,
        options: &SearchOptions,
    ) -> SearchResponse {
        let started = Instant::now();
        let mut stage = SearchStage::Received;
        let max_results = options.max_results.unwrap_or(self.config.search.max_results);
        let threshold = options
            .threshold
            .unwrap_or(self.config.search.similarity_threshold);

        let mut response = SearchResponse::empty(query);

        if let Err(err) = self.ensure_ready() {
            warn!(error = %err, "search while index unavailable");
            response.error = Some(failure(&err, stage));
            return self.complete(response, context, started, &mut stage);
        }

        advance(&mut stage, SearchStage::CacheCheck);
        let generation = self.index.generation();
        let key = match CacheKey::new(query, context, max_results, threshold) {
            Ok(key) => Some(key),
            Err(err) => {
                warn!(error = %err, "cache key derivation failed, treating as miss");
                None
            }
        };
        if !options.force_refresh {
            if let Some(mut cached) = key.as_ref().and_then(|k| self.cache.get(k, generation)) {
                debug!(query, "cache hit");
                cached.query = query.to_string();
                cached.metrics.cache_hit = true;
                return self.complete(cached, context, started, &mut stage);
            }
        }

        match self.run_pipeline(query, context, options, max_results, threshold, started, &mut stage) {
            Ok(output) => {
                response.metrics.total_matches = output.total_matches;
                response.metrics.average_relevance = average_relevance(&output.results);
                response.results = output.results;
                response.truncated = output.truncated;
                response.suggestions = output.suggestions;
                response.related_queries = output.related_queries;
            }
            Err(err) => {
                error!(stage = %stage, error = %err, "search stage failed");
                response.error = Some(failure(&err, stage));
            }
        }

        if response.error.is_none() && !response.truncated {
            if let Some(key) = key {
                advance(&mut stage, SearchStage::Caching);
                response.metrics.search_time_ms = elapsed_ms(started);
                self.cache.put(key, response.clone(), generation);
            }
        }

        self.complete(response, context, started, &mut stage)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_pipeline(
        &self,
        query: &str,
        context: &SearchContext,
        options: &SearchOptions,
        max_results: usize,
        threshold: f32,
        started: Instant,
        stage: &mut SearchStage,
    ) -> Result<PipelineOutput> {
        advance(stage, SearchStage::Analyzing);
        let analysis = self.index.analyzer().analyze(query, context);

        advance(stage, SearchStage::Vectorizing);
        let (preferences, recent_queries) = self.user_signals(context);
        let scoring = self.scorer.prepare(
            self.embedder.as_ref(),
            query,
            &analysis,
            context,
            preferences,
            &recent_queries,
        );

        advance(stage, SearchStage::Scanning);
        let view = self.index.read();
        let deadline = started + options.timeout.unwrap_or(self.config.search.scan_timeout);
        let check_every = self.config.search.scan_check_interval.max(1);
        let mut candidates = Vec::new();
        let mut truncated = false;
        let mut skipped = 0usize;

        advance(stage, SearchStage::Scoring);
        for (position, (document, vector)) in view.iter().enumerate() {
            if position % check_every == 0 {
                if options.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                    warn!(scanned = position, "search cancelled, returning partial results");
                    truncated = true;
                    break;
                }
                if Instant::now() >= deadline {
                    warn!(scanned = position, "search timed out, returning partial results");
                    truncated = true;
                    break;
                }
            }

            match self.scorer.score(&scoring, document, vector, view.graph()) {
                Ok(scored) => candidates.push(scored),
                Err(err @ RankError::VectorDimensionMismatch { .. }) => {
                    warn!(error = %err, "skipping document");
                    skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }

        advance(stage, SearchStage::Ranking);
        let total_matches = candidates
            .iter()
            .filter(|c| c.relevance_score >= threshold)
            .count();
        let results = rank(candidates, threshold, max_results);
        debug!(total_matches, returned = results.len(), skipped, truncated, "ranked");

        advance(stage, SearchStage::Suggesting);
        let suggestions = self
            .suggester
            .suggest(query, &analysis, context, view.graph());

        Ok(PipelineOutput {
            results,
            total_matches,
            truncated,
            suggestions: suggestions.suggestions,
            related_queries: suggestions.related_queries,
        })
    }

    /// Merged preferences and recent queries for the requesting user.
    fn user_signals(&self, context: &SearchContext) -> (UserPreferences, Vec<String>) {
        let stored = context
            .user_id
            .as_deref()
            .and_then(|id| self.profiles.read().get(id).cloned())
            .unwrap_or_default();
        let mut merged = stored.clone();
        if let Some(prefs) = &context.user_preferences {
            merged.merge_preferences(prefs);
        }
        (merged.preferences(), stored.recent_queries())
    }

    fn complete(
        &self,
        mut response: SearchResponse,
        context: &SearchContext,
        started: Instant,
        stage: &mut SearchStage,
    ) -> SearchResponse {
        advance(stage, SearchStage::Completed);
        response.metrics.search_time_ms = elapsed_ms(started);
        let now = Utc::now();

        self.history.lock().push(HistoryEntry {
            query: response.query.clone(),
            user_id: context.user_id.clone(),
            timestamp: now,
            result_count: response.results.len(),
            search_time_ms: response.metrics.search_time_ms,
            cache_hit: response.metrics.cache_hit,
        });

        if let Some(user_id) = &context.user_id {
            let mut profiles = self.profiles.write();
            let profile = profiles.entry(user_id.clone()).or_default();
            if let Some(prefs) = &context.user_preferences {
                profile.merge_preferences(prefs);
            }
            profile.record_search(&response.query, now, self.config.history.recent_searches);
        }

        self.metrics.lock().record(
            response.metrics.search_time_ms,
            response.metrics.cache_hit,
            response.error.is_some(),
            response.truncated,
        );

        response
    }

    pub fn health_status(&self) -> HealthStatus {
        let metrics = *self.metrics.lock();
        HealthStatus {
            state: self.state(),
            indexed_document_count: self.index.len(),
            history_count: self.history.lock().len(),
            user_pattern_count: self.profiles.read().len(),
            average_search_time_ms: metrics.average_search_time_ms(),
            cache_hit_rate: metrics.cache_hit_rate(),
            cache_entries: self.cache.len(),
            total_searches: metrics.total_searches,
            errors: metrics.errors,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let (documents, vectors, relationship_graph) = self.index.export();
        Snapshot {
            version: Snapshot::VERSION,
            saved_at: Utc::now(),
            dimensions: self.index.dims(),
            documents,
            vectors,
            relationship_graph,
            user_search_profiles: self.profiles.read().clone(),
            search_history: self.history.lock().to_vec(),
            performance_metrics: *self.metrics.lock(),
        }
    }

    /// Replace all engine state with a snapshot and mark the engine ready.
    pub fn restore(&self, snapshot: Snapshot) -> RestoreReport {
        let report = self.index.restore(
            snapshot.documents,
            snapshot.vectors,
            snapshot.relationship_graph,
        );
        *self.profiles.write() = snapshot.user_search_profiles;
        *self.history.lock() =
            SearchHistory::from_entries(snapshot.search_history, self.config.history.max_entries);
        *self.metrics.lock() = snapshot.performance_metrics;
        self.cache.clear();
        self.set_state(IndexState::Ready);
        report
    }
}

fn advance(stage: &mut SearchStage, next: SearchStage) {
    debug!(from = %stage, to = %next, "search stage");
    *stage = next;
}

fn failure(err: &RankError, stage: SearchStage) -> SearchFailure {
    SearchFailure {
        code: err.code(),
        stage,
        message: err.to_string(),
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn average_relevance(results: &[ScoredDocument]) -> f32 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.relevance_score).sum::<f32>() / results.len() as f32
}
