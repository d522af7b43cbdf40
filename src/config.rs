use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RankError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SEMRANK_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            if let Some(patch) = Self::load_patch(&path)? {
                config.merge_patch(patch);
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a full config from a TOML string, layered over defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let patch: ConfigPatch = toml::from_str(raw)?;
        let mut config = Self::default();
        config.merge_patch(patch);
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("semrank/config.toml"))
    }

    fn load_project(root: &Path) -> Result<Option<ConfigPatch>> {
        Self::load_patch(&root.join("config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| RankError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| RankError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
        if let Some(patch) = patch.scoring {
            self.scoring.merge(patch);
        }
        if let Some(patch) = patch.cache {
            self.cache.merge(patch);
        }
        if let Some(patch) = patch.history {
            self.history.merge(patch);
        }
        if let Some(patch) = patch.persistence {
            self.persistence.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("SEMRANK_SEARCH_EMBEDDING_BACKEND") {
            self.search.embedding_backend = value;
        }
        if let Some(value) = env_usize("SEMRANK_SEARCH_DIMENSIONS")? {
            self.search.dimensions = value;
        }
        if let Some(value) = env_usize("SEMRANK_SEARCH_MAX_RESULTS")? {
            self.search.max_results = value;
        }
        if let Some(value) = env_f32("SEMRANK_SEARCH_THRESHOLD")? {
            self.search.similarity_threshold = value;
        }
        if let Some(value) = env_duration("SEMRANK_SEARCH_SCAN_TIMEOUT")? {
            self.search.scan_timeout = value;
        }

        if let Some(value) = env_duration("SEMRANK_SCORING_MAX_AGE")? {
            self.scoring.max_age = value;
        }

        if let Some(value) = env_bool("SEMRANK_CACHE_ENABLED") {
            self.cache.enabled = value;
        }
        if let Some(value) = env_usize("SEMRANK_CACHE_CAPACITY")? {
            self.cache.capacity = value;
        }
        if let Some(value) = env_duration("SEMRANK_CACHE_TTL")? {
            self.cache.ttl = value;
        }

        if let Some(value) = env_usize("SEMRANK_HISTORY_MAX_ENTRIES")? {
            self.history.max_entries = value;
        }

        if let Some(value) = env_duration("SEMRANK_PERSISTENCE_INTERVAL")? {
            self.persistence.checkpoint_interval = value;
        }
        if let Some(value) = env_string("SEMRANK_PERSISTENCE_SNAPSHOT") {
            self.persistence.snapshot_path = Some(PathBuf::from(value));
        }
        if let Some(value) = env_bool("SEMRANK_PERSISTENCE_FALLBACK_TO_EMPTY") {
            self.persistence.fallback_to_empty = value;
        }

        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.search.dimensions == 0 {
            return Err(RankError::Config(
                "search.dimensions must be greater than 0".to_string(),
            ));
        }
        if self.search.max_results == 0 {
            return Err(RankError::Config(
                "search.max_results must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.search.similarity_threshold) {
            return Err(RankError::Config(format!(
                "search.similarity_threshold must be within [0, 1], got {}",
                self.search.similarity_threshold
            )));
        }
        if self.search.scan_check_interval == 0 {
            return Err(RankError::Config(
                "search.scan_check_interval must be greater than 0".to_string(),
            ));
        }
        self.scoring.weights.validate()?;
        if self.scoring.max_age.is_zero() {
            return Err(RankError::Config(
                "scoring.max_age must be greater than 0".to_string(),
            ));
        }
        if self.cache.capacity == 0 {
            return Err(RankError::Config(
                "cache.capacity must be greater than 0".to_string(),
            ));
        }
        if self.history.max_entries == 0 || self.history.recent_searches == 0 {
            return Err(RankError::Config(
                "history.max_entries and history.recent_searches must be greater than 0"
                    .to_string(),
            ));
        }
        if self.persistence.checkpoint_interval.is_zero() {
            return Err(RankError::Config(
                "persistence.checkpoint_interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub embedding_backend: String,
    #[serde(default)]
    pub dimensions: usize,
    #[serde(default)]
    pub max_results: usize,
    #[serde(default)]
    pub similarity_threshold: f32,
    #[serde(default, with = "humantime_serde")]
    pub scan_timeout: Duration,
    /// Documents scored between deadline/cancellation checks.
    #[serde(default)]
    pub scan_check_interval: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            embedding_backend: "char-code".to_string(),
            dimensions: 300,
            max_results: 10,
            similarity_threshold: 0.7,
            scan_timeout: Duration::from_secs(2),
            scan_check_interval: 256,
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.embedding_backend {
            self.embedding_backend = value;
        }
        if let Some(value) = patch.dimensions {
            self.dimensions = value;
        }
        if let Some(value) = patch.max_results {
            self.max_results = value;
        }
        if let Some(value) = patch.similarity_threshold {
            self.similarity_threshold = value;
        }
        if let Some(value) = patch.scan_timeout {
            self.scan_timeout = value;
        }
        if let Some(value) = patch.scan_check_interval {
            self.scan_check_interval = value;
        }
    }
}

/// Combination weights for the relevance sub-scores.
///
/// The entity and relationship boosts are weights in the normalized sum,
/// not multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub similarity: f32,
    pub context: f32,
    pub personalization: f32,
    pub recency: f32,
    pub entity_boost: f32,
    pub relationship_boost: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            similarity: 0.4,
            context: 0.3,
            personalization: 0.2,
            recency: 0.1,
            entity_boost: 1.2,
            relationship_boost: 1.1,
        }
    }
}

impl ScoringWeights {
    #[must_use]
    pub fn total(&self) -> f32 {
        self.similarity
            + self.context
            + self.personalization
            + self.recency
            + self.entity_boost
            + self.relationship_boost
    }

    pub fn validate(&self) -> Result<()> {
        let all = [
            self.similarity,
            self.context,
            self.personalization,
            self.recency,
            self.entity_boost,
            self.relationship_boost,
        ];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RankError::Config(
                "scoring.weights must be finite and non-negative".to_string(),
            ));
        }
        if self.total() <= 0.0 {
            return Err(RankError::Config(
                "scoring.weights must not all be zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default, with = "humantime_serde")]
    pub max_age: Duration,
    /// Conversation-history messages used for context relevance.
    #[serde(default)]
    pub conversation_window: usize,
    /// Recent searches used for personalization.
    #[serde(default)]
    pub recent_search_window: usize,
    #[serde(default)]
    pub weights: ScoringWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(30 * 24 * 3600),
            conversation_window: 5,
            recent_search_window: 3,
            weights: ScoringWeights::default(),
        }
    }
}

impl ScoringConfig {
    fn merge(&mut self, patch: ScoringPatch) {
        if let Some(weights) = patch.weights {
            if let Some(value) = weights.similarity {
                self.weights.similarity = value;
            }
            if let Some(value) = weights.context {
                self.weights.context = value;
            }
            if let Some(value) = weights.personalization {
                self.weights.personalization = value;
            }
            if let Some(value) = weights.recency {
                self.weights.recency = value;
            }
            if let Some(value) = weights.entity_boost {
                self.weights.entity_boost = value;
            }
            if let Some(value) = weights.relationship_boost {
                self.weights.relationship_boost = value;
            }
        }
        if let Some(value) = patch.max_age {
            self.max_age = value;
        }
        if let Some(value) = patch.conversation_window {
            self.conversation_window = value;
        }
        if let Some(value) = patch.recent_search_window {
            self.recent_search_window = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub capacity: usize,
    #[serde(default, with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 256,
            ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    fn merge(&mut self, patch: CachePatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.capacity {
            self.capacity = value;
        }
        if let Some(value) = patch.ttl {
            self.ttl = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub max_entries: usize,
    /// Per-user recent searches retained in the profile.
    #[serde(default)]
    pub recent_searches: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            recent_searches: 5,
        }
    }
}

impl HistoryConfig {
    fn merge(&mut self, patch: HistoryPatch) {
        if let Some(value) = patch.max_entries {
            self.max_entries = value;
        }
        if let Some(value) = patch.recent_searches {
            self.recent_searches = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Snapshot file; defaults to `<root>/snapshot.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
    #[serde(default, with = "humantime_serde")]
    pub checkpoint_interval: Duration,
    /// Serve from an empty index when the startup load fails.
    #[serde(default)]
    pub fallback_to_empty: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            checkpoint_interval: Duration::from_secs(300),
            fallback_to_empty: true,
        }
    }
}

impl PersistenceConfig {
    fn merge(&mut self, patch: PersistencePatch) {
        if let Some(value) = patch.snapshot_path {
            self.snapshot_path = Some(value);
        }
        if let Some(value) = patch.checkpoint_interval {
            self.checkpoint_interval = value;
        }
        if let Some(value) = patch.fallback_to_empty {
            self.fallback_to_empty = value;
        }
    }

    #[must_use]
    pub fn resolve_snapshot_path(&self, root: &Path) -> PathBuf {
        self.snapshot_path
            .clone()
            .unwrap_or_else(|| root.join("snapshot.json"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub search: Option<SearchPatch>,
    pub scoring: Option<ScoringPatch>,
    pub cache: Option<CachePatch>,
    pub history: Option<HistoryPatch>,
    pub persistence: Option<PersistencePatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    pub embedding_backend: Option<String>,
    pub dimensions: Option<usize>,
    pub max_results: Option<usize>,
    pub similarity_threshold: Option<f32>,
    #[serde(default, with = "humantime_serde::option")]
    pub scan_timeout: Option<Duration>,
    pub scan_check_interval: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct WeightsPatch {
    pub similarity: Option<f32>,
    pub context: Option<f32>,
    pub personalization: Option<f32>,
    pub recency: Option<f32>,
    pub entity_boost: Option<f32>,
    pub relationship_boost: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ScoringPatch {
    pub weights: Option<WeightsPatch>,
    #[serde(default, with = "humantime_serde::option")]
    pub max_age: Option<Duration>,
    pub conversation_window: Option<usize>,
    pub recent_search_window: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CachePatch {
    pub enabled: Option<bool>,
    pub capacity: Option<usize>,
    #[serde(default, with = "humantime_serde::option")]
    pub ttl: Option<Duration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct HistoryPatch {
    pub max_entries: Option<usize>,
    pub recent_searches: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PersistencePatch {
    pub snapshot_path: Option<PathBuf>,
    #[serde(default, with = "humantime_serde::option")]
    pub checkpoint_interval: Option<Duration>,
    pub fallback_to_empty: Option<bool>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        matches!(
            value.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_usize(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<usize>().map(Some).map_err(|err| {
            RankError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_f32(key: &str) -> Result<Option<f32>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<f32>().map(Some).map_err(|err| {
            RankError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_duration(key: &str) -> Result<Option<Duration>> {
    match std::env::var(key) {
        Ok(value) => humantime_serde::re::humantime::parse_duration(&value)
            .map(Some)
            .map_err(|err| RankError::Config(format!("invalid {key} value {value}: {err}"))),
        Err(_) => Ok(None),
    }
}
