//! Search history, per-user profiles and aggregate metrics
//!
//! All collections are bounded: pushing past capacity evicts the oldest entry.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::UserPreferences;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub result_count: usize,
    pub search_time_ms: f64,
    pub cache_hit: bool,
}

/// Ring buffer of completed searches, oldest first.
#[derive(Debug, Clone)]
pub struct SearchHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl SearchHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Rebuild from persisted entries, keeping the newest `capacity`.
    pub fn from_entries(entries: Vec<HistoryEntry>, capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        for entry in entries {
            history.push(entry);
        }
        history
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSearch {
    pub query: String,
    pub timestamp: DateTime<Utc>,
}

/// What the engine remembers about one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSearchProfile {
    #[serde(default)]
    pub preferred_categories: Vec<String>,
    #[serde(default)]
    pub preferred_difficulty: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    /// Oldest first
    #[serde(default)]
    pub recent_searches: VecDeque<RecentSearch>,
}

impl UserSearchProfile {
    /// Merge caller-supplied preferences; supplied values win.
    pub fn merge_preferences(&mut self, prefs: &UserPreferences) {
        for category in &prefs.preferred_categories {
            if !self.preferred_categories.iter().any(|c| c.eq_ignore_ascii_case(category)) {
                self.preferred_categories.push(category.clone());
            }
        }
        if prefs.preferred_difficulty.is_some() {
            self.preferred_difficulty.clone_from(&prefs.preferred_difficulty);
        }
        for interest in &prefs.interests {
            if !self.interests.contains(interest) {
                self.interests.push(interest.clone());
            }
        }
    }

    pub fn record_search(&mut self, query: &str, timestamp: DateTime<Utc>, cap: usize) {
        if cap == 0 {
            return;
        }
        while self.recent_searches.len() >= cap {
            self.recent_searches.pop_front();
        }
        self.recent_searches.push_back(RecentSearch {
            query: query.to_string(),
            timestamp,
        });
    }

    pub fn preferences(&self) -> UserPreferences {
        UserPreferences {
            preferred_categories: self.preferred_categories.clone(),
            preferred_difficulty: self.preferred_difficulty.clone(),
            interests: self.interests.clone(),
        }
    }

    pub fn recent_queries(&self) -> Vec<String> {
        self.recent_searches.iter().map(|r| r.query.clone()).collect()
    }
}

pub type UserProfiles = BTreeMap<String, UserSearchProfile>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_searches: u64,
    pub cache_hits: u64,
    pub total_search_time_ms: f64,
    pub errors: u64,
    pub truncated: u64,
}

impl PerformanceMetrics {
    pub fn record(&mut self, search_time_ms: f64, cache_hit: bool, failed: bool, truncated: bool) {
        self.total_searches += 1;
        self.total_search_time_ms += search_time_ms;
        if cache_hit {
            self.cache_hits += 1;
        }
        if failed {
            self.errors += 1;
        }
        if truncated {
            self.truncated += 1;
        }
    }

    pub fn average_search_time_ms(&self) -> f64 {
        if self.total_searches == 0 {
            0.0
        } else {
            self.total_search_time_ms / self.total_searches as f64
        }
    }

    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_searches == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_searches as f64
        }
    }
}
