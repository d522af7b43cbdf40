//! Request context and per-call search options
//!
//! The conversation layer supplies a [`SearchContext`] with every query;
//! callers tune a single request with [`SearchOptions`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Preferences the caller knows about the user issuing the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
}

impl UserPreferences {
    pub fn is_empty(&self) -> bool {
        self.preferred_categories.is_empty()
            && self.preferred_difficulty.is_none()
            && self.interests.is_empty()
    }
}

/// Context for personalized search ranking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchContext {
    /// Key for the stored search profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_preferences: Option<UserPreferences>,
    /// Most recent conversation messages, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversation_history_tail: Vec<String>,
}

impl SearchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn difficulty(mut self, difficulty: impl Into<String>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    pub fn preferences(mut self, preferences: UserPreferences) -> Self {
        self.user_preferences = Some(preferences);
        self
    }

    pub fn history(mut self, messages: Vec<String>) -> Self {
        self.conversation_history_tail = messages;
        self
    }

    /// Words folded into the query vector alongside the query text.
    pub fn context_words(&self) -> Vec<String> {
        let mut words = Vec::new();
        words.extend(self.domain.iter().cloned());
        words.extend(self.category.iter().cloned());
        if let Some(prefs) = &self.user_preferences {
            words.extend(prefs.interests.iter().cloned());
        }
        words
    }

    /// Last `window` conversation messages.
    pub fn history_window(&self, window: usize) -> &[String] {
        let len = self.conversation_history_tail.len();
        &self.conversation_history_tail[len.saturating_sub(window)..]
    }

    /// Serialization with sorted keys, used for cache keys.
    pub fn canonical_json(&self) -> Result<String> {
        // serde_json::Map is BTreeMap-backed, so keys come out sorted.
        let value = serde_json::to_value(self)?;
        Ok(serde_json::to_string(&value)?)
    }
}

/// Cooperative cancellation flag shared between caller and scan loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-request overrides of the configured search behavior.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub max_results: Option<usize>,
    pub threshold: Option<f32>,
    /// Skip the cache lookup; the fresh response is still cached.
    pub force_refresh: bool,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancelToken>,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold.clamp(0.0, 1.0));
        self
    }

    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}
