//! Prompt-keyed response cache backed by the conversation log.
//!
//! The cache key is the prompt text verbatim: no trimming, no case folding.
//! Each prompt maps to the responses received for it in arrival order.
//! On open, the log is replayed to rebuild the map; on save, the record is
//! appended to the log first and only then made visible in memory, so the
//! in-memory view never runs ahead of what is on disk.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::log::{PersistentLog, PromptRecord};
use crate::config::{CacheConfig, DurabilityPolicy};
use crate::error::{BenderError, Result};

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    NotFound,
}

impl Lookup {
    pub fn into_option(self) -> Option<String> {
        match self {
            Self::Found(response) => Some(response),
            Self::NotFound => None,
        }
    }
}

/// What happened to a response handed to [`ResponseCache::save_response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Appended to the log and cached in memory.
    Persisted,
    /// The log append failed under [`DurabilityPolicy::BestEffort`]; the
    /// response was not cached.
    NotPersisted,
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of distinct prompts cached.
    pub prompts: usize,
    /// Responses held in memory across all prompts.
    pub responses: usize,
}

/// Concurrent prompt → responses cache with JSONL durability.
pub struct ResponseCache {
    entries: DashMap<String, Vec<String>>,
    log: PersistentLog,
    durability: DurabilityPolicy,
    max_history: usize,
}

impl ResponseCache {
    /// Open the cache described by `config`, replaying its log.
    ///
    /// A log that cannot be read degrades to an empty cache with a warning.
    pub fn open(config: &CacheConfig) -> Self {
        Self::with_log(
            PersistentLog::new(config.path.clone()),
            config.durability,
            config.max_history_per_prompt,
        )
    }

    /// Build a cache over an existing log. `max_history` is clamped to at least 1.
    pub fn with_log(log: PersistentLog, durability: DurabilityPolicy, max_history: usize) -> Self {
        let cache = Self {
            entries: DashMap::new(),
            log,
            durability,
            max_history: max_history.max(1),
        };
        cache.replay();
        cache
    }

    fn replay(&self) {
        let report = match self.log.load_all() {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Conversation log unreadable, starting with an empty cache");
                return;
            }
        };

        let total = report.records.len();
        for record in report.records {
            self.push(record.prompt, record.response);
        }
        info!(
            path = %self.log.path().display(),
            records = total,
            skipped = report.skipped,
            prompts = self.entries.len(),
            "Loaded cached conversations"
        );
    }

    fn push(&self, prompt: String, response: String) {
        let mut history = self.entries.entry(prompt).or_default();
        history.push(response);
        if history.len() > self.max_history {
            let excess = history.len() - self.max_history;
            history.drain(..excess);
        }
    }

    /// Exact-string membership test.
    pub fn is_cached(&self, prompt: &str) -> bool {
        self.entries.contains_key(prompt)
    }

    /// Most recent response for `prompt`.
    pub fn get_response(&self, prompt: &str) -> Lookup {
        self.entries
            .get(prompt)
            .and_then(|history| history.last().cloned())
            .map_or(Lookup::NotFound, Lookup::Found)
    }

    /// Retained responses for `prompt`, oldest first.
    pub fn history(&self, prompt: &str) -> Vec<String> {
        self.entries
            .get(prompt)
            .map(|history| history.value().clone())
            .unwrap_or_default()
    }

    /// Durably record `response` for `prompt`, then cache it.
    ///
    /// The log append and the in-memory update happen under the log's writer
    /// lock, so per-prompt history order always matches log order. Under
    /// [`DurabilityPolicy::Strict`] an append failure is returned; under
    /// [`DurabilityPolicy::BestEffort`] it is logged and reported as
    /// [`SaveOutcome::NotPersisted`].
    pub fn save_response(&self, prompt: &str, response: &str) -> Result<SaveOutcome> {
        let record = PromptRecord::now(prompt, response);
        let _guard = self.log.lock();

        if let Err(e) = self.log.append_locked(&record) {
            return match self.durability {
                DurabilityPolicy::Strict => Err(e),
                DurabilityPolicy::BestEffort => {
                    warn!(error = %e, "Response not persisted; it will not be served from cache");
                    Ok(SaveOutcome::NotPersisted)
                }
            };
        }

        self.push(record.prompt, record.response);
        debug!(prompt_len = prompt.len(), "Cached response");
        Ok(SaveOutcome::Persisted)
    }

    /// [`Self::save_response`] on the blocking thread pool.
    ///
    /// Append and insert run together inside one blocking task, so dropping
    /// the returned future never splits them.
    pub async fn save_response_async(
        self: Arc<Self>,
        prompt: String,
        response: String,
    ) -> Result<SaveOutcome> {
        tokio::task::spawn_blocking(move || self.save_response(&prompt, &response))
            .await
            .map_err(|e| BenderError::Persistence(format!("Save task failed: {e}")))?
    }

    /// Return aggregate statistics about the cache.
    pub fn stats(&self) -> CacheStats {
        let responses = self.entries.iter().map(|e| e.value().len()).sum();
        CacheStats {
            prompts: self.entries.len(),
            responses,
        }
    }

    /// Return the number of distinct prompts cached.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The underlying log.
    pub fn log(&self) -> &PersistentLog {
        &self.log
    }
}
