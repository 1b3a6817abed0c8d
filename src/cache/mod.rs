//! Prompt-keyed response caching with append-only JSONL persistence.

pub mod log;
pub mod response_cache;

pub use log::{LoadReport, PersistentLog, PromptRecord};
pub use response_cache::{CacheStats, Lookup, ResponseCache, SaveOutcome};
