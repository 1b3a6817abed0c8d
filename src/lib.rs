//! Bender: a command-line front end to a remote text-completion service,
//! answering in the voice of Ostap Bender.
//!
//! Prompts are resolved against a small catalog, answered from a durable
//! response cache when possible, and otherwise sent to the completion
//! service with rate-limit backoff. Every new response is appended to a
//! JSONL log that is replayed on startup.

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod prompts;
pub mod providers;
pub mod session;

pub use cache::{PersistentLog, PromptRecord, ResponseCache, SaveOutcome};
pub use config::{Config, DurabilityPolicy};
pub use error::{BenderError, Result};
pub use prompts::{resolve, PromptCatalog};
pub use providers::{CompletionProvider, OpenAiCompletionClient, RetryPolicy, RetryProvider};
pub use session::{ConversationSession, Outcome, Reply, ResponseSource};
