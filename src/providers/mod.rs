//! Remote completion providers.
//!
//! [`CompletionProvider`] is the seam between the session and the network:
//! [`OpenAiCompletionClient`] speaks the `/v1/completions` contract,
//! [`RetryProvider`] decorates any provider with rate-limit backoff, and tests
//! substitute scripted providers.

use async_trait::async_trait;

use crate::error::Result;

pub mod openai;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use openai::OpenAiCompletionClient;
pub use retry::{complete_with_retry, RetryPolicy, RetryProvider, Sleeper, TokioSleeper};

/// A service that turns a prompt into completion text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send a single completion request. Implementations must not retry.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Model requested from the service.
    fn model(&self) -> &str;
}
