//! Wiring shared by the commands that talk to the completion service.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use bender::cache::ResponseCache;
use bender::config::Config;
use bender::prompts::PromptCatalog;
use bender::providers::{OpenAiCompletionClient, RetryPolicy, RetryProvider};
use bender::session::ConversationSession;

/// Build a session from configuration. Ctrl-C cancels the returned token,
/// which aborts any in-flight request or backoff.
pub(crate) fn build_session(config: &Config) -> Result<(ConversationSession, CancellationToken)> {
    config.validate()?;

    let catalog = PromptCatalog::load(config.catalog.path.as_deref());
    let cache = ResponseCache::open(&config.cache);
    let stats = cache.stats();
    debug!(
        prompts = stats.prompts,
        responses = stats.responses,
        path = %config.cache.path.display(),
        "Response cache ready"
    );

    let client = OpenAiCompletionClient::from_config(&config.completion)
        .with_context(|| "Failed to create completion client")?;
    let shutdown = CancellationToken::new();
    let provider = RetryProvider::new(Box::new(client), RetryPolicy::from(&config.retry))
        .with_shutdown(shutdown.clone());

    let token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            token.cancel();
        }
    });

    let session = ConversationSession::new(Arc::new(catalog), Arc::new(cache), Arc::new(provider));
    Ok((session, shutdown))
}
