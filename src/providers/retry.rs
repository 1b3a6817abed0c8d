//! Rate-limit retry with exponential backoff.
//!
//! Only `Protocol` failures with HTTP 429 are retried. Delays double on each
//! retry starting from [`RetryPolicy::initial_delay`]. Every backoff sleep
//! (and every in-flight attempt) races a [`CancellationToken`], and an
//! optional overall deadline bounds the total time spent across attempts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{BenderError, Result};

use super::CompletionProvider;

/// Backoff parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on total time across all attempts and sleeps.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            deadline: None,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            deadline: config.deadline_secs.map(Duration::from_secs),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): `initial_delay * 2^retry`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.initial_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Source of backoff sleeps, swappable in tests.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Call `provider`, retrying rate-limit failures per `policy`.
///
/// Non-rate-limit errors surface immediately. When retries are exhausted the
/// last rate-limit error is returned. Cancellation yields
/// [`BenderError::Cancelled`]; an elapsed deadline yields
/// [`BenderError::DeadlineExceeded`].
pub async fn complete_with_retry(
    provider: &dyn CompletionProvider,
    prompt: &str,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
) -> Result<String> {
    let attempts = retry_loop(provider, prompt, policy, sleeper, cancel);
    match policy.deadline {
        Some(deadline) => tokio::time::timeout(deadline, attempts)
            .await
            .map_err(|_| BenderError::DeadlineExceeded(deadline))?,
        None => attempts.await,
    }
}

async fn retry_loop(
    provider: &dyn CompletionProvider,
    prompt: &str,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
) -> Result<String> {
    let mut retry = 0;
    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(BenderError::Cancelled),
            result = provider.complete(prompt) => result,
        };

        match result {
            Ok(text) => {
                if retry > 0 {
                    debug!(retries = retry, "Completion succeeded after retry");
                }
                return Ok(text);
            }
            Err(err) if err.is_rate_limited() && retry < policy.max_retries => {
                let delay = policy.delay_for(retry);
                retry += 1;
                warn!(
                    provider = provider.name(),
                    delay_ms = delay.as_millis() as u64,
                    attempt = retry,
                    max_retries = policy.max_retries,
                    "Rate limit reached, retrying"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(BenderError::Cancelled),
                    _ = sleeper.sleep(delay) => {}
                }
            }
            Err(err) => return Err(err),
        }
    }
}

/// Decorates a provider with [`complete_with_retry`].
pub struct RetryProvider {
    inner: Box<dyn CompletionProvider>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    shutdown: CancellationToken,
}

impl RetryProvider {
    pub fn new(inner: Box<dyn CompletionProvider>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            sleeper: Arc::new(TokioSleeper),
            shutdown: CancellationToken::new(),
        }
    }

    /// Replace the sleep source.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Use `token` as the process-wide shutdown signal. Cancelling it aborts
    /// every in-flight call and backoff.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Retry with a per-request token; the shutdown token still applies.
    pub async fn complete_cancellable(
        &self,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BenderError::Cancelled),
            result = complete_with_retry(
                self.inner.as_ref(),
                prompt,
                &self.policy,
                self.sleeper.as_ref(),
                &self.shutdown,
            ) => result,
        }
    }
}

#[async_trait]
impl CompletionProvider for RetryProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        complete_with_retry(
            self.inner.as_ref(),
            prompt,
            &self.policy,
            self.sleeper.as_ref(),
            &self.shutdown,
        )
        .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::{
        rate_limited, HangingProvider, RecordingSleeper, ScriptedProvider,
    };

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), ms(1000));
        assert_eq!(policy.delay_for(1), ms(2000));
        assert_eq!(policy.delay_for(2), ms(4000));
        // The multiplier saturates instead of overflowing.
        assert_eq!(policy.delay_for(200), ms(1000).saturating_mul(u32::MAX));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_retries: 5,
            initial_delay_ms: 250,
            deadline_secs: Some(9),
        });
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.initial_delay, ms(250));
        assert_eq!(policy.deadline, Some(Duration::from_secs(9)));
    }

    #[tokio::test]
    async fn test_rate_limited_twice_then_success() {
        let provider = ScriptedProvider::new(vec![
            rate_limited(),
            rate_limited(),
            Ok("Bold plan.".into()),
        ]);
        let sleeper = RecordingSleeper::default();

        let text = complete_with_retry(
            &provider,
            "p",
            &RetryPolicy::default(),
            &sleeper,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(text, "Bold plan.");
        assert_eq!(provider.calls(), 3);
        assert_eq!(sleeper.delays(), vec![ms(1000), ms(2000)]);
    }

    #[tokio::test]
    async fn test_non_rate_limit_failure_is_immediate() {
        let provider = ScriptedProvider::new(vec![Err(BenderError::Protocol {
            status: 500,
            message: "internal".into(),
        })]);
        let sleeper = RecordingSleeper::default();

        let err = complete_with_retry(
            &provider,
            "p",
            &RetryPolicy::default(),
            &sleeper,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BenderError::Protocol { status: 500, .. }));
        assert_eq!(provider.calls(), 1);
        assert!(sleeper.delays().is_empty());
    }

    #[tokio::test]
    async fn test_transport_and_malformed_are_not_retried() {
        for err in [
            BenderError::Transport("reset".into()),
            BenderError::MalformedResponse("no choices".into()),
        ] {
            let provider = ScriptedProvider::new(vec![Err(err)]);
            let sleeper = RecordingSleeper::default();
            let result = complete_with_retry(
                &provider,
                "p",
                &RetryPolicy::default(),
                &sleeper,
                &CancellationToken::new(),
            )
            .await;
            assert!(result.is_err());
            assert_eq!(provider.calls(), 1);
            assert!(sleeper.delays().is_empty());
        }
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_rate_limit_error() {
        let provider = ScriptedProvider::new((0..4).map(|_| rate_limited()).collect());
        let sleeper = RecordingSleeper::default();

        let err = complete_with_retry(
            &provider,
            "p",
            &RetryPolicy::default(),
            &sleeper,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(provider.calls(), 4);
        assert_eq!(sleeper.delays(), vec![ms(1000), ms(2000), ms(4000)]);
    }

    #[tokio::test]
    async fn test_zero_retries() {
        let provider = ScriptedProvider::new(vec![rate_limited()]);
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        };
        let err = complete_with_retry(&provider, "p", &policy, &sleeper, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
        assert!(sleeper.delays().is_empty());
    }

    /// Cancels the token as soon as a backoff starts, then never wakes.
    struct CancellingSleeper(CancellationToken);

    #[async_trait]
    impl Sleeper for CancellingSleeper {
        async fn sleep(&self, _duration: Duration) {
            self.0.cancel();
            std::future::pending::<()>().await;
        }
    }

    #[tokio::test]
    async fn test_cancellation_during_backoff_is_surfaced() {
        let provider = ScriptedProvider::new(vec![rate_limited(), Ok("never".into())]);
        let token = CancellationToken::new();
        let sleeper = CancellingSleeper(token.clone());

        let err = complete_with_retry(&provider, "p", &RetryPolicy::default(), &sleeper, &token)
            .await
            .unwrap_err();

        assert!(matches!(err, BenderError::Cancelled));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_during_attempt_is_surfaced() {
        let provider = HangingProvider::default();
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ms(50)).await;
            trigger.cancel();
        });

        let err = complete_with_retry(
            &provider,
            "p",
            &RetryPolicy::default(),
            &RecordingSleeper::default(),
            &token,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BenderError::Cancelled));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_call() {
        let provider = ScriptedProvider::new(vec![Ok("unused".into())]);
        let token = CancellationToken::new();
        token.cancel();
        let err = complete_with_retry(
            &provider,
            "p",
            &RetryPolicy::default(),
            &RecordingSleeper::default(),
            &token,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BenderError::Cancelled));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_deadline_bounds_total_wait() {
        let provider = ScriptedProvider::new((0..4).map(|_| rate_limited()).collect());
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_secs(5),
            deadline: Some(ms(50)),
        };

        let started = std::time::Instant::now();
        let err = complete_with_retry(
            &provider,
            "p",
            &policy,
            &TokioSleeper,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, BenderError::DeadlineExceeded(d) if d == ms(50)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_provider_decorates_inner() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let provider = RetryProvider::new(
            Box::new(ScriptedProvider::new(vec![rate_limited(), Ok("ok".into())])),
            RetryPolicy::default(),
        )
        .with_sleeper(sleeper.clone());

        assert_eq!(provider.name(), "scripted");
        assert_eq!(provider.model(), "scripted-model");
        assert_eq!(provider.complete("p").await.unwrap(), "ok");
        assert_eq!(sleeper.delays(), vec![ms(1000)]);
    }

    #[tokio::test]
    async fn test_retry_provider_request_cancellation() {
        let request = CancellationToken::new();
        let provider = RetryProvider::new(
            Box::new(ScriptedProvider::new(vec![rate_limited(), Ok("late".into())])),
            RetryPolicy::default(),
        )
        .with_sleeper(Arc::new(CancellingSleeper(request.clone())));

        let err = provider
            .complete_cancellable("p", &request)
            .await
            .unwrap_err();
        assert!(matches!(err, BenderError::Cancelled));
    }

    #[tokio::test]
    async fn test_retry_provider_shutdown_cancels() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let provider = RetryProvider::new(
            Box::new(ScriptedProvider::new(vec![Ok("unused".into())])),
            RetryPolicy::default(),
        )
        .with_shutdown(shutdown);
        assert!(matches!(
            provider.complete("p").await,
            Err(BenderError::Cancelled)
        ));
    }
}
