//! Conversation orchestration: resolve → cache check → remote call → record.
//!
//! A [`ConversationSession`] owns its transcript and shares the catalog,
//! response cache, and provider with every other session in the process.
//!
//! ```text
//! Idle → Resolving → CacheCheck ─┬─ CacheHit ───┬─→ Recorded
//!                                └─ RemoteCall ─┘
//! ```
//!
//! Blank input is rejected before any transition; `exit` ends the session
//! without touching the cache or transcript. A failed remote call leaves the
//! transcript untouched.

pub mod transcript;

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cache::{Lookup, ResponseCache, SaveOutcome};
use crate::error::{BenderError, Result};
use crate::prompts::{resolve, PromptCatalog};
use crate::providers::CompletionProvider;

pub use transcript::{Role, Transcript, TranscriptEntry, SYSTEM_PREAMBLE};

/// Where a session is in handling the current input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Resolving,
    CacheCheck,
    CacheHit,
    RemoteCall,
    Recorded,
}

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Remote,
}

/// A completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Canonical prompt after resolution.
    pub prompt: String,
    pub response: String,
    pub source: ResponseSource,
}

/// Result of [`ConversationSession::ask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The user asked to leave.
    Exit,
    Reply(Reply),
}

/// True for the `exit` sentinel, ignoring case and surrounding whitespace.
pub fn is_exit_command(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case("exit")
}

/// Checks made before any state transition: blank input is rejected and the
/// `exit` sentinel yields [`Outcome::Exit`]. `None` means the input should be
/// answered.
pub fn screen_input(input: &str) -> Result<Option<Outcome>> {
    if input.trim().is_empty() {
        return Err(BenderError::Validation(
            "Prompt cannot be null or empty.".into(),
        ));
    }
    if is_exit_command(input) {
        return Ok(Some(Outcome::Exit));
    }
    Ok(None)
}

/// One user's conversation.
pub struct ConversationSession {
    id: Uuid,
    catalog: Arc<PromptCatalog>,
    cache: Arc<ResponseCache>,
    provider: Arc<dyn CompletionProvider>,
    transcript: Transcript,
    state: SessionState,
}

impl ConversationSession {
    pub fn new(
        catalog: Arc<PromptCatalog>,
        cache: Arc<ResponseCache>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            catalog,
            cache,
            provider,
            transcript: Transcript::new(),
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn catalog(&self) -> &PromptCatalog {
        &self.catalog
    }

    /// Handle one line of user input.
    #[instrument(skip_all, fields(session = %self.id))]
    pub async fn ask(&mut self, input: &str) -> Result<Outcome> {
        if let Some(outcome) = screen_input(input)? {
            info!("Session ended by user");
            return Ok(outcome);
        }

        match self.exchange(input).await {
            Ok(reply) => {
                self.transcript.push(Role::User, reply.prompt.as_str());
                self.transcript.push(Role::Assistant, reply.response.as_str());
                self.state = SessionState::Recorded;
                Ok(Outcome::Reply(reply))
            }
            Err(e) => {
                self.state = SessionState::Idle;
                Err(e)
            }
        }
    }

    async fn exchange(&mut self, input: &str) -> Result<Reply> {
        self.state = SessionState::Resolving;
        let prompt = resolve(input, &self.catalog);
        debug!(prompt_len = prompt.len(), resolved = prompt != input, "Resolved prompt");

        self.state = SessionState::CacheCheck;
        if let Lookup::Found(response) = self.cache.get_response(&prompt) {
            self.state = SessionState::CacheHit;
            info!(prompt = %prompt, "Serving response from cache");
            return Ok(Reply {
                prompt,
                response,
                source: ResponseSource::Cache,
            });
        }

        self.state = SessionState::RemoteCall;
        info!(
            prompt = %prompt,
            provider = self.provider.name(),
            model = self.provider.model(),
            "Requesting completion"
        );
        let response = self.provider.complete(&prompt).await?;

        let saved = Arc::clone(&self.cache)
            .save_response_async(prompt.clone(), response.clone())
            .await?;
        if saved == SaveOutcome::NotPersisted {
            warn!("Response delivered without being cached");
        }

        Ok(Reply {
            prompt,
            response,
            source: ResponseSource::Remote,
        })
    }
}
