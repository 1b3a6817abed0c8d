//! One-shot prompt handler.

use anyhow::Result;

use bender::config::Config;
use bender::session::{screen_input, Outcome};

use super::common::build_session;
use super::render::{print_catalog, print_reply, print_transcript};

/// Answer a single input, then print the transcript.
pub(crate) async fn cmd_ask(config: &Config, input: &str) -> Result<()> {
    // Blank input and `exit` need neither credentials nor the cache.
    if let Some(Outcome::Exit) = screen_input(input)? {
        println!("Goodbye.");
        return Ok(());
    }

    let (mut session, _shutdown) = build_session(config)?;

    print_catalog(session.catalog(), false);
    println!();

    match session.ask(input).await? {
        Outcome::Exit => println!("Goodbye."),
        Outcome::Reply(reply) => {
            print_reply(&reply);
            println!();
            print_transcript(session.transcript());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bender::error::BenderError;

    fn without_key() -> Config {
        let config = Config::default();
        assert!(config.completion.api_key.is_none());
        config
    }

    #[tokio::test]
    async fn test_blank_input_is_a_validation_error_without_credentials() {
        for input in ["", "   "] {
            let err = cmd_ask(&without_key(), input).await.unwrap_err();
            assert!(
                matches!(err.downcast_ref::<BenderError>(), Some(BenderError::Validation(_))),
                "unexpected error: {err:#}"
            );
        }
    }

    #[tokio::test]
    async fn test_exit_ends_cleanly_without_credentials() {
        cmd_ask(&without_key(), "exit").await.unwrap();
        cmd_ask(&without_key(), " EXIT ").await.unwrap();
    }

    #[tokio::test]
    async fn test_real_prompt_still_requires_credentials() {
        let err = cmd_ask(&without_key(), "Why not?").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BenderError>(),
            Some(BenderError::Config(_))
        ));
    }
}
