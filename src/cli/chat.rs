//! Interactive chat loop.

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, warn};

use bender::config::Config;
use bender::error::BenderError;
use bender::session::Outcome;

use super::common::build_session;
use super::render::{print_catalog, print_reply, print_transcript};

/// Run the REPL until `exit`, EOF, or interrupt.
pub(crate) async fn cmd_chat(config: &Config) -> Result<()> {
    let (mut session, shutdown) = build_session(config)?;
    let mut editor = DefaultEditor::new().with_context(|| "Failed to initialize line editor")?;

    print_catalog(session.catalog(), false);
    println!();
    println!("Enter a prompt number, a key, or your own question. Type 'exit' to quit.");

    loop {
        // rustyline blocks the thread while waiting for input.
        let line = tokio::task::block_in_place(|| editor.readline("You: "));

        let line = match line {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).with_context(|| "Failed to read input"),
        };
        remember(&mut editor, &line);

        match session.ask(&line).await {
            Ok(Outcome::Exit) => break,
            Ok(Outcome::Reply(reply)) => {
                print_reply(&reply);
                println!();
            }
            Err(BenderError::Cancelled) => {
                println!("Request cancelled.");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Prompt failed");
                super::print_error(&anyhow::Error::new(e));
                if shutdown.is_cancelled() {
                    break;
                }
            }
        }
    }

    if session.transcript().turns() > 0 {
        println!();
        print_transcript(session.transcript());
    }
    println!("Goodbye.");
    Ok(())
}

/// Add a non-blank line to the editor history. Returns whether it was added.
fn remember(editor: &mut DefaultEditor, line: &str) -> bool {
    if line.trim().is_empty() {
        return false;
    }
    match editor.add_history_entry(line) {
        Ok(added) => added,
        Err(e) => {
            debug!(error = %e, "Failed to record line in history");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustyline::history::History;

    #[test]
    fn test_remember_skips_blank_lines() {
        let mut editor = DefaultEditor::new().unwrap();
        assert!(!remember(&mut editor, "   "));
        assert!(remember(&mut editor, "Plan an escape"));
        assert_eq!(editor.history().len(), 1);
    }
}
