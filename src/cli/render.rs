//! Plain-text output helpers.

use bender::error::BenderError;
use bender::prompts::PromptCatalog;
use bender::session::{Reply, ResponseSource, Transcript};

/// Column width for wrapped responses.
pub(crate) const WRAP_WIDTH: usize = 80;

/// Greedy word wrap. Words longer than `width` get a line of their own;
/// blank input yields no lines.
pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub(crate) fn print_catalog(catalog: &PromptCatalog, show_keys: bool) {
    println!("Available prompts:");
    for (i, entry) in catalog.entries().iter().enumerate() {
        if show_keys {
            println!("{}. [{}] {}", i + 1, entry.key, entry.text);
        } else {
            println!("{}. {}", i + 1, entry.text);
        }
    }
}

pub(crate) fn print_reply(reply: &Reply) {
    println!("Prompt: {}", reply.prompt);
    let label = match reply.source {
        ResponseSource::Cache => "Bender's Response (cached):",
        ResponseSource::Remote => "Bender's Response:",
    };
    println!("{label}");
    for line in wrap(&reply.response, WRAP_WIDTH) {
        println!("{line}");
    }
}

pub(crate) fn print_transcript(transcript: &Transcript) {
    println!("Conversation:");
    print!("{transcript}");
}

/// Print an error and, when one applies, a hint for fixing it.
pub(crate) fn print_error(err: &anyhow::Error) {
    eprintln!("Error: {err:#}");
    if let Some(hint) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<BenderError>())
        .and_then(BenderError::suggestion)
    {
        eprintln!("{hint}");
    }
}
