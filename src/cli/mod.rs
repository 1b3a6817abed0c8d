//! Command-line interface: argument parsing and dispatch.

mod ask;
mod chat;
mod common;
mod history;
mod prompts;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use bender::config::Config;
use bender::logging;

pub(crate) use render::print_error;

/// Ask Ostap Bender, the Great Strategist, for advice.
#[derive(Parser, Debug)]
#[command(name = "bender", version, about)]
pub(crate) struct Cli {
    /// Ask a single question: a catalog number, a catalog key, or free text.
    #[arg(short, long, value_name = "INPUT")]
    pub prompt: Option<String>,

    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Interactive conversation until `exit`.
    Chat,
    /// List the prompt catalog.
    Prompts {
        /// Only show prompts containing this keyword.
        #[arg(long, value_name = "KEYWORD")]
        search: Option<String>,
        /// Show catalog keys next to each prompt.
        #[arg(long)]
        keys: bool,
    },
    /// Show recorded responses from the conversation log.
    History {
        /// Maximum number of records to show, newest last.
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Only show records for this exact prompt.
        #[arg(long)]
        prompt: Option<String>,
    },
}

/// Parse arguments and run the selected command.
pub(crate) async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::load().with_context(|| "Failed to load configuration")?;

    match cli.command {
        Some(Commands::Chat) => chat::cmd_chat(&config).await,
        Some(Commands::Prompts { search, keys }) => {
            prompts::cmd_prompts(&config, search.as_deref(), keys)
        }
        Some(Commands::History { limit, prompt }) => {
            history::cmd_history(&config, limit, prompt.as_deref())
        }
        None => match cli.prompt {
            Some(input) => ask::cmd_ask(&config, &input).await,
            None => chat::cmd_chat(&config).await,
        },
    }
}
