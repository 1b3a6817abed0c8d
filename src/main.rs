//! `bender` binary.

mod cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        cli::print_error(&e);
        std::process::exit(1);
    }
}
