//! # Memopad CLI
//!
//! The binary is intentionally thin: the CLI lives in `cli/`, while this file
//! only starts the runtime, invokes `cli::run()` and handles process termination.
//! Everything the CLI calls into (`memopad::api` and below) is UI agnostic; see
//! the library docs for the layering.

mod cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
