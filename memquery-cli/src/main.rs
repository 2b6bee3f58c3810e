//! memquery command-line tool
//!
//! Loads a JSON array of records, runs one store command and prints the
//! result as JSON.
//!
//! Usage:
//!   memquery --records movies.json search --filter '{"name": {"$includes": "alien", "caseSensitive": false}}'
//!   memquery --records movies.json update 3 '{"isOnline": true}'

use anyhow::Result;
use clap::Parser;
use memquery_cli::{Args, run};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let output = run(&args)?;
    println!("{output}");
    Ok(())
}
