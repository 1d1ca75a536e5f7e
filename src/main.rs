//! # KudaGo News
//!
//! Fetches news headlines from the KudaGo public API, rates them by
//! popularity and exports them as CSV or prints them as text cards.
//!
//! ## Usage
//!
//! ```sh
//! kudago_news fetch --count 13134 --output news.csv
//! kudago_news top --count 50 --from 2024-01-01 --to 2024-09-15 --output top.csv
//! ```
//!
//! ## Architecture
//!
//! Bulk fetches run through a pipeline:
//! 1. **Planning**: split the requested count into strided page ranges
//! 2. **Fetching**: workers pull pages through a shared request gate
//! 3. **Writing**: a single sink task appends every batch to the CSV file
//!
//! The runtime is sized by `thread_count`; the number of workers and the
//! number of concurrent requests are configured independently.

use clap::Parser;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod card;
mod cli;
mod client;
mod config;
mod error;
mod gate;
mod models;
mod outputs;
mod pipeline;
mod ranking;
mod utils;

use card::Card;
use cli::{Cli, Command, period};
use client::NewsClient;
use models::News;
use outputs::csv::save_news;

fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = args.settings()?;
    let runtime = settings.build_runtime()?;
    let client = NewsClient::new(settings)?;

    let start_time = Instant::now();
    let outcome = runtime.block_on(run(&client, args.command));
    let elapsed = start_time.elapsed();

    match &outcome {
        Ok(()) => info!(?elapsed, millis = elapsed.as_millis() as u64, "Execution complete"),
        Err(e) => error!(?elapsed, error = %e, "Execution failed"),
    }
    outcome.map_err(Into::into)
}

async fn run(client: &NewsClient, command: Command) -> error::Result<()> {
    match command {
        Command::Fetch { count, output } => {
            let report = client.fetch_to_csv(count, &output).await?;
            info!(
                path = %output.display(),
                requested = report.requested,
                written = report.written,
                workers = report.workers,
                peak_in_flight = client.gate().peak_in_flight(),
                "Bulk fetch written"
            );
        }
        Command::Latest { count, output } => {
            let news = client.latest(count).await?;
            emit(&news, output.as_deref()).await?;
        }
        Command::Top {
            count,
            from,
            to,
            latest,
            output,
        } => {
            let period = period(from, to)?;
            let top = match latest {
                Some(latest) => {
                    let recent = client.latest(latest).await?;
                    ranking::most_rated(&recent, count, &period)
                }
                None => client.most_rated_among_all(count, &period).await?,
            };
            info!(count = top.len(), %from, %to, "Selected most rated headlines");
            emit(&top, output.as_deref()).await?;
        }
    }
    Ok(())
}

/// Save to CSV when a path is given, otherwise print cards to stdout.
async fn emit(news: &[News], output: Option<&std::path::Path>) -> error::Result<()> {
    match output {
        Some(path) => save_news(path, news).await,
        None => {
            for item in news {
                println!("{}", Card::from(item));
            }
            Ok(())
        }
    }
}
