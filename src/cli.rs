//! Command-line interface definitions.
//!
//! Global options tune the fetcher and may also come from environment
//! variables or a YAML settings file; flags win over the file.

use crate::config::Settings;
use crate::error::{NewsError, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::ops::RangeInclusive;
use std::path::PathBuf;

/// Fetch, rate and export KudaGo news.
///
/// # Examples
///
/// ```sh
/// # Bulk fetch 2 500 headlines into a CSV file
/// kudago_news fetch --count 2500 --output news.csv
///
/// # Print the ten best rated headlines of September 2024
/// kudago_news top --count 10 --from 2024-09-01 --to 2024-09-30
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, env = "KUDAGO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listing endpoint
    #[arg(long, env = "KUDAGO_API_URL")]
    pub api_url: Option<String>,

    /// City filter sent with every request
    #[arg(long, env = "KUDAGO_LOCATION")]
    pub location: Option<String>,

    /// Number of logical workers for bulk fetches
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// Worker threads of the async runtime
    #[arg(long)]
    pub threads: Option<usize>,

    /// Maximum concurrent upstream requests
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Fetch `count` headlines concurrently into a new CSV file
    Fetch {
        #[arg(short = 'n', long)]
        count: usize,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Fetch the newest headlines in one request
    Latest {
        #[arg(short = 'n', long, default_value_t = 100)]
        count: u32,
        /// Save as CSV instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Best rated headlines published within a date range (UTC+3, inclusive)
    Top {
        #[arg(short = 'n', long)]
        count: usize,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        /// Rank only the newest N headlines instead of scanning the feed
        #[arg(long)]
        latest: Option<u32>,
        /// Save as CSV instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Settings from the file (or defaults) with command-line overrides applied.
    pub fn settings(&self) -> Result<Settings> {
        let base = match &self.config {
            Some(path) => Settings::from_yaml_file(path)?,
            None => Settings::default(),
        };
        Ok(self.apply_overrides(base))
    }

    pub fn apply_overrides(&self, mut settings: Settings) -> Settings {
        if let Some(url) = &self.api_url {
            settings.api_url = url.clone();
        }
        if let Some(location) = &self.location {
            settings.location = location.clone();
        }
        if let Some(pool_size) = self.pool_size {
            settings.pool_size = pool_size;
        }
        if let Some(threads) = self.threads {
            settings.thread_count = threads;
        }
        if let Some(max_in_flight) = self.max_in_flight {
            settings.max_in_flight_requests = max_in_flight;
        }
        settings
    }
}

/// Inclusive date window, rejecting reversed bounds.
pub fn period(from: NaiveDate, to: NaiveDate) -> Result<RangeInclusive<NaiveDate>> {
    if from > to {
        return Err(NewsError::Config(format!(
            "period start {from} is after its end {to}"
        )));
    }
    Ok(from..=to)
}
