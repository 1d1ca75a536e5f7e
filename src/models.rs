//! Data models for KudaGo news headlines.
//!
//! This module defines the core data structures used throughout the application:
//! - [`News`]: one headline as decoded from the listing endpoint
//! - [`Place`]: the optional location a headline refers to
//! - [`NewsResponse`]: the JSON envelope of one listing page
//! - [`Page`]: a decoded page plus the size that was asked for
//!
//! Field names match the upstream JSON (`site_url`, `favorites_count`, ...),
//! so no renames are needed. Unknown fields are ignored by serde.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Offset of the calendar used for publication dates (UTC+3).
pub const PUBLICATION_OFFSET_SECS: i32 = 3 * 3600;

/// Format of the timestamp column in CSV output.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The UTC+3 offset publication dates are rendered in.
pub fn publication_offset() -> FixedOffset {
    FixedOffset::east_opt(PUBLICATION_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Popularity score of a headline.
///
/// `1 / (1 + e^(-(favorites / (comments + 1))))`. The `+ 1` keeps headlines
/// without comments finite. Counters are promoted to `f64` before dividing.
pub fn rating(favorites_count: u64, comments_count: u64) -> f64 {
    let ratio = favorites_count as f64 / (comments_count as f64 + 1.0);
    1.0 / (1.0 + (-ratio).exp())
}

/// A location attached to a headline (`expand=place`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Place {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// A single news headline.
///
/// Immutable once decoded. The rating is derived from the two counters on
/// demand and is never part of the wire format.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct News {
    /// Identity, unique across the feed.
    pub id: u64,
    pub title: String,
    pub place: Option<Place>,
    pub description: String,
    pub site_url: String,
    pub favorites_count: u64,
    pub comments_count: u64,
    /// Publication instant in epoch seconds.
    pub publication_date: i64,
}

impl News {
    pub fn rating(&self) -> f64 {
        rating(self.favorites_count, self.comments_count)
    }

    /// Publication instant in UTC+3, `None` if the timestamp is out of range.
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::<Utc>::from_timestamp(self.publication_date, 0)
            .map(|utc| utc.with_timezone(&publication_offset()))
    }

    /// Calendar date of publication in UTC+3.
    pub fn published_on(&self) -> Option<NaiveDate> {
        self.published_at().map(|dt| dt.date_naive())
    }

    pub fn published_local(&self) -> Option<NaiveDateTime> {
        self.published_at().map(|dt| dt.naive_local())
    }

    /// Render this headline as one CSV line (without the terminator).
    ///
    /// `id,"title","placeId","description","siteUrl",favorites,comments,timestamp,rating`
    pub fn to_csv_line(&self) -> String {
        let place_id = self
            .place
            .as_ref()
            .map(|p| p.id.to_string())
            .unwrap_or_else(|| "null".to_string());
        let timestamp = self
            .published_local()
            .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|| self.publication_date.to_string());

        format!(
            "{},\"{}\",\"{}\",\"{}\",\"{}\",{},{},{},{}",
            self.id,
            escape_quotes(&self.title),
            place_id,
            escape_quotes(&self.description),
            escape_quotes(&self.site_url),
            self.favorites_count,
            self.comments_count,
            timestamp,
            self.rating()
        )
    }
}

/// Double every `"` so the value can sit inside a quoted CSV field.
pub fn escape_quotes(s: &str) -> String {
    s.replace('"', "\"\"")
}

/// JSON envelope returned by the listing endpoint.
#[derive(Debug, Deserialize)]
pub struct NewsResponse {
    pub results: Vec<News>,
}

/// One fetched page together with the page size that was requested.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<News>,
    pub requested: usize,
}

impl Page {
    pub fn new(items: Vec<News>, requested: usize) -> Self {
        Self { items, requested }
    }

    /// A page shorter than requested is the last one in the feed.
    pub fn is_last(&self) -> bool {
        self.items.len() < self.requested
    }

    /// Number of items actually returned.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn sample_news(id: u64, favorites: u64, comments: u64, date: i64) -> News {
    News {
        id,
        title: String::new(),
        place: None,
        description: String::new(),
        site_url: String::new(),
        favorites_count: favorites,
        comments_count: comments,
        publication_date: date,
    }
}
