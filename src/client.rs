//! Invocation context.
//!
//! [`NewsClient`] owns the one HTTP client and the one request gate used by
//! an invocation and hands them to the pipeline, the single-page fetch and
//! the feed scan. Settings are validated when it is built, so a bad pool,
//! thread or permit count never reaches a fetch loop.

use crate::api::{KudaGoApi, get_news};
use crate::config::Settings;
use crate::error::Result;
use crate::gate::{Gated, RequestGate};
use crate::models::News;
use crate::pipeline::{BulkFetcher, FetchReport};
use crate::ranking;
use chrono::NaiveDate;
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct NewsClient {
    settings: Settings,
    source: Arc<Gated<KudaGoApi>>,
}

impl NewsClient {
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let gate = Arc::new(RequestGate::new(settings.max_in_flight_requests)?);
        let api = KudaGoApi::from_settings(&settings)?;
        info!(
            endpoint = %api.endpoint(),
            pool_size = settings.pool_size,
            permits = gate.permits(),
            "News client ready"
        );
        Ok(Self {
            settings,
            source: Arc::new(Gated::new(api, gate)),
        })
    }

    pub fn gate(&self) -> &RequestGate {
        self.source.gate()
    }

    /// Bulk fetch `total` headlines into a new CSV file.
    pub async fn fetch_to_csv(&self, total: usize, destination: impl AsRef<Path>) -> Result<FetchReport> {
        BulkFetcher::new(
            Arc::clone(&self.source),
            self.settings.pool_size,
            self.settings.queue_capacity,
        )?
        .run(total, destination)
        .await
    }

    /// Newest `count` headlines.
    pub async fn latest(&self, count: u32) -> Result<Vec<News>> {
        get_news(self.source.as_ref(), count).await
    }

    /// Best rated headlines in `period` across the whole feed.
    pub async fn most_rated_among_all(
        &self,
        count: usize,
        period: &RangeInclusive<NaiveDate>,
    ) -> Result<Vec<News>> {
        ranking::most_rated_among_all(self.source.as_ref(), count, period).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NewsError;

    #[test]
    fn test_client_rejects_invalid_settings() {
        let settings = Settings {
            max_in_flight_requests: 0,
            ..Settings::default()
        };
        assert!(matches!(NewsClient::new(settings), Err(NewsError::Config(_))));
    }

    #[test]
    fn test_client_gate_uses_configured_permits() {
        let settings = Settings {
            max_in_flight_requests: 3,
            ..Settings::default()
        };
        let client = NewsClient::new(settings).unwrap();
        assert_eq!(client.gate().permits(), 3);
        assert_eq!(client.settings.pool_size, 16);
    }

    #[tokio::test]
    async fn test_fetch_to_csv_zero_makes_no_requests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nothing.csv");
        // Unroutable endpoint: any request would fail the run.
        let settings = Settings {
            api_url: "http://127.0.0.1:9/".to_string(),
            ..Settings::default()
        };
        let client = NewsClient::new(settings).unwrap();
        let report = client.fetch_to_csv(0, &path).await.unwrap();
        assert_eq!(report.written, 0);
        assert!(path.exists());
        assert!(client.latest(0).await.unwrap().is_empty());
    }
}
