//! Runtime settings for one invocation.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! command-line flags (see [`crate::cli::Cli::apply_overrides`]). Validation
//! happens once, before any runtime, client or file is created.

use crate::error::{NewsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};
use url::Url;

/// Production listing endpoint.
pub const DEFAULT_API_URL: &str = "https://kudago.com/public-api/v1.4/news/";

/// City filter sent with every request.
pub const DEFAULT_LOCATION: &str = "kzn";

/// Items per page requested by bulk workers.
pub const PAGE_SIZE: u32 = 100;

/// Items per page when scanning the whole feed for top-rated headlines.
pub const SCAN_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Listing endpoint.
    pub api_url: String,
    /// `location` query parameter.
    pub location: String,
    /// Number of logical workers in a bulk fetch.
    pub pool_size: usize,
    /// Worker threads of the async runtime.
    pub thread_count: usize,
    /// Permits of the request gate.
    pub max_in_flight_requests: usize,
    /// Bound of the hand-off queue between workers and the sink.
    pub queue_capacity: usize,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            pool_size: 16,
            thread_count: 8,
            max_in_flight_requests: 5,
            queue_capacity: 16,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Load settings from a YAML file. Missing keys keep their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| NewsError::Config(format!("cannot read {}: {e}", path.display())))?;
        let settings = Self::from_yaml_str(&raw)?;
        debug!(?settings, "Loaded settings file");
        Ok(settings)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| NewsError::Config(format!("invalid settings: {e}")))
    }

    /// Reject zero-sized pools, gates and queues and malformed endpoints.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("pool_size", self.pool_size),
            ("thread_count", self.thread_count),
            ("max_in_flight_requests", self.max_in_flight_requests),
            ("queue_capacity", self.queue_capacity),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(NewsError::Config(format!("{name} must be positive")));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(NewsError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        self.endpoint()?;
        Ok(())
    }

    pub fn endpoint(&self) -> Result<Url> {
        Url::parse(&self.api_url)
            .map_err(|e| NewsError::Config(format!("invalid api_url {:?}: {e}", self.api_url)))
    }

    /// Multi-threaded runtime sized by `thread_count`.
    pub fn build_runtime(&self) -> Result<tokio::runtime::Runtime> {
        self.validate()?;
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.thread_count)
            .thread_name("news-worker")
            .enable_all()
            .build()
            .map_err(|e| NewsError::Config(format!("cannot start runtime: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.pool_size, 16);
        assert_eq!(settings.thread_count, 8);
        assert_eq!(settings.max_in_flight_requests, 5);
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_values_are_rejected() {
        for field in ["pool", "threads", "permits", "queue"] {
            let mut settings = Settings::default();
            match field {
                "pool" => settings.pool_size = 0,
                "threads" => settings.thread_count = 0,
                "permits" => settings.max_in_flight_requests = 0,
                _ => settings.queue_capacity = 0,
            }
            assert!(matches!(settings.validate(), Err(NewsError::Config(_))), "{field}");
        }
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let settings = Settings {
            api_url: "not a url".to_string(),
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(NewsError::Config(_))));
    }

    #[test]
    fn test_yaml_partial_keeps_defaults() {
        let settings = Settings::from_yaml_str("pool_size: 4\nlocation: msk\n").unwrap();
        assert_eq!(settings.pool_size, 4);
        assert_eq!(settings.location, "msk");
        assert_eq!(settings.thread_count, 8);
    }

    #[test]
    fn test_yaml_file_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "max_in_flight_requests: 2\n").unwrap();
        let settings = Settings::from_yaml_file(&path).unwrap();
        assert_eq!(settings.max_in_flight_requests, 2);

        assert!(Settings::from_yaml_file(dir.path().join("missing.yaml")).is_err());
    }

    #[test]
    fn test_build_runtime_rejects_zero_threads() {
        let settings = Settings {
            thread_count: 0,
            ..Settings::default()
        };
        assert!(settings.build_runtime().is_err());
    }
}
