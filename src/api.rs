//! Paginated access to the KudaGo news listing endpoint.
//!
//! The module uses a trait-based design so the pipeline can run against any
//! upstream:
//! - [`PageSource`]: core trait, "give me page `n` of size `m`"
//! - [`KudaGoApi`]: the HTTP implementation backed by `reqwest`
//! - [`crate::gate::Gated`]: decorator that bounds in-flight requests
//!
//! Fetchers never retry. A failed page is reported as
//! [`NewsError::Fetch`] carrying the page number and the cause.

use crate::config::Settings;
use crate::error::{FetchCause, NewsError, Result};
use crate::models::{News, NewsResponse, Page};
use crate::utils::truncate_for_log;
use reqwest::Client;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use url::Url;

/// Fields requested from the upstream, in the order it documents them.
pub const NEWS_FIELDS: &str =
    "id,title,place,description,site_url,favorites_count,comments_count,publication_date";

/// Source of paginated news.
///
/// Implementors issue exactly one upstream call per invocation. The returned
/// future is `Send` so fetches can run on spawned worker tasks.
pub trait PageSource {
    /// Fetch the 1-based `page` with `page_size` items.
    fn fetch_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Page>> + Send;
}

/// HTTP client for the listing endpoint.
#[derive(Debug, Clone)]
pub struct KudaGoApi {
    client: Client,
    endpoint: Url,
    location: String,
}

impl KudaGoApi {
    pub fn new(endpoint: Url, location: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NewsError::Config(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            location: location.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.endpoint()?,
            settings.location.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn query(&self, page: u32, page_size: u32) -> [(&'static str, String); 7] {
        [
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
            ("text_format", "text".to_string()),
            ("expand", "place".to_string()),
            ("order_by", "-publication_date".to_string()),
            ("location", self.location.clone()),
            ("fields", NEWS_FIELDS.to_string()),
        ]
    }
}

impl PageSource for KudaGoApi {
    #[instrument(level = "debug", skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Page> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&self.query(page, page_size)[..])
            .send()
            .await
            .map_err(|e| NewsError::fetch(page, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(page, %status, "Upstream returned non-success status");
            return Err(NewsError::fetch(page, FetchCause::Status(status)));
        }

        let body = response.text().await.map_err(|e| NewsError::fetch(page, e))?;
        let decoded: NewsResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(
                page,
                error = %e,
                body_preview = %truncate_for_log(&body, 300),
                "Failed to decode page"
            );
            NewsError::fetch(page, e)
        })?;

        let fetched = Page::new(decoded.results, page_size as usize);
        if fetched.is_empty() {
            debug!(page, "Upstream returned an empty page");
        }
        debug!(
            page,
            page_size,
            items = fetched.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(fetched)
    }
}

/// Newest `count` headlines: page 1 with `page_size = count`.
#[instrument(level = "info", skip(source))]
pub async fn get_news<S: PageSource>(source: &S, count: u32) -> Result<Vec<News>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    Ok(source.fetch_page(1, count).await?.items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    const ONE_ITEM: &str = r#"{"count": 1, "results": [{
        "id": 1, "title": "t", "place": null, "description": "d",
        "site_url": "https://kudago.com/1/", "favorites_count": 2,
        "comments_count": 0, "publication_date": 1710507332
    }]}"#;

    /// Serve one HTTP response and hand back the raw request head.
    async fn serve_once(status: &'static str, body: &'static str) -> (Url, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&head).into_owned());
        });
        let url = Url::parse(&format!("http://{addr}/public-api/v1.4/news/")).unwrap();
        (url, rx)
    }

    fn api(url: Url) -> KudaGoApi {
        KudaGoApi::new(url, "kzn", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_page_sends_listing_query() {
        let (url, head) = serve_once("200 OK", ONE_ITEM).await;
        let page = api(url).fetch_page(3, 100).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.requested, 100);
        assert!(page.is_last());

        let head = head.await.unwrap();
        let request_line = head.lines().next().unwrap();
        assert!(request_line.starts_with("GET /public-api/v1.4/news/?"));
        for expected in [
            "page=3",
            "page_size=100",
            "text_format=text",
            "expand=place",
            "order_by=-publication_date",
            "location=kzn",
            "fields=id%2Ctitle%2Cplace%2Cdescription%2Csite_url%2Cfavorites_count%2Ccomments_count%2Cpublication_date",
        ] {
            assert!(request_line.contains(expected), "{expected} missing in {request_line}");
        }
    }

    #[tokio::test]
    async fn test_fetch_page_non_success_status() {
        let (url, _head) = serve_once("503 Service Unavailable", "{}").await;
        let err = api(url).fetch_page(5, 100).await.unwrap_err();
        assert_eq!(err.page(), Some(5));
        assert!(matches!(
            err,
            NewsError::Fetch { cause: FetchCause::Status(s), .. } if s.as_u16() == 503
        ));
    }

    #[tokio::test]
    async fn test_fetch_page_malformed_body() {
        let (url, _head) = serve_once("200 OK", r#"{"results": [{"id": "x"}]}"#).await;
        let err = api(url).fetch_page(1, 10).await.unwrap_err();
        assert!(matches!(err, NewsError::Fetch { page: 1, cause: FetchCause::Decode(_) }));
    }

    #[tokio::test]
    async fn test_fetch_page_transport_failure() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = Url::parse(&format!("http://{addr}/")).unwrap();
        let err = api(url).fetch_page(2, 100).await.unwrap_err();
        assert!(matches!(err, NewsError::Fetch { page: 2, cause: FetchCause::Transport(_) }));
    }

    #[tokio::test]
    async fn test_get_news_uses_first_page() {
        let (url, head) = serve_once("200 OK", ONE_ITEM).await;
        let news = get_news(&api(url), 25).await.unwrap();
        assert_eq!(news.len(), 1);
        let head = head.await.unwrap();
        assert!(head.contains("page=1&page_size=25"));
    }
}
