//! Remote Content Fetcher
//!
//! Downloads images and files referenced by URL into memory so they can be
//! attached to outgoing messages. One attempt per call, bounded by a fixed
//! timeout; no retries.

use crate::error::FetchError;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::time::Duration;

/// Content type assumed when the server does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A downloaded payload.
#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// HTTP(S) downloader shared by all request handlers.
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl ContentFetcher {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    /// Fetch `url`, failing on network errors, timeouts and non-2xx statuses.
    pub async fn fetch(&self, url: &str) -> Result<FetchedContent, FetchError> {
        tracing::info!("Fetching remote content from: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = content_type_or_default(response.headers().get(CONTENT_TYPE));
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.request_error(url, e))?
            .to_vec();

        tracing::debug!("Fetched {} bytes ({}) from {}", bytes.len(), content_type, url);
        Ok(FetchedContent {
            bytes,
            content_type,
        })
    }

    fn request_error(&self, url: &str, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

fn content_type_or_default(value: Option<&HeaderValue>) -> String {
    value
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

/// Last non-empty path segment of `url`, used as an attachment name.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .rev()
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> ContentFetcher {
        ContentFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_returns_bytes_and_content_type() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/logo.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body([0x89u8, b'P', b'N', b'G'])
            .create_async()
            .await;

        let content = fetcher()
            .fetch(&format!("{}/logo.png", server.url()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(content.content_type, "image/png");
        assert_eq!(content.bytes, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing.pdf")
            .with_status(404)
            .create_async()
            .await;

        let err = fetcher()
            .fetch(&format!("{}/missing.pdf", server.url()))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_single_attempt_on_server_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let result = fetcher().fetch(&format!("{}/flaky", server.url())).await;

        assert!(result.is_err());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        // Port 9 on localhost is almost never bound
        let err = fetcher().fetch("http://127.0.0.1:9/file").await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Request { .. } | FetchError::Timeout { .. }
        ));
    }

    #[test]
    fn test_content_type_defaults() {
        assert_eq!(content_type_or_default(None), DEFAULT_CONTENT_TYPE);
        assert_eq!(
            content_type_or_default(Some(&HeaderValue::from_static(""))),
            DEFAULT_CONTENT_TYPE
        );
        assert_eq!(
            content_type_or_default(Some(&HeaderValue::from_static("application/pdf"))),
            "application/pdf"
        );
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://cdn.example.com/img/cat.jpg?size=large"),
            Some("cat.jpg".to_string())
        );
        assert_eq!(
            file_name_from_url("https://cdn.example.com/img/"),
            Some("img".to_string())
        );
        assert_eq!(file_name_from_url("https://cdn.example.com"), None);
        assert_eq!(file_name_from_url("not a url"), None);
    }
}
