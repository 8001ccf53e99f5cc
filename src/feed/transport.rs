use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use log::debug;
use reqwest::header::{ACCEPT, CACHE_CONTROL};

use crate::error_handling::types::FeedError;

/// Raw body of one feed connection.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, FeedError>>;

/// Opens connections to the event feed. One call, one connection; the
/// subscription calls it again after every drop.
#[async_trait]
pub trait EventTransport: Send + Sync + 'static {
    async fn connect(&self) -> Result<ByteStream, FeedError>;
}

/// SSE over HTTP against `{backend}/api/stream/events`.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(backend_url: &str) -> Self {
        // no overall timeout: the response body is the long-lived feed
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            url: format!("{}/api/stream/events", backend_url.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventTransport for HttpTransport {
    async fn connect(&self) -> Result<ByteStream, FeedError> {
        debug!("Opening event feed at {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| FeedError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FeedError::UnexpectedStatus(response.status().as_u16()));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| FeedError::StreamInterrupted(e.to_string()))
            })
            .boxed())
    }
}
