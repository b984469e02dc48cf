use crate::{ResearchError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// The parts of an HTTP response the pipeline looks at.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// The declared `Content-Length`, if any.
    pub content_length: Option<u64>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound HTTP used by the pipeline. Every call is awaited on its own; a `timeout`
/// cancels the in-flight request when it elapses.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse>;

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse>;
}

/// The `ReqwestTransport` struct sends requests with a browser-like header set.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a new `ReqwestTransport` with the given user agent.
    ///
    /// # Returns
    ///
    /// A `Result` containing the transport, or an error if the client could not be created.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .build()
            .map_err(ResearchError::RequestError)?;

        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let content_length = response.content_length();
        debug!("Response status: {}", status);

        let body = response.text().await?;
        Ok(HttpResponse {
            status,
            content_length,
            body,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse> {
        debug!("GET {}", url);

        let mut request = self
            .client
            .get(url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Cache-Control", "no-cache");
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        Self::read(request.send().await?).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse> {
        let mut request = self.client.post(url).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        Self::read(request.send().await?).await
    }
}
