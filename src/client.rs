use crate::server::RESEARCH_PATH;
use crate::types::{CompanyProfile, ResearchRequest};
use crate::{ResearchError, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// The `ResearchClient` struct talks to a running research server.
pub struct ResearchClient {
    client: Client,
    endpoint: String,
}

impl ResearchClient {
    /// Creates a client for the server at `base_url`, e.g. `http://localhost:5001`.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), RESEARCH_PATH),
        })
    }

    /// Posts the request and returns the profile, or the server's error message.
    pub async fn research(&self, request: &ResearchRequest) -> Result<CompanyProfile> {
        debug!("POST {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Research failed")
                .to_string();
            return Err(ResearchError::ServerError(message));
        }

        CompanyProfile::from_value(body).ok_or_else(|| {
            ResearchError::ServerError("server returned an unexpected response".into())
        })
    }
}

/// Rewrites a few well-known failure messages into something a user can act on.
pub fn friendly_error(message: &str) -> String {
    let lower = message.to_lowercase();

    if lower.contains("api key") {
        "API key is missing or invalid. Set GEMINI_API_KEY (and optionally TAVILY_API_KEY) \
         in the server environment."
            .to_string()
    } else if lower.contains("error sending request")
        || lower.contains("connection refused")
        || lower.contains("failed to connect")
    {
        "Unable to connect to the research server. Make sure it is running and reachable."
            .to_string()
    } else if lower.contains("failed to fetch") {
        "The website could not be reached. Check the URL and try again.".to_string()
    } else {
        message.to_string()
    }
}
