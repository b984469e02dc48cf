use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

pub mod client;
pub mod config;
pub mod extract;
pub mod handler;
pub mod http;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod prompt;
pub mod report;
pub mod search;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use config::{ApiKeys, ResearchConfig};
pub use types::{CompanyProfile, ExternalData, ResearchRequest, ScrapedData, SearchHit};

/// The `ResearchError` enum represents the errors that can occur while researching a company.
#[derive(Error, Debug)]
pub enum ResearchError {
    /// The incoming request was malformed or missing required fields.
    #[error("{0}")]
    InvalidRequest(String),
    /// A required API key is not configured.
    #[error("{0}")]
    MissingApiKey(String),
    /// Represents an error that occurs during an HTTP request.
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    /// The target website could not be reached.
    #[error("Failed to fetch website: {0}")]
    FetchError(String),
    /// The target website answered with a non-success status.
    #[error("Website returned error: {0}")]
    UpstreamStatus(u16),
    /// The target website declared a body larger than we are willing to process.
    #[error("Website content too large to process")]
    ContentTooLarge,
    /// Represents an error that occurs during LLM synthesis.
    #[error("AI synthesis failed: {0}")]
    SynthesisError(String),
    /// The research server answered with an error.
    #[error("{0}")]
    ServerError(String),
    /// Represents an error that occurs during a search operation.
    #[error("Search failed: {0}")]
    SearchError(String),
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResearchError {
    /// The HTTP status the request handler answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResearchError::InvalidRequest(_) | ResearchError::MissingApiKey(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A type alias for `Result` with the `ResearchError` error type.
pub type Result<T> = std::result::Result<T, ResearchError>;

// Constants

/// The default timeout for fetching the target website.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// The default timeout for a single search API call.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
/// The default timeout for the model call.
pub const DEFAULT_LLM_TIMEOUT: Duration = Duration::from_secs(60);
/// Number of characters of page text handed to the model.
pub const CONTENT_CHAR_LIMIT: usize = 5000;
/// HTML beyond this many bytes is dropped before extraction.
pub const MAX_HTML_BYTES: usize = 1_000_000;
/// Declared bodies above this size are rejected outright.
pub const MAX_CONTENT_LENGTH: u64 = 5_000_000;
/// Results kept per search query.
pub const DEFAULT_MAX_SEARCH_RESULTS: usize = 3;
