use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the Gemini API key.
pub const GEMINI_KEY_VAR: &str = "GEMINI_API_KEY";
/// Environment variable holding the Tavily API key.
pub const TAVILY_KEY_VAR: &str = "TAVILY_API_KEY";

/// The `ResearchConfig` struct holds the configuration settings for the research agent.
/// It includes settings for the site fetch, the search API, the LLM and the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Timeout in seconds for fetching the target website.
    pub fetch_timeout_secs: u64,
    /// The user agent string to be used in HTTP requests.
    pub user_agent: String,
    /// The search API settings.
    pub search: SearchConfig,
    /// The configuration settings for the Language Model (LLM).
    pub llm_config: LLMConfig,
    /// Where the HTTP server listens.
    pub server: ServerConfig,
}

/// The `SearchConfig` struct holds the settings for the external search API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// The search endpoint URL.
    pub endpoint: String,
    /// Search depth requested from the API.
    pub search_depth: String,
    /// Maximum results kept per query.
    pub max_results: usize,
    /// Per-query timeout in seconds; `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

/// The `LLMConfig` struct holds the configuration settings for the Language Model (LLM).
/// It includes the endpoint, model name and decoding parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Base URL of the models API; the model name and method are appended.
    pub endpoint: String,
    /// The model used for synthesis.
    pub model: String,
    /// The temperature setting for the LLM, controlling the randomness of the output.
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    /// The maximum number of tokens allowed in the LLM response.
    pub max_tokens: u32,
    /// Timeout in seconds; `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ResearchConfig {
    /// Provides default values for the `ResearchConfig` struct.
    ///
    /// # Returns
    ///
    /// A `ResearchConfig` instance with default settings.
    fn default() -> Self {
        Self {
            fetch_timeout_secs: crate::DEFAULT_FETCH_TIMEOUT.as_secs(),
            user_agent: String::from("Mozilla/5.0 (compatible; AIResearchAgent/1.0)"),
            search: SearchConfig {
                endpoint: String::from("https://api.tavily.com/search"),
                search_depth: String::from("basic"),
                max_results: crate::DEFAULT_MAX_SEARCH_RESULTS,
                timeout_secs: Some(crate::DEFAULT_SEARCH_TIMEOUT.as_secs()),
            },
            llm_config: LLMConfig {
                endpoint: String::from("https://generativelanguage.googleapis.com/v1beta/models"),
                model: String::from("gemini-1.5-flash-latest"),
                temperature: 0.1,
                top_k: 1,
                top_p: 1.0,
                max_tokens: 2048,
                timeout_secs: Some(crate::DEFAULT_LLM_TIMEOUT.as_secs()),
            },
            server: ServerConfig {
                host: String::from("0.0.0.0"),
                port: 5001,
            },
        }
    }
}

impl ResearchConfig {
    /// Loads the configuration by layering built-in defaults, an optional config file
    /// and `PROSPECTOR__SECTION__KEY` environment variables.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the config file, with or without extension. A missing file is not an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().into_owned();

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&ResearchConfig::default())?)
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("PROSPECTOR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl LLMConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// API keys for the two hosted services. Blank values count as absent.
#[derive(Clone, Default)]
pub struct ApiKeys {
    pub gemini: Option<String>,
    pub tavily: Option<String>,
}

impl ApiKeys {
    pub fn new(gemini: Option<String>, tavily: Option<String>) -> Self {
        Self {
            gemini: gemini.filter(|k| !k.trim().is_empty()),
            tavily: tavily.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Reads `GEMINI_API_KEY` and `TAVILY_API_KEY` from the process environment.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var(GEMINI_KEY_VAR).ok(),
            std::env::var(TAVILY_KEY_VAR).ok(),
        )
    }
}

// Keys must never end up in logs.
impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("gemini", &self.gemini.is_some())
            .field("tavily", &self.tavily.is_some())
            .finish()
    }
}
