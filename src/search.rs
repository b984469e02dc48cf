use crate::config::SearchConfig;
use crate::http::HttpTransport;
use crate::types::{ExternalData, SearchHit};
use crate::{ResearchError, Result};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One of the fixed lookups run against the search API.
///
/// Each topic owns both its query template and the bucket its results land in, so
/// the two can never drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchTopic {
    Funding,
    Leadership,
    Business,
}

impl ResearchTopic {
    /// Topics in the order they are queried.
    pub const ALL: [ResearchTopic; 3] = [
        ResearchTopic::Funding,
        ResearchTopic::Leadership,
        ResearchTopic::Business,
    ];

    pub fn bucket(self) -> &'static str {
        match self {
            ResearchTopic::Funding => "funding_info",
            ResearchTopic::Leadership => "leadership_info",
            ResearchTopic::Business => "business_info",
        }
    }

    pub fn query(self, company_name: &str) -> String {
        match self {
            ResearchTopic::Funding => format!("{} company funding valuation", company_name),
            ResearchTopic::Leadership => {
                format!("{} founders executives leadership", company_name)
            }
            ResearchTopic::Business => {
                format!("{} products services business model", company_name)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// The `ExternalResearcher` struct gathers supplementary web-search results about a company.
pub struct ExternalResearcher {
    /// The transport used for the search API calls.
    transport: Arc<dyn HttpTransport>,
    /// The search API settings.
    config: SearchConfig,
}

impl ExternalResearcher {
    pub fn new(transport: Arc<dyn HttpTransport>, config: SearchConfig) -> Self {
        Self { transport, config }
    }

    /// Runs every [`ResearchTopic`] query one after another.
    ///
    /// # Arguments
    ///
    /// * `company_name` - The name substituted into each query.
    /// * `api_key` - The search API key.
    ///
    /// # Returns
    ///
    /// The results grouped by topic. A failed query leaves its bucket empty; a missing
    /// key yields an error marker without any outbound call.
    #[instrument(skip(self, api_key))]
    pub async fn research(&self, company_name: &str, api_key: Option<&str>) -> ExternalData {
        let Some(api_key) = api_key else {
            return ExternalData::unavailable("Tavily API key not provided");
        };

        let mut data = ExternalData::default();
        for topic in ResearchTopic::ALL {
            let query = topic.query(company_name);
            let hits = match self.search(&query, api_key).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!("Tavily search failed for query '{}': {}", query, e);
                    Vec::new()
                }
            };
            data.buckets.insert(topic.bucket().to_string(), hits);
        }

        info!(
            hits = data.buckets.values().map(Vec::len).sum::<usize>(),
            "External research completed"
        );
        data
    }

    /// Performs a single search and returns at most `max_results` hits.
    pub async fn search(&self, query: &str, api_key: &str) -> Result<Vec<SearchHit>> {
        debug!("Searching for '{}'", query);

        let body = json!({
            "api_key": api_key,
            "query": query,
            "search_depth": self.config.search_depth,
            "include_answer": true,
            "include_raw_content": false,
            "max_results": self.config.max_results,
        });

        let response = self
            .transport
            .post_json(&self.config.endpoint, &body, self.config.timeout())
            .await?;

        if !response.is_success() {
            return Err(ResearchError::SearchError(format!(
                "search API returned {}",
                response.status
            )));
        }

        let mut parsed: SearchResponse = serde_json::from_str(&response.body)?;
        parsed.results.truncate(self.config.max_results);
        Ok(parsed.results)
    }
}
