use crate::config::LLMConfig;
use crate::http::HttpTransport;
use crate::prompt::ProfilePromptBuilder;
use crate::types::{CompanyProfile, ExternalData, ScrapedData};
use crate::{ResearchError, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

/// The `LLMProcessor` struct turns scraped and searched data into a company profile
/// by asking the hosted Gemini model for JSON.
pub struct LLMProcessor {
    /// The transport used for the model call.
    transport: Arc<dyn HttpTransport>,
    /// The endpoint, model and decoding parameters.
    config: LLMConfig,
}

impl LLMProcessor {
    pub fn new(transport: Arc<dyn HttpTransport>, config: LLMConfig) -> Self {
        Self { transport, config }
    }

    /// Synthesizes a company profile.
    ///
    /// # Arguments
    ///
    /// * `scraped` - Data extracted from the company website.
    /// * `external` - Search results, possibly empty.
    /// * `api_key` - The Gemini API key.
    ///
    /// # Returns
    ///
    /// The parsed profile. Fails without a key, on a non-success status, or when the
    /// model output is not a JSON object.
    #[instrument(skip_all, fields(company = %scraped.company_name))]
    pub async fn synthesize(
        &self,
        scraped: &ScrapedData,
        external: &ExternalData,
        api_key: Option<&str>,
    ) -> Result<CompanyProfile> {
        let api_key = api_key
            .ok_or_else(|| ResearchError::SynthesisError("Gemini API key not provided".into()))?;

        let prompt = ProfilePromptBuilder::new(scraped)
            .with_external(external)
            .build()?;

        let text = self.generate(&prompt, api_key).await?;
        parse_profile(&text)
    }

    /// Sends the prompt to the model and returns the text of the first candidate.
    pub async fn generate(&self, prompt: &str, api_key: &str) -> Result<String> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model,
            urlencoding::encode(api_key)
        );

        let body = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "topK": self.config.top_k,
                "topP": self.config.top_p,
                "maxOutputTokens": self.config.max_tokens,
            }
        });

        debug!(prompt_length = prompt.len(), model = %self.config.model, "Calling Gemini");

        let response = self
            .transport
            .post_json(&url, &body, self.config.timeout())
            .await
            .map_err(|e| ResearchError::SynthesisError(e.to_string()))?;

        if !response.is_success() {
            return Err(ResearchError::SynthesisError(format!(
                "Gemini API error: {}",
                response.status
            )));
        }

        let data: Value = serde_json::from_str(&response.body).map_err(|e| {
            ResearchError::SynthesisError(format!("invalid Gemini response: {}", e))
        })?;

        data.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ResearchError::SynthesisError("Gemini returned no content".into()))
    }
}

/// Removes a leading ```` ```json ```` (or bare ```` ``` ````) fence and a trailing ```` ``` ````.
pub fn strip_code_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parses the model output as a profile object.
pub fn parse_profile(text: &str) -> Result<CompanyProfile> {
    let value: Value = serde_json::from_str(strip_code_fences(text)).map_err(|e| {
        ResearchError::SynthesisError(format!("Failed to parse AI response as JSON: {}", e))
    })?;

    CompanyProfile::from_value(value).ok_or_else(|| {
        ResearchError::SynthesisError("AI response is not a JSON object".to_string())
    })
}
