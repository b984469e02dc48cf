use crate::config::{ApiKeys, ResearchConfig, GEMINI_KEY_VAR};
use crate::extract::ContentScraper;
use crate::http::HttpTransport;
use crate::llm::LLMProcessor;
use crate::progress::{ProgressObserver, ProgressUpdate, Stage};
use crate::search::ExternalResearcher;
use crate::types::{CompanyProfile, ExternalData, ResearchRequest, ScrapedData};
use crate::{ResearchError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

/// The `ResearchPipeline` runs fetch → extract → search → synthesis → finalize for one URL.
///
/// Each step is awaited before the next one starts and nothing is shared between runs
/// apart from the read-only configuration and transport.
pub struct ResearchPipeline {
    transport: Arc<dyn HttpTransport>,
    scraper: ContentScraper,
    researcher: ExternalResearcher,
    llm: LLMProcessor,
    keys: ApiKeys,
    fetch_timeout: Duration,
}

impl ResearchPipeline {
    pub fn new(config: &ResearchConfig, transport: Arc<dyn HttpTransport>, keys: ApiKeys) -> Self {
        Self {
            scraper: ContentScraper::default(),
            researcher: ExternalResearcher::new(transport.clone(), config.search.clone()),
            llm: LLMProcessor::new(transport.clone(), config.llm_config.clone()),
            transport,
            keys,
            fetch_timeout: config.fetch_timeout(),
        }
    }

    /// Researches the company behind `request.website_url`.
    ///
    /// # Arguments
    ///
    /// * `request` - The validated request.
    /// * `progress` - Receives an update as each step completes.
    ///
    /// # Returns
    ///
    /// The finalized profile, or the first error that stopped the run. Search failures
    /// never stop a run.
    #[instrument(skip_all, fields(url = request.website_url.as_deref().unwrap_or_default()))]
    pub async fn run(
        &self,
        request: &ResearchRequest,
        progress: &dyn ProgressObserver,
    ) -> Result<CompanyProfile> {
        let website_url = validate_url(request.website_url.as_deref())?;

        let gemini_key = self.keys.gemini.as_deref().ok_or_else(|| {
            ResearchError::MissingApiKey(format!(
                "Gemini API key not configured. Please add {} to your environment variables.",
                GEMINI_KEY_VAR
            ))
        })?;

        info!(
            gemini = self.keys.gemini.is_some(),
            tavily = self.keys.tavily.is_some(),
            max_pages = request.max_pages,
            "Processing research request"
        );

        notify(progress, Stage::WebsiteAnalysis, "Connecting to website...", 15);
        let html = self.fetch_site(&website_url).await?;
        notify(progress, Stage::WebsiteAnalysis, "Content downloaded successfully", 25);

        notify(progress, Stage::ContentProcessing, "Extracting text content...", 35);
        let scraped = self.scraper.extract(&website_url, &html);
        notify(progress, Stage::ContentProcessing, "Parsing company information...", 40);
        info!(
            company_name = %scraped.company_name,
            content_length = scraped.content.len(),
            emails_found = scraped.emails.len(),
            "Scraped data extracted"
        );

        notify(progress, Stage::ExternalResearch, "Initiating external data gathering...", 50);
        let external = self.external_research(request, &scraped, progress).await;

        notify(progress, Stage::AiAnalysis, "Preparing data for AI synthesis...", 70);
        notify(progress, Stage::AiAnalysis, "Sending to Gemini AI...", 75);
        let mut profile = self
            .llm
            .synthesize(&scraped, &external, Some(gemini_key))
            .await?;
        notify(progress, Stage::AiAnalysis, "AI analysis completed", 85);

        notify(progress, Stage::ReportGeneration, "Finalizing company profile...", 90);
        profile.finalize(&website_url, chrono::Utc::now().date_naive());
        notify(progress, Stage::ReportGeneration, "Research completed successfully", 100);

        Ok(profile)
    }

    /// Downloads the landing page, enforcing the timeout and size limits.
    async fn fetch_site(&self, url: &str) -> Result<String> {
        let response = self
            .transport
            .get(url, Some(self.fetch_timeout))
            .await
            .map_err(|e| match e {
                fetch @ ResearchError::FetchError(_) => fetch,
                other => ResearchError::FetchError(other.to_string()),
            })?;

        if !response.is_success() {
            return Err(ResearchError::UpstreamStatus(response.status));
        }
        if response
            .content_length
            .is_some_and(|len| len > crate::MAX_CONTENT_LENGTH)
        {
            return Err(ResearchError::ContentTooLarge);
        }

        Ok(response.body)
    }

    async fn external_research(
        &self,
        request: &ResearchRequest,
        scraped: &ScrapedData,
        progress: &dyn ProgressObserver,
    ) -> ExternalData {
        match (request.include_external, self.keys.tavily.as_deref()) {
            (true, Some(key)) => {
                notify(progress, Stage::ExternalResearch, "Searching external sources...", 55);
                let data = self.researcher.research(&scraped.company_name, Some(key)).await;
                notify(progress, Stage::ExternalResearch, "External research completed", 65);
                data
            }
            (true, None) => {
                warn!("External research skipped - no Tavily API key");
                notify(progress, Stage::ExternalResearch, "Skipped - no Tavily API key", 65);
                ExternalData::skipped()
            }
            (false, _) => {
                notify(progress, Stage::ExternalResearch, "Skipped - not requested", 65);
                ExternalData::skipped()
            }
        }
    }
}

/// Checks that the request names an absolute URL with a host.
pub fn validate_url(website_url: Option<&str>) -> Result<String> {
    let website_url = website_url
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ResearchError::InvalidRequest("Website URL is required".into()))?;

    match Url::parse(website_url) {
        Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => {
            Ok(website_url.to_string())
        }
        _ => Err(ResearchError::InvalidRequest("Invalid website URL".into())),
    }
}

fn notify(progress: &dyn ProgressObserver, stage: Stage, message: &str, percent: u8) {
    progress.update(&ProgressUpdate {
        stage,
        message: message.to_string(),
        percent,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedTransport;
    use crate::http::HttpResponse;
    use crate::progress::RecordedProgress;
    use serde_json::json;

    const PAGE: &str = "<html><head><title>Acme - Home</title></head>\
                        <body><p>Rockets for everyone. sales@acme.io</p></body></html>";

    fn gemini_reply(profile: serde_json::Value) -> String {
        json!({"candidates": [{"content": {"parts": [{"text": profile.to_string()}]}}]}).to_string()
    }

    fn search_reply() -> String {
        json!({"results": [{"title": "hit", "url": "https://news.example", "content": "c"}]})
            .to_string()
    }

    fn pipeline(transport: Arc<ScriptedTransport>, keys: ApiKeys) -> ResearchPipeline {
        ResearchPipeline::new(&ResearchConfig::default(), transport, keys)
    }

    fn both_keys() -> ApiKeys {
        ApiKeys::new(Some("gm".into()), Some("tv".into()))
    }

    #[tokio::test]
    async fn test_run_without_research() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(200, PAGE)
                .reply(200, gemini_reply(json!({"company_name": "Acme Rockets"}))),
        );
        let progress = RecordedProgress::default();

        let profile = pipeline(transport.clone(), both_keys())
            .run(
                &ResearchRequest::new("https://www.acme.io").with_external(false),
                &progress,
            )
            .await
            .unwrap();

        assert_eq!(profile.str_field("website_url"), Some("https://www.acme.io"));
        assert_eq!(
            profile.str_field("last_updated"),
            Some(chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string().as_str())
        );
        assert_eq!(profile.str_field("confidence_score"), Some("Medium"));

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, "GET");
        assert_eq!(calls[0].timeout, Some(Duration::from_secs(10)));
        assert_eq!(calls[1].timeout, Some(Duration::from_secs(60)));

        let prompt = calls[1].body.as_ref().unwrap()["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(prompt.contains("\"company_name\": \"Acme\""));
        assert!(prompt.contains("sales@acme.io"));

        let percents: Vec<u8> = progress.updates().iter().map(|u| u.percent).collect();
        assert_eq!(percents.first(), Some(&15));
        assert_eq!(percents.last(), Some(&100));
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_run_with_research_searches_three_times() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(200, PAGE)
                .reply(200, search_reply())
                .reply(500, "down")
                .reply(200, search_reply())
                .reply(200, gemini_reply(json!({"company_name": "Acme"}))),
        );

        let profile = pipeline(transport.clone(), both_keys())
            .run(&ResearchRequest::new("https://acme.io"), &RecordedProgress::default())
            .await
            .unwrap();

        assert_eq!(profile.company_name(), Some("Acme"));
        let calls = transport.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[1].body.as_ref().unwrap()["query"], "Acme company funding valuation");
        for search in &calls[1..4] {
            assert_eq!(search.timeout, Some(Duration::from_secs(15)));
        }
        assert_eq!(calls[4].timeout, Some(Duration::from_secs(60)));
        let prompt = calls[4].body.as_ref().unwrap()["contents"][0]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(prompt.contains("\"leadership_info\": []"));
    }

    #[tokio::test]
    async fn test_run_skips_research_without_search_key() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .reply(200, PAGE)
                .reply(200, gemini_reply(json!({}))),
        );

        pipeline(transport.clone(), ApiKeys::new(Some("gm".into()), None))
            .run(&ResearchRequest::new("https://acme.io"), &RecordedProgress::default())
            .await
            .unwrap();

        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_url_makes_no_calls() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut request = ResearchRequest::new("");
        request.website_url = None;

        let err = pipeline(transport.clone(), both_keys())
            .run(&request, &RecordedProgress::default())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Website URL is required");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_model_key() {
        let transport = Arc::new(ScriptedTransport::new());

        let err = pipeline(transport.clone(), ApiKeys::new(None, Some("tv".into())))
            .run(&ResearchRequest::new("https://acme.io"), &RecordedProgress::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ResearchError::MissingApiKey(_)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_site_errors() {
        let transport = Arc::new(ScriptedTransport::new().reply(404, "missing"));
        let err = pipeline(transport, both_keys())
            .run(&ResearchRequest::new("https://acme.io"), &RecordedProgress::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Website returned error: 404");

        let transport = Arc::new(ScriptedTransport::new().fail("timed out"));
        let err = pipeline(transport, both_keys())
            .run(&ResearchRequest::new("https://acme.io"), &RecordedProgress::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch website: timed out");

        let transport = Arc::new(ScriptedTransport::new().reply_with(HttpResponse {
            status: 200,
            content_length: Some(crate::MAX_CONTENT_LENGTH + 1),
            body: String::new(),
        }));
        let err = pipeline(transport, both_keys())
            .run(&ResearchRequest::new("https://acme.io"), &RecordedProgress::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResearchError::ContentTooLarge));
    }

    #[test]
    fn test_validate_url() {
        assert_eq!(validate_url(Some(" https://acme.io ")).unwrap(), "https://acme.io");
        assert!(matches!(validate_url(None), Err(ResearchError::InvalidRequest(_))));
        assert!(validate_url(Some("   ")).is_err());
        assert_eq!(
            validate_url(Some("acme.io")).unwrap_err().to_string(),
            "Invalid website URL"
        );
    }
}
