use crate::types::{ExternalData, ScrapedData};
use crate::Result;

/// The JSON shape the model is asked to produce.
const PROFILE_SCHEMA: &str = r#"{
  "company_name": "string",
  "website_url": "string",
  "linkedin_url": "string or null",
  "confidence_score": "High/Medium/Low",
  "summary": {
    "about": "comprehensive company description",
    "tagline": "company tagline or mission statement"
  },
  "company_details": {
    "industry": "primary industry",
    "founded_year": "number or null",
    "company_type": "Public/Private/Startup/etc",
    "headquarters": "city, country/state"
  },
  "people": {
    "founders": ["list of founder names"],
    "key_executives": ["list of key executives with titles"]
  },
  "offerings": {
    "service_details": ["list of main products/services"],
    "pricing_model": "description of pricing approach"
  },
  "valuation_and_revenue": {
    "value": "string representation of value",
    "metric_type": "valuation/revenue/funding",
    "source": "source of information",
    "source_url": "url of source or null",
    "date_of_metric": "YYYY-MM-DD or null",
    "explanation": "brief explanation of the metric"
  },
  "contact_info": {
    "phone": "phone number or null",
    "email": "email address or null",
    "contact_page_url": "contact page URL or null"
  },
  "reference_links": {
    "crunchbase_url": "crunchbase profile URL or null",
    "wikipedia_url": "wikipedia page URL or null",
    "other": ["array of other relevant URLs"]
  },
  "last_updated": "YYYY-MM-DD"
}"#;

const INSTRUCTIONS: &str = "INSTRUCTIONS:
1. Extract and synthesize information from both scraped and external data
2. If information is missing or unclear, use null values
3. Provide a confidence score based on data quality and completeness
4. Ensure all extracted information is factual and verifiable
5. Use today's date for last_updated field
6. Return ONLY valid JSON, no additional text or explanations";

/// The `ProfilePromptBuilder` struct builds the synthesis prompt from the gathered data.
pub struct ProfilePromptBuilder<'a> {
    /// What was scraped from the company website.
    scraped: &'a ScrapedData,
    /// Search results, or an empty object when research was skipped.
    external: Option<&'a ExternalData>,
}

impl<'a> ProfilePromptBuilder<'a> {
    pub fn new(scraped: &'a ScrapedData) -> Self {
        Self {
            scraped,
            external: None,
        }
    }

    /// Adds the external research results to the prompt.
    pub fn with_external(mut self, external: &'a ExternalData) -> Self {
        self.external = Some(external);
        self
    }

    /// Builds the prompt string, embedding both data blobs as pretty JSON.
    ///
    /// # Returns
    ///
    /// The prompt, or a serialization error.
    pub fn build(&self) -> Result<String> {
        let skipped = ExternalData::skipped();
        let scraped = serde_json::to_string_pretty(self.scraped)?;
        let external = serde_json::to_string_pretty(self.external.unwrap_or(&skipped))?;

        Ok(format!(
            "
You are an expert business analyst. Analyze the following company data and create a comprehensive company profile in JSON format.

SCRAPED WEBSITE DATA:
{scraped}

EXTERNAL RESEARCH DATA:
{external}

Based on this information, create a structured company profile with the following JSON schema:

{PROFILE_SCHEMA}

{INSTRUCTIONS}

JSON Response:"
        ))
    }
}
