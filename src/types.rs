use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

fn default_max_pages() -> u32 {
    5
}

fn default_include_external() -> bool {
    true
}

/// JavaScript-style truthiness, used where callers send loosely typed JSON.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn lenient_website_url<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        other if is_truthy(&other) => Some(other.to_string()),
        _ => None,
    })
}

fn lenient_max_pages<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let pages = match &value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(pages
        .and_then(|p| u32::try_from(p).ok())
        .unwrap_or_else(default_max_pages))
}

fn lenient_include_external<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(is_truthy(&Value::deserialize(deserializer)?))
}

/// The body accepted by the research endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    #[serde(default, deserialize_with = "lenient_website_url")]
    pub website_url: Option<String>,
    /// Accepted for compatibility; only the landing page is ever fetched. Values that
    /// are not a page count fall back to the default.
    #[serde(default = "default_max_pages", deserialize_with = "lenient_max_pages")]
    pub max_pages: u32,
    /// Absent means `true`; an explicit value is read by truthiness, so `null` is `false`.
    #[serde(
        default = "default_include_external",
        deserialize_with = "lenient_include_external"
    )]
    pub include_external: bool,
}

impl ResearchRequest {
    pub fn new(website_url: impl Into<String>) -> Self {
        Self {
            website_url: Some(website_url.into()),
            max_pages: default_max_pages(),
            include_external: default_include_external(),
        }
    }

    pub fn with_external(mut self, include_external: bool) -> Self {
        self.include_external = include_external;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }
}

/// What was learned from the company's own website.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedData {
    pub base_url: String,
    pub company_name: String,
    /// Page text, truncated to [`crate::CONTENT_CHAR_LIMIT`] characters.
    pub content: String,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub social_links: BTreeMap<String, String>,
    pub scraped_pages_count: u32,
}

/// A single result returned by the search API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// Search results grouped by research topic, or an error marker when research could not run.
///
/// Serializes as a flat JSON object: `{"funding_info": [...], ...}`, `{"error": "..."}`,
/// or `{}` when research was skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalData {
    #[serde(flatten)]
    pub buckets: BTreeMap<String, Vec<SearchHit>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExternalData {
    /// Research was not attempted.
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            buckets: BTreeMap::new(),
            error: Some(reason.into()),
        }
    }

    pub fn hits(&self, bucket: &str) -> &[SearchHit] {
        self.buckets.get(bucket).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Sections every finalized profile carries, even when the model left them out.
pub const PROFILE_SECTIONS: [&str; 6] = [
    "summary",
    "company_details",
    "people",
    "offerings",
    "contact_info",
    "reference_links",
];

/// The structured company profile produced by the model.
///
/// The shape is dictated by the prompt, not enforced locally, so the record stays a
/// JSON object and only a handful of fields are ever written here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyProfile(pub Map<String, Value>);

impl CompanyProfile {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    /// Returns a string field, ignoring nulls and blanks.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn company_name(&self) -> Option<&str> {
        self.str_field("company_name")
    }

    /// Stamps the locally known fields onto the model output.
    ///
    /// `website_url` and `last_updated` are always overwritten; `confidence_score`
    /// defaults to `Medium` when missing or falsy (null, `""`, `false`, `0`).
    pub fn finalize(&mut self, website_url: &str, today: chrono::NaiveDate) {
        self.0
            .insert("website_url".into(), Value::String(website_url.to_string()));
        self.0.insert(
            "last_updated".into(),
            Value::String(today.format("%Y-%m-%d").to_string()),
        );

        if !self.0.get("confidence_score").is_some_and(is_truthy) {
            self.0
                .insert("confidence_score".into(), Value::String("Medium".into()));
        }

        for section in PROFILE_SECTIONS {
            if self.get(section).is_none() {
                self.0.insert(section.into(), Value::Object(Map::new()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let request: ResearchRequest =
            serde_json::from_str(r#"{"websiteUrl": "https://acme.io"}"#).unwrap();
        assert_eq!(request.website_url.as_deref(), Some("https://acme.io"));
        assert_eq!(request.max_pages, 5);
        assert!(request.include_external);
    }

    #[test]
    fn test_request_accepts_loosely_typed_fields() {
        let parse = |body: &str| serde_json::from_str::<ResearchRequest>(body).unwrap();

        for max_pages in ["null", "-1", "\"abc\"", "2.5", "{}"] {
            let request =
                parse(&format!(r#"{{"websiteUrl": "https://acme.io", "maxPages": {}}}"#, max_pages));
            assert_eq!(request.max_pages, 5, "maxPages = {}", max_pages);
        }
        assert_eq!(parse(r#"{"websiteUrl": "https://acme.io", "maxPages": "3"}"#).max_pages, 3);

        assert!(!parse(r#"{"websiteUrl": "https://acme.io", "includeExternal": null}"#).include_external);
        assert!(!parse(r#"{"websiteUrl": "https://acme.io", "includeExternal": 0}"#).include_external);
        assert!(!parse(r#"{"websiteUrl": "https://acme.io", "includeExternal": ""}"#).include_external);
        assert!(parse(r#"{"websiteUrl": "https://acme.io", "includeExternal": "no"}"#).include_external);

        assert_eq!(parse(r#"{"websiteUrl": null}"#).website_url, None);
        assert_eq!(parse(r#"{"websiteUrl": ""}"#).website_url.as_deref(), Some(""));
        assert_eq!(parse(r#"{"websiteUrl": 42}"#).website_url.as_deref(), Some("42"));
    }

    #[test]
    fn test_external_data_shapes() {
        assert_eq!(serde_json::to_value(ExternalData::skipped()).unwrap(), json!({}));
        assert_eq!(
            serde_json::to_value(ExternalData::unavailable("no key")).unwrap(),
            json!({"error": "no key"})
        );

        let mut data = ExternalData::default();
        data.buckets.insert(
            "funding_info".into(),
            vec![SearchHit {
                title: "Series A".into(),
                url: "https://news.example/acme".into(),
                content: "Acme raised".into(),
                score: None,
            }],
        );
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["funding_info"][0]["title"], "Series A");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_finalize_overwrites_and_fills() {
        let mut profile = CompanyProfile::from_value(json!({
            "company_name": "Acme",
            "website_url": "https://wrong.example",
            "last_updated": "1999-01-01",
            "confidence_score": null,
            "people": {"founders": ["Ada"]}
        }))
        .unwrap();

        profile.finalize("https://acme.io", NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());

        assert_eq!(profile.str_field("website_url"), Some("https://acme.io"));
        assert_eq!(profile.str_field("last_updated"), Some("2024-03-09"));
        assert_eq!(profile.str_field("confidence_score"), Some("Medium"));
        assert_eq!(profile.get("summary"), Some(&json!({})));
        assert_eq!(profile.get("people"), Some(&json!({"founders": ["Ada"]})));
    }

    #[test]
    fn test_finalize_replaces_falsy_confidence() {
        for confidence in [json!(""), json!(false), json!(0)] {
            let mut profile =
                CompanyProfile::from_value(json!({"confidence_score": confidence})).unwrap();
            profile.finalize("https://acme.io", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
            assert_eq!(profile.str_field("confidence_score"), Some("Medium"));
        }
    }

    #[test]
    fn test_finalize_keeps_model_confidence() {
        let mut profile = CompanyProfile::from_value(json!({"confidence_score": "High"})).unwrap();
        profile.finalize("https://acme.io", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(profile.str_field("confidence_score"), Some("High"));
    }

    #[test]
    fn test_non_object_is_not_a_profile() {
        assert!(CompanyProfile::from_value(json!(["a"])).is_none());
    }
}
