use crate::types::ScrapedData;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;
use tracing::instrument;
use url::Url;

/// Returned when the website URL cannot be parsed.
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

/// Free-mail and placeholder domains that never identify a business.
const EXCLUDED_EMAIL_DOMAINS: [&str; 4] = ["example.com", "test.com", "gmail.com", "yahoo.com"];

const SOCIAL_PLATFORMS: [(&str, &str); 5] = [
    ("linkedin", "linkedin.com"),
    ("twitter", "twitter.com"),
    ("facebook", "facebook.com"),
    ("instagram", "instagram.com"),
    ("youtube", "youtube.com"),
];

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("hardcoded regex pattern is valid")
});
static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("hardcoded regex pattern is valid")
});
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("hardcoded regex pattern is valid"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded regex pattern is valid"));
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").expect("hardcoded regex pattern is valid")
});
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b")
        .expect("hardcoded regex pattern is valid")
});
static PHONE_RES: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        // North American
        Regex::new(r"\+?1?[-.\s]?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}")
            .expect("hardcoded regex pattern is valid"),
        // International
        Regex::new(r"\+?[0-9]{1,3}[-.\s]?[0-9]{3,4}[-.\s]?[0-9]{3,4}[-.\s]?[0-9]{3,4}")
            .expect("hardcoded regex pattern is valid"),
    ]
});
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)href\s*=\s*["']([^"']+)["']"#).expect("hardcoded regex pattern is valid")
});

/// The `ContentScraper` struct turns a fetched landing page into [`ScrapedData`].
///
/// Everything is regex based: no DOM is built, malformed markup is handled on a
/// best-effort basis and HTML entities are left as they are.
#[derive(Debug, Clone)]
pub struct ContentScraper {
    /// Characters of page text kept for the model.
    content_limit: usize,
    /// Bytes of HTML looked at; anything beyond is dropped before extraction.
    html_limit: usize,
}

impl Default for ContentScraper {
    fn default() -> Self {
        Self::new(crate::CONTENT_CHAR_LIMIT, crate::MAX_HTML_BYTES)
    }
}

impl ContentScraper {
    pub fn new(content_limit: usize, html_limit: usize) -> Self {
        Self {
            content_limit,
            html_limit,
        }
    }

    /// Extracts the page text and contact heuristics from the given HTML string.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL the page was fetched from.
    /// * `html` - The raw HTML of the page.
    ///
    /// # Returns
    ///
    /// The `ScrapedData` for a single page. Extraction never fails.
    #[instrument(skip(self, html), fields(html_length = html.len()))]
    pub fn extract(&self, url: &str, html: &str) -> ScrapedData {
        let html = truncate_bytes(html, self.html_limit);
        let text = extract_text_from_html(html);

        ScrapedData {
            base_url: url.to_string(),
            company_name: extract_company_name(url, html),
            content: truncate_chars(&text, self.content_limit).to_string(),
            emails: extract_emails(&text),
            phone_numbers: extract_phone_numbers(&text),
            social_links: extract_social_links(html),
            scraped_pages_count: 1,
        }
    }
}

/// Strips `<script>`/`<style>` blocks and every remaining tag, then collapses whitespace.
pub fn extract_text_from_html(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, "");
    let text = STYLE_RE.replace_all(&text, "");
    let text = TAG_RE.replace_all(&text, " ");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Guesses the company name from the page `<title>`, falling back to the domain.
///
/// # Arguments
///
/// * `url` - The website URL.
/// * `html` - The raw HTML of the page.
///
/// # Returns
///
/// The first segment of the title before `" - "` or `" | "`, or the capitalized first
/// label of the host name. [`UNKNOWN_COMPANY`] when the URL does not parse.
pub fn extract_company_name(url: &str, html: &str) -> String {
    let host = match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return UNKNOWN_COMPANY.to_string(),
        },
        Err(_) => return UNKNOWN_COMPANY.to_string(),
    };

    if let Some(captures) = TITLE_RE.captures(html) {
        let title = captures[1].trim();
        let length = title.chars().count();
        if length > 0 && length < 100 {
            let name = title
                .split(" - ")
                .next()
                .unwrap_or(title)
                .split(" | ")
                .next()
                .unwrap_or(title)
                .trim();
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }

    let domain = host.strip_prefix("www.").unwrap_or(&host);
    capitalize(domain.split('.').next().unwrap_or(domain))
}

/// Finds e-mail addresses in plain text, dropping free-mail and placeholder domains.
/// Duplicates are removed, keeping first-seen order.
pub fn extract_emails(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();

    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|email| {
            let domain = email
                .rsplit_once('@')
                .map(|(_, domain)| domain.to_lowercase())
                .unwrap_or_default();
            !EXCLUDED_EMAIL_DOMAINS
                .iter()
                .any(|excluded| domain.contains(excluded))
        })
        .filter(|email| seen.insert(email.to_string()))
        .map(str::to_string)
        .collect()
}

/// Finds phone numbers with at least ten digits in plain text.
pub fn extract_phone_numbers(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut numbers = Vec::new();

    for pattern in PHONE_RES.iter() {
        for found in pattern.find_iter(text) {
            let number = found.as_str().trim();
            let digits = number
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '+')
                .count();
            if digits >= 10 && seen.insert(number.to_string()) {
                numbers.push(number.to_string());
            }
        }
    }

    numbers
}

/// Collects the first link to each known social platform from the raw HTML.
pub fn extract_social_links(html: &str) -> BTreeMap<String, String> {
    let mut links = BTreeMap::new();

    for captures in HREF_RE.captures_iter(html) {
        let href = &captures[1];
        let lower = href.to_lowercase();
        if let Some((platform, _)) = SOCIAL_PLATFORMS
            .iter()
            .find(|(_, domain)| lower.contains(domain))
        {
            links
                .entry(platform.to_string())
                .or_insert_with(|| href.to_string());
        }
    }

    links
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Returns at most `limit` characters of `text`.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Returns at most `limit` bytes of `text`, cut back to a char boundary.
fn truncate_bytes(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
