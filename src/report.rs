use crate::types::CompanyProfile;
use crate::{ResearchError, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// The panes of a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Tab {
    Summary,
    Details,
    People,
    Offerings,
    Financials,
    Contact,
    Links,
}

impl Tab {
    pub const ALL: [Tab; 7] = [
        Tab::Summary,
        Tab::Details,
        Tab::People,
        Tab::Offerings,
        Tab::Financials,
        Tab::Contact,
        Tab::Links,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Summary => "Summary",
            Tab::Details => "Company Details",
            Tab::People => "Key People",
            Tab::Offerings => "Products & Services",
            Tab::Financials => "Financial Information",
            Tab::Contact => "Contact Information",
            Tab::Links => "Reference Links",
        }
    }
}

/// Renders a profile as plain-text tabs.
pub struct ReportView<'a> {
    profile: &'a CompanyProfile,
}

impl<'a> ReportView<'a> {
    pub fn new(profile: &'a CompanyProfile) -> Self {
        Self { profile }
    }

    pub fn header(&self) -> String {
        let profile = self.profile;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== {} ===",
            profile.company_name().unwrap_or("Unknown Company").to_uppercase()
        );
        let _ = writeln!(out, "Website: {}", profile.str_field("website_url").unwrap_or("N/A"));
        let _ = writeln!(
            out,
            "Confidence Score: {}",
            profile.str_field("confidence_score").unwrap_or("N/A")
        );
        let _ = write!(
            out,
            "Last Updated: {}",
            profile.str_field("last_updated").unwrap_or("N/A")
        );
        out
    }

    /// Renders a single tab. Empty fields are left out.
    pub fn render_tab(&self, tab: Tab) -> String {
        let mut lines = Vec::new();
        match tab {
            Tab::Summary => {
                let summary = self.section("summary");
                push_field(&mut lines, "About", summary.get("about"));
                push_field(&mut lines, "Tagline", summary.get("tagline"));
            }
            Tab::Details => {
                let details = self.section("company_details");
                push_field(&mut lines, "Industry", details.get("industry"));
                push_field(&mut lines, "Founded", details.get("founded_year"));
                push_field(&mut lines, "Type", details.get("company_type"));
                push_field(&mut lines, "Headquarters", details.get("headquarters"));
            }
            Tab::People => {
                let people = self.section("people");
                push_list(&mut lines, "Founders", people.get("founders"));
                push_list(&mut lines, "Key Executives", people.get("key_executives"));
            }
            Tab::Offerings => {
                let offerings = self.section("offerings");
                push_list(&mut lines, "Services & Products", offerings.get("service_details"));
                push_field(&mut lines, "Pricing Model", offerings.get("pricing_model"));
            }
            Tab::Financials => {
                let financials = self.section("valuation_and_revenue");
                if let Some(value) = display(financials.get("value")) {
                    let metric = display(financials.get("metric_type"))
                        .unwrap_or_else(|| "Value".to_string());
                    lines.push(format!("{}: ${}", metric, value));
                    push_field(&mut lines, "Source", financials.get("source"));
                    push_field(&mut lines, "Date", financials.get("date_of_metric"));
                    push_field(&mut lines, "Explanation", financials.get("explanation"));
                }
            }
            Tab::Contact => {
                let contact = self.section("contact_info");
                push_field(&mut lines, "Email", contact.get("email"));
                push_field(&mut lines, "Phone", contact.get("phone"));
                push_field(&mut lines, "Contact Page", contact.get("contact_page_url"));
            }
            Tab::Links => {
                let links = self.section("reference_links");
                push_field(&mut lines, "LinkedIn", self.profile.get("linkedin_url"));
                push_field(&mut lines, "Crunchbase", links.get("crunchbase_url"));
                push_field(&mut lines, "Wikipedia", links.get("wikipedia_url"));
                if let Some(Value::Array(other)) = links.get("other") {
                    for url in other.iter().filter_map(|v| display(Some(v))) {
                        lines.push(format!("Other: {}", url));
                    }
                }
            }
        }

        if lines.is_empty() {
            lines.push("No information available".to_string());
        }
        format!("--- {} ---\n{}", tab.title().to_uppercase(), lines.join("\n"))
    }

    /// Renders the header followed by every tab.
    pub fn render_all(&self) -> String {
        let mut out = self.header();
        for tab in Tab::ALL {
            out.push_str("\n\n");
            out.push_str(&self.render_tab(tab));
        }
        out
    }

    fn section(&self, key: &str) -> &serde_json::Map<String, Value> {
        static EMPTY: std::sync::LazyLock<serde_json::Map<String, Value>> =
            std::sync::LazyLock::new(serde_json::Map::new);
        self.profile
            .get(key)
            .and_then(Value::as_object)
            .unwrap_or(&*EMPTY)
    }
}

fn display(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn push_field(lines: &mut Vec<String>, label: &str, value: Option<&Value>) {
    if let Some(value) = display(value) {
        lines.push(format!("{}: {}", label, value));
    }
}

fn push_list(lines: &mut Vec<String>, label: &str, value: Option<&Value>) {
    let Some(Value::Array(items)) = value else {
        return;
    };
    let items: Vec<String> = items.iter().filter_map(|v| display(Some(v))).collect();
    if items.is_empty() {
        return;
    }
    lines.push(format!("{}:", label));
    lines.extend(items.into_iter().map(|item| format!("  • {}", item)));
}

/// File name used when exporting a profile: `{company}_report_{YYYY-MM-DD}.json`.
pub fn export_file_name(profile: &CompanyProfile, date: NaiveDate) -> String {
    let company: String = profile
        .company_name()
        .unwrap_or("company")
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{}_report_{}.json", company, date.format("%Y-%m-%d"))
}

/// Holds the most recent result of an interactive session.
#[derive(Debug, Default)]
pub struct ResearchSession {
    current: Option<CompanyProfile>,
}

impl ResearchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_result(&mut self, profile: CompanyProfile) {
        self.current = Some(profile);
    }

    pub fn current(&self) -> Option<&CompanyProfile> {
        self.current.as_ref()
    }

    /// Writes the current result as pretty JSON into `dir`.
    ///
    /// # Returns
    ///
    /// The path written, or an error when there is no result yet.
    pub fn export(&self, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
        let profile = self
            .current
            .as_ref()
            .ok_or_else(|| ResearchError::InvalidRequest("No results to export".into()))?;

        let path = dir.join(export_file_name(profile, date));
        std::fs::write(&path, serde_json::to_string_pretty(profile)?)?;
        info!("Report saved to {}", path.display());
        Ok(path)
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
