use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Report analysis modes offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, poise::ChoiceParameter)]
pub enum AnalysisMode {
    #[name = "Deep Dive"]
    #[serde(rename = "TYPE_A")]
    DeepDive,
    #[name = "Quick Intel"]
    #[serde(rename = "TYPE_B")]
    QuickIntel,
    #[name = "News Dashboard"]
    #[serde(rename = "NEWS")]
    News,
}

impl AnalysisMode {
    pub fn label(self) -> &'static str {
        match self {
            AnalysisMode::DeepDive => "Mode A: Deep Dive",
            AnalysisMode::QuickIntel => "Mode B: Quick Intel",
            AnalysisMode::News => "News Dashboard",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            AnalysisMode::DeepDive => "📘",
            AnalysisMode::QuickIntel => "⚡",
            AnalysisMode::News => "📰",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, poise::ChoiceParameter)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    #[name = "English"]
    En,
    #[name = "한국어"]
    Ko,
}

/// Structured view of one raw report text. Built by [`super::split`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportDocument {
    /// Markdown before the first `## ` heading (title and metadata).
    pub header: String,
    /// Interior of the `:::ALERT:::` block, still pipe-separated.
    pub alert: Option<String>,
    /// Body of the `## Latest News` section, removed from `sections`.
    pub news: Option<String>,
    pub sections: Vec<Section>,
}

impl ReportDocument {
    /// Alert display lines (pipe-separated in the source).
    pub fn alert_lines(&self) -> Vec<&str> {
        self.alert
            .as_deref()
            .map(|a| a.split('|').map(str::trim).collect())
            .unwrap_or_default()
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// `sec-{n}`, unique within one document.
    pub id: String,
    pub title: String,
    pub content: String,
}

/// A persisted report. Only `content` is ever parsed; the rest is metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedReport {
    pub id: String,
    pub title: String,
    pub query: String,
    pub mode: AnalysisMode,
    pub date: DateTime<Utc>,
    pub content: String,
}

impl SavedReport {
    /// Build a record for a freshly generated report.
    /// Id is content-addressed over query, date and body.
    pub fn new(query: &str, mode: AnalysisMode, content: &str, date: DateTime<Utc>) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(query.as_bytes());
        hasher.update(date.to_rfc3339().as_bytes());
        hasher.update(content.as_bytes());
        let id = hasher.finalize().to_hex()[..16].to_string();

        Self {
            id,
            title: derive_title(query, mode, content),
            query: query.to_string(),
            mode,
            date,
            content: content.to_string(),
        }
    }
}

/// First `# ` heading of the report, falling back to the query.
fn derive_title(query: &str, mode: AnalysisMode, content: &str) -> String {
    let heading = content
        .lines()
        .find_map(|l| l.strip_prefix("# "))
        .map(|t| t.trim().trim_matches('*').trim())
        .filter(|t| !t.is_empty());

    match heading {
        Some(t) => t.to_string(),
        None if query.trim().is_empty() => mode.label().to_string(),
        None => format!("{} ({})", query.trim(), mode.label()),
    }
}
