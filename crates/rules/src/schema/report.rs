//! Report configuration entity and report artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Status;
use crate::schedule::Schedule;

/// One data series of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSelector {
    pub channel_id: String,
    /// Restrict to one publisher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Restrict to one measurement name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Csv => "text/csv",
            ReportFormat::Json => "application/json",
        }
    }
}

/// Email delivery settings. `subject` and `content` are templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSetting {
    pub to: Vec<String>,
    pub subject: String,
    #[serde(default)]
    pub content: String,
}

fn default_window() -> String {
    "24h".to_string()
}

/// What a report contains and how it is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportParams {
    pub metrics: Vec<MetricSelector>,
    /// Lookback from the run instant, e.g. `24h`, `7d`, `1d12h`.
    #[serde(default = "default_window")]
    pub window: String,
    #[serde(default)]
    pub format: ReportFormat,
    /// Per-metric row cap passed to the reader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailSetting>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub id: String,
    pub name: String,
    pub domain_id: String,
    pub schedule: Schedule,
    pub status: Status,
    pub params: ReportParams,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub next_due: Option<DateTime<Utc>>,
}

/// Client-provided fields of a new report config. Also the request body of
/// on-demand generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReportConfig {
    pub name: String,
    pub schedule: Schedule,
    pub params: ReportParams,
}

/// Replaceable fields of an existing report config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfigUpdate {
    pub name: String,
    pub params: ReportParams,
}

/// What to do with a generated report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportAction {
    /// Return the data only.
    #[default]
    View,
    /// Return the data and a file artifact.
    Save,
    /// Like `Save`, and email the artifact.
    Email,
}

impl ReportAction {
    pub const ALL: [&'static str; 3] = ["view", "save", "email"];
}

impl fmt::Display for ReportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportAction::View => write!(f, "view"),
            ReportAction::Save => write!(f, "save"),
            ReportAction::Email => write!(f, "email"),
        }
    }
}

impl FromStr for ReportAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "view" => Ok(ReportAction::View),
            "save" => Ok(ReportAction::Save),
            "email" => Ok(ReportAction::Email),
            other => Err(format!("unknown report action: '{}'", other)),
        }
    }
}

/// A generated report file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub format: ReportFormat,
    pub data: Vec<u8>,
}
