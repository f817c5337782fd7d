//! YAML seed files: rules and report configs preloaded into the store at
//! startup.
//!
//! ```yaml
//! rules:
//!   - domain_id: plant-7
//!     name: overheat
//!     input_channel: temp
//!     output_channel: alerts
//!     logic: { type: template, code: "{% if payload.v > 30 %}hot{% endif %}" }
//!     schedule: { start_date_time: 2024-01-01T00:00:00Z, time: 2024-01-01T00:00:00Z }
//! reports:
//!   - domain_id: plant-7
//!     status: disabled
//!     name: daily temperature
//!     schedule: { start_date_time: 2024-01-01T00:00:00Z, time: 2024-01-01T06:00:00Z, recurring: daily }
//!     params: { metrics: [ { channel_id: temp } ], window: 24h }
//! ```
//!
//! Entries go through the same validation as API requests. A bad entry is
//! reported and skipped; it does not abort the rest of the file.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::schema::{NewReportConfig, NewRule, Session, Status};
use crate::service::Engine;

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

fn default_author() -> String {
    "seed".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SeedRule {
    pub domain_id: String,
    #[serde(default = "default_author")]
    pub created_by: String,
    /// Initial status; only `enabled` and `disabled` make sense here.
    #[serde(default)]
    pub status: Status,
    #[serde(flatten)]
    pub rule: NewRule,
}

#[derive(Debug, Deserialize)]
pub struct SeedReport {
    pub domain_id: String,
    #[serde(default = "default_author")]
    pub created_by: String,
    #[serde(default)]
    pub status: Status,
    #[serde(flatten)]
    pub report: NewReportConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub rules: Vec<SeedRule>,
    #[serde(default)]
    pub reports: Vec<SeedReport>,
}

impl SeedFile {
    pub fn from_path(path: &Path) -> Result<Self, SeedError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}

/// Outcome of seeding one entry.
#[derive(Debug)]
pub struct LoadResult {
    /// `rules[i]` or `reports[i]`.
    pub entry: String,
    pub status: LoadStatus,
}

#[derive(Debug)]
pub enum LoadStatus {
    Loaded { id: String },
    Failed { error: String },
}

impl LoadResult {
    pub fn is_loaded(&self) -> bool {
        matches!(self.status, LoadStatus::Loaded { .. })
    }
}

/// Add every entry of `seed` through `engine`.
pub async fn apply(engine: &Engine, seed: SeedFile) -> Vec<LoadResult> {
    let mut results = Vec::with_capacity(seed.rules.len() + seed.reports.len());

    for (i, entry) in seed.rules.into_iter().enumerate() {
        let session = Session::new(entry.created_by, entry.domain_id);
        let added = match engine.add_rule(&session, entry.rule).await {
            Ok(rule) if entry.status == Status::Disabled => engine
                .disable_rule(&session, &rule.id)
                .await
                .map(|r| r.id),
            Ok(rule) => Ok(rule.id),
            Err(e) => Err(e),
        };
        results.push(outcome(format!("rules[{}]", i), added));
    }

    for (i, entry) in seed.reports.into_iter().enumerate() {
        let session = Session::new(entry.created_by, entry.domain_id);
        let added = match engine.add_report_config(&session, entry.report).await {
            Ok(cfg) if entry.status == Status::Disabled => engine
                .disable_report_config(&session, &cfg.id)
                .await
                .map(|c| c.id),
            Ok(cfg) => Ok(cfg.id),
            Err(e) => Err(e),
        };
        results.push(outcome(format!("reports[{}]", i), added));
    }

    results
}

fn outcome<E: std::fmt::Display>(entry: String, added: Result<String, E>) -> LoadResult {
    let status = match added {
        Ok(id) => {
            info!(%entry, %id, "seeded");
            LoadStatus::Loaded { id }
        }
        Err(e) => {
            warn!(%entry, error = %e, "seed entry rejected");
            LoadStatus::Failed {
                error: e.to_string(),
            }
        }
    };
    LoadResult { entry, status }
}

/// Read a seed file and apply it.
pub async fn load_file(engine: &Engine, path: &Path) -> Result<Vec<LoadResult>, SeedError> {
    let seed = SeedFile::from_path(path)?;
    let results = apply(engine, seed).await;
    let loaded = results.iter().filter(|r| r.is_loaded()).count();
    info!(
        path = %path.display(),
        loaded,
        failed = results.len() - loaded,
        "seed file applied"
    );
    Ok(results)
}
