//! Observability record of one firing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Rule,
    Report,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunKind::Rule => write!(f, "rule"),
            RunKind::Report => write!(f, "report"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

/// Outcome of one rule or report firing. Never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub kind: RunKind,
    pub entity_id: String,
    pub domain_id: String,
    pub outcome: Outcome,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunInfo {
    pub fn success(
        kind: RunKind,
        entity_id: &str,
        domain_id: &str,
        started_at: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            entity_id: entity_id.to_string(),
            domain_id: domain_id.to_string(),
            outcome: Outcome::Success,
            message: message.into(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn failure(
        kind: RunKind,
        entity_id: &str,
        domain_id: &str,
        started_at: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            outcome: Outcome::Failure,
            ..Self::success(kind, entity_id, domain_id, started_at, message)
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Log at `info` on success and `warn` on failure.
    pub fn log(&self) {
        let elapsed_ms = (self.finished_at - self.started_at).num_milliseconds();
        match self.outcome {
            Outcome::Success => tracing::info!(
                kind = %self.kind,
                id = %self.entity_id,
                domain = %self.domain_id,
                elapsed_ms,
                "{}",
                self.message
            ),
            Outcome::Failure => tracing::warn!(
                kind = %self.kind,
                id = %self.entity_id,
                domain = %self.domain_id,
                elapsed_ms,
                "{}",
                self.message
            ),
        }
    }
}
