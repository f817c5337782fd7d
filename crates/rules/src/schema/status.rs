//! Lifecycle state of rules and report configs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stored lifecycle state. `Deleted` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Disabled,
    #[default]
    Enabled,
    Deleted,
}

/// A status change the lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot change status from {from} to {to}")]
pub struct TransitionError {
    pub from: Status,
    pub to: Status,
}

impl Status {
    /// Validate a transition: Disabled and Enabled swap freely, either may
    /// become Deleted, and nothing leaves Deleted. Same-state requests are
    /// rejected so callers can tell a no-op from a change.
    pub fn transition(self, to: Status) -> Result<Status, TransitionError> {
        match (self, to) {
            (Status::Disabled, Status::Enabled)
            | (Status::Enabled, Status::Disabled)
            | (Status::Disabled, Status::Deleted)
            | (Status::Enabled, Status::Deleted) => Ok(to),
            _ => Err(TransitionError { from: self, to }),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Disabled => write!(f, "disabled"),
            Status::Enabled => write!(f, "enabled"),
            Status::Deleted => write!(f, "deleted"),
        }
    }
}

/// Status selector for queries. `Any` matches enabled and disabled
/// entities; deleted ones are only returned when asked for explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    #[serde(alias = "all")]
    Any,
    Enabled,
    Disabled,
    Deleted,
}

impl StatusFilter {
    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::Any => status != Status::Deleted,
            StatusFilter::Enabled => status == Status::Enabled,
            StatusFilter::Disabled => status == Status::Disabled,
            StatusFilter::Deleted => status == Status::Deleted,
        }
    }
}

impl From<Status> for StatusFilter {
    fn from(s: Status) -> Self {
        match s {
            Status::Disabled => StatusFilter::Disabled,
            Status::Enabled => StatusFilter::Enabled,
            Status::Deleted => StatusFilter::Deleted,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "any" | "all" => Ok(StatusFilter::Any),
            "enabled" => Ok(StatusFilter::Enabled),
            "disabled" => Ok(StatusFilter::Disabled),
            "deleted" => Ok(StatusFilter::Deleted),
            other => Err(format!("unknown status: '{}'", other)),
        }
    }
}
