//! Rule entity: a script bound to an input channel or to a schedule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Status;
use crate::schedule::Schedule;

/// Script language of a rule's logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptKind {
    Lua,
    Go,
    Template,
}

impl ScriptKind {
    pub const ALL: [&'static str; 3] = ["lua", "go", "template"];
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptKind::Lua => write!(f, "lua"),
            ScriptKind::Go => write!(f, "go"),
            ScriptKind::Template => write!(f, "template"),
        }
    }
}

/// Rule logic: a tagged script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    #[serde(rename = "type")]
    pub kind: ScriptKind,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub domain_id: String,
    /// Empty for time-triggered rules.
    #[serde(default)]
    pub input_channel: String,
    /// Empty when the rule's output is not republished.
    #[serde(default)]
    pub output_channel: String,
    pub logic: Script,
    pub schedule: Schedule,
    pub status: Status,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    /// Next instant a time-triggered rule fires. `None` for event rules and
    /// once a one-shot schedule has fired.
    #[serde(default)]
    pub next_due: Option<DateTime<Utc>>,
}

impl Rule {
    /// Time-triggered rules have no input channel.
    pub fn is_scheduled(&self) -> bool {
        self.input_channel.is_empty()
    }

    /// Whether a message created at `created` falls inside the rule's
    /// active window.
    pub fn accepts(&self, created: DateTime<Utc>) -> bool {
        created >= self.schedule.start_date_time
    }

    /// Due instant a freshly scheduled rule starts from.
    pub fn initial_due(&self) -> Option<DateTime<Utc>> {
        if self.is_scheduled() {
            self.schedule.first_due()
        } else {
            None
        }
    }
}

/// Client-provided fields of a new rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRule {
    pub name: String,
    #[serde(default)]
    pub input_channel: String,
    #[serde(default)]
    pub output_channel: String,
    pub logic: Script,
    pub schedule: Schedule,
}

/// Replaceable fields of an existing rule. Status and schedule have their
/// own operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleUpdate {
    pub name: String,
    #[serde(default)]
    pub input_channel: String,
    #[serde(default)]
    pub output_channel: String,
    pub logic: Script,
}
