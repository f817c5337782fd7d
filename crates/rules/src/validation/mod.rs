//! Request validation with structured errors and suggestions.
//!
//! Everything here runs before the store is touched. Returns a
//! [`ValidationResult`] with errors (reject the request) and warnings
//! (advisory, logged by the caller).

pub mod fuzzy;

use serde::{Deserialize, Serialize};

use ruleflow_notify::TemplateRenderer;

use crate::report::window::{parse_window, MAX_WINDOW};
use crate::schedule::Schedule;
use crate::schema::*;

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field path, e.g. `"params.metrics[0].channel_id"`.
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    pub(crate) fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    pub(crate) fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    pub(crate) fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }

    /// One line per error, `path: message (did you mean 'x'?)`.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| {
                let mut line = if e.path.is_empty() {
                    e.message.clone()
                } else {
                    format!("{}: {}", e.path, e.message)
                };
                if let Some(s) = &e.suggestion {
                    line.push_str(&format!(" (did you mean '{}'?)", s));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Shared checks ───────────────────────────────────────────────────

fn check_name(name: &str, result: &mut ValidationResult) {
    if name.trim().is_empty() {
        result.error("name", "name must not be empty");
    }
}

/// Channel names end up in bus topics, which are split on dots.
fn check_channel(path: &str, channel: &str, result: &mut ValidationResult) {
    if channel.chars().any(|c| c.is_whitespace() || c == '.') {
        result.error(path, format!("invalid channel name '{}'", channel));
    }
}

pub fn validate_schedule(schedule: &Schedule, result: &mut ValidationResult) {
    if let Err(e) = schedule.check() {
        result.error("schedule.recurring_period", e);
    }
    if schedule.first_due().is_none() {
        result.error("schedule", "schedule never produces an occurrence");
    }
}

fn check_logic(logic: &Script, result: &mut ValidationResult) {
    if logic.code.trim().is_empty() {
        result.error("logic.code", "rule logic must not be empty");
        return;
    }
    if logic.kind == ScriptKind::Template {
        if let Err(e) = TemplateRenderer::new().validate(&logic.code) {
            result.error("logic.code", e.to_string());
        }
    }
}

fn check_rule_fields(
    input_channel: &str,
    output_channel: &str,
    logic: &Script,
    result: &mut ValidationResult,
) {
    check_channel("input_channel", input_channel, result);
    check_channel("output_channel", output_channel, result);
    check_logic(logic, result);
    if !output_channel.is_empty() && input_channel == output_channel {
        result.warn(
            "output_channel",
            "output channel equals input channel; the rule will consume its own output",
        );
    }
}

// ── Public API ──────────────────────────────────────────────────────

pub fn validate_new_rule(rule: &NewRule) -> ValidationResult {
    let mut result = ValidationResult::new();
    check_name(&rule.name, &mut result);
    check_rule_fields(&rule.input_channel, &rule.output_channel, &rule.logic, &mut result);
    validate_schedule(&rule.schedule, &mut result);
    if rule.input_channel.is_empty() && rule.output_channel.is_empty() {
        result.warn(
            "output_channel",
            "time-triggered rule without an output channel publishes nothing",
        );
    }
    result
}

pub fn validate_rule_update(update: &RuleUpdate) -> ValidationResult {
    let mut result = ValidationResult::new();
    check_name(&update.name, &mut result);
    check_rule_fields(
        &update.input_channel,
        &update.output_channel,
        &update.logic,
        &mut result,
    );
    result
}

pub fn validate_report_params(params: &ReportParams, result: &mut ValidationResult) {
    if params.metrics.is_empty() {
        result.error("params.metrics", "at least one metric is required");
    }
    for (i, metric) in params.metrics.iter().enumerate() {
        let path = format!("params.metrics[{}].channel_id", i);
        if metric.channel_id.is_empty() {
            result.error(path, "channel_id must not be empty");
        } else {
            check_channel(&path, &metric.channel_id, result);
        }
    }
    match parse_window(&params.window) {
        None => result.error(
            "params.window",
            format!(
                "invalid window '{}' (expected e.g. '30m', '24h', '7d', '1d12h')",
                params.window
            ),
        ),
        Some(w) if w > MAX_WINDOW => result.error(
            "params.window",
            format!(
                "window '{}' is longer than {} days",
                params.window,
                MAX_WINDOW.as_secs() / 86_400
            ),
        ),
        Some(_) => {}
    }
    if params.limit == Some(0) {
        result.error("params.limit", "limit must be positive when set");
    }
    if let Some(email) = &params.email {
        if email.to.is_empty() {
            result.error("params.email.to", "at least one recipient is required");
        }
        for (i, addr) in email.to.iter().enumerate() {
            if !addr.contains('@') {
                result.error(
                    format!("params.email.to[{}]", i),
                    format!("'{}' is not an email address", addr),
                );
            }
        }
        let renderer = TemplateRenderer::new();
        if let Err(e) = renderer.validate(&email.subject) {
            result.error("params.email.subject", e.to_string());
        }
        if let Err(e) = renderer.validate(&email.content) {
            result.error("params.email.content", e.to_string());
        }
    }
}

pub fn validate_new_report(cfg: &NewReportConfig) -> ValidationResult {
    let mut result = ValidationResult::new();
    check_name(&cfg.name, &mut result);
    validate_schedule(&cfg.schedule, &mut result);
    validate_report_params(&cfg.params, &mut result);
    result
}

pub fn validate_report_update(update: &ReportConfigUpdate) -> ValidationResult {
    let mut result = ValidationResult::new();
    check_name(&update.name, &mut result);
    validate_report_params(&update.params, &mut result);
    result
}

/// Parse a report action, suggesting the closest valid one on failure.
pub fn parse_action(action: &str) -> Result<ReportAction, ValidationResult> {
    action.parse::<ReportAction>().map_err(|msg| {
        let mut result = ValidationResult::new();
        match fuzzy::fuzzy_match(action, &ReportAction::ALL) {
            Some(s) => result.error_with_suggestion("action", msg, s),
            None => result.error(
                "action",
                format!("{} (valid: {})", msg, ReportAction::ALL.join(", ")),
            ),
        }
        result
    })
}
