//! Runs a rule against a message and republishes the result.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use ruleflow_bus::{EventPublisher, Message};

use crate::schema::{Rule, RunInfo, RunKind};
use crate::scripting::ScriptRegistry;

/// Orchestrates one rule execution: script, then at-most-once publish.
///
/// A publish failure is recorded in the returned [`RunInfo`]; it is never
/// retried and the script is not re-run.
#[derive(Clone)]
pub struct Executor {
    scripts: Arc<ScriptRegistry>,
    publisher: Arc<dyn EventPublisher>,
}

impl Executor {
    pub fn new(scripts: Arc<ScriptRegistry>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { scripts, publisher }
    }

    pub async fn execute(&self, rule: &Rule, message: &Message) -> RunInfo {
        let started = Utc::now();

        let output = match self.scripts.run(rule, message).await {
            Ok(output) => output,
            Err(e) => {
                return RunInfo::failure(
                    RunKind::Rule,
                    &rule.id,
                    &rule.domain_id,
                    started,
                    format!("rule '{}' {}", rule.name, e),
                );
            }
        };

        let Some(payload) = output else {
            debug!(rule_id = %rule.id, "rule produced no output");
            return RunInfo::success(
                RunKind::Rule,
                &rule.id,
                &rule.domain_id,
                started,
                format!("rule '{}' ran with no output", rule.name),
            );
        };

        if rule.output_channel.is_empty() {
            return RunInfo::success(
                RunKind::Rule,
                &rule.id,
                &rule.domain_id,
                started,
                format!("rule '{}' ran; no output channel", rule.name),
            );
        }

        let out = Message::new(rule.domain_id.clone(), rule.output_channel.clone(), payload)
            .with_publisher(rule.id.clone());
        match self.publisher.publish(out).await {
            Ok(()) => RunInfo::success(
                RunKind::Rule,
                &rule.id,
                &rule.domain_id,
                started,
                format!(
                    "rule '{}' published to channel '{}'",
                    rule.name, rule.output_channel
                ),
            ),
            Err(e) => RunInfo::failure(
                RunKind::Rule,
                &rule.id,
                &rule.domain_id,
                started,
                format!(
                    "rule '{}' publish to channel '{}' failed: {}",
                    rule.name, rule.output_channel, e
                ),
            ),
        }
    }
}
