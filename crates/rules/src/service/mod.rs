//! The engine: CRUD over rules and report configs, plus the two firing
//! paths.
//!
//! - [`Engine::handle`]: message-triggered rules, then an opportunistic
//!   report-due pass for the message's domain
//! - [`Engine::start_scheduler`]: tick-driven loop over due rules and
//!   report configs
//!
//! Both paths isolate per-entity failures into [`RunInfo`] records so one
//! bad rule or report never stops the others.

mod dispatch;
mod error;
mod poller;
mod reports;
mod rules;

pub use error::EngineError;
pub use poller::Shutdown;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use ruleflow_bus::Message;
use ruleflow_core::IdProvider;

use crate::executor::Executor;
use crate::report::ReportRunner;
use crate::repository::{RepoError, Repository};
use crate::run_info::RunInfoSink;
use crate::schema::{PageMeta, ReportConfig, Rule, RunInfo, RunKind};
use crate::validation::ValidationResult;

#[derive(Clone)]
pub struct Engine {
    repo: Arc<dyn Repository>,
    ids: Arc<dyn IdProvider>,
    executor: Executor,
    reports: Arc<ReportRunner>,
    run_info: RunInfoSink,
}

impl Engine {
    pub fn new(
        repo: Arc<dyn Repository>,
        ids: Arc<dyn IdProvider>,
        executor: Executor,
        reports: ReportRunner,
        run_info: RunInfoSink,
    ) -> Self {
        Self {
            repo,
            ids,
            executor,
            reports: Arc::new(reports),
            run_info,
        }
    }

    pub fn run_info(&self) -> &RunInfoSink {
        &self.run_info
    }

    fn next_id(&self) -> Result<String, EngineError> {
        self.ids
            .id()
            .map_err(|e| EngineError::Execution(format!("id generation: {}", e)))
    }

    /// Fire every due, time-triggered rule matching `pm`.
    async fn fire_due_rules(&self, pm: &PageMeta, now: DateTime<Utc>) -> Result<(), RepoError> {
        let page = self.repo.list_rules(pm).await?;
        for rule in page.items {
            self.fire_due_rule(rule, now).await;
        }
        Ok(())
    }

    /// Fire every due report config matching `pm`.
    async fn fire_due_reports(&self, pm: &PageMeta, now: DateTime<Utc>) -> Result<(), RepoError> {
        let page = self.repo.list_reports_config(pm).await?;
        for cfg in page.items {
            self.fire_due_report(cfg, now).await;
        }
        Ok(())
    }

    async fn fire_due_rule(&self, rule: Rule, now: DateTime<Utc>) {
        let Some(expected) = rule.next_due else {
            return;
        };
        let next = rule.schedule.next_due_after(now);
        match self.repo.claim_rule_due(&rule.id, expected, next).await {
            Ok(true) => {
                let trigger = Message::new(rule.domain_id.clone(), String::new(), Vec::<u8>::new())
                    .with_created(now);
                let info = self.executor.execute(&rule, &trigger).await;
                self.run_info.record(info).await;
            }
            Ok(false) => debug!(rule_id = %rule.id, "occurrence already claimed"),
            Err(e) => {
                let info = RunInfo::failure(
                    RunKind::Rule,
                    &rule.id,
                    &rule.domain_id,
                    Utc::now(),
                    format!("rule '{}' claim failed: {}", rule.name, e),
                );
                self.run_info.record(info).await;
            }
        }
    }

    async fn fire_due_report(&self, cfg: ReportConfig, now: DateTime<Utc>) {
        let Some(expected) = cfg.next_due else {
            return;
        };
        let next = cfg.schedule.next_due_after(now);
        match self.repo.claim_report_due(&cfg.id, expected, next).await {
            Ok(true) => {
                let (artifact, info) = self.reports.run(&cfg, now).await;
                if let Some(artifact) = artifact {
                    debug!(
                        report_id = %cfg.id,
                        file = %artifact.name,
                        bytes = artifact.data.len(),
                        "report artifact generated"
                    );
                }
                self.run_info.record(info).await;
            }
            Ok(false) => debug!(report_id = %cfg.id, "occurrence already claimed"),
            Err(e) => {
                let info = RunInfo::failure(
                    RunKind::Report,
                    &cfg.id,
                    &cfg.domain_id,
                    Utc::now(),
                    format!("report '{}' claim failed: {}", cfg.name, e),
                );
                self.run_info.record(info).await;
            }
        }
    }
}

/// Turn a validation outcome into an error, logging warnings either way.
fn checked(result: ValidationResult) -> Result<(), EngineError> {
    for w in &result.warnings {
        warn!(path = %w.path, "{}", w.message);
    }
    if result.valid {
        Ok(())
    } else {
        Err(result.into())
    }
}
