//! In-memory [`Repository`] used by the worker binary and tests.
//!
//! Entities are kept in insertion order, which is also creation order, so
//! listings are stable across calls. Every operation holds the table lock for
//! its whole duration, which makes the claim operations atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{RepoError, Repository};
use crate::schedule::Schedule;
use crate::schema::{Direction, Page, PageMeta, ReportConfig, Rule, Status};

#[derive(Default)]
struct Tables {
    rules: Vec<Rule>,
    reports: Vec<ReportConfig>,
}

#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn rule_matches(pm: &PageMeta, r: &Rule) -> bool {
    pm.domain_id.as_ref().map_or(true, |d| *d == r.domain_id)
        && pm.input_channel.as_ref().map_or(true, |c| *c == r.input_channel)
        && pm.output_channel.as_ref().map_or(true, |c| *c == r.output_channel)
        && pm.scheduled.map_or(true, |s| s == r.is_scheduled())
        && pm.status.matches(r.status)
        && pm.name_matches(&r.name)
        && pm.due_matches(r.next_due)
}

/// Channel filters do not apply to report configs, which are always
/// time-triggered.
fn report_matches(pm: &PageMeta, c: &ReportConfig) -> bool {
    pm.domain_id.as_ref().map_or(true, |d| *d == c.domain_id)
        && pm.scheduled != Some(false)
        && pm.status.matches(c.status)
        && pm.name_matches(&c.name)
        && pm.due_matches(c.next_due)
}

fn live_rule<'a>(rules: &'a mut [Rule], id: &str) -> Result<&'a mut Rule, RepoError> {
    rules
        .iter_mut()
        .find(|r| r.id == id && r.status != Status::Deleted)
        .ok_or(RepoError::NotFound)
}

fn live_report<'a>(
    reports: &'a mut [ReportConfig],
    id: &str,
) -> Result<&'a mut ReportConfig, RepoError> {
    reports
        .iter_mut()
        .find(|c| c.id == id && c.status != Status::Deleted)
        .ok_or(RepoError::NotFound)
}

fn ordered<T>(mut matches: Vec<T>, dir: Direction) -> Vec<T> {
    if dir == Direction::Desc {
        matches.reverse();
    }
    matches
}

#[async_trait]
impl Repository for InMemoryRepository {
    // ── Rules ────────────────────────────────────────────────────────

    async fn add_rule(&self, rule: Rule) -> Result<Rule, RepoError> {
        let mut t = self.tables.write().await;
        if t.rules.iter().any(|r| r.id == rule.id) {
            return Err(RepoError::Conflict(format!("rule '{}' already exists", rule.id)));
        }
        t.rules.push(rule.clone());
        Ok(rule)
    }

    async fn view_rule(&self, id: &str) -> Result<Rule, RepoError> {
        let t = self.tables.read().await;
        t.rules
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn update_rule(&self, rule: &Rule) -> Result<Rule, RepoError> {
        let mut t = self.tables.write().await;
        let stored = live_rule(&mut t.rules, &rule.id)?;
        let was_scheduled = stored.is_scheduled();
        stored.name = rule.name.clone();
        stored.input_channel = rule.input_channel.clone();
        stored.output_channel = rule.output_channel.clone();
        stored.logic = rule.logic.clone();
        if stored.is_scheduled() != was_scheduled {
            stored.next_due = stored.initial_due();
        }
        stored.updated_by = rule.updated_by.clone();
        stored.updated_at = rule.updated_at;
        Ok(stored.clone())
    }

    async fn update_rule_schedule(
        &self,
        id: &str,
        schedule: &Schedule,
        next_due: Option<DateTime<Utc>>,
        updated_by: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Rule, RepoError> {
        let mut t = self.tables.write().await;
        let stored = live_rule(&mut t.rules, id)?;
        stored.schedule = schedule.clone();
        stored.next_due = next_due;
        stored.updated_by = updated_by.to_string();
        stored.updated_at = updated_at;
        Ok(stored.clone())
    }

    async fn update_rule_status(
        &self,
        id: &str,
        status: Status,
        updated_by: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Rule, RepoError> {
        let mut t = self.tables.write().await;
        let stored = t
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        stored.status = stored.status.transition(status)?;
        stored.updated_by = updated_by.to_string();
        stored.updated_at = updated_at;
        Ok(stored.clone())
    }

    async fn list_rules(&self, pm: &PageMeta) -> Result<Page<Rule>, RepoError> {
        let t = self.tables.read().await;
        let matches: Vec<Rule> = t
            .rules
            .iter()
            .filter(|r| rule_matches(pm, r))
            .cloned()
            .collect();
        Ok(Page::slice(ordered(matches, pm.dir), pm))
    }

    async fn claim_rule_due(
        &self,
        id: &str,
        expected: DateTime<Utc>,
        next: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError> {
        let mut t = self.tables.write().await;
        let stored = t
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        if stored.status != Status::Enabled || stored.next_due != Some(expected) {
            return Ok(false);
        }
        stored.next_due = next;
        Ok(true)
    }

    // ── Report configs ───────────────────────────────────────────────

    async fn add_report_config(&self, cfg: ReportConfig) -> Result<ReportConfig, RepoError> {
        let mut t = self.tables.write().await;
        if t.reports.iter().any(|c| c.id == cfg.id) {
            return Err(RepoError::Conflict(format!(
                "report config '{}' already exists",
                cfg.id
            )));
        }
        t.reports.push(cfg.clone());
        Ok(cfg)
    }

    async fn view_report_config(&self, id: &str) -> Result<ReportConfig, RepoError> {
        let t = self.tables.read().await;
        t.reports
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn update_report_config(&self, cfg: &ReportConfig) -> Result<ReportConfig, RepoError> {
        let mut t = self.tables.write().await;
        let stored = live_report(&mut t.reports, &cfg.id)?;
        stored.name = cfg.name.clone();
        stored.params = cfg.params.clone();
        stored.updated_by = cfg.updated_by.clone();
        stored.updated_at = cfg.updated_at;
        Ok(stored.clone())
    }

    async fn update_report_schedule(
        &self,
        id: &str,
        schedule: &Schedule,
        next_due: Option<DateTime<Utc>>,
        updated_by: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<ReportConfig, RepoError> {
        let mut t = self.tables.write().await;
        let stored = live_report(&mut t.reports, id)?;
        stored.schedule = schedule.clone();
        stored.next_due = next_due;
        stored.updated_by = updated_by.to_string();
        stored.updated_at = updated_at;
        Ok(stored.clone())
    }

    async fn update_report_status(
        &self,
        id: &str,
        status: Status,
        updated_by: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<ReportConfig, RepoError> {
        let mut t = self.tables.write().await;
        let stored = t
            .reports
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepoError::NotFound)?;
        stored.status = stored.status.transition(status)?;
        stored.updated_by = updated_by.to_string();
        stored.updated_at = updated_at;
        Ok(stored.clone())
    }

    async fn list_reports_config(&self, pm: &PageMeta) -> Result<Page<ReportConfig>, RepoError> {
        let t = self.tables.read().await;
        let matches: Vec<ReportConfig> = t
            .reports
            .iter()
            .filter(|c| report_matches(pm, c))
            .cloned()
            .collect();
        Ok(Page::slice(ordered(matches, pm.dir), pm))
    }

    async fn claim_report_due(
        &self,
        id: &str,
        expected: DateTime<Utc>,
        next: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError> {
        let mut t = self.tables.write().await;
        let stored = t
            .reports
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepoError::NotFound)?;
        if stored.status != Status::Enabled || stored.next_due != Some(expected) {
            return Ok(false);
        }
        stored.next_due = next;
        Ok(true)
    }
}
