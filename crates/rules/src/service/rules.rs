use chrono::Utc;
use tracing::info;

use super::{checked, Engine, EngineError};
use crate::schedule::Schedule;
use crate::schema::{NewRule, Page, PageMeta, Rule, RuleUpdate, Session, Status};
use crate::validation::{validate_new_rule, validate_rule_update, validate_schedule, ValidationResult};

impl Engine {
    pub async fn add_rule(&self, session: &Session, rule: NewRule) -> Result<Rule, EngineError> {
        checked(validate_new_rule(&rule))?;
        let now = Utc::now();
        let mut rule = Rule {
            id: self.next_id()?,
            name: rule.name,
            domain_id: session.domain_id.clone(),
            input_channel: rule.input_channel,
            output_channel: rule.output_channel,
            logic: rule.logic,
            schedule: rule.schedule,
            status: Status::Enabled,
            created_by: session.user_id.clone(),
            created_at: now,
            updated_by: session.user_id.clone(),
            updated_at: now,
            next_due: None,
        };
        rule.next_due = rule.initial_due();
        let rule = self
            .repo
            .add_rule(rule)
            .await
            .map_err(EngineError::storage("add rule"))?;
        info!(rule_id = %rule.id, domain = %rule.domain_id, scheduled = rule.is_scheduled(), "rule added");
        Ok(rule)
    }

    pub async fn view_rule(&self, session: &Session, id: &str) -> Result<Rule, EngineError> {
        let rule = self
            .repo
            .view_rule(id)
            .await
            .map_err(EngineError::storage("view rule"))?;
        if rule.domain_id != session.domain_id {
            return Err(EngineError::NotFound);
        }
        Ok(rule)
    }

    /// Like [`Self::view_rule`], but deleted rules count as missing.
    async fn live_rule(&self, session: &Session, id: &str) -> Result<Rule, EngineError> {
        let rule = self.view_rule(session, id).await?;
        if rule.status == Status::Deleted {
            return Err(EngineError::NotFound);
        }
        Ok(rule)
    }

    /// Replace name, channels and logic. Status is left alone, and the due
    /// instant only restarts when the rule changes trigger mode.
    pub async fn update_rule(
        &self,
        session: &Session,
        id: &str,
        update: RuleUpdate,
    ) -> Result<Rule, EngineError> {
        checked(validate_rule_update(&update))?;
        let mut rule = self.live_rule(session, id).await?;
        rule.name = update.name;
        rule.input_channel = update.input_channel;
        rule.output_channel = update.output_channel;
        rule.logic = update.logic;
        rule.updated_by = session.user_id.clone();
        rule.updated_at = Utc::now();

        self.repo
            .update_rule(&rule)
            .await
            .map_err(EngineError::storage("update rule"))
    }

    /// Replace the schedule and restart the due sequence from it.
    pub async fn update_rule_schedule(
        &self,
        session: &Session,
        id: &str,
        schedule: Schedule,
    ) -> Result<Rule, EngineError> {
        let mut result = ValidationResult::new();
        validate_schedule(&schedule, &mut result);
        checked(result)?;

        let mut rule = self.live_rule(session, id).await?;
        rule.schedule = schedule;
        let next_due = rule.initial_due();
        self.repo
            .update_rule_schedule(id, &rule.schedule, next_due, &session.user_id, Utc::now())
            .await
            .map_err(EngineError::storage("update rule schedule"))
    }

    /// List rules of the session's domain. Any domain filter in `pm` is
    /// overridden.
    pub async fn list_rules(&self, session: &Session, pm: PageMeta) -> Result<Page<Rule>, EngineError> {
        let pm = pm.in_domain(&session.domain_id);
        self.repo
            .list_rules(&pm)
            .await
            .map_err(EngineError::storage("list rules"))
    }

    pub async fn enable_rule(&self, session: &Session, id: &str) -> Result<Rule, EngineError> {
        self.set_rule_status(session, id, Status::Enabled).await
    }

    pub async fn disable_rule(&self, session: &Session, id: &str) -> Result<Rule, EngineError> {
        self.set_rule_status(session, id, Status::Disabled).await
    }

    /// Logical delete. The rule stays listable with an explicit `deleted`
    /// status filter.
    pub async fn remove_rule(&self, session: &Session, id: &str) -> Result<Rule, EngineError> {
        self.set_rule_status(session, id, Status::Deleted).await
    }

    async fn set_rule_status(
        &self,
        session: &Session,
        id: &str,
        to: Status,
    ) -> Result<Rule, EngineError> {
        self.view_rule(session, id).await?;
        let rule = self
            .repo
            .update_rule_status(id, to, &session.user_id, Utc::now())
            .await
            .map_err(EngineError::storage("update rule status"))?;
        info!(rule_id = %rule.id, status = %rule.status, "rule status changed");
        Ok(rule)
    }
}
