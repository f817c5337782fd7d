//! Persistence contract for rules and report configs.
//!
//! The engine talks to storage only through [`Repository`]. Besides CRUD and
//! paged listing, implementations must provide claim-once updates of the
//! next due instant (`claim_rule_due` / `claim_report_due`): a conditional
//! write that succeeds for exactly one caller per occurrence, so replicas
//! polling the same store never fire an occurrence twice.
//!
//! Updates never write back a `next_due` read earlier, and status changes
//! are checked against the stored status, both under the same write. A
//! concurrent claim or status change therefore cannot be undone.

mod memory;

pub use memory::InMemoryRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::schedule::Schedule;
use crate::schema::{Page, PageMeta, ReportConfig, Rule, Status, TransitionError};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Repository: Send + Sync {
    // ── Rules ────────────────────────────────────────────────────────

    async fn add_rule(&self, rule: Rule) -> Result<Rule, RepoError>;

    async fn view_rule(&self, id: &str) -> Result<Rule, RepoError>;

    /// Replace name, channels, logic and the update stamp. Status, schedule
    /// and creation fields are left alone. The stored next due instant is
    /// kept unless the rule switches between event and time triggering, in
    /// which case it restarts from the schedule. Deleted rules are
    /// `NotFound`.
    async fn update_rule(&self, rule: &Rule) -> Result<Rule, RepoError>;

    /// Deleted rules are `NotFound`.
    async fn update_rule_schedule(
        &self,
        id: &str,
        schedule: &Schedule,
        next_due: Option<DateTime<Utc>>,
        updated_by: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Rule, RepoError>;

    /// Apply [`Status::transition`] to the stored status.
    async fn update_rule_status(
        &self,
        id: &str,
        status: Status,
        updated_by: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Rule, RepoError>;

    async fn list_rules(&self, pm: &PageMeta) -> Result<Page<Rule>, RepoError>;

    /// Move `next_due` from `expected` to `next` if it still equals
    /// `expected` and the rule is enabled. Returns whether this call won.
    async fn claim_rule_due(
        &self,
        id: &str,
        expected: DateTime<Utc>,
        next: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError>;

    // ── Report configs ───────────────────────────────────────────────

    async fn add_report_config(&self, cfg: ReportConfig) -> Result<ReportConfig, RepoError>;

    async fn view_report_config(&self, id: &str) -> Result<ReportConfig, RepoError>;

    /// Replace name, params and the update stamp. Deleted configs are
    /// `NotFound`.
    async fn update_report_config(&self, cfg: &ReportConfig) -> Result<ReportConfig, RepoError>;

    /// Deleted configs are `NotFound`.
    async fn update_report_schedule(
        &self,
        id: &str,
        schedule: &Schedule,
        next_due: Option<DateTime<Utc>>,
        updated_by: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<ReportConfig, RepoError>;

    /// Apply [`Status::transition`] to the stored status.
    async fn update_report_status(
        &self,
        id: &str,
        status: Status,
        updated_by: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<ReportConfig, RepoError>;

    async fn list_reports_config(&self, pm: &PageMeta) -> Result<Page<ReportConfig>, RepoError>;

    async fn claim_report_due(
        &self,
        id: &str,
        expected: DateTime<Utc>,
        next: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError>;
}
