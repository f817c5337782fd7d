use chrono::Utc;
use tracing::info;

use super::{checked, Engine, EngineError};
use crate::report::GeneratedReport;
use crate::schedule::Schedule;
use crate::schema::{
    NewReportConfig, Page, PageMeta, ReportConfig, ReportConfigUpdate, Session, Status,
};
use crate::validation::{
    parse_action, validate_new_report, validate_report_params, validate_report_update,
    validate_schedule, ValidationResult,
};

impl Engine {
    pub async fn add_report_config(
        &self,
        session: &Session,
        cfg: NewReportConfig,
    ) -> Result<ReportConfig, EngineError> {
        checked(validate_new_report(&cfg))?;
        let now = Utc::now();
        let next_due = cfg.schedule.first_due();
        let cfg = ReportConfig {
            id: self.next_id()?,
            name: cfg.name,
            domain_id: session.domain_id.clone(),
            schedule: cfg.schedule,
            status: Status::Enabled,
            params: cfg.params,
            created_by: session.user_id.clone(),
            created_at: now,
            updated_by: session.user_id.clone(),
            updated_at: now,
            next_due,
        };
        let cfg = self
            .repo
            .add_report_config(cfg)
            .await
            .map_err(EngineError::storage("add report config"))?;
        info!(report_id = %cfg.id, domain = %cfg.domain_id, "report config added");
        Ok(cfg)
    }

    pub async fn view_report_config(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<ReportConfig, EngineError> {
        let cfg = self
            .repo
            .view_report_config(id)
            .await
            .map_err(EngineError::storage("view report config"))?;
        if cfg.domain_id != session.domain_id {
            return Err(EngineError::NotFound);
        }
        Ok(cfg)
    }

    async fn live_report_config(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<ReportConfig, EngineError> {
        let cfg = self.view_report_config(session, id).await?;
        if cfg.status == Status::Deleted {
            return Err(EngineError::NotFound);
        }
        Ok(cfg)
    }

    pub async fn update_report_config(
        &self,
        session: &Session,
        id: &str,
        update: ReportConfigUpdate,
    ) -> Result<ReportConfig, EngineError> {
        checked(validate_report_update(&update))?;
        let mut cfg = self.live_report_config(session, id).await?;
        cfg.name = update.name;
        cfg.params = update.params;
        cfg.updated_by = session.user_id.clone();
        cfg.updated_at = Utc::now();
        self.repo
            .update_report_config(&cfg)
            .await
            .map_err(EngineError::storage("update report config"))
    }

    pub async fn update_report_schedule(
        &self,
        session: &Session,
        id: &str,
        schedule: Schedule,
    ) -> Result<ReportConfig, EngineError> {
        let mut result = ValidationResult::new();
        validate_schedule(&schedule, &mut result);
        checked(result)?;

        self.live_report_config(session, id).await?;
        let next_due = schedule.first_due();
        self.repo
            .update_report_schedule(id, &schedule, next_due, &session.user_id, Utc::now())
            .await
            .map_err(EngineError::storage("update report schedule"))
    }

    pub async fn list_reports_config(
        &self,
        session: &Session,
        pm: PageMeta,
    ) -> Result<Page<ReportConfig>, EngineError> {
        let pm = pm.in_domain(&session.domain_id);
        self.repo
            .list_reports_config(&pm)
            .await
            .map_err(EngineError::storage("list report configs"))
    }

    pub async fn enable_report_config(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<ReportConfig, EngineError> {
        self.set_report_status(session, id, Status::Enabled).await
    }

    pub async fn disable_report_config(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<ReportConfig, EngineError> {
        self.set_report_status(session, id, Status::Disabled).await
    }

    pub async fn remove_report_config(
        &self,
        session: &Session,
        id: &str,
    ) -> Result<ReportConfig, EngineError> {
        self.set_report_status(session, id, Status::Deleted).await
    }

    async fn set_report_status(
        &self,
        session: &Session,
        id: &str,
        to: Status,
    ) -> Result<ReportConfig, EngineError> {
        self.view_report_config(session, id).await?;
        let cfg = self
            .repo
            .update_report_status(id, to, &session.user_id, Utc::now())
            .await
            .map_err(EngineError::storage("update report status"))?;
        info!(report_id = %cfg.id, status = %cfg.status, "report config status changed");
        Ok(cfg)
    }

    /// Generate a report now, ignoring schedule and status. The request's
    /// schedule is not used.
    pub async fn generate_report(
        &self,
        session: &Session,
        request: NewReportConfig,
        action: &str,
    ) -> Result<GeneratedReport, EngineError> {
        let action = parse_action(action)?;
        let mut result = ValidationResult::new();
        if request.name.trim().is_empty() {
            result.error("name", "name must not be empty");
        }
        validate_report_params(&request.params, &mut result);
        checked(result)?;

        let now = Utc::now();
        let cfg = ReportConfig {
            id: String::new(),
            name: request.name,
            domain_id: session.domain_id.clone(),
            schedule: request.schedule,
            status: Status::Enabled,
            params: request.params,
            created_by: session.user_id.clone(),
            created_at: now,
            updated_by: session.user_id.clone(),
            updated_at: now,
            next_due: None,
        };
        let report = self.reports.generate(&cfg, action, now).await?;
        info!(
            domain = %cfg.domain_id,
            name = %cfg.name,
            %action,
            rows = report.rows(),
            "on-demand report generated"
        );
        Ok(report)
    }
}
