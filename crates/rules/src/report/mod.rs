//! Report generation: read history, encode an artifact, optionally email it.

pub mod format;
pub mod reader;
pub mod window;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use ruleflow_notify::{Attachment, EmailContent, Emailer, NotifyError, TemplateRenderer};

use crate::schema::{
    Artifact, MetricSelector, ReportAction, ReportConfig, RunInfo, RunKind,
};
use reader::{ReadQuery, Reader, ReaderError, StoredMessage, DEFAULT_READ_LIMIT};
use window::{parse_window, MAX_WINDOW};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("invalid report window '{0}'")]
    Window(String),

    #[error("report has no metrics")]
    NoMetrics,

    #[error("email action requires an email block with recipients")]
    MissingEmail,

    #[error("email delivery is not configured")]
    NoEmailer,

    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("failed to encode report: {0}")]
    Format(String),

    #[error("email failed: {0}")]
    Email(#[from] NotifyError),
}

impl ReportError {
    /// Errors caused by the request itself rather than a collaborator.
    pub fn is_invalid_request(&self) -> bool {
        matches!(
            self,
            ReportError::Window(_) | ReportError::NoMetrics | ReportError::MissingEmail
        )
    }
}

/// Data read for one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport {
    pub metric: MetricSelector,
    pub messages: Vec<StoredMessage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedReport {
    pub name: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub reports: Vec<MetricReport>,
    /// Present for `save` and `email`.
    pub artifact: Option<Artifact>,
}

impl GeneratedReport {
    pub fn rows(&self) -> usize {
        self.reports.iter().map(|r| r.messages.len()).sum()
    }
}

#[derive(Serialize)]
struct EmailReportContext<'a> {
    report: EmailReportMeta<'a>,
    from: String,
    to: String,
    rows: usize,
    metrics: usize,
    file: &'a str,
}

#[derive(Serialize)]
struct EmailReportMeta<'a> {
    id: &'a str,
    name: &'a str,
    domain_id: &'a str,
}

fn slug(name: &str) -> String {
    let s: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if s.is_empty() { "report".to_string() } else { s }
}

pub struct ReportRunner {
    reader: Arc<dyn Reader>,
    emailer: Option<Arc<dyn Emailer>>,
    renderer: TemplateRenderer,
}

impl ReportRunner {
    pub fn new(reader: Arc<dyn Reader>) -> Self {
        Self {
            reader,
            emailer: None,
            renderer: TemplateRenderer::new(),
        }
    }

    pub fn with_emailer(mut self, emailer: Arc<dyn Emailer>) -> Self {
        self.emailer = Some(emailer);
        self
    }

    /// Action used for scheduled runs: email when the config says where to.
    pub fn scheduled_action(cfg: &ReportConfig) -> ReportAction {
        if cfg.params.email.is_some() {
            ReportAction::Email
        } else {
            ReportAction::Save
        }
    }

    /// Generate a report covering the configured window ending at `now`.
    pub async fn generate(
        &self,
        cfg: &ReportConfig,
        action: ReportAction,
        now: DateTime<Utc>,
    ) -> Result<GeneratedReport, ReportError> {
        let params = &cfg.params;
        if params.metrics.is_empty() {
            return Err(ReportError::NoMetrics);
        }
        let from = parse_window(&params.window)
            .filter(|w| *w <= MAX_WINDOW)
            .and_then(|w| chrono::Duration::from_std(w).ok())
            .and_then(|w| now.checked_sub_signed(w))
            .ok_or_else(|| ReportError::Window(params.window.clone()))?;
        let email = match action {
            ReportAction::Email => {
                let email = params
                    .email
                    .as_ref()
                    .filter(|e| !e.to.is_empty())
                    .ok_or(ReportError::MissingEmail)?;
                let emailer = self.emailer.as_ref().ok_or(ReportError::NoEmailer)?;
                Some((email, emailer))
            }
            _ => None,
        };

        let mut reports = Vec::with_capacity(params.metrics.len());
        for metric in &params.metrics {
            let query = ReadQuery {
                domain_id: cfg.domain_id.clone(),
                channel_id: metric.channel_id.clone(),
                publisher: metric.client_id.clone(),
                name: metric.name.clone(),
                from,
                to: now,
                limit: params.limit.unwrap_or(DEFAULT_READ_LIMIT),
            };
            let messages = self.reader.read_messages(&query).await?;
            reports.push(MetricReport {
                metric: metric.clone(),
                messages,
            });
        }

        let mut generated = GeneratedReport {
            name: cfg.name.clone(),
            from,
            to: now,
            reports,
            artifact: None,
        };
        if action == ReportAction::View {
            return Ok(generated);
        }

        let artifact = Artifact {
            name: format!(
                "{}_{}.{}",
                slug(&cfg.name),
                now.format("%Y%m%d_%H%M%S"),
                params.format.extension()
            ),
            format: params.format,
            data: format::encode(&generated.reports, params.format)?,
        };

        if let Some((email, emailer)) = email {
            let ctx = EmailReportContext {
                report: EmailReportMeta {
                    id: &cfg.id,
                    name: &cfg.name,
                    domain_id: &cfg.domain_id,
                },
                from: from.to_rfc3339(),
                to: now.to_rfc3339(),
                rows: generated.rows(),
                metrics: generated.reports.len(),
                file: &artifact.name,
            };
            let content = EmailContent {
                subject: self.renderer.render(&email.subject, &ctx)?,
                body: self.renderer.render(&email.content, &ctx)?,
                attachment: Some(Attachment {
                    filename: artifact.name.clone(),
                    content_type: params.format.content_type().to_string(),
                    data: artifact.data.clone(),
                }),
            };
            emailer.send(&email.to, &content).await?;
            debug!(report_id = %cfg.id, recipients = email.to.len(), "report emailed");
        }

        generated.artifact = Some(artifact);
        Ok(generated)
    }

    /// Scheduled run: generate with [`Self::scheduled_action`] and describe
    /// the outcome as a [`RunInfo`].
    pub async fn run(&self, cfg: &ReportConfig, now: DateTime<Utc>) -> (Option<Artifact>, RunInfo) {
        let started = Utc::now();
        let action = Self::scheduled_action(cfg);
        match self.generate(cfg, action, now).await {
            Ok(report) => {
                let info = RunInfo::success(
                    RunKind::Report,
                    &cfg.id,
                    &cfg.domain_id,
                    started,
                    format!(
                        "report '{}' generated ({} rows, action {})",
                        cfg.name,
                        report.rows(),
                        action
                    ),
                );
                (report.artifact, info)
            }
            Err(e) => (
                None,
                RunInfo::failure(
                    RunKind::Report,
                    &cfg.id,
                    &cfg.domain_id,
                    started,
                    format!("report '{}' failed: {}", cfg.name, e),
                ),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use tokio::sync::Mutex;

    use crate::schedule::Schedule;
    use crate::schema::{EmailSetting, Outcome, ReportFormat, ReportParams, Status};

    struct FixedReader {
        queries: Mutex<Vec<ReadQuery>>,
    }

    #[async_trait]
    impl Reader for FixedReader {
        async fn read_messages(&self, query: &ReadQuery) -> Result<Vec<StoredMessage>, ReaderError> {
            self.queries.lock().await.push(query.clone());
            Ok(vec![StoredMessage {
                channel: query.channel_id.clone(),
                publisher: "s1".into(),
                name: "t".into(),
                unit: None,
                time: query.to,
                value: json!(1),
            }])
        }
    }

    #[derive(Default)]
    struct MockEmailer {
        sent: AtomicUsize,
        last: Mutex<Option<(Vec<String>, EmailContent)>>,
    }

    #[async_trait]
    impl Emailer for MockEmailer {
        async fn send(&self, recipients: &[String], email: &EmailContent) -> Result<(), NotifyError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().await = Some((recipients.to_vec(), email.clone()));
            Ok(())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn config(email: Option<EmailSetting>) -> ReportConfig {
        ReportConfig {
            id: "rep1".into(),
            name: "Boiler Room".into(),
            domain_id: "d1".into(),
            schedule: Schedule::once(now()),
            status: Status::Enabled,
            params: ReportParams {
                metrics: vec![
                    MetricSelector {
                        channel_id: "temp".into(),
                        client_id: Some("s1".into()),
                        name: None,
                    },
                    MetricSelector {
                        channel_id: "hum".into(),
                        client_id: None,
                        name: None,
                    },
                ],
                window: "2h".into(),
                format: ReportFormat::Csv,
                limit: None,
                email,
            },
            created_by: "u".into(),
            created_at: now(),
            updated_by: "u".into(),
            updated_at: now(),
            next_due: None,
        }
    }

    fn email() -> EmailSetting {
        EmailSetting {
            to: vec!["ops@example.com".into()],
            subject: "{{ report.name }}: {{ rows }} rows".into(),
            content: "Attached: {{ file }}".into(),
        }
    }

    fn reader() -> Arc<FixedReader> {
        Arc::new(FixedReader {
            queries: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn view_reads_each_metric_without_artifact() {
        let reader = reader();
        let runner = ReportRunner::new(reader.clone());
        let report = runner
            .generate(&config(None), ReportAction::View, now())
            .await
            .unwrap();

        assert_eq!(report.rows(), 2);
        assert!(report.artifact.is_none());
        let queries = reader.queries.lock().await;
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].publisher.as_deref(), Some("s1"));
        assert_eq!(queries[0].from, now() - chrono::Duration::hours(2));
        assert_eq!(queries[0].limit, DEFAULT_READ_LIMIT);
    }

    #[tokio::test]
    async fn save_produces_named_artifact() {
        let runner = ReportRunner::new(reader());
        let report = runner
            .generate(&config(None), ReportAction::Save, now())
            .await
            .unwrap();
        let artifact = report.artifact.unwrap();
        assert_eq!(artifact.name, "boiler_room_20240601_120000.csv");
        assert_eq!(artifact.format, ReportFormat::Csv);
        assert!(artifact.data.starts_with(b"channel,"));
    }

    #[tokio::test]
    async fn email_renders_templates_and_attaches() {
        let emailer = Arc::new(MockEmailer::default());
        let runner = ReportRunner::new(reader()).with_emailer(emailer.clone());
        runner
            .generate(&config(Some(email())), ReportAction::Email, now())
            .await
            .unwrap();

        assert_eq!(emailer.sent.load(Ordering::SeqCst), 1);
        let last = emailer.last.lock().await;
        let (to, content) = last.as_ref().unwrap();
        assert_eq!(to, &vec!["ops@example.com".to_string()]);
        assert_eq!(content.subject, "Boiler Room: 2 rows");
        assert_eq!(content.body, "Attached: boiler_room_20240601_120000.csv");
        assert_eq!(content.attachment.as_ref().unwrap().content_type, "text/csv");
    }

    #[tokio::test]
    async fn email_without_block_is_invalid() {
        let runner = ReportRunner::new(reader()).with_emailer(Arc::new(MockEmailer::default()));
        let err = runner
            .generate(&config(None), ReportAction::Email, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::MissingEmail));
        assert!(err.is_invalid_request());
    }

    #[tokio::test]
    async fn email_without_emailer_fails_before_reading() {
        let reader = reader();
        let runner = ReportRunner::new(reader.clone());
        let err = runner
            .generate(&config(Some(email())), ReportAction::Email, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::NoEmailer));
        assert!(reader.queries.lock().await.is_empty());
    }

    #[tokio::test]
    async fn bad_window_is_invalid() {
        let mut cfg = config(None);
        cfg.params.window = "soon".into();
        let err = ReportRunner::new(reader())
            .generate(&cfg, ReportAction::View, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Window(_)));
    }

    #[tokio::test]
    async fn oversized_window_is_invalid_not_a_panic() {
        let reader = reader();
        let mut cfg = config(None);
        cfg.params.window = "99999999d".into();
        let err = ReportRunner::new(reader.clone())
            .generate(&cfg, ReportAction::View, now())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Window(_)));
        assert!(reader.queries.lock().await.is_empty());

        let (_, info) = ReportRunner::new(reader.clone()).run(&cfg, now()).await;
        assert_eq!(info.outcome, Outcome::Failure);
    }

    #[tokio::test]
    async fn window_reaching_before_the_calendar_is_invalid() {
        let mut cfg = config(None);
        cfg.params.window = "3650d".into();
        let start = DateTime::<Utc>::MIN_UTC + chrono::Duration::days(1);
        let err = ReportRunner::new(reader())
            .generate(&cfg, ReportAction::View, start)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Window(_)));
    }

    #[tokio::test]
    async fn scheduled_run_picks_action_from_config() {
        let emailer = Arc::new(MockEmailer::default());
        let runner = ReportRunner::new(reader()).with_emailer(emailer.clone());

        let (artifact, info) = runner.run(&config(None), now()).await;
        assert!(artifact.is_some());
        assert_eq!(info.outcome, Outcome::Success);
        assert_eq!(emailer.sent.load(Ordering::SeqCst), 0);

        let (_, info) = runner.run(&config(Some(email())), now()).await;
        assert!(info.is_success());
        assert_eq!(emailer.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn scheduled_failure_becomes_run_info() {
        let mut cfg = config(None);
        cfg.params.metrics.clear();
        let (artifact, info) = ReportRunner::new(reader()).run(&cfg, now()).await;
        assert!(artifact.is_none());
        assert_eq!(info.outcome, Outcome::Failure);
        assert_eq!(info.kind, RunKind::Report);
    }
}
