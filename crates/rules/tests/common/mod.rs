//! Shared mocks for the engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};

use ruleflow_bus::{BusError, EventPublisher, Message};
use ruleflow_core::{CoreError, IdProvider};
use ruleflow_rules::executor::Executor;
use ruleflow_rules::report::reader::{ReadQuery, Reader, ReaderError, StoredMessage};
use ruleflow_rules::report::ReportRunner;
use ruleflow_rules::repository::{InMemoryRepository, RepoError, Repository};
use ruleflow_rules::run_info::RunInfoSink;
use ruleflow_rules::schedule::Schedule;
use ruleflow_rules::schema::*;
use ruleflow_rules::scripting::ScriptRegistry;
use ruleflow_rules::ticker::Ticker;
use ruleflow_rules::Engine;

// ── Store ───────────────────────────────────────────────────────────

/// In-memory store that counts queries and can be told to fail listings.
///
/// `claim_on_view` and `delete_on_view` make the next `view_*` call act as
/// a concurrent writer: right after the snapshot is read, the due
/// occurrence is claimed or the entity is deleted.
#[derive(Default)]
pub struct CountingRepo {
    inner: InMemoryRepository,
    pub rule_lists: AtomicUsize,
    pub report_lists: AtomicUsize,
    pub fail_lists: AtomicBool,
    pub claim_on_view: AtomicBool,
    pub delete_on_view: AtomicBool,
}

impl CountingRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn queries(&self) -> usize {
        self.rule_lists.load(Ordering::SeqCst) + self.report_lists.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.fail_lists.load(Ordering::SeqCst) {
            Err(RepoError::Backend("store unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Repository for CountingRepo {
    async fn add_rule(&self, rule: Rule) -> Result<Rule, RepoError> {
        self.inner.add_rule(rule).await
    }

    async fn view_rule(&self, id: &str) -> Result<Rule, RepoError> {
        let rule = self.inner.view_rule(id).await?;
        if self.claim_on_view.swap(false, Ordering::SeqCst) {
            if let Some(due) = rule.next_due {
                self.inner.claim_rule_due(id, due, None).await?;
            }
        }
        if self.delete_on_view.swap(false, Ordering::SeqCst) {
            self.inner
                .update_rule_status(id, Status::Deleted, "racer", Utc::now())
                .await?;
        }
        Ok(rule)
    }

    async fn update_rule(&self, rule: &Rule) -> Result<Rule, RepoError> {
        self.inner.update_rule(rule).await
    }

    async fn update_rule_schedule(
        &self,
        id: &str,
        schedule: &Schedule,
        next_due: Option<DateTime<Utc>>,
        updated_by: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Rule, RepoError> {
        self.inner
            .update_rule_schedule(id, schedule, next_due, updated_by, updated_at)
            .await
    }

    async fn update_rule_status(
        &self,
        id: &str,
        status: Status,
        updated_by: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Rule, RepoError> {
        self.inner
            .update_rule_status(id, status, updated_by, updated_at)
            .await
    }

    async fn list_rules(&self, pm: &PageMeta) -> Result<Page<Rule>, RepoError> {
        self.rule_lists.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.list_rules(pm).await
    }

    async fn claim_rule_due(
        &self,
        id: &str,
        expected: DateTime<Utc>,
        next: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError> {
        self.inner.claim_rule_due(id, expected, next).await
    }

    async fn add_report_config(&self, cfg: ReportConfig) -> Result<ReportConfig, RepoError> {
        self.inner.add_report_config(cfg).await
    }

    async fn view_report_config(&self, id: &str) -> Result<ReportConfig, RepoError> {
        let cfg = self.inner.view_report_config(id).await?;
        if self.delete_on_view.swap(false, Ordering::SeqCst) {
            self.inner
                .update_report_status(id, Status::Deleted, "racer", Utc::now())
                .await?;
        }
        Ok(cfg)
    }

    async fn update_report_config(&self, cfg: &ReportConfig) -> Result<ReportConfig, RepoError> {
        self.inner.update_report_config(cfg).await
    }

    async fn update_report_schedule(
        &self,
        id: &str,
        schedule: &Schedule,
        next_due: Option<DateTime<Utc>>,
        updated_by: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<ReportConfig, RepoError> {
        self.inner
            .update_report_schedule(id, schedule, next_due, updated_by, updated_at)
            .await
    }

    async fn update_report_status(
        &self,
        id: &str,
        status: Status,
        updated_by: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<ReportConfig, RepoError> {
        self.inner
            .update_report_status(id, status, updated_by, updated_at)
            .await
    }

    async fn list_reports_config(&self, pm: &PageMeta) -> Result<Page<ReportConfig>, RepoError> {
        self.report_lists.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.list_reports_config(pm).await
    }

    async fn claim_report_due(
        &self,
        id: &str,
        expected: DateTime<Utc>,
        next: Option<DateTime<Utc>>,
    ) -> Result<bool, RepoError> {
        self.inner.claim_report_due(id, expected, next).await
    }
}

// ── Collaborators ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockPublisher {
    pub sent: Mutex<Vec<Message>>,
    pub calls: AtomicUsize,
}

impl MockPublisher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventPublisher for MockPublisher {
    async fn publish(&self, message: Message) -> Result<(), BusError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().await.push(message);
        Ok(())
    }
}

/// Returns one row per query and counts queries.
#[derive(Default)]
pub struct CountingReader {
    pub reads: AtomicUsize,
}

#[async_trait]
impl Reader for CountingReader {
    async fn read_messages(&self, query: &ReadQuery) -> Result<Vec<StoredMessage>, ReaderError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(vec![StoredMessage {
            channel: query.channel_id.clone(),
            publisher: "sensor-1".into(),
            name: "temp".into(),
            unit: Some("C".into()),
            time: query.to,
            value: serde_json::json!(21.5),
        }])
    }
}

/// Sequential ids `{prefix}-00`, `{prefix}-01`, ...
pub struct SeqIds {
    prefix: &'static str,
    next: AtomicUsize,
}

impl SeqIds {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: AtomicUsize::new(0),
        }
    }
}

impl IdProvider for SeqIds {
    fn id(&self) -> Result<String, CoreError> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}-{:02}", self.prefix, n))
    }
}

/// Ticks every `period` until stopped; counts `stop` calls.
pub struct MockTicker {
    period: Duration,
    pub ticks: AtomicUsize,
    pub stops: AtomicUsize,
}

impl MockTicker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ticks: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ticker for MockTicker {
    async fn tick(&self) -> DateTime<Utc> {
        tokio::time::sleep(self.period).await;
        self.ticks.fetch_add(1, Ordering::SeqCst);
        Utc::now()
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub struct Harness {
    pub engine: Engine,
    pub repo: Arc<CountingRepo>,
    pub publisher: Arc<MockPublisher>,
    pub reader: Arc<CountingReader>,
    pub records: mpsc::Receiver<RunInfo>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_repo(CountingRepo::new())
    }

    pub fn with_repo(repo: Arc<CountingRepo>) -> Self {
        let publisher = Arc::new(MockPublisher::default());
        let reader = Arc::new(CountingReader::default());
        let (sink, records) = RunInfoSink::channel(1024, Duration::from_millis(50));
        let executor = Executor::new(Arc::new(ScriptRegistry::with_builtins()), publisher.clone());
        let engine = Engine::new(
            repo.clone(),
            Arc::new(SeqIds::new("id")),
            executor,
            ReportRunner::new(reader.clone()),
            sink,
        );
        Self {
            engine,
            repo,
            publisher,
            reader,
            records,
        }
    }

    /// Run info recorded so far.
    pub fn drain(&mut self) -> Vec<RunInfo> {
        let mut out = Vec::new();
        while let Ok(info) = self.records.try_recv() {
            out.push(info);
        }
        out
    }
}

pub fn session() -> Session {
    Session::new("alice", "d1")
}

pub fn template(code: &str) -> Script {
    Script {
        kind: ScriptKind::Template,
        code: code.into(),
    }
}

/// Message-triggered rule active since yesterday.
pub fn listener(name: &str, input: &str, output: &str) -> NewRule {
    NewRule {
        name: name.into(),
        input_channel: input.into(),
        output_channel: output.into(),
        logic: template("v={{ payload.v }}"),
        schedule: Schedule::once(Utc::now() - chrono::Duration::days(1)),
    }
}

/// Time-triggered rule with the given schedule.
pub fn timed(name: &str, schedule: Schedule) -> NewRule {
    NewRule {
        name: name.into(),
        input_channel: String::new(),
        output_channel: "ticks".into(),
        logic: template("fired {{ rule.name }}"),
        schedule,
    }
}

pub fn report(name: &str, schedule: Schedule) -> NewReportConfig {
    NewReportConfig {
        name: name.into(),
        schedule,
        params: ReportParams {
            metrics: vec![MetricSelector {
                channel_id: "temp".into(),
                client_id: None,
                name: None,
            }],
            window: "24h".into(),
            format: ReportFormat::Csv,
            limit: None,
            email: None,
        },
    }
}
