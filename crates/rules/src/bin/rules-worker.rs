//! rules-worker: runs the rule engine against the message bus.
//!
//! - Subscribes to inbound channel messages and dispatches them to
//!   message-triggered rules
//! - Polls the store on a fixed interval for due rules and report configs
//! - Publishes rule output back onto the bus

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ruleflow_bus::{EventPublisher, EventSubscriber, Transport, ZmqPublisher, ZmqSubscriber};
use ruleflow_core::config::{load_dotenv, Config};
use ruleflow_core::UuidProvider;
use ruleflow_notify::{Emailer, SmtpEmailer};
use ruleflow_rules::executor::Executor;
use ruleflow_rules::report::reader::{HttpReader, Reader, UnconfiguredReader};
use ruleflow_rules::report::ReportRunner;
use ruleflow_rules::repository::{InMemoryRepository, Repository};
use ruleflow_rules::run_info::RunInfoSink;
use ruleflow_rules::scripting::ScriptRegistry;
use ruleflow_rules::seed;
use ruleflow_rules::ticker::IntervalTicker;
use ruleflow_rules::{Engine, Shutdown};

// ── CLI ─────────────────────────────────────────────────────────────

/// Rule engine worker: message dispatch and scheduled firing.
#[derive(Parser, Debug)]
#[command(name = "rules-worker", version, about)]
struct Cli {
    /// YAML file of rules and report configs to preload.
    #[arg(long, env = "RULES_SEED")]
    seed: Option<PathBuf>,

    /// Override the poll interval in seconds.
    #[arg(long, env = "RULES_TICK_SECS")]
    tick_secs: Option<u64>,

    /// Stop the scheduler after this many seconds (for smoke runs).
    #[arg(long)]
    run_for_secs: Option<u64>,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(secs) = cli.tick_secs {
        config.engine.tick_interval_secs = secs;
    }
    config.validate()?;
    config.log_summary();

    // Bus
    let frontend = Transport::parse(&config.bus.frontend)?;
    let backend = Transport::parse(&config.bus.backend)?;
    let publisher = Arc::new(
        ZmqPublisher::connect(&frontend)
            .await
            .context("connecting bus publisher")?
            .with_prefix(config.bus.inbound_prefix.clone()),
    );
    let subscriber = ZmqSubscriber::connect(&backend)
        .await
        .context("connecting bus subscriber")?;
    subscriber.subscribe(&config.bus.inbound_prefix).await?;

    // Reports
    let reader: Arc<dyn Reader> = match &config.reader.url {
        Some(url) => Arc::new(HttpReader::new(url, config.reader.timeout())?),
        None => {
            warn!("READER_URL not set, scheduled reports will fail");
            Arc::new(UnconfiguredReader)
        }
    };
    let mut reports = ReportRunner::new(reader);
    if let Some(host) = config.smtp.host.as_deref() {
        let emailer: Arc<dyn Emailer> = Arc::new(SmtpEmailer::from_config(
            host,
            Some(config.smtp.port),
            Some(config.smtp.tls),
            &config.smtp.from,
            config.smtp.credentials(),
        )?);
        reports = reports.with_emailer(emailer);
    }

    // Run info
    let (run_info, mut records) = RunInfoSink::channel(
        config.engine.run_info_capacity,
        config.engine.run_info_send_timeout(),
    );
    tokio::spawn(async move {
        while let Some(record) = records.recv().await {
            if let Ok(json) = serde_json::to_string(&record) {
                tracing::debug!(target: "run_info", "{}", json);
            }
        }
    });

    let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
    let publisher: Arc<dyn EventPublisher> = publisher;
    let executor = Executor::new(Arc::new(ScriptRegistry::with_builtins()), publisher);
    let engine = Engine::new(repo, Arc::new(UuidProvider), executor, reports, run_info);

    if let Some(path) = &cli.seed {
        let results = seed::load_file(&engine, path)
            .await
            .with_context(|| format!("loading seed file {}", path.display()))?;
        let failed = results.iter().filter(|r| !r.is_loaded()).count();
        if failed > 0 {
            warn!(failed, "some seed entries were rejected");
        }
    }

    let token = CancellationToken::new();
    let mut shutdown = Shutdown::new(token.clone());
    if let Some(secs) = cli.run_for_secs {
        shutdown = shutdown.with_timeout(Duration::from_secs(secs));
    }

    // Scheduler
    let scheduler = {
        let engine = engine.clone();
        let token = token.clone();
        let ticker = IntervalTicker::new(config.engine.tick_interval());
        tokio::spawn(async move {
            let reason = engine.start_scheduler(shutdown, &ticker).await;
            token.cancel();
            reason
        })
    };

    // Dispatch
    let dispatcher = {
        let token = token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    result = subscriber.recv() => match result {
                        Ok(message) => {
                            let engine = engine.clone();
                            tokio::spawn(async move {
                                if let Err(e) = engine.handle(&message).await {
                                    error!(
                                        domain = %message.domain,
                                        channel = %message.channel,
                                        error = %e,
                                        "message dispatch failed"
                                    );
                                }
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "subscriber recv error");
                            tokio::time::sleep(Duration::from_millis(100)).await;
                        }
                    }
                }
            }
        })
    };

    info!("rules-worker running");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupt received"),
        _ = token.cancelled() => {}
    }
    token.cancel();

    let reason = scheduler.await.context("scheduler task panicked")?;
    info!(%reason, "scheduler exited");
    dispatcher.await.context("dispatcher task panicked")?;
    info!("rules-worker exited cleanly");
    Ok(())
}
