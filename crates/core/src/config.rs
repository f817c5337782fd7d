use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub engine: EngineConfig,
    pub bus: BusConfig,
    pub smtp: SmtpConfig,
    pub reader: ReaderConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `RULEFLOW_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("RULEFLOW_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            engine: EngineConfig::from_env_profiled(p),
            bus: BusConfig::from_env_profiled(p),
            smtp: SmtpConfig::from_env_profiled(p),
            reader: ReaderConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.engine.tick_interval_secs == 0 {
            return Err(CoreError::InvalidConfig {
                key: "TICK_INTERVAL_SECS".into(),
                value: "0".into(),
            });
        }
        if self.engine.run_info_capacity == 0 {
            return Err(CoreError::InvalidConfig {
                key: "RUN_INFO_CAPACITY".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  engine:  tick={}s, run_info_capacity={}",
            self.engine.tick_interval_secs,
            self.engine.run_info_capacity
        );
        tracing::info!(
            "  bus:     frontend={}, backend={}, inbound_prefix={}",
            self.bus.frontend,
            self.bus.backend,
            self.bus.inbound_prefix
        );
        tracing::info!(
            "  smtp:    host={}, configured={}",
            self.smtp.host.as_deref().unwrap_or("(none)"),
            self.smtp.is_configured()
        );
        tracing::info!(
            "  reader:  url={}",
            self.reader.url.as_deref().unwrap_or("(none)")
        );
    }
}

// ── Engine ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Poller tick interval. Shorter intervals fire closer to the due
    /// instant at the cost of more store queries.
    pub tick_interval_secs: u64,
    /// Bounded capacity of the run-info queue.
    pub run_info_capacity: usize,
    /// Longest a firing waits for room in the run-info queue before dropping.
    pub run_info_send_timeout_ms: u64,
}

impl EngineConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            tick_interval_secs: profiled_env_u64(p, "TICK_INTERVAL_SECS", 60),
            run_info_capacity: profiled_env_usize(p, "RUN_INFO_CAPACITY", 256),
            run_info_send_timeout_ms: profiled_env_u64(p, "RUN_INFO_SEND_TIMEOUT_MS", 50),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn run_info_send_timeout(&self) -> Duration {
        Duration::from_millis(self.run_info_send_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            run_info_capacity: 256,
            run_info_send_timeout_ms: 50,
        }
    }
}

// ── Message bus ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Endpoint publishers connect to (broker XSUB side).
    pub frontend: String,
    /// Endpoint subscribers connect to (broker XPUB side).
    pub backend: String,
    /// Topic prefix for inbound device messages.
    pub inbound_prefix: String,
}

impl BusConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            frontend: profiled_env_or(p, "BUS_FRONTEND", "tcp://127.0.0.1:5555"),
            backend: profiled_env_or(p, "BUS_BACKEND", "tcp://127.0.0.1:5556"),
            inbound_prefix: profiled_env_or(p, "BUS_INBOUND_PREFIX", "m."),
        }
    }
}

// ── SMTP ──────────────────────────────────────────────────────

#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub tls: bool,
    pub from: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

impl SmtpConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_opt(p, "SMTP_HOST"),
            port: profiled_env_u16(p, "SMTP_PORT", 587),
            tls: profiled_env_or(p, "SMTP_TLS", "true") == "true",
            from: profiled_env_or(p, "SMTP_FROM", "reports@localhost"),
            username: profiled_env_opt(p, "SMTP_USERNAME"),
            password: profiled_env_opt(p, "SMTP_PASSWORD"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.host.is_some()
    }

    /// Username and password, when both are set.
    pub fn credentials(&self) -> Option<(String, String)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.clone(), pass.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("from", &self.from)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

// ── Readers service ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl ReaderConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "READER_URL"),
            timeout_secs: profiled_env_u64(p, "READER_TIMEOUT_SECS", 30),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
