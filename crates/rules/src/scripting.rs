//! Pluggable rule logic.
//!
//! Each [`ScriptKind`] is served by one [`ScriptRunner`] registered in a
//! [`ScriptRegistry`] at startup. The engine only orchestrates: it hands a
//! rule and the triggering message to the runner and publishes whatever
//! comes back. Interpreters for Lua and Go scripts live outside this crate
//! and plug in through the same trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use ruleflow_bus::Message;
use ruleflow_notify::TemplateRenderer;

use crate::schema::{Rule, ScriptKind};

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("no runner registered for {0} scripts")]
    Unsupported(ScriptKind),

    #[error("script failed: {0}")]
    Runtime(String),
}

/// Runs one kind of script. `Ok(None)` means the script produced no output.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    fn kind(&self) -> ScriptKind;

    async fn run(&self, rule: &Rule, message: &Message) -> Result<Option<Vec<u8>>, ScriptError>;
}

/// Script runners keyed by kind.
#[derive(Default, Clone)]
pub struct ScriptRegistry {
    runners: HashMap<ScriptKind, Arc<dyn ScriptRunner>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in template runner.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TemplateRunner::new()));
        registry
    }

    /// Register a runner, replacing any previous runner of the same kind.
    pub fn register(&mut self, runner: Arc<dyn ScriptRunner>) {
        self.runners.insert(runner.kind(), runner);
    }

    pub fn supports(&self, kind: ScriptKind) -> bool {
        self.runners.contains_key(&kind)
    }

    /// Run the rule's logic against `message`.
    pub async fn run(&self, rule: &Rule, message: &Message) -> Result<Option<Vec<u8>>, ScriptError> {
        let runner = self
            .runners
            .get(&rule.logic.kind)
            .ok_or(ScriptError::Unsupported(rule.logic.kind))?;
        runner.run(rule, message).await
    }
}

// ── Template runner ─────────────────────────────────────────────────

#[derive(Serialize)]
struct MessageContext<'a> {
    domain: &'a str,
    channel: &'a str,
    publisher: &'a str,
    created: String,
}

#[derive(Serialize)]
struct RuleContext<'a> {
    id: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct ScriptContext<'a> {
    rule: RuleContext<'a>,
    message: MessageContext<'a>,
    payload: serde_json::Value,
}

/// Renders the rule's code as a minijinja template.
///
/// The template sees `rule`, `message` and `payload` (the payload parsed as
/// JSON when possible, otherwise as text). A blank render produces no output.
#[derive(Debug, Default)]
pub struct TemplateRunner {
    renderer: TemplateRenderer,
}

impl TemplateRunner {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScriptRunner for TemplateRunner {
    fn kind(&self) -> ScriptKind {
        ScriptKind::Template
    }

    async fn run(&self, rule: &Rule, message: &Message) -> Result<Option<Vec<u8>>, ScriptError> {
        let ctx = ScriptContext {
            rule: RuleContext {
                id: &rule.id,
                name: &rule.name,
            },
            message: MessageContext {
                domain: &message.domain,
                channel: &message.channel,
                publisher: &message.publisher,
                created: message.created.to_rfc3339(),
            },
            payload: message.payload_value(),
        };
        let rendered = self
            .renderer
            .render(&rule.logic.code, &ctx)
            .map_err(|e| ScriptError::Runtime(e.to_string()))?;
        if rendered.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(rendered.into_bytes()))
    }
}
