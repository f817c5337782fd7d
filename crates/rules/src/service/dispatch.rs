use chrono::Utc;
use tracing::{debug, warn};

use ruleflow_bus::Message;

use super::{Engine, EngineError};
use crate::schema::PageMeta;

impl Engine {
    /// Run every enabled, message-triggered rule listening on the message's
    /// domain channel, then fire report configs of that domain that are due.
    ///
    /// Per-rule failures end up in run info. The only error returned is a
    /// failed rule lookup, and the report pass still runs in that case.
    pub async fn handle(&self, message: &Message) -> Result<(), EngineError> {
        let listed = self
            .repo
            .list_rules(&PageMeta::listeners(&message.domain, &message.channel))
            .await;

        match &listed {
            Ok(page) => {
                for rule in &page.items {
                    if !rule.accepts(message.created) {
                        debug!(rule_id = %rule.id, "message predates rule start");
                        continue;
                    }
                    let info = self.executor.execute(rule, message).await;
                    self.run_info.record(info).await;
                }
            }
            Err(e) => warn!(
                domain = %message.domain,
                channel = %message.channel,
                error = %e,
                "listener lookup failed"
            ),
        }

        let now = Utc::now();
        let due = PageMeta::due(now).in_domain(&message.domain);
        if let Err(e) = self.fire_due_reports(&due, now).await {
            warn!(domain = %message.domain, error = %e, "report due check failed");
        }

        listed
            .map(|_| ())
            .map_err(EngineError::storage("list rules"))
    }
}
