//! Topic naming for PUB/SUB routing.
//!
//! Topics follow `{prefix}{domain}.{channel}`. The prefix separates device
//! traffic from other publishers sharing the broker.

/// Prefix used for device and rule output messages.
pub const DEFAULT_PREFIX: &str = "m.";

/// Full topic for a domain channel.
pub fn channel_topic(prefix: &str, domain: &str, channel: &str) -> String {
    format!("{prefix}{domain}.{channel}")
}

/// Subscription prefix matching every channel of a domain.
pub fn domain_prefix(prefix: &str, domain: &str) -> String {
    format!("{prefix}{domain}.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_topic_is_prefixed() {
        assert_eq!(channel_topic(DEFAULT_PREFIX, "d1", "temp"), "m.d1.temp");
    }

    #[test]
    fn domain_prefix_matches_its_channels() {
        let prefix = domain_prefix(DEFAULT_PREFIX, "d1");
        assert!(channel_topic(DEFAULT_PREFIX, "d1", "temp").starts_with(&prefix));
        assert!(!channel_topic(DEFAULT_PREFIX, "d10", "temp").starts_with(&prefix));
    }
}
