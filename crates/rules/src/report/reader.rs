//! Historical message queries backing report generation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("reader request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reader not configured: {0}")]
    Config(String),
}

/// One stored measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub channel: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub time: DateTime<Utc>,
    /// Numeric, string or boolean reading.
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadQuery {
    pub domain_id: String,
    pub channel_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub limit: u64,
}

/// Default per-metric row cap.
pub const DEFAULT_READ_LIMIT: u64 = 1000;

#[async_trait]
pub trait Reader: Send + Sync {
    async fn read_messages(&self, query: &ReadQuery) -> Result<Vec<StoredMessage>, ReaderError>;
}

#[derive(Deserialize)]
struct ReadResponse {
    #[serde(default)]
    messages: Vec<StoredMessage>,
}

#[derive(Serialize)]
struct QueryParams<'a> {
    from: String,
    to: String,
    limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    publisher: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

/// Reader backed by the readers service HTTP API:
/// `GET {base}/{domain}/channels/{channel}/messages?from=..&to=..&limit=..`.
#[derive(Debug, Clone)]
pub struct HttpReader {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReader {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ReaderError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ReaderError::Config("empty base url".into()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn messages_url(&self, query: &ReadQuery) -> String {
        format!(
            "{}/{}/channels/{}/messages",
            self.base_url, query.domain_id, query.channel_id
        )
    }
}

#[async_trait]
impl Reader for HttpReader {
    async fn read_messages(&self, query: &ReadQuery) -> Result<Vec<StoredMessage>, ReaderError> {
        let params = QueryParams {
            from: query.from.to_rfc3339(),
            to: query.to.to_rfc3339(),
            limit: query.limit,
            publisher: query.publisher.as_deref(),
            name: query.name.as_deref(),
        };
        let resp: ReadResponse = self
            .client
            .get(self.messages_url(query))
            .query(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        tracing::debug!(
            channel = %query.channel_id,
            rows = resp.messages.len(),
            "read historical messages"
        );
        Ok(resp.messages)
    }
}

/// Stand-in when no reader service is configured. Every read fails, so
/// report runs are recorded as failures instead of producing empty files.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredReader;

#[async_trait]
impl Reader for UnconfiguredReader {
    async fn read_messages(&self, _query: &ReadQuery) -> Result<Vec<StoredMessage>, ReaderError> {
        Err(ReaderError::Config("READER_URL is not set".into()))
    }
}
