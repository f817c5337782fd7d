//! Query contract shared by rule and report listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StatusFilter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Oldest first.
    #[default]
    Asc,
    Desc,
}

/// Filters and window of a listing. Unset filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub offset: u64,
    /// `None` returns every match after `offset`.
    #[serde(default)]
    pub limit: Option<u64>,
    /// Case-insensitive substring of the name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub domain_id: Option<String>,
    /// Rules only.
    #[serde(default)]
    pub input_channel: Option<String>,
    /// Rules only.
    #[serde(default)]
    pub output_channel: Option<String>,
    #[serde(default)]
    pub status: StatusFilter,
    /// Only entities whose next due instant is at or before this.
    #[serde(default)]
    pub scheduled_before: Option<DateTime<Utc>>,
    /// `Some(true)`: time-triggered only. `Some(false)`: message-triggered only.
    #[serde(default)]
    pub scheduled: Option<bool>,
    #[serde(default)]
    pub dir: Direction,
}

impl PageMeta {
    /// Enabled, time-triggered entities due at or before `now`.
    pub fn due(now: DateTime<Utc>) -> Self {
        Self {
            status: StatusFilter::Enabled,
            scheduled_before: Some(now),
            scheduled: Some(true),
            ..Self::default()
        }
    }

    /// Enabled, message-triggered rules listening on a domain channel.
    pub fn listeners(domain_id: &str, channel: &str) -> Self {
        Self {
            domain_id: Some(domain_id.to_string()),
            input_channel: Some(channel.to_string()),
            status: StatusFilter::Enabled,
            scheduled: Some(false),
            ..Self::default()
        }
    }

    pub fn window(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    pub fn in_domain(mut self, domain_id: &str) -> Self {
        self.domain_id = Some(domain_id.to_string());
        self
    }

    /// Whether `name` passes the name filter.
    pub fn name_matches(&self, name: &str) -> bool {
        match &self.name {
            None => true,
            Some(needle) => name.to_lowercase().contains(&needle.to_lowercase()),
        }
    }

    /// Whether a next-due instant passes the `scheduled_before` cutoff.
    pub fn due_matches(&self, next_due: Option<DateTime<Utc>>) -> bool {
        match self.scheduled_before {
            None => true,
            Some(cutoff) => next_due.is_some_and(|d| d <= cutoff),
        }
    }
}

/// One page of a listing. `total` counts every match, not just `items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub offset: u64,
    pub limit: Option<u64>,
    pub total: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Cut a page out of the full, already ordered match list.
    pub fn slice(matches: Vec<T>, pm: &PageMeta) -> Self {
        let total = matches.len() as u64;
        let offset = usize::try_from(pm.offset).unwrap_or(usize::MAX);
        let iter = matches.into_iter().skip(offset);
        let items = match pm.limit {
            Some(limit) => iter
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            None => iter.collect(),
        };
        Self {
            offset: pm.offset,
            limit: pm.limit,
            total,
            items,
        }
    }
}
