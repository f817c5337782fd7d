//! Recurrence model and due-time calculation for rules and report configs.
//!
//! A [`Schedule`] describes an anchor instant (`time`) repeated every
//! `recurring_period` units. Occurrence `k` is `time + k * period` units;
//! occurrences before `start_date_time` are never due. All functions here are
//! pure: the store persists the next due instant, the calculator only answers
//! questions about a reference time.
//!
//! Monthly recurrence clamps to the last valid day of the month and is always
//! computed from the anchor, so an anchor on the 31st yields Jan 31, Feb 28
//! (or 29), Mar 31, and so on.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// Recurrence unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurring {
    /// Fire once and never again.
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for Recurring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        };
        f.write_str(s)
    }
}

fn default_period() -> u32 {
    1
}

/// When an entity fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Nothing is due before this instant.
    pub start_date_time: DateTime<Utc>,
    /// Anchor instant; every occurrence shares its time of day.
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub recurring: Recurring,
    /// Multiplier of the recurrence unit. Must be >= 1 when recurring.
    #[serde(default = "default_period")]
    pub recurring_period: u32,
}

impl Schedule {
    /// One-shot schedule firing at `at`.
    pub fn once(at: DateTime<Utc>) -> Self {
        Self {
            start_date_time: at,
            time: at,
            recurring: Recurring::None,
            recurring_period: 1,
        }
    }

    /// Recurring schedule anchored at `time`, active from the anchor on.
    pub fn every(recurring: Recurring, period: u32, time: DateTime<Utc>) -> Self {
        Self {
            start_date_time: time,
            time,
            recurring,
            recurring_period: period,
        }
    }

    pub fn starting(mut self, start: DateTime<Utc>) -> Self {
        self.start_date_time = start;
        self
    }

    pub fn is_recurring(&self) -> bool {
        self.recurring != Recurring::None
    }

    fn period(&self) -> u32 {
        self.recurring_period.max(1)
    }

    /// The single instant a one-shot schedule fires at.
    fn one_shot_instant(&self) -> DateTime<Utc> {
        self.time.max(self.start_date_time)
    }

    /// Occurrence `k` of the raw series, ignoring the start bound.
    /// `None` past the end of a one-shot series or on overflow.
    pub fn occurrence(&self, k: u32) -> Option<DateTime<Utc>> {
        let units = k.checked_mul(self.period())?;
        match self.recurring {
            Recurring::None => (k == 0).then_some(self.time),
            Recurring::Daily => self
                .time
                .checked_add_signed(Duration::try_days(i64::from(units))?),
            Recurring::Weekly => self
                .time
                .checked_add_signed(Duration::try_weeks(i64::from(units))?),
            Recurring::Monthly => self.time.checked_add_months(Months::new(units)),
        }
    }

    /// Index of an occurrence close to `at`. May be off by one in either
    /// direction; callers step to the exact index.
    fn estimate_index(&self, at: DateTime<Utc>) -> u32 {
        if at <= self.time {
            return 0;
        }
        let elapsed = at - self.time;
        let units = match self.recurring {
            Recurring::None => 0,
            Recurring::Daily => elapsed.num_days(),
            Recurring::Weekly => elapsed.num_weeks(),
            Recurring::Monthly => {
                i64::from(at.year() - self.time.year()) * 12 + i64::from(at.month())
                    - i64::from(self.time.month())
            }
        };
        u32::try_from(units.max(0) / i64::from(self.period())).unwrap_or(u32::MAX)
    }

    /// First occurrence at or after `from` (`inclusive`) or strictly after it.
    fn first_occurrence_from(&self, from: DateTime<Utc>, inclusive: bool) -> Option<DateTime<Utc>> {
        let qualifies = |t: DateTime<Utc>| if inclusive { t >= from } else { t > from };
        let mut k = self.estimate_index(from);
        while k > 0 {
            match self.occurrence(k - 1) {
                Some(t) if qualifies(t) => k -= 1,
                _ => break,
            }
        }
        loop {
            let t = self.occurrence(k)?;
            if qualifies(t) {
                return Some(t);
            }
            k = k.checked_add(1)?;
        }
    }

    /// The first due instant of this schedule.
    pub fn first_due(&self) -> Option<DateTime<Utc>> {
        if !self.is_recurring() {
            return Some(self.one_shot_instant());
        }
        self.first_occurrence_from(self.start_date_time, true)
    }

    /// The first due instant strictly after `reference`. `None` when the
    /// schedule has nothing left to fire (a one-shot already behind us).
    pub fn next_due_after(&self, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if !self.is_recurring() {
            let at = self.one_shot_instant();
            return (at > reference).then_some(at);
        }
        if reference < self.start_date_time {
            return self.first_due();
        }
        self.first_occurrence_from(reference, false)
    }

    /// The most recent due instant at or before `now`.
    pub fn latest_occurrence(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if now < self.start_date_time {
            return None;
        }
        if !self.is_recurring() {
            let at = self.one_shot_instant();
            return (at <= now).then_some(at);
        }

        let mut k = self.estimate_index(now);
        loop {
            match self.occurrence(k) {
                Some(t) if t > now => {
                    if k == 0 {
                        return None;
                    }
                    k -= 1;
                }
                Some(_) => break,
                None => return None,
            }
        }
        while let Some(t) = k.checked_add(1).and_then(|n| self.occurrence(n)) {
            if t > now {
                break;
            }
            k += 1;
        }
        self.occurrence(k).filter(|t| *t >= self.start_date_time)
    }

    /// Whether an occurrence at or before `now` has not fired yet.
    ///
    /// `last_fired` is the occurrence most recently fired, if any.
    pub fn is_due(&self, now: DateTime<Utc>, last_fired: Option<DateTime<Utc>>) -> bool {
        match self.latest_occurrence(now) {
            None => false,
            Some(occurrence) => last_fired.map_or(true, |fired| occurrence > fired),
        }
    }

    /// Reject schedules that violate the period invariant.
    pub fn check(&self) -> Result<(), String> {
        if self.is_recurring() && self.recurring_period < 1 {
            return Err(format!(
                "recurring_period must be at least 1 for {} schedules",
                self.recurring
            ));
        }
        Ok(())
    }
}
