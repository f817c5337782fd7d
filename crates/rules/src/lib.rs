//! Rule engine and scheduler for domain-scoped message streams.
//!
//! This crate provides:
//! - Recurrence calculation for one-shot, daily, weekly and monthly schedules
//! - Rule and report config model with a status lifecycle
//! - Repository contract with claim-once due updates, plus an in-memory store
//! - Message dispatch to channel-bound rules and pluggable script runners
//! - A tick-driven poller for time-triggered rules and scheduled reports
//! - Report generation from historical data with CSV/JSON artifacts and email delivery

pub mod executor;
pub mod report;
pub mod repository;
pub mod run_info;
pub mod schedule;
pub mod schema;
pub mod scripting;
pub mod seed;
pub mod service;
pub mod ticker;
pub mod validation;

pub use service::{Engine, EngineError, Shutdown};
