//! Entity model shared by the store, the dispatch paths and the CRUD service.
//!
//! - `Rule`: message transformation bound to an input channel or a schedule
//! - `ReportConfig`: scheduled report generation
//! - `Status` / `StatusFilter`: stored lifecycle state vs. query wildcard
//! - `PageMeta` / `Page`: filtered, paged queries
//! - `RunInfo`: one firing's outcome

mod page;
mod report;
mod rule;
mod run_info;
mod session;
mod status;

pub use page::*;
pub use report::*;
pub use rule::*;
pub use run_info::*;
pub use session::*;
pub use status::*;
