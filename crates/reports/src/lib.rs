//! Daily dispatch reporting.
//!
//! Resolves the requested UTC calendar day and aggregates the dispatches that
//! fall inside it: count, revenue, and the best-moving supplies.

pub mod daily;

pub use daily::{
    DailyReport, ReportWindow, TOP_SUPPLIES_LIMIT, TopSupply, rank_top_supplies, resolve_report_date,
};
