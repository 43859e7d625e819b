//! Dispatch (order) domain module.
//!
//! This crate contains the dispatch aggregate and the rules for building one
//! from a list of requested lines, implemented purely as deterministic domain
//! logic (no IO, no HTTP, no storage).

pub mod dispatch;
pub mod views;

pub use dispatch::{Dispatch, DispatchDraft, DispatchItem, DispatchLine, PricedLine};
pub use views::{DispatchDetail, DispatchDetailItem, DispatchSummary};
