//! Catalog domain module.
//!
//! This crate contains the business rules for supplies (priced catalog items),
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod supply;

pub use supply::{NewSupply, Supply, SupplyFilter};
