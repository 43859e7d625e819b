//! Store abstractions over the three persisted collections
//! (supplies, dispatches, dispatch items).
//!
//! Backends assign identities, never reuse them, and create a dispatch together
//! with all of its items as one unit of work.

pub mod in_memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use ravenpost_catalog::{NewSupply, Supply, SupplyFilter};
use ravenpost_core::{DispatchId, DomainError, SupplyId};
use ravenpost_dispatch::{Dispatch, DispatchDetail, DispatchLine, DispatchSummary};
use ravenpost_reports::{DailyReport, ReportWindow};

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation error.
///
/// `Domain` carries deterministic business failures (validation, not found,
/// conflicts). `Backend` is an unexpected storage failure; it is never retried
/// and surfaces to callers as a server error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("store failure during {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::Domain(DomainError::not_found())
    }

    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            StoreError::Domain(e) => Some(e),
            StoreError::Backend { .. } => None,
        }
    }
}

/// Catalog management operations.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Supplies matching `filter`, in identity order.
    async fn list_supplies(&self, filter: &SupplyFilter) -> StoreResult<Vec<Supply>>;

    async fn get_supply(&self, id: SupplyId) -> StoreResult<Option<Supply>>;

    async fn create_supply(&self, input: NewSupply) -> StoreResult<Supply>;

    /// Full replacement. Fails with `NotFound` when `id` is absent.
    async fn replace_supply(&self, id: SupplyId, input: NewSupply) -> StoreResult<Supply>;

    /// Fails with `NotFound` when absent and `Conflict` when any dispatch item references it.
    async fn delete_supply(&self, id: SupplyId) -> StoreResult<()>;
}

/// Dispatch creation, queries and reporting.
#[async_trait]
pub trait DispatchStore: Send + Sync {
    /// Price `lines` against the catalog and persist the dispatch with all of its items.
    ///
    /// Nothing is written when validation fails (empty request, unknown supply).
    async fn create_dispatch(
        &self,
        created_at: DateTime<Utc>,
        lines: &[DispatchLine],
    ) -> StoreResult<Dispatch>;

    /// All dispatches in identity order.
    async fn list_dispatches(&self) -> StoreResult<Vec<DispatchSummary>>;

    async fn get_dispatch(&self, id: DispatchId) -> StoreResult<Option<DispatchDetail>>;

    async fn daily_report(&self, window: ReportWindow) -> StoreResult<DailyReport>;
}
