//! Read-side projections of dispatches returned by the query endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use ravenpost_catalog::Supply;
use ravenpost_core::{DispatchId, DispatchItemId, DomainError, DomainResult, SupplyId};

use crate::dispatch::Dispatch;

/// Listing projection: item detail omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub id: DispatchId,
    pub created_at: DateTime<Utc>,
    pub total_cost: Decimal,
    pub item_count: usize,
}

impl From<&Dispatch> for DispatchSummary {
    fn from(d: &Dispatch) -> Self {
        Self {
            id: d.id,
            created_at: d.created_at,
            total_cost: d.total_cost,
            item_count: d.item_count(),
        }
    }
}

/// Detail projection: every item with the *current* fields of its supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchDetail {
    pub id: DispatchId,
    pub created_at: DateTime<Utc>,
    pub total_cost: Decimal,
    pub items: Vec<DispatchDetailItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchDetailItem {
    pub id: DispatchItemId,
    pub quantity: i32,
    pub line_cost: Decimal,
    pub supply: Supply,
}

impl DispatchDetail {
    /// Join a dispatch with the current catalog entries of its supplies.
    pub fn assemble<F>(dispatch: &Dispatch, mut supply_of: F) -> DomainResult<Self>
    where
        F: FnMut(SupplyId) -> Option<Supply>,
    {
        let items = dispatch
            .items
            .iter()
            .map(|item| {
                let supply = supply_of(item.supply_id).ok_or_else(|| {
                    DomainError::invariant(format!(
                        "dispatch {} references missing supply {}",
                        dispatch.id, item.supply_id
                    ))
                })?;
                Ok(DispatchDetailItem {
                    id: item.id,
                    quantity: item.quantity,
                    line_cost: item.line_cost,
                    supply,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(Self {
            id: dispatch.id,
            created_at: dispatch.created_at,
            total_cost: dispatch.total_cost,
            items,
        })
    }
}
