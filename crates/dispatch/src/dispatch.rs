use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ravenpost_core::{DispatchId, DispatchItemId, DomainError, DomainResult, Entity, SupplyId};

/// Requested line: a quantity of a supply, referenced by identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DispatchLine {
    pub supply_id: SupplyId,
    /// Zero and negative quantities are accepted and priced as given.
    pub quantity: i32,
}

impl DispatchLine {
    pub fn new(supply_id: SupplyId, quantity: i32) -> Self {
        Self {
            supply_id,
            quantity,
        }
    }
}

/// Persisted line of a dispatch.
///
/// `line_cost` is the supply price at creation time times the quantity. It is a
/// snapshot and is never recomputed when the supply price changes later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchItem {
    pub id: DispatchItemId,
    pub dispatch_id: DispatchId,
    pub supply_id: SupplyId,
    pub quantity: i32,
    pub line_cost: Decimal,
}

/// Aggregate root: Dispatch.
///
/// Created together with its items as one unit and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispatch {
    pub id: DispatchId,
    pub created_at: DateTime<Utc>,
    pub total_cost: Decimal,
    pub items: Vec<DispatchItem>,
}

impl Entity for Dispatch {
    type Id = DispatchId;

    fn id(&self) -> DispatchId {
        self.id
    }
}

impl Dispatch {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of the frozen line costs.
    pub fn items_total(&self) -> Decimal {
        self.items.iter().map(|i| i.line_cost).sum()
    }
}

/// A requested line after its price has been resolved.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub supply_id: SupplyId,
    pub quantity: i32,
    pub line_cost: Decimal,
}

/// Validated, priced dispatch that has not been assigned identities yet.
///
/// Stores turn a draft into a [`Dispatch`] inside their unit of work, so either
/// the dispatch and all of its items become visible or none of them do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchDraft {
    created_at: DateTime<Utc>,
    total_cost: Decimal,
    lines: Vec<PricedLine>,
}

impl DispatchDraft {
    /// Price every requested line in input order.
    ///
    /// `price_of` resolves the current price of a supply, or `None` when the
    /// supply does not exist. Duplicate supply ids produce separate lines.
    pub fn build<F>(
        created_at: DateTime<Utc>,
        lines: &[DispatchLine],
        mut price_of: F,
    ) -> DomainResult<Self>
    where
        F: FnMut(SupplyId) -> Option<Decimal>,
    {
        if lines.is_empty() {
            return Err(DomainError::validation(
                "dispatch must contain at least one item",
            ));
        }

        let mut total = Decimal::ZERO;
        let mut priced = Vec::with_capacity(lines.len());

        for line in lines {
            let price = price_of(line.supply_id).ok_or_else(|| {
                DomainError::validation(format!("supply {} not found", line.supply_id))
            })?;

            let line_cost = price
                .checked_mul(Decimal::from(line.quantity))
                .ok_or_else(|| {
                    DomainError::validation(format!(
                        "line cost overflow for supply {}",
                        line.supply_id
                    ))
                })?;

            total = total
                .checked_add(line_cost)
                .ok_or_else(|| DomainError::validation("dispatch total overflow"))?;

            priced.push(PricedLine {
                supply_id: line.supply_id,
                quantity: line.quantity,
                line_cost,
            });
        }

        Ok(Self {
            created_at,
            total_cost: total,
            lines: priced,
        })
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn total_cost(&self) -> Decimal {
        self.total_cost
    }

    pub fn lines(&self) -> &[PricedLine] {
        &self.lines
    }

    /// Attach store-assigned identities. `item_ids` yields one id per line, in line order.
    pub fn into_dispatch<I>(self, id: DispatchId, item_ids: I) -> Dispatch
    where
        I: IntoIterator<Item = DispatchItemId>,
    {
        let items = self
            .lines
            .into_iter()
            .zip(item_ids)
            .map(|(line, item_id)| DispatchItem {
                id: item_id,
                dispatch_id: id,
                supply_id: line.supply_id,
                quantity: line.quantity,
                line_cost: line.line_cost,
            })
            .collect();

        Dispatch {
            id,
            created_at: self.created_at,
            total_cost: self.total_cost,
            items,
        }
    }
}
