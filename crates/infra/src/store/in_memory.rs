use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;

use ravenpost_catalog::{NewSupply, Supply, SupplyFilter};
use ravenpost_core::{DispatchId, DispatchItemId, DomainError, SupplyId};
use ravenpost_dispatch::{Dispatch, DispatchDetail, DispatchDraft, DispatchLine, DispatchSummary};
use ravenpost_reports::{DailyReport, ReportWindow};

use super::{CatalogStore, DispatchStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    supplies: BTreeMap<SupplyId, Supply>,
    dispatches: BTreeMap<DispatchId, Dispatch>,
    last_supply_id: i64,
    last_dispatch_id: i64,
    last_item_id: i64,
}

impl Tables {
    fn next_supply_id(&mut self) -> SupplyId {
        self.last_supply_id += 1;
        SupplyId::new(self.last_supply_id)
    }

    fn next_dispatch_id(&mut self) -> DispatchId {
        self.last_dispatch_id += 1;
        DispatchId::new(self.last_dispatch_id)
    }

    fn next_item_id(&mut self) -> DispatchItemId {
        self.last_item_id += 1;
        DispatchItemId::new(self.last_item_id)
    }

    fn is_referenced(&self, id: SupplyId) -> bool {
        self.dispatches
            .values()
            .flat_map(|d| d.items.iter())
            .any(|i| i.supply_id == id)
    }
}

/// In-memory store for tests/dev.
///
/// A single lock guards all collections; dispatch creation holds the write lock
/// from the first supply lookup until the last item is inserted.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, operation: &'static str) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::backend(operation, "store lock poisoned"))
    }

    fn write(&self, operation: &'static str) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::backend(operation, "store lock poisoned"))
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    #[instrument(skip(self), err)]
    async fn list_supplies(&self, filter: &SupplyFilter) -> StoreResult<Vec<Supply>> {
        let tables = self.read("list_supplies")?;
        Ok(tables
            .supplies
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    #[instrument(skip(self), err)]
    async fn get_supply(&self, id: SupplyId) -> StoreResult<Option<Supply>> {
        let tables = self.read("get_supply")?;
        Ok(tables.supplies.get(&id).cloned())
    }

    #[instrument(skip(self), err)]
    async fn create_supply(&self, input: NewSupply) -> StoreResult<Supply> {
        let mut tables = self.write("create_supply")?;
        let id = tables.next_supply_id();
        let supply = input.into_supply(id);
        tables.supplies.insert(id, supply.clone());
        Ok(supply)
    }

    #[instrument(skip(self), err)]
    async fn replace_supply(&self, id: SupplyId, input: NewSupply) -> StoreResult<Supply> {
        let mut tables = self.write("replace_supply")?;
        let slot = tables.supplies.get_mut(&id).ok_or_else(StoreError::not_found)?;
        *slot = input.into_supply(id);
        Ok(slot.clone())
    }

    #[instrument(skip(self), err)]
    async fn delete_supply(&self, id: SupplyId) -> StoreResult<()> {
        let mut tables = self.write("delete_supply")?;
        if !tables.supplies.contains_key(&id) {
            return Err(StoreError::not_found());
        }
        if tables.is_referenced(id) {
            return Err(DomainError::conflict(format!(
                "supply {id} is referenced by existing dispatches"
            ))
            .into());
        }
        tables.supplies.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl DispatchStore for InMemoryStore {
    #[instrument(skip(self, lines), fields(line_count = lines.len()), err)]
    async fn create_dispatch(
        &self,
        created_at: DateTime<Utc>,
        lines: &[DispatchLine],
    ) -> StoreResult<Dispatch> {
        let mut tables = self.write("create_dispatch")?;

        let draft = DispatchDraft::build(created_at, lines, |id| {
            tables.supplies.get(&id).map(|s| s.price)
        })?;

        let id = tables.next_dispatch_id();
        let item_ids: Vec<_> = draft.lines().iter().map(|_| tables.next_item_id()).collect();
        let dispatch = draft.into_dispatch(id, item_ids);
        tables.dispatches.insert(id, dispatch.clone());
        Ok(dispatch)
    }

    #[instrument(skip(self), err)]
    async fn list_dispatches(&self) -> StoreResult<Vec<DispatchSummary>> {
        let tables = self.read("list_dispatches")?;
        Ok(tables.dispatches.values().map(DispatchSummary::from).collect())
    }

    #[instrument(skip(self), err)]
    async fn get_dispatch(&self, id: DispatchId) -> StoreResult<Option<DispatchDetail>> {
        let tables = self.read("get_dispatch")?;
        let Some(dispatch) = tables.dispatches.get(&id) else {
            return Ok(None);
        };
        let detail =
            DispatchDetail::assemble(dispatch, |sid| tables.supplies.get(&sid).cloned())?;
        Ok(Some(detail))
    }

    #[instrument(skip(self), err)]
    async fn daily_report(&self, window: ReportWindow) -> StoreResult<DailyReport> {
        let tables = self.read("daily_report")?;
        let report = DailyReport::summarize(window, tables.dispatches.values(), |sid| {
            tables.supplies.get(&sid).map(|s| s.name.clone())
        })?;
        Ok(report)
    }
}
