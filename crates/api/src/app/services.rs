use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

use ravenpost_catalog::{NewSupply, Supply, SupplyFilter};
use ravenpost_core::{DispatchId, SupplyId};
use ravenpost_dispatch::{Dispatch, DispatchDetail, DispatchLine, DispatchSummary};
use ravenpost_infra::seed::seed_catalog;
use ravenpost_infra::{
    CatalogStore, DispatchStore, InMemoryStore, SqliteStore, StoreError, StoreResult,
};
use ravenpost_reports::{DailyReport, ReportWindow, resolve_report_date};

use crate::config::Settings;

/// Storage backend selected at startup.
pub enum AppServices {
    InMemory(Arc<InMemoryStore>),
    Sqlite(SqliteStore),
}

impl AppServices {
    pub fn in_memory() -> Self {
        AppServices::InMemory(Arc::new(InMemoryStore::new()))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            AppServices::InMemory(_) => "in_memory",
            AppServices::Sqlite(_) => "sqlite",
        }
    }

    fn catalog(&self) -> &dyn CatalogStore {
        match self {
            AppServices::InMemory(store) => store.as_ref(),
            AppServices::Sqlite(store) => store,
        }
    }

    fn dispatch_store(&self) -> &dyn DispatchStore {
        match self {
            AppServices::InMemory(store) => store.as_ref(),
            AppServices::Sqlite(store) => store,
        }
    }

    pub async fn seed_if_empty(&self) -> StoreResult<usize> {
        seed_catalog(self.catalog()).await
    }

    // ---- catalog ----

    pub async fn list_supplies(&self, filter: &SupplyFilter) -> StoreResult<Vec<Supply>> {
        self.catalog().list_supplies(filter).await
    }

    pub async fn get_supply(&self, id: SupplyId) -> StoreResult<Supply> {
        self.catalog()
            .get_supply(id)
            .await?
            .ok_or_else(StoreError::not_found)
    }

    pub async fn create_supply(&self, input: NewSupply) -> StoreResult<Supply> {
        let supply = self.catalog().create_supply(input).await?;
        info!(supply_id = %supply.id, price = %supply.price, "supply created");
        Ok(supply)
    }

    pub async fn replace_supply(&self, id: SupplyId, input: NewSupply) -> StoreResult<Supply> {
        let supply = self.catalog().replace_supply(id, input).await?;
        info!(supply_id = %id, "supply replaced");
        Ok(supply)
    }

    pub async fn delete_supply(&self, id: SupplyId) -> StoreResult<()> {
        self.catalog().delete_supply(id).await?;
        info!(supply_id = %id, "supply deleted");
        Ok(())
    }

    // ---- dispatches ----

    /// Create a dispatch stamped with the current UTC time.
    pub async fn create_dispatch(&self, lines: &[DispatchLine]) -> StoreResult<Dispatch> {
        match self.dispatch_store().create_dispatch(Utc::now(), lines).await {
            Ok(dispatch) => {
                info!(
                    dispatch_id = %dispatch.id,
                    item_count = dispatch.item_count(),
                    total_cost = %dispatch.total_cost,
                    "dispatch created"
                );
                Ok(dispatch)
            }
            Err(e) => {
                warn!(error = %e, line_count = lines.len(), "dispatch rejected");
                Err(e)
            }
        }
    }

    pub async fn list_dispatches(&self) -> StoreResult<Vec<DispatchSummary>> {
        self.dispatch_store().list_dispatches().await
    }

    pub async fn get_dispatch(&self, id: DispatchId) -> StoreResult<DispatchDetail> {
        self.dispatch_store()
            .get_dispatch(id)
            .await?
            .ok_or_else(StoreError::not_found)
    }

    // ---- reports ----

    /// Daily report for the `date` query value (see [`resolve_report_date`]).
    pub async fn daily_report(&self, date: Option<&str>) -> StoreResult<DailyReport> {
        let day = resolve_report_date(date, Utc::now())?;
        let report = self
            .dispatch_store()
            .daily_report(ReportWindow::for_date(day)?)
            .await?;
        info!(
            %day,
            dispatch_count = report.dispatch_count,
            total_revenue = %report.total_revenue,
            "daily report generated"
        );
        Ok(report)
    }
}

/// Wire the backend chosen by `settings` and seed it when requested.
pub async fn build_services(settings: &Settings) -> anyhow::Result<AppServices> {
    let services = match &settings.database_url {
        Some(url) => {
            let store = SqliteStore::connect(url, settings.db_max_connections)
                .await
                .with_context(|| format!("failed to open database {url}"))?;
            AppServices::Sqlite(store)
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
            AppServices::in_memory()
        }
    };

    if settings.seed {
        services
            .seed_if_empty()
            .await
            .context("failed to seed supply catalog")?;
    }

    info!(backend = services.backend_name(), "services ready");
    Ok(services)
}
