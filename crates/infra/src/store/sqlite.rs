//! SQLite-backed store.
//!
//! ## Storage formats
//!
//! | value | column type | encoding |
//! |-------|-------------|----------|
//! | decimal (price, costs) | `TEXT` | canonical `Decimal` string |
//! | timestamp (`created_at`) | `TEXT` | fixed-width RFC 3339 UTC, microsecond precision |
//!
//! The fixed-width timestamp encoding makes lexical comparison equal to time
//! comparison, which the report window query relies on.
//!
//! ## Error mapping
//!
//! | SQLx error | StoreError |
//! |------------|------------|
//! | foreign key violation | `Domain(Conflict)` |
//! | anything else | `Backend` |

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{Span, instrument};

use ravenpost_catalog::{NewSupply, Supply, SupplyFilter};
use ravenpost_core::{DispatchId, DispatchItemId, DomainError, SupplyId};
use ravenpost_dispatch::{
    Dispatch, DispatchDetail, DispatchDetailItem, DispatchDraft, DispatchLine, DispatchSummary,
};
use ravenpost_reports::{DailyReport, ReportWindow, TOP_SUPPLIES_LIMIT, rank_top_supplies};

use super::{CatalogStore, DispatchStore, StoreError, StoreResult};

const SCHEMA: &str = include_str!("schema.sql");

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// SQLite store. Cheap to clone (the pool is reference-counted).
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to `url` (e.g. `sqlite://ravenpost.db`) and bootstrap the schema.
    ///
    /// The database file is created when missing; foreign keys are enforced.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("parse_database_url", e))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self { pool };
        store.bootstrap_schema().await?;
        Ok(store)
    }

    /// Private in-memory database; the single connection is kept alive for the pool's lifetime.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| map_sqlx_error("parse_database_url", e))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self { pool };
        store.bootstrap_schema().await?;
        Ok(store)
    }

    /// Transaction for read-then-write paths.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front, so concurrent writers wait
    /// on the busy timeout instead of failing with `SQLITE_BUSY` on lock upgrade.
    async fn begin_write(&self) -> StoreResult<sqlx::Transaction<'static, sqlx::Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn bootstrap_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("bootstrap_schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    #[instrument(skip(self), fields(supply_count = tracing::field::Empty), err)]
    async fn list_supplies(&self, filter: &SupplyFilter) -> StoreResult<Vec<Supply>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, category, price
            FROM supplies
            WHERE ?1 IS NULL OR category = ?1
            ORDER BY id ASC
            "#,
        )
        .bind(filter.category())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_supplies", e))?;

        // Name and price criteria are applied after decoding: prices are stored as TEXT.
        let mut supplies = Vec::with_capacity(rows.len());
        for row in &rows {
            let supply = supply_from_row(row, "id")?;
            if filter.matches(&supply) {
                supplies.push(supply);
            }
        }

        Span::current().record("supply_count", supplies.len());
        Ok(supplies)
    }

    #[instrument(skip(self), err)]
    async fn get_supply(&self, id: SupplyId) -> StoreResult<Option<Supply>> {
        let row = sqlx::query("SELECT id, name, category, price FROM supplies WHERE id = ?1")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_supply", e))?;

        row.as_ref().map(|r| supply_from_row(r, "id")).transpose()
    }

    #[instrument(skip(self), err)]
    async fn create_supply(&self, input: NewSupply) -> StoreResult<Supply> {
        let result = sqlx::query("INSERT INTO supplies (name, category, price) VALUES (?1, ?2, ?3)")
            .bind(input.name())
            .bind(input.category())
            .bind(input.price().to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_supply", e))?;

        Ok(input.into_supply(SupplyId::new(result.last_insert_rowid())))
    }

    #[instrument(skip(self), err)]
    async fn replace_supply(&self, id: SupplyId, input: NewSupply) -> StoreResult<Supply> {
        let result = sqlx::query(
            "UPDATE supplies SET name = ?1, category = ?2, price = ?3 WHERE id = ?4",
        )
        .bind(input.name())
        .bind(input.category())
        .bind(input.price().to_string())
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("replace_supply", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found());
        }
        Ok(input.into_supply(id))
    }

    #[instrument(skip(self), err)]
    async fn delete_supply(&self, id: SupplyId) -> StoreResult<()> {
        let mut tx = self.begin_write().await?;

        let exists = sqlx::query("SELECT 1 FROM supplies WHERE id = ?1")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_supply", e))?
            .is_some();
        if !exists {
            return Err(StoreError::not_found());
        }

        let referenced: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM dispatch_items WHERE supply_id = ?1")
                .bind(id.get())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("delete_supply", e))?;
        if referenced > 0 {
            return Err(DomainError::conflict(format!(
                "supply {id} is referenced by existing dispatches"
            ))
            .into());
        }

        sqlx::query("DELETE FROM supplies WHERE id = ?1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_supply", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }
}

#[async_trait]
impl DispatchStore for SqliteStore {
    #[instrument(skip(self, lines), fields(line_count = lines.len()), err)]
    async fn create_dispatch(
        &self,
        created_at: DateTime<Utc>,
        lines: &[DispatchLine],
    ) -> StoreResult<Dispatch> {
        // Stored timestamps carry microseconds; keep the returned value identical to later reads.
        let created_at = created_at.trunc_subsecs(6);

        // Dropping `tx` on any early return rolls back everything written so far.
        let mut tx = self.begin_write().await?;

        let mut prices: HashMap<SupplyId, Decimal> = HashMap::new();
        for line in lines {
            if prices.contains_key(&line.supply_id) {
                continue;
            }
            let price: Option<String> = sqlx::query_scalar("SELECT price FROM supplies WHERE id = ?1")
                .bind(line.supply_id.get())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("lookup_supply", e))?;
            if let Some(price) = price {
                prices.insert(line.supply_id, decode_decimal(&price)?);
            }
        }

        let draft = DispatchDraft::build(created_at, lines, |id| prices.get(&id).copied())?;

        let dispatch_id = sqlx::query(
            "INSERT INTO dispatches (created_at, total_cost) VALUES (?1, ?2)",
        )
        .bind(encode_timestamp(draft.created_at()))
        .bind(draft.total_cost().to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_dispatch", e))?
        .last_insert_rowid();
        let dispatch_id = DispatchId::new(dispatch_id);

        let mut item_ids = Vec::with_capacity(draft.lines().len());
        for line in draft.lines() {
            let item_id = sqlx::query(
                r#"
                INSERT INTO dispatch_items (dispatch_id, supply_id, quantity, line_cost)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )
            .bind(dispatch_id.get())
            .bind(line.supply_id.get())
            .bind(line.quantity)
            .bind(line.line_cost.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_dispatch_item", e))?
            .last_insert_rowid();
            item_ids.push(DispatchItemId::new(item_id));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(draft.into_dispatch(dispatch_id, item_ids))
    }

    #[instrument(skip(self), err)]
    async fn list_dispatches(&self) -> StoreResult<Vec<DispatchSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT d.id, d.created_at, d.total_cost, COUNT(i.id) AS item_count
            FROM dispatches d
            LEFT JOIN dispatch_items i ON i.dispatch_id = d.id
            GROUP BY d.id, d.created_at, d.total_cost
            ORDER BY d.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_dispatches", e))?;

        rows.iter()
            .map(|row| -> StoreResult<_> {
                let item_count: i64 = get(row, "item_count")?;
                Ok(DispatchSummary {
                    id: DispatchId::new(get(row, "id")?),
                    created_at: decode_timestamp(&get::<String>(row, "created_at")?)?,
                    total_cost: decode_decimal(&get::<String>(row, "total_cost")?)?,
                    item_count: usize::try_from(item_count).unwrap_or_default(),
                })
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn get_dispatch(&self, id: DispatchId) -> StoreResult<Option<DispatchDetail>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let Some(head) = sqlx::query("SELECT id, created_at, total_cost FROM dispatches WHERE id = ?1")
            .bind(id.get())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("get_dispatch", e))?
        else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r#"
            SELECT i.id AS item_id, i.quantity, i.line_cost,
                   s.id AS supply_id, s.name, s.category, s.price
            FROM dispatch_items i
            JOIN supplies s ON s.id = i.supply_id
            WHERE i.dispatch_id = ?1
            ORDER BY i.id ASC
            "#,
        )
        .bind(id.get())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("get_dispatch_items", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        let items = rows
            .iter()
            .map(|row| -> StoreResult<_> {
                Ok(DispatchDetailItem {
                    id: DispatchItemId::new(get(row, "item_id")?),
                    quantity: get(row, "quantity")?,
                    line_cost: decode_decimal(&get::<String>(row, "line_cost")?)?,
                    supply: supply_from_row(row, "supply_id")?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Some(DispatchDetail {
            id,
            created_at: decode_timestamp(&get::<String>(&head, "created_at")?)?,
            total_cost: decode_decimal(&get::<String>(&head, "total_cost")?)?,
            items,
        }))
    }

    #[instrument(skip(self), err)]
    async fn daily_report(&self, window: ReportWindow) -> StoreResult<DailyReport> {
        let start = encode_timestamp(window.start());
        let end = encode_timestamp(window.end());

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let totals: Vec<String> = sqlx::query_scalar(
            "SELECT total_cost FROM dispatches WHERE created_at >= ?1 AND created_at < ?2",
        )
        .bind(&start)
        .bind(&end)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("daily_report_totals", e))?;

        let rows = sqlx::query(
            r#"
            SELECT i.supply_id, s.name, SUM(i.quantity) AS quantity
            FROM dispatch_items i
            JOIN dispatches d ON d.id = i.dispatch_id
            JOIN supplies s ON s.id = i.supply_id
            WHERE d.created_at >= ?1 AND d.created_at < ?2
            GROUP BY i.supply_id, s.name
            ORDER BY quantity DESC, i.supply_id ASC
            LIMIT ?3
            "#,
        )
        .bind(&start)
        .bind(&end)
        .bind(TOP_SUPPLIES_LIMIT as i64)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("daily_report_top_supplies", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        let mut report = DailyReport::empty(window);
        for total in &totals {
            report.record_dispatch(decode_decimal(total)?)?;
        }
        report.top_supplies = rank_top_supplies(
            rows.iter()
                .map(|row| -> StoreResult<_> {
                    Ok((
                        SupplyId::new(get(row, "supply_id")?),
                        get::<String>(row, "name")?,
                        get::<i64>(row, "quantity")?,
                    ))
                })
                .collect::<StoreResult<Vec<_>>>()?,
        );

        Ok(report)
    }
}

fn supply_from_row(row: &SqliteRow, id_column: &str) -> StoreResult<Supply> {
    Ok(Supply {
        id: SupplyId::new(get(row, id_column)?),
        name: get(row, "name")?,
        category: get(row, "category")?,
        price: decode_decimal(&get::<String>(row, "price")?)?,
    })
}

fn get<T>(row: &SqliteRow, column: &str) -> StoreResult<T>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| map_sqlx_error("decode_row", e))
}

fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn decode_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::backend("decode_timestamp", format!("{raw:?}: {e}")))
}

fn decode_decimal(raw: &str) -> StoreResult<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| StoreError::backend("decode_decimal", format!("{raw:?}: {e}")))
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            StoreError::Domain(DomainError::conflict(format!(
                "referential integrity violation in {operation}: {}",
                db_err.message()
            )))
        }
        sqlx::Error::Database(db_err) => StoreError::backend(operation, db_err.message()),
        sqlx::Error::PoolClosed => StoreError::backend(operation, "connection pool closed"),
        other => StoreError::backend(operation, other.to_string()),
    }
}
