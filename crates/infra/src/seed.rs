//! Starter catalog inserted into an empty store.

use rust_decimal::Decimal;
use tracing::{info, instrument};

use ravenpost_catalog::{NewSupply, SupplyFilter};

use crate::store::{CatalogStore, StoreResult};

/// `(name, category, price in whole units)`.
pub const SEED_SUPPLIES: &[(&str, &str, i64)] = &[
    ("Black Ink Scroll", "Scrolls", 5),
    ("Cipher Sheet", "Scrolls", 8),
    ("Wax Seal Kit", "Seals", 3),
    ("Royal Parchment", "Scrolls", 12),
    ("Night Raven", "Birds", 25),
    ("War Raven", "Birds", 40),
    ("Dispatch Tube", "Containers", 6),
    ("Maester Satchel", "Containers", 15),
];

/// Insert [`SEED_SUPPLIES`] when the catalog has no supplies.
///
/// Returns how many supplies were inserted; a non-empty catalog is left untouched.
#[instrument(skip(store), err)]
pub async fn seed_catalog<S>(store: &S) -> StoreResult<usize>
where
    S: CatalogStore + ?Sized,
{
    if !store.list_supplies(&SupplyFilter::all()).await?.is_empty() {
        info!("catalog already populated; skipping seed");
        return Ok(0);
    }

    for (name, category, price) in SEED_SUPPLIES {
        let supply = NewSupply::new(*name, *category, Decimal::from(*price))?;
        store.create_supply(supply).await?;
    }

    info!(count = SEED_SUPPLIES.len(), "seeded supply catalog");
    Ok(SEED_SUPPLIES.len())
}
