use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use ravenpost_catalog::{NewSupply, SupplyFilter};
use ravenpost_core::{DomainError, DomainResult, SupplyId};
use ravenpost_dispatch::DispatchLine;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /supplies` and `PUT /supplies/{id}`. Missing fields fail validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SupplyRequest {
    pub name: String,
    pub category: String,
    pub price: Decimal,
}

impl SupplyRequest {
    pub fn into_new_supply(self) -> DomainResult<NewSupply> {
        NewSupply::new(self.name, self.category, self.price)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DispatchLineRequest {
    pub supply_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateDispatchRequest {
    pub items: Vec<DispatchLineRequest>,
}

impl CreateDispatchRequest {
    pub fn lines(&self) -> Vec<DispatchLine> {
        self.items
            .iter()
            .map(|i| DispatchLine::new(SupplyId::new(i.supply_id), i.quantity))
            .collect()
    }
}

// -------------------------
// Query DTOs
// -------------------------

/// `GET /supplies` query. Prices arrive as text so bad input maps to a 400 JSON error.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SupplyQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

impl SupplyQuery {
    pub fn into_filter(self) -> DomainResult<SupplyFilter> {
        let min_price = parse_price("minPrice", self.min_price.as_deref())?;
        let max_price = parse_price("maxPrice", self.max_price.as_deref())?;
        Ok(SupplyFilter::new(self.q, self.category, min_price, max_price))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReportQuery {
    pub date: Option<String>,
}

fn parse_price(field: &str, raw: Option<&str>) -> DomainResult<Option<Decimal>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => Decimal::from_str(v)
            .map(Some)
            .map_err(|_| DomainError::validation(format!("{field} must be a decimal number"))),
    }
}
