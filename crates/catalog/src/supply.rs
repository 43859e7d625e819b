use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use ravenpost_core::{DomainError, DomainResult, Entity, SupplyId};

/// Catalog item available for inclusion in a dispatch, at its current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supply {
    pub id: SupplyId,
    pub name: String,
    pub category: String,
    pub price: Decimal,
}

impl Entity for Supply {
    type Id = SupplyId;

    fn id(&self) -> SupplyId {
        self.id
    }
}

/// Validated supply fields, used for both creation and full replacement.
///
/// Construction is the only place catalog validation happens: a `NewSupply`
/// always has a non-blank name and category and a strictly positive price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSupply {
    name: String,
    category: String,
    price: Decimal,
}

impl NewSupply {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        price: Decimal,
    ) -> DomainResult<Self> {
        let name = name.into();
        let category = category.into();

        if name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }

        if category.trim().is_empty() {
            return Err(DomainError::validation("category is required"));
        }

        if price <= Decimal::ZERO {
            return Err(DomainError::validation("price must be greater than 0"));
        }

        Ok(Self {
            name,
            category,
            price,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Materialize the supply under a store-assigned identity.
    pub fn into_supply(self, id: SupplyId) -> Supply {
        Supply {
            id,
            name: self.name,
            category: self.category,
            price: self.price,
        }
    }
}

/// Catalog listing filter. Every criterion is optional; present ones are AND-composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplyFilter {
    /// Case-insensitive substring of the name (stored lowercased).
    query: Option<String>,
    /// Exact category match.
    category: Option<String>,
    /// Inclusive lower price bound.
    min_price: Option<Decimal>,
    /// Inclusive upper price bound.
    max_price: Option<Decimal>,
}

impl SupplyFilter {
    /// Build a filter; blank text criteria are treated as absent.
    pub fn new(
        query: Option<String>,
        category: Option<String>,
        min_price: Option<Decimal>,
        max_price: Option<Decimal>,
    ) -> Self {
        Self {
            query: non_blank(query).map(|q| q.to_lowercase()),
            category: non_blank(category),
            min_price,
            max_price,
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn matches(&self, supply: &Supply) -> bool {
        if let Some(q) = &self.query {
            if !supply.name.to_lowercase().contains(q.as_str()) {
                return false;
            }
        }

        if let Some(category) = &self.category {
            if supply.category != *category {
                return false;
            }
        }

        if let Some(min) = self.min_price {
            if supply.price < min {
                return false;
            }
        }

        if let Some(max) = self.max_price {
            if supply.price > max {
                return false;
            }
        }

        true
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supply(id: i64, name: &str, category: &str, price: i64) -> Supply {
        Supply {
            id: SupplyId::new(id),
            name: name.to_string(),
            category: category.to_string(),
            price: Decimal::from(price),
        }
    }

    fn catalog() -> Vec<Supply> {
        vec![
            supply(1, "Black Ink Scroll", "Scrolls", 5),
            supply(2, "Cipher Sheet", "Scrolls", 8),
            supply(3, "Night Raven", "Birds", 25),
            supply(4, "War Raven", "Birds", 40),
        ]
    }

    fn matching_ids(filter: &SupplyFilter) -> Vec<i64> {
        catalog()
            .into_iter()
            .filter(|s| filter.matches(s))
            .map(|s| s.id.get())
            .collect()
    }

    #[test]
    fn new_supply_accepts_valid_fields() {
        let s = NewSupply::new("Night Raven", "Birds", Decimal::from(25)).unwrap();
        assert_eq!(s.name(), "Night Raven");
        assert_eq!(s.category(), "Birds");
        assert_eq!(s.price(), Decimal::from(25));

        let materialized = s.into_supply(SupplyId::new(7));
        assert_eq!(materialized.id(), SupplyId::new(7));
    }

    #[test]
    fn new_supply_rejects_blank_name() {
        let err = NewSupply::new("   ", "Birds", Decimal::from(25)).unwrap_err();
        assert_eq!(err, DomainError::validation("name is required"));
    }

    #[test]
    fn new_supply_rejects_blank_category() {
        let err = NewSupply::new("Night Raven", "", Decimal::from(25)).unwrap_err();
        assert_eq!(err, DomainError::validation("category is required"));
    }

    #[test]
    fn new_supply_rejects_zero_and_negative_price() {
        for price in [Decimal::ZERO, Decimal::from(-3)] {
            let err = NewSupply::new("Night Raven", "Birds", price).unwrap_err();
            assert_eq!(err, DomainError::validation("price must be greater than 0"));
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(matching_ids(&SupplyFilter::all()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn query_is_case_insensitive_substring() {
        let filter = SupplyFilter::new(Some("RAVEN".into()), None, None, None);
        assert_eq!(matching_ids(&filter), vec![3, 4]);
    }

    #[test]
    fn category_is_exact_match() {
        let filter = SupplyFilter::new(None, Some("Birds".into()), None, None);
        assert_eq!(matching_ids(&filter), vec![3, 4]);

        let filter = SupplyFilter::new(None, Some("birds".into()), None, None);
        assert!(matching_ids(&filter).is_empty());
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let filter = SupplyFilter::new(
            None,
            None,
            Some(Decimal::from(8)),
            Some(Decimal::from(25)),
        );
        assert_eq!(matching_ids(&filter), vec![2, 3]);
    }

    #[test]
    fn blank_text_criteria_are_ignored() {
        let filter = SupplyFilter::new(Some("  ".into()), Some("".into()), None, None);
        assert_eq!(filter, SupplyFilter::all());
    }

    #[test]
    fn criteria_are_and_composed() {
        let filter = SupplyFilter::new(
            Some("raven".into()),
            Some("Birds".into()),
            None,
            Some(Decimal::from(30)),
        );
        assert_eq!(matching_ids(&filter), vec![3]);
    }

    #[test]
    fn supply_serializes_price_as_number() {
        let json = serde_json::to_value(supply(1, "Wax Seal Kit", "Seals", 3)).unwrap();
        assert_eq!(json["price"].as_f64(), Some(3.0));
        assert_eq!(json["id"], 1);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any strictly positive price with non-blank text is accepted.
            #[test]
            fn positive_prices_validate(
                name in "[A-Za-z][A-Za-z ]{0,30}",
                category in "[A-Za-z]{1,12}",
                cents in 1i64..10_000_000
            ) {
                let price = Decimal::new(cents, 2);
                let s = NewSupply::new(name.clone(), category.clone(), price).unwrap();
                prop_assert_eq!(s.price(), price);
            }

            /// Property: a supply always matches a filter built from its own fields.
            #[test]
            fn supply_matches_own_fields(
                name in "[A-Za-z][A-Za-z ]{0,30}",
                category in "[A-Za-z]{1,12}",
                cents in 1i64..10_000_000
            ) {
                let price = Decimal::new(cents, 2);
                let s = NewSupply::new(name.clone(), category.clone(), price)
                    .unwrap()
                    .into_supply(SupplyId::new(1));
                let filter = SupplyFilter::new(
                    Some(name.to_uppercase()),
                    Some(category),
                    Some(price),
                    Some(price),
                );
                prop_assert!(filter.matches(&s));
            }
        }
    }
}
