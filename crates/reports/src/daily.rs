use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use ravenpost_core::{DomainError, DomainResult, SupplyId};
use ravenpost_dispatch::Dispatch;

/// How many supplies the daily report ranks.
pub const TOP_SUPPLIES_LIMIT: usize = 3;

const DATE_HINT: &str = "use YYYY-MM-DD or 'today'";

/// Resolve the `date` query value to a UTC calendar day.
///
/// Absent, blank, or `today` (any case) resolve to the current UTC day. A bare
/// `YYYY-MM-DD` is taken as-is; an RFC 3339 timestamp contributes its UTC date.
pub fn resolve_report_date(input: Option<&str>, now: DateTime<Utc>) -> DomainResult<NaiveDate> {
    let raw = input.map(str::trim).unwrap_or_default();

    if raw.is_empty() || raw.eq_ignore_ascii_case("today") {
        return Ok(now.date_naive());
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| DomainError::validation(DATE_HINT))
}

/// Half-open UTC window `[start, end)` covering one calendar day.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReportWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ReportWindow {
    /// Fails for the last representable calendar day, which has no next-day bound.
    pub fn for_date(date: NaiveDate) -> DomainResult<Self> {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = start
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| DomainError::validation(DATE_HINT))?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// One ranked entry of the daily report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopSupply {
    pub supply_id: SupplyId,
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    /// Start of the reported day (UTC midnight).
    pub date: DateTime<Utc>,
    pub dispatch_count: u64,
    /// Zero when nothing was dispatched.
    pub total_revenue: Decimal,
    pub top_supplies: Vec<TopSupply>,
}

impl DailyReport {
    /// Report with no dispatches in the window.
    pub fn empty(window: ReportWindow) -> Self {
        Self {
            date: window.start(),
            dispatch_count: 0,
            total_revenue: Decimal::ZERO,
            top_supplies: Vec::new(),
        }
    }

    /// Count one dispatch total towards the day.
    ///
    /// Fails instead of wrapping when the revenue leaves the decimal range.
    pub fn record_dispatch(&mut self, total_cost: Decimal) -> DomainResult<()> {
        self.total_revenue = self
            .total_revenue
            .checked_add(total_cost)
            .ok_or_else(|| DomainError::invariant("daily revenue overflow"))?;
        self.dispatch_count += 1;
        Ok(())
    }

    /// Aggregate the dispatches inside `window`; others are ignored.
    ///
    /// `name_of` resolves the current supply name. Supplies it cannot resolve
    /// are left out of the ranking.
    pub fn summarize<'a, I, F>(
        window: ReportWindow,
        dispatches: I,
        mut name_of: F,
    ) -> DomainResult<Self>
    where
        I: IntoIterator<Item = &'a Dispatch>,
        F: FnMut(SupplyId) -> Option<String>,
    {
        let mut report = Self::empty(window);
        let mut moved: BTreeMap<SupplyId, i64> = BTreeMap::new();

        for dispatch in dispatches.into_iter().filter(|d| window.contains(d.created_at)) {
            report.record_dispatch(dispatch.total_cost)?;
            for item in &dispatch.items {
                *moved.entry(item.supply_id).or_default() += i64::from(item.quantity);
            }
        }

        report.top_supplies = rank_top_supplies(
            moved
                .into_iter()
                .filter_map(|(id, qty)| name_of(id).map(|name| (id, name, qty))),
        );
        Ok(report)
    }
}

/// Highest quantities first; ties keep ascending supply id order.
pub fn rank_top_supplies<I>(totals: I) -> Vec<TopSupply>
where
    I: IntoIterator<Item = (SupplyId, String, i64)>,
{
    let mut ranked: Vec<TopSupply> = totals
        .into_iter()
        .map(|(supply_id, name, quantity)| TopSupply {
            supply_id,
            name,
            quantity,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.supply_id.cmp(&b.supply_id))
    });
    ranked.truncate(TOP_SUPPLIES_LIMIT);
    ranked
}
