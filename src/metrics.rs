//! Per-day and per-period performance metrics
//!
//! All amounts are rounded half away from zero: money to 2 decimals,
//! ratios to 4. Ratios with a zero denominator are `None`.

use crate::types::DailyRow;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Market CPC assumed when no positive CPC has been observed.
/// A policy default, not a measured value.
pub const DEFAULT_MARKET_CPC: Decimal = Decimal::ONE;

/// Derived metrics for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_cost: Decimal,
    pub store_value: Decimal,
    pub gross_margin: Decimal,
    /// Break-even ratio: price / gross margin
    pub break_even_ratio: Option<Decimal>,
    pub roas: Option<Decimal>,
    pub cpa: Option<Decimal>,
    pub margin_amount: Decimal,
    pub margin_pct: Option<Decimal>,
    pub cpc: Option<Decimal>,
}

/// Compute metrics for a single day. Never fails.
pub fn compute_metrics(row: &DailyRow) -> Metrics {
    let units = Decimal::from(row.units_sold);
    let purchases = row.purchases();
    let spend = row.spend();

    let total_cost = round_money(row.cost_of_goods * units);
    let store_value = round_money(row.price * units);
    let gross_margin = round_money(row.price - row.cost_of_goods);

    let break_even_ratio = if gross_margin > Decimal::ZERO {
        Some(round_ratio(row.price / gross_margin))
    } else {
        None
    };

    let roas = if spend > Decimal::ZERO {
        Some(round_ratio(store_value / spend))
    } else {
        None
    };

    let cpa = if purchases > 0 {
        Some(round_money(spend / Decimal::from(purchases)))
    } else {
        None
    };

    let margin_amount = round_money(store_value - total_cost - spend);

    let margin_pct = if store_value > Decimal::ZERO {
        Some(round_ratio(margin_amount / store_value))
    } else {
        None
    };

    Metrics {
        total_cost,
        store_value,
        gross_margin,
        break_even_ratio,
        roas,
        cpa,
        margin_amount,
        margin_pct,
        cpc: row_cpc(row),
    }
}

/// CPC for a day: the platform-reported value when positive,
/// else spend / clicks. `None` without clicks.
pub fn row_cpc(row: &DailyRow) -> Option<Decimal> {
    if let Some(reported) = row.reported_cpc.filter(|c| *c > Decimal::ZERO) {
        return Some(round_ratio(reported));
    }

    let clicks = row.clicks();
    if clicks == 0 {
        return None;
    }
    Some(round_ratio(row.spend() / Decimal::from(clicks)))
}

/// Mean of the positive CPC observations across rows.
///
/// Falls back to [`DEFAULT_MARKET_CPC`] when there are none.
pub fn average_cpc<'a, I>(rows: I) -> Decimal
where
    I: IntoIterator<Item = &'a DailyRow>,
{
    let (sum, count) = rows
        .into_iter()
        .filter_map(row_cpc)
        .filter(|cpc| *cpc > Decimal::ZERO)
        .fold((Decimal::ZERO, 0u32), |(sum, count), cpc| (sum + cpc, count + 1));

    if count == 0 {
        return DEFAULT_MARKET_CPC;
    }
    round_ratio(sum / Decimal::from(count))
}

/// Totals and blended ratios over a run of days (dashboard summary line)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetrics {
    pub days: usize,
    pub total_spend: Decimal,
    pub units_sold: u64,
    pub purchases: u64,
    pub clicks: u64,
    pub add_to_cart: u64,
    pub store_value: Decimal,
    pub total_cost: Decimal,
    pub margin_amount: Decimal,
    pub roas: Option<Decimal>,
    pub cpa: Option<Decimal>,
    pub margin_pct: Option<Decimal>,
    /// Click-weighted CPC: total spend / total clicks
    pub avg_cpc: Option<Decimal>,
}

/// Aggregate rows into period totals. Ratios are recomputed over the
/// totals rather than averaged per day.
pub fn aggregate_metrics(rows: &[DailyRow]) -> PeriodMetrics {
    let mut period = PeriodMetrics {
        days: rows.len(),
        total_spend: Decimal::ZERO,
        units_sold: 0,
        purchases: 0,
        clicks: 0,
        add_to_cart: 0,
        store_value: Decimal::ZERO,
        total_cost: Decimal::ZERO,
        margin_amount: Decimal::ZERO,
        roas: None,
        cpa: None,
        margin_pct: None,
        avg_cpc: None,
    };

    for row in rows {
        let day = compute_metrics(row);
        period.total_spend += row.spend();
        period.units_sold += u64::from(row.units_sold);
        period.purchases += u64::from(row.purchases());
        period.clicks += u64::from(row.clicks());
        period.add_to_cart += u64::from(row.add_to_cart());
        period.store_value += day.store_value;
        period.total_cost += day.total_cost;
    }

    period.total_spend = round_money(period.total_spend);
    period.margin_amount =
        round_money(period.store_value - period.total_cost - period.total_spend);

    if period.total_spend > Decimal::ZERO {
        period.roas = Some(round_ratio(period.store_value / period.total_spend));
    }
    if period.purchases > 0 {
        period.cpa = Some(round_money(
            period.total_spend / Decimal::from(period.purchases),
        ));
    }
    if period.store_value > Decimal::ZERO {
        period.margin_pct = Some(round_ratio(period.margin_amount / period.store_value));
    }
    if period.clicks > 0 {
        period.avg_cpc = Some(round_ratio(
            period.total_spend / Decimal::from(period.clicks),
        ));
    }

    period
}

pub(crate) fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub(crate) fn round_ratio(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}
