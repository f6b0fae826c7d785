//! Daily performance rows, raw-row normalization and error types

use chrono::{DateTime, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// One day of observed performance for one product/campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    /// Unit selling price
    pub price: Decimal,
    /// Unit cost of goods
    pub cost_of_goods: Decimal,
    pub units_sold: u32,
    /// Ad spend for the day
    pub total_spend: Decimal,
    #[serde(default)]
    pub clicks: Option<u32>,
    #[serde(default)]
    pub add_to_cart: Option<u32>,
    #[serde(default)]
    pub purchases: Option<u32>,
    /// Daily budget the campaign ran with
    #[serde(default)]
    pub budget: Option<Decimal>,
    /// CPC as reported by the ad platform, preferred over spend / clicks
    #[serde(default)]
    pub reported_cpc: Option<Decimal>,
}

impl DailyRow {
    /// Create an empty day (no spend, no sales) for a product
    pub fn new(date: NaiveDate, price: Decimal, cost_of_goods: Decimal) -> Self {
        Self {
            date,
            price,
            cost_of_goods,
            units_sold: 0,
            total_spend: Decimal::ZERO,
            clicks: None,
            add_to_cart: None,
            purchases: None,
            budget: None,
            reported_cpc: None,
        }
    }

    /// Set ad spend (negative values are clamped to zero)
    pub fn with_spend(mut self, spend: Decimal) -> Self {
        self.total_spend = spend.max(Decimal::ZERO);
        self
    }

    pub fn with_units_sold(mut self, units: u32) -> Self {
        self.units_sold = units;
        self
    }

    pub fn with_clicks(mut self, clicks: u32) -> Self {
        self.clicks = Some(clicks);
        self
    }

    pub fn with_add_to_cart(mut self, add_to_cart: u32) -> Self {
        self.add_to_cart = Some(add_to_cart);
        self
    }

    pub fn with_purchases(mut self, purchases: u32) -> Self {
        self.purchases = Some(purchases);
        self
    }

    pub fn with_budget(mut self, budget: Decimal) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_reported_cpc(mut self, cpc: Decimal) -> Self {
        self.reported_cpc = Some(cpc);
        self
    }

    /// Ad spend, negative values read as zero
    pub fn spend(&self) -> Decimal {
        self.total_spend.max(Decimal::ZERO)
    }

    /// Purchases, absent counted as zero
    pub fn purchases(&self) -> u32 {
        self.purchases.unwrap_or(0)
    }

    /// Clicks, absent counted as zero
    pub fn clicks(&self) -> u32 {
        self.clicks.unwrap_or(0)
    }

    /// Add-to-carts, absent counted as zero
    pub fn add_to_cart(&self) -> u32 {
        self.add_to_cart.unwrap_or(0)
    }
}

/// A numeric field as it arrives from imports or the database layer:
/// either a real number or text that should hold one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(Decimal),
    Text(String),
}

impl From<Decimal> for NumericInput {
    fn from(value: Decimal) -> Self {
        NumericInput::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

impl NumericInput {
    /// Parse into a decimal. Empty text is treated as absent.
    fn to_decimal(&self, field: &'static str) -> Result<Option<Decimal>> {
        match self {
            NumericInput::Number(value) => Ok(Some(*value)),
            NumericInput::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                // Accept decimal commas ("12,50")
                let normalized = trimmed.replace(',', ".");
                Decimal::from_str(&normalized)
                    .map(Some)
                    .map_err(|_| EngineError::InvalidNumber {
                        field,
                        value: text.clone(),
                    })
            }
        }
    }
}

/// Loosely-typed daily row, before normalization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDailyRow {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub price: Option<NumericInput>,
    #[serde(default)]
    pub cost_of_goods: Option<NumericInput>,
    #[serde(default)]
    pub units_sold: Option<NumericInput>,
    #[serde(default)]
    pub total_spend: Option<NumericInput>,
    #[serde(default)]
    pub clicks: Option<NumericInput>,
    #[serde(default)]
    pub add_to_cart: Option<NumericInput>,
    #[serde(default)]
    pub purchases: Option<NumericInput>,
    #[serde(default)]
    pub budget: Option<NumericInput>,
    #[serde(default)]
    pub reported_cpc: Option<NumericInput>,
}

impl RawDailyRow {
    /// Coerce and validate into a typed row.
    ///
    /// Missing amounts and counts become zero, negative counts and spend are
    /// clamped to zero. Text that is not a number is rejected.
    pub fn normalize(&self) -> Result<DailyRow> {
        let date = parse_date(self.date.as_deref())?;

        let price = decimal_field("price", &self.price)?.unwrap_or(Decimal::ZERO);
        let cost_of_goods =
            decimal_field("cost_of_goods", &self.cost_of_goods)?.unwrap_or(Decimal::ZERO);

        let mut total_spend =
            decimal_field("total_spend", &self.total_spend)?.unwrap_or(Decimal::ZERO);
        if total_spend < Decimal::ZERO {
            warn!(%date, spend = %total_spend, "Negative spend clamped to zero");
            total_spend = Decimal::ZERO;
        }

        Ok(DailyRow {
            date,
            price,
            cost_of_goods,
            units_sold: count_field("units_sold", &self.units_sold)?.unwrap_or(0),
            total_spend,
            clicks: count_field("clicks", &self.clicks)?,
            add_to_cart: count_field("add_to_cart", &self.add_to_cart)?,
            purchases: count_field("purchases", &self.purchases)?,
            budget: decimal_field("budget", &self.budget)?.filter(|b| *b > Decimal::ZERO),
            reported_cpc: decimal_field("reported_cpc", &self.reported_cpc)?
                .filter(|c| *c > Decimal::ZERO),
        })
    }
}

/// Normalize a batch of raw rows into an oldest-first history
pub fn normalize_history(raw: &[RawDailyRow]) -> Result<Vec<DailyRow>> {
    let mut rows = raw
        .iter()
        .map(RawDailyRow::normalize)
        .collect::<Result<Vec<_>>>()?;
    rows.sort_by_key(|row| row.date);
    Ok(rows)
}

fn parse_date(input: Option<&str>) -> Result<NaiveDate> {
    let text = match input.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return Err(EngineError::MissingDate),
    };

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date);
    }

    // Timestamps from the database layer carry a time component
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.date_naive())
        .map_err(|_| EngineError::InvalidDate(text.to_string()))
}

fn decimal_field(field: &'static str, input: &Option<NumericInput>) -> Result<Option<Decimal>> {
    match input {
        Some(value) => value.to_decimal(field),
        None => Ok(None),
    }
}

fn count_field(field: &'static str, input: &Option<NumericInput>) -> Result<Option<u32>> {
    let Some(value) = decimal_field(field, input)? else {
        return Ok(None);
    };

    if value < Decimal::ZERO {
        warn!(field, %value, "Negative count clamped to zero");
        return Ok(Some(0));
    }

    value
        .trunc()
        .to_u32()
        .map(Some)
        .ok_or_else(|| EngineError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

/// Error types for row normalization and configuration
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid number in field {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Row has no date")]
    MissingDate,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
