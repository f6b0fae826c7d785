//! Market tier classification by average cost per click

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market tier, selects which threshold table and budget ladder apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketTier {
    /// Average CPC at or below 0.65
    SuperLow,
    /// Average CPC above 0.65, at or below 0.75
    Low,
    /// Average CPC above 0.75
    Normal,
}

impl MarketTier {
    pub const ALL: [MarketTier; 3] = [MarketTier::SuperLow, MarketTier::Low, MarketTier::Normal];
}

impl std::fmt::Display for MarketTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            MarketTier::SuperLow => "SUPER_LOW",
            MarketTier::Low => "LOW",
            MarketTier::Normal => "NORMAL",
        };
        f.write_str(code)
    }
}

/// Upper CPC bounds (inclusive) of the two cheaper tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierBreakpoints {
    pub super_low_max: Decimal,
    pub low_max: Decimal,
}

impl Default for TierBreakpoints {
    fn default() -> Self {
        Self {
            super_low_max: Decimal::new(65, 2),
            low_max: Decimal::new(75, 2),
        }
    }
}

impl TierBreakpoints {
    /// Bucket an average CPC. Ties go to the cheaper tier.
    pub fn classify(&self, avg_cpc: Decimal) -> MarketTier {
        if avg_cpc <= self.super_low_max {
            MarketTier::SuperLow
        } else if avg_cpc <= self.low_max {
            MarketTier::Low
        } else {
            MarketTier::Normal
        }
    }
}

/// Classify with the default breakpoints
pub fn classify(avg_cpc: Decimal) -> MarketTier {
    TierBreakpoints::default().classify(avg_cpc)
}
