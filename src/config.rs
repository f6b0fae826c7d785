//! Engine Configuration
//!
//! Threshold tables and budget ladders per market tier. Defaults live in
//! code; deployments can override them from a file and the environment.

use crate::ladder::{BudgetLadder, LadderGrowth};
use crate::market::{MarketTier, TierBreakpoints};
use crate::metrics::DEFAULT_MARKET_CPC;
use crate::rules::{Checkpoint, KillCondition, SpendGate};
use crate::types::{EngineError, Result};
use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Environment prefix for overrides, e.g. `CAMPAIGN_ENGINE__MARGIN__SCALE_ABOVE=0.25`
pub const ENV_PREFIX: &str = "CAMPAIGN_ENGINE";

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// CPC bounds for market classification
    pub breakpoints: TierBreakpoints,
    pub super_low: TierProfile,
    pub low: TierProfile,
    pub normal: TierProfile,
    /// Market CPC used when the caller has no positive observation
    pub default_market_cpc: Decimal,
    pub margin: MarginPolicy,
    pub bad_signal: BadSignalPolicy,
    /// Prefix for amounts in decision reasons
    pub currency_symbol: String,
}

/// Thresholds and ladder owned by one market tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierProfile {
    /// Reference CPC for the tier
    pub cpc_breakpoint: Decimal,
    /// Day-1 kill table, ascending spend
    pub day_one: Vec<Checkpoint>,
    /// Day-2 kill table. Empty means the tier has no day-2 stage.
    #[serde(default)]
    pub day_two: Vec<Checkpoint>,
    pub ladder: BudgetLadder,
}

/// End-of-day margin thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginPolicy {
    /// Number of most recent days averaged
    pub window_days: usize,
    /// Mean margin strictly above this scales up
    pub scale_above: Decimal,
    /// Mean margin at or below this descales (or kills at the minimum budget)
    pub descale_at_or_below: Decimal,
}

impl Default for MarginPolicy {
    fn default() -> Self {
        Self {
            window_days: 2,
            scale_above: Decimal::new(20, 2),
            descale_at_or_below: Decimal::ZERO,
        }
    }
}

/// Day-2 immediate kill on expensive clicks with a weak funnel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BadSignalPolicy {
    /// Kill when CPC exceeds this multiple of the tier breakpoint
    pub cpc_multiplier: Decimal,
    /// ... and add-to-carts are below this
    pub atc_below: u32,
}

impl Default for BadSignalPolicy {
    fn default() -> Self {
        Self {
            cpc_multiplier: Decimal::new(15, 1),
            atc_below: 2,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            breakpoints: TierBreakpoints::default(),
            super_low: super_low_profile(),
            low: low_profile(),
            normal: normal_profile(),
            default_market_cpc: DEFAULT_MARKET_CPC,
            margin: MarginPolicy::default(),
            bad_signal: BadSignalPolicy::default(),
            currency_symbol: "€".to_string(),
        }
    }
}

impl EngineConfig {
    /// Profile for a tier
    pub fn tier(&self, tier: MarketTier) -> &TierProfile {
        match tier {
            MarketTier::SuperLow => &self.super_low,
            MarketTier::Low => &self.low,
            MarketTier::Normal => &self.normal,
        }
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.breakpoints.super_low_max <= Decimal::ZERO
            || self.breakpoints.super_low_max >= self.breakpoints.low_max
        {
            return Err(EngineError::InvalidConfig(format!(
                "breakpoints must satisfy 0 < super_low_max < low_max (got {} / {})",
                self.breakpoints.super_low_max, self.breakpoints.low_max
            )));
        }
        if self.default_market_cpc <= Decimal::ZERO {
            return Err(EngineError::InvalidConfig(
                "default_market_cpc must be positive".to_string(),
            ));
        }
        if self.margin.window_days == 0 {
            return Err(EngineError::InvalidConfig(
                "margin.window_days must be at least 1".to_string(),
            ));
        }
        if self.margin.descale_at_or_below > self.margin.scale_above {
            return Err(EngineError::InvalidConfig(
                "margin.descale_at_or_below must not exceed margin.scale_above".to_string(),
            ));
        }
        if self.bad_signal.cpc_multiplier <= Decimal::ZERO {
            return Err(EngineError::InvalidConfig(
                "bad_signal.cpc_multiplier must be positive".to_string(),
            ));
        }

        for tier in MarketTier::ALL {
            let profile = self.tier(tier);
            if profile.cpc_breakpoint <= Decimal::ZERO {
                return Err(EngineError::InvalidConfig(format!(
                    "{} cpc_breakpoint must be positive",
                    tier
                )));
            }
            validate_table(tier, "day_one", &profile.day_one)?;
            validate_table(tier, "day_two", &profile.day_two)?;
            profile.ladder.validate(tier)?;
        }
        Ok(())
    }

    /// Load configuration: defaults, then an optional file (TOML/JSON/YAML by
    /// extension), then `CAMPAIGN_ENGINE__*` environment variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let defaults = config::Config::try_from(&EngineConfig::default())
            .context("Failed to seed configuration defaults")?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"));

        let loaded: EngineConfig = builder
            .build()
            .context("Failed to read engine configuration")?
            .try_deserialize()
            .context("Invalid engine configuration shape")?;

        loaded.validate()?;

        info!(
            source = %path.map(|p| p.display().to_string()).unwrap_or_else(|| "defaults".to_string()),
            "Engine configuration loaded"
        );
        Ok(loaded)
    }
}

fn validate_table(tier: MarketTier, table: &str, checkpoints: &[Checkpoint]) -> Result<()> {
    let mut previous = Decimal::ZERO;
    for checkpoint in checkpoints {
        let spend = match &checkpoint.gate {
            SpendGate::Immediate => continue,
            SpendGate::Fixed { spend } => *spend,
            SpendGate::Adaptive { fast, slow, .. } => {
                if fast > slow {
                    return Err(EngineError::InvalidConfig(format!(
                        "{} {} checkpoint {}: fast spend above slow spend",
                        tier, table, checkpoint.name
                    )));
                }
                *fast
            }
        };
        if spend < previous {
            return Err(EngineError::InvalidConfig(format!(
                "{} {} checkpoints must be in ascending spend order ({} after {})",
                tier, table, spend, previous
            )));
        }
        previous = spend;
    }
    Ok(())
}

/// Default ladder for a tier
pub fn default_ladder(tier: MarketTier) -> BudgetLadder {
    match tier {
        MarketTier::SuperLow => BudgetLadder::linear(d(10), d(10), d(100)),
        MarketTier::Low => BudgetLadder::new(
            [15, 20, 30, 45, 60, 80, 100, 130, 170, 220, 300, 400]
                .into_iter()
                .map(d)
                .collect(),
            LadderGrowth::Multiply {
                factor: Decimal::new(12, 1),
            },
        ),
        MarketTier::Normal => BudgetLadder::new(
            [20, 30, 40, 60, 80, 100, 130, 170, 220, 300, 400]
                .into_iter()
                .map(d)
                .collect(),
            LadderGrowth::Multiply {
                factor: Decimal::new(12, 1),
            },
        ),
    }
}

fn super_low_profile() -> TierProfile {
    let breakpoint = Decimal::new(65, 2);
    TierProfile {
        cpc_breakpoint: breakpoint,
        day_one: vec![
            Checkpoint::new(
                "early_cpc",
                SpendGate::Immediate,
                KillCondition::CpcAtLeast {
                    threshold: breakpoint,
                },
            ),
            Checkpoint::new("spend_ceiling", fixed(10), KillCondition::NoSale),
        ],
        // No distinct day-2 stage: day 2 goes straight to end-of-day rules
        day_two: Vec::new(),
        ladder: default_ladder(MarketTier::SuperLow),
    }
}

fn low_profile() -> TierProfile {
    let breakpoint = Decimal::new(75, 2);
    TierProfile {
        cpc_breakpoint: breakpoint,
        day_one: vec![
            Checkpoint::new("cpc_check", fixed(10), no_sale_and(cpc_above(breakpoint))),
            Checkpoint::new("atc_check", fixed(15), no_sale_and(atc_below(2))),
            Checkpoint::new(
                "final_spend",
                SpendGate::Adaptive {
                    fast: d(20),
                    slow: d(25),
                    cpc_below: Decimal::new(7, 1),
                    atc_at_least: 3,
                },
                KillCondition::NoSale,
            ),
            Checkpoint::new("spend_ceiling", fixed(30), KillCondition::NoSale),
        ],
        day_two: vec![
            Checkpoint::new("day_two_spend", fixed(10), KillCondition::NoSale),
            Checkpoint::new("day_two_ceiling", fixed(25), KillCondition::NoSale),
        ],
        ladder: default_ladder(MarketTier::Low),
    }
}

fn normal_profile() -> TierProfile {
    // Policy default matching the fallback market CPC, not derived from data
    let breakpoint = Decimal::ONE;
    TierProfile {
        cpc_breakpoint: breakpoint,
        day_one: vec![
            Checkpoint::new("cpc_check", fixed(10), no_sale_and(cpc_above(breakpoint))),
            Checkpoint::new("atc_check", fixed(20), no_sale_and(atc_below(2))),
            Checkpoint::new(
                "final_spend",
                SpendGate::Adaptive {
                    fast: d(25),
                    slow: d(30),
                    cpc_below: Decimal::new(9, 1),
                    atc_at_least: 3,
                },
                KillCondition::NoSale,
            ),
            Checkpoint::new("spend_ceiling", fixed(50), KillCondition::NoSale),
        ],
        day_two: vec![
            Checkpoint::new("day_two_atc", fixed(15), no_sale_and(atc_below(2))),
            Checkpoint::new("day_two_ceiling", fixed(25), KillCondition::NoSale),
        ],
        ladder: default_ladder(MarketTier::Normal),
    }
}

fn d(v: i64) -> Decimal {
    Decimal::from(v)
}

fn fixed(spend: i64) -> SpendGate {
    SpendGate::Fixed { spend: d(spend) }
}

fn cpc_above(threshold: Decimal) -> KillCondition {
    KillCondition::CpcAbove { threshold }
}

fn atc_below(count: u32) -> KillCondition {
    KillCondition::AtcBelow { count }
}

fn no_sale_and(condition: KillCondition) -> KillCondition {
    KillCondition::All {
        conditions: vec![KillCondition::NoSale, condition],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.margin.window_days, 2);
        assert_eq!(config.default_market_cpc, Decimal::ONE);
        assert!(config.tier(MarketTier::SuperLow).day_two.is_empty());
        assert_eq!(config.tier(MarketTier::Low).cpc_breakpoint, Decimal::new(75, 2));
    }

    #[test]
    fn test_default_ladders() {
        let super_low = default_ladder(MarketTier::SuperLow);
        assert_eq!(super_low.first(), d(10));
        assert_eq!(super_low.last(), d(100));
        assert_eq!(super_low.levels.len(), 10);

        assert_eq!(default_ladder(MarketTier::Low).last(), d(400));
        assert_eq!(default_ladder(MarketTier::Normal).first(), d(20));
    }

    #[test]
    fn test_validate_rejects_bad_breakpoints() {
        let mut config = EngineConfig::default();
        config.breakpoints.low_max = Decimal::new(60, 2);
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_descending_checkpoints() {
        let mut config = EngineConfig::default();
        config.low.day_one.reverse();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_defaults_without_file() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config.tier(MarketTier::Normal).ladder, default_ladder(MarketTier::Normal));
        assert_eq!(config.currency_symbol, "€");
    }

    #[test]
    fn test_load_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
currency_symbol = "$"

[margin]
window_days = 3
scale_above = "0.25"
descale_at_or_below = "0"
"#
        )
        .unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.margin.window_days, 3);
        assert_eq!(config.margin.scale_above, Decimal::new(25, 2));
        // Untouched sections keep their defaults
        assert_eq!(config.low, EngineConfig::default().low);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[margin]\nwindow_days = 0").unwrap();
        assert!(EngineConfig::load(Some(file.path())).is_err());
    }
}
