//! Budget ladder navigation
//!
//! A ladder is an ascending list of daily budget levels. Scaling walks one
//! level up, descaling one level down. Past the last level budgets grow by
//! a fixed increment or a multiplicative factor.

use crate::market::MarketTier;
use crate::types::{EngineError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Growth rule once a budget is at or beyond the last ladder level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LadderGrowth {
    /// Add a fixed amount
    Increment { step: Decimal },
    /// Multiply, rounded to the nearest whole unit
    Multiply { factor: Decimal },
}

/// Tier-specific sequence of budget levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLadder {
    pub levels: Vec<Decimal>,
    pub growth: LadderGrowth,
}

impl BudgetLadder {
    pub fn new(levels: Vec<Decimal>, growth: LadderGrowth) -> Self {
        Self { levels, growth }
    }

    /// Linear ladder: `start, start + step, ...` up to `ceiling`, growing by `step` beyond
    pub fn linear(start: Decimal, step: Decimal, ceiling: Decimal) -> Self {
        let mut levels = Vec::new();
        let mut level = start;
        while step > Decimal::ZERO && level <= ceiling {
            levels.push(level);
            level += step;
        }
        Self::new(levels, LadderGrowth::Increment { step })
    }

    /// Lowest level (zero for an empty ladder)
    pub fn first(&self) -> Decimal {
        self.levels.first().copied().unwrap_or(Decimal::ZERO)
    }

    /// Highest fixed level (zero for an empty ladder)
    pub fn last(&self) -> Decimal {
        self.levels.last().copied().unwrap_or(Decimal::ZERO)
    }

    /// Index of an exact ladder member
    pub fn position(&self, budget: Decimal) -> Option<usize> {
        self.levels.iter().position(|level| *level == budget)
    }

    /// True when there is no lower step to descale to
    pub fn is_at_minimum(&self, budget: Decimal) -> bool {
        budget <= self.first()
    }

    /// Apply the above-ladder growth rule
    pub fn grow(&self, budget: Decimal) -> Decimal {
        match self.growth {
            LadderGrowth::Increment { step } => budget + step,
            LadderGrowth::Multiply { factor } => (budget * factor)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero),
        }
    }

    /// Budget one step up from `current`
    pub fn next(&self, current: Decimal) -> Decimal {
        if self.levels.is_empty() || current >= self.last() {
            return self.grow(current);
        }

        match self.position(current) {
            Some(i) => self.levels[i + 1],
            // Off-ladder budgets snap up to the next level
            None => self
                .levels
                .iter()
                .copied()
                .find(|level| *level > current)
                .unwrap_or_else(|| self.grow(current)),
        }
    }

    /// Budget one step down from `current`, `None` at or below the first level.
    ///
    /// Budgets above the last fixed level (reached through growth) drop
    /// straight back to the last fixed level, not by the inverse of the
    /// growth step.
    pub fn prev(&self, current: Decimal) -> Option<Decimal> {
        if self.levels.is_empty() || self.is_at_minimum(current) {
            return None;
        }

        if let Some(i) = self.position(current) {
            return Some(self.levels[i - 1]);
        }

        if current > self.last() {
            return Some(self.last());
        }

        self.levels.iter().copied().rev().find(|level| *level < current)
    }

    pub(crate) fn validate(&self, tier: MarketTier) -> Result<()> {
        if self.levels.is_empty() {
            return Err(EngineError::InvalidConfig(format!(
                "{} budget ladder is empty",
                tier
            )));
        }
        if self.levels[0] <= Decimal::ZERO {
            return Err(EngineError::InvalidConfig(format!(
                "{} budget ladder must start above zero",
                tier
            )));
        }
        if self.levels.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(EngineError::InvalidConfig(format!(
                "{} budget ladder must be strictly ascending",
                tier
            )));
        }
        let growth_ok = match self.growth {
            LadderGrowth::Increment { step } => step > Decimal::ZERO,
            LadderGrowth::Multiply { factor } => factor > Decimal::ONE,
        };
        if !growth_ok {
            return Err(EngineError::InvalidConfig(format!(
                "{} ladder growth must increase the budget",
                tier
            )));
        }
        Ok(())
    }
}

/// Next budget on the default ladder for a tier
pub fn next_budget(tier: MarketTier, current: Decimal) -> Decimal {
    crate::config::default_ladder(tier).next(current)
}

/// Previous budget on the default ladder for a tier
pub fn prev_budget(tier: MarketTier, current: Decimal) -> Option<Decimal> {
    crate::config::default_ladder(tier).prev(current)
}
