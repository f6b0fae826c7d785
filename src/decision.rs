//! Budget decisions - output from the decision engine

use crate::market::MarketTier;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What the caller should do with the campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Leave the campaign alone
    Maintain,
    /// Pause the campaign
    Kill,
    /// Raise the daily budget to `target_budget`
    Scale,
    /// Lower the daily budget to `target_budget`
    Descale,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::Maintain => "MAINTAIN",
            Action::Kill => "KILL",
            Action::Scale => "SCALE",
            Action::Descale => "DESCALE",
        };
        f.write_str(name)
    }
}

/// Budget decision with the values it was based on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub reason: String,
    /// New daily budget, only for Scale/Descale
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_budget: Option<Decimal>,
    pub market_tier: MarketTier,
    /// Position of today in the history (1-based, 0 when there is no history)
    pub day_index: usize,
    /// Thresholds and observations evaluated, for audit
    pub metadata: serde_json::Value,
}

impl Decision {
    fn new(action: Action, market_tier: MarketTier, day_index: usize, reason: String) -> Self {
        Self {
            action,
            reason,
            target_budget: None,
            market_tier,
            day_index,
            metadata: serde_json::json!({}),
        }
    }

    /// Leave the campaign running as is
    pub fn maintain(market_tier: MarketTier, day_index: usize, reason: impl Into<String>) -> Self {
        Self::new(Action::Maintain, market_tier, day_index, reason.into())
    }

    /// Pause the campaign
    pub fn kill(market_tier: MarketTier, day_index: usize, reason: impl Into<String>) -> Self {
        Self::new(Action::Kill, market_tier, day_index, reason.into())
    }

    /// Raise the budget
    pub fn scale(
        market_tier: MarketTier,
        day_index: usize,
        target_budget: Decimal,
        reason: impl Into<String>,
    ) -> Self {
        let mut decision = Self::new(Action::Scale, market_tier, day_index, reason.into());
        decision.target_budget = Some(target_budget);
        decision
    }

    /// Lower the budget
    pub fn descale(
        market_tier: MarketTier,
        day_index: usize,
        target_budget: Decimal,
        reason: impl Into<String>,
    ) -> Self {
        let mut decision = Self::new(Action::Descale, market_tier, day_index, reason.into());
        decision.target_budget = Some(target_budget);
        decision
    }

    /// Sentinel for an empty history
    pub fn inconclusive(market_tier: MarketTier) -> Self {
        Self::maintain(market_tier, 0, "No data for analysis")
    }

    /// True when the caller has to touch the ad platform
    pub fn is_actionable(&self) -> bool {
        self.action != Action::Maintain
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        if let Some(obj) = self.metadata.as_object_mut() {
            obj.insert(key.to_string(), value);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_budget_actions_carry_target() {
        let keep = Decision::maintain(MarketTier::Low, 3, "hold");
        assert_eq!(keep.target_budget, None);
        assert!(!keep.is_actionable());

        let up = Decision::scale(MarketTier::Low, 3, Decimal::from(30), "up");
        assert_eq!(up.target_budget, Some(Decimal::from(30)));
        assert!(up.is_actionable());
    }

    #[test]
    fn test_serialized_shape() {
        let d = Decision::kill(MarketTier::SuperLow, 1, "€10 spent, no sale")
            .with_metadata("checkpoint", serde_json::json!("spend_ceiling"));
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["action"], "KILL");
        assert_eq!(json["market_tier"], "SUPER_LOW");
        assert_eq!(json["metadata"]["checkpoint"], "spend_ceiling");
        assert!(json.get("target_budget").is_none());
    }
}
