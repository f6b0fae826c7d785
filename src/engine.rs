//! Decision engine - single evaluation entry point for all market tiers
//!
//! The position of today in the history selects the rule set:
//! day 1 runs the tier's spend checkpoints, day 2 adds the tier's day-2
//! kills, and from day 2 on a completed day is judged on recent margin.

use crate::config::{EngineConfig, TierProfile};
use crate::decision::Decision;
use crate::market::MarketTier;
use crate::metrics::{compute_metrics, round_ratio};
use crate::rules::{first_kill, DayObservation};
use crate::types::DailyRow;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, info, warn};

/// Decision engine - evaluates a campaign history against tier thresholds
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: EngineConfig,
}

impl DecisionEngine {
    /// Create new engine with config
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Market CPC actually used for classification
    pub fn effective_market_cpc(&self, avg_market_cpc: Decimal) -> Decimal {
        if avg_market_cpc > Decimal::ZERO {
            avg_market_cpc
        } else {
            self.config.default_market_cpc
        }
    }

    pub fn classify(&self, avg_market_cpc: Decimal) -> MarketTier {
        self.config
            .breakpoints
            .classify(self.effective_market_cpc(avg_market_cpc))
    }

    /// Evaluate one campaign.
    ///
    /// `history` is oldest-first and ends with today. Pure: equal inputs
    /// always give equal decisions.
    pub fn evaluate(
        &self,
        history: &[DailyRow],
        avg_market_cpc: Decimal,
        is_day_complete: bool,
    ) -> Decision {
        if avg_market_cpc <= Decimal::ZERO {
            warn!(
                default = %self.config.default_market_cpc,
                "No positive market CPC supplied, using default"
            );
        }
        let market_cpc = self.effective_market_cpc(avg_market_cpc);
        let tier = self.config.breakpoints.classify(market_cpc);

        let Some(today) = history.last() else {
            debug!(%tier, "Empty history, nothing to evaluate");
            return Decision::inconclusive(tier).with_metadata("market_cpc", json!(market_cpc));
        };

        let day_index = history.len();
        let profile = self.config.tier(tier);

        let decision = if day_index == 1 {
            self.evaluate_day_one(tier, profile, today)
        } else {
            self.evaluate_follow_up(tier, profile, history, is_day_complete)
        }
        .with_metadata("market_cpc", json!(market_cpc))
        .with_metadata("cpc_breakpoint", json!(profile.cpc_breakpoint));

        debug!(
            %tier,
            day_index,
            action = %decision.action,
            reason = %decision.reason,
            "Campaign evaluated"
        );
        if decision.is_actionable() {
            info!(
                %tier,
                day_index,
                action = %decision.action,
                target_budget = ?decision.target_budget,
                "{}",
                decision.reason
            );
        }

        decision
    }

    /// Day 1: a sale lets the campaign run, otherwise walk the kill table
    fn evaluate_day_one(&self, tier: MarketTier, profile: &TierProfile, today: &DailyRow) -> Decision {
        let obs = DayObservation::from(today);

        let decision = if obs.purchases >= 1 {
            Decision::maintain(tier, 1, "Got a sale, let it run")
        } else {
            match first_kill(&profile.day_one, &obs) {
                Some(fired) => Decision::kill(tier, 1, fired.reason(&obs, &self.config.currency_symbol))
                    .with_metadata("checkpoint", json!(fired.checkpoint.name))
                    .with_metadata("spend_threshold", json!(fired.spend_threshold)),
                None => Decision::maintain(tier, 1, "Continue progression"),
            }
        };

        with_observation(decision, &obs)
    }

    /// Day 2 and later
    fn evaluate_follow_up(
        &self,
        tier: MarketTier,
        profile: &TierProfile,
        history: &[DailyRow],
        is_day_complete: bool,
    ) -> Decision {
        let day_index = history.len();

        if day_index == 2 && !profile.day_two.is_empty() {
            if let Some(today) = history.last() {
                if let Some(kill) = self.day_two_kill(tier, profile, today) {
                    return kill;
                }
            }
        }

        if !is_day_complete {
            return Decision::maintain(tier, day_index, "Let the day finish");
        }

        self.end_of_day(tier, profile, history)
    }

    /// Day-2 kills: the bad-signal check first, then the day-2 table
    fn day_two_kill(&self, tier: MarketTier, profile: &TierProfile, today: &DailyRow) -> Option<Decision> {
        let obs = DayObservation::from(today);
        let policy = &self.config.bad_signal;
        let cpc_limit = profile.cpc_breakpoint * policy.cpc_multiplier;

        if let Some(cpc) = obs.cpc {
            if cpc > cpc_limit && obs.add_to_cart < policy.atc_below {
                let reason = format!(
                    "Day 2 bad signal: CPC {} > {}, ATC {} < {}",
                    cpc.normalize(),
                    cpc_limit.normalize(),
                    obs.add_to_cart,
                    policy.atc_below
                );
                let decision = Decision::kill(tier, 2, reason)
                    .with_metadata("checkpoint", json!("bad_signal"))
                    .with_metadata("cpc_limit", json!(cpc_limit));
                return Some(with_observation(decision, &obs));
            }
        }

        first_kill(&profile.day_two, &obs).map(|fired| {
            let reason = format!(
                "Day 2: {}",
                fired.reason(&obs, &self.config.currency_symbol)
            );
            let decision = Decision::kill(tier, 2, reason)
                .with_metadata("checkpoint", json!(fired.checkpoint.name))
                .with_metadata("spend_threshold", json!(fired.spend_threshold));
            with_observation(decision, &obs)
        })
    }

    /// Completed day: scale, hold, descale or kill on the recent mean margin
    fn end_of_day(&self, tier: MarketTier, profile: &TierProfile, history: &[DailyRow]) -> Decision {
        let day_index = history.len();
        let policy = &self.config.margin;
        let ladder = &profile.ladder;

        let mean = mean_margin_pct(history, policy.window_days);
        let current = current_budget(history).unwrap_or_else(|| ladder.first());

        let decision = if mean > policy.scale_above {
            let target = ladder.next(current);
            Decision::scale(
                tier,
                day_index,
                target,
                format!(
                    "Margin {}% over the last {} days, scaling {} → {}",
                    percent(mean),
                    policy.window_days,
                    current.normalize(),
                    target.normalize()
                ),
            )
        } else if mean <= policy.descale_at_or_below {
            match ladder.prev(current) {
                Some(target) => Decision::descale(
                    tier,
                    day_index,
                    target,
                    format!(
                        "Margin {}% over the last {} days, descaling {} → {}",
                        percent(mean),
                        policy.window_days,
                        current.normalize(),
                        target.normalize()
                    ),
                ),
                None => Decision::kill(tier, day_index, "Negative profit at minimum budget"),
            }
        } else {
            Decision::maintain(
                tier,
                day_index,
                format!("Margin {}% within hold band", percent(mean)),
            )
        };

        decision
            .with_metadata("mean_margin_pct", json!(round_ratio(mean)))
            .with_metadata("margin_window_days", json!(policy.window_days))
            .with_metadata("scale_above", json!(policy.scale_above))
            .with_metadata("descale_at_or_below", json!(policy.descale_at_or_below))
            .with_metadata("current_budget", json!(current))
            .with_metadata("ladder_min", json!(ladder.first()))
            .with_metadata("ladder_max", json!(ladder.last()))
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Evaluate with the default configuration
pub fn evaluate(history: &[DailyRow], avg_market_cpc: Decimal, is_day_complete: bool) -> Decision {
    DecisionEngine::default().evaluate(history, avg_market_cpc, is_day_complete)
}

/// Mean margin % over the last `window` rows. A day without revenue has no
/// margin % and counts as zero.
fn mean_margin_pct(history: &[DailyRow], window: usize) -> Decimal {
    let recent = &history[history.len().saturating_sub(window.max(1))..];
    if recent.is_empty() {
        return Decimal::ZERO;
    }

    let sum: Decimal = recent
        .iter()
        .map(|row| compute_metrics(row).margin_pct.unwrap_or(Decimal::ZERO))
        .sum();
    sum / Decimal::from(recent.len())
}

/// Today's budget, else the most recent one recorded
fn current_budget(history: &[DailyRow]) -> Option<Decimal> {
    history
        .iter()
        .rev()
        .find_map(|row| row.budget.filter(|b| *b > Decimal::ZERO))
}

fn percent(ratio: Decimal) -> Decimal {
    (ratio * Decimal::ONE_HUNDRED).round_dp(1).normalize()
}

fn with_observation(decision: Decision, obs: &DayObservation) -> Decision {
    decision
        .with_metadata("spend", json!(obs.spend))
        .with_metadata("purchases", json!(obs.purchases))
        .with_metadata("add_to_cart", json!(obs.add_to_cart))
        .with_metadata("cpc", json!(obs.cpc))
}
