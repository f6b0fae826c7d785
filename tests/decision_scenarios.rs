//! Decision scenarios and rule properties
//!
//! Walks campaigns through day 1, day 2 and end-of-day evaluations and
//! checks the properties the rule tables must keep.

use campaign_engine::{
    evaluate, next_budget, prev_budget, Action, DailyRow, DecisionEngine, EngineConfig,
    MarketTier,
};
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    Decimal::from_str_exact(s).unwrap()
}

fn date(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 2).unwrap() + Days::new(offset)
}

/// Market CPC inside each tier's band
fn market_for(tier: MarketTier) -> Decimal {
    match tier {
        MarketTier::SuperLow => dec("0.55"),
        MarketTier::Low => dec("0.70"),
        MarketTier::Normal => dec("1.10"),
    }
}

/// First day of a product priced 40 with cost 15
fn day_one(spend: &str, cpc: &str, atc: u32, purchases: u32) -> Vec<DailyRow> {
    vec![DailyRow::new(date(0), dec("40"), dec("15"))
        .with_spend(dec(spend))
        .with_reported_cpc(dec(cpc))
        .with_add_to_cart(atc)
        .with_purchases(purchases)
        .with_units_sold(purchases)]
}

/// A day with one sale at price 40 / cost 15: margin % = (25 - spend) / 40
fn selling_day(offset: u64, spend: &str, budget: &str) -> DailyRow {
    DailyRow::new(date(offset), dec("40"), dec("15"))
        .with_units_sold(1)
        .with_purchases(1)
        .with_add_to_cart(3)
        .with_clicks(30)
        .with_spend(dec(spend))
        .with_budget(dec(budget))
}

fn three_days(spend: &str, budget: &str) -> Vec<DailyRow> {
    (0..3).map(|i| selling_day(i, spend, budget)).collect()
}

// ---------------------------------------------------------------------------
// SUPER_LOW walkthrough (market breakpoint 0.65)
// ---------------------------------------------------------------------------

#[test]
fn test_super_low_expensive_clicks_killed_before_spend_checkpoint() {
    let d = evaluate(&day_one("12", "0.70", 0, 0), market_for(MarketTier::SuperLow), false);
    assert_eq!(d.market_tier, MarketTier::SuperLow);
    assert_eq!(d.action, Action::Kill);
    assert_eq!(d.reason, "CPC 0.7 ≥ 0.65, early kill");
    assert_eq!(d.metadata["checkpoint"], "early_cpc");
}

#[test]
fn test_super_low_sale_keeps_campaign_running() {
    let d = evaluate(&day_one("8", "0.40", 0, 1), market_for(MarketTier::SuperLow), false);
    assert_eq!(d.action, Action::Maintain);
    assert_eq!(d.reason, "Got a sale, let it run");
    assert_eq!(d.target_budget, None);
}

#[test]
fn test_super_low_ten_spent_without_sale() {
    let d = evaluate(&day_one("10", "0.40", 0, 0), market_for(MarketTier::SuperLow), false);
    assert_eq!(d.action, Action::Kill);
    assert_eq!(d.reason, "€10 spent, no sale");
}

#[test]
fn test_super_low_below_ceiling_continues() {
    let d = evaluate(&day_one("9.99", "0.40", 0, 0), market_for(MarketTier::SuperLow), true);
    assert_eq!(d.action, Action::Maintain);
    assert_eq!(d.reason, "Continue progression");
}

#[test]
fn test_super_low_profitable_days_scale_up_the_ladder() {
    // (25 - 15) / 40 = 0.25
    let d = evaluate(&three_days("15", "10"), market_for(MarketTier::SuperLow), true);
    assert_eq!(d.day_index, 3);
    assert_eq!(d.action, Action::Scale);
    assert_eq!(d.target_budget, Some(dec("20")));
}

#[test]
fn test_super_low_loss_at_minimum_budget_kills() {
    // (25 - 27) / 40 = -0.05
    let d = evaluate(&three_days("27", "10"), market_for(MarketTier::SuperLow), true);
    assert_eq!(d.action, Action::Kill);
    assert_eq!(d.reason, "Negative profit at minimum budget");
    assert_eq!(d.target_budget, None);
}

#[test]
fn test_unfinished_day_is_left_alone() {
    for spend in ["5", "15", "27", "60"] {
        let d = evaluate(&three_days(spend, "10"), market_for(MarketTier::SuperLow), false);
        assert_eq!(d.action, Action::Maintain);
        assert_eq!(d.reason, "Let the day finish");
    }
}

// ---------------------------------------------------------------------------
// End-of-day boundaries
// ---------------------------------------------------------------------------

#[test]
fn test_margin_exactly_at_scale_threshold_holds() {
    // (25 - 17) / 40 = 0.20
    let d = evaluate(&three_days("17", "30"), market_for(MarketTier::SuperLow), true);
    assert_eq!(d.action, Action::Maintain);
}

#[test]
fn test_margin_just_above_zero_holds() {
    // (25 - 24.96) / 40 = 0.001
    let d = evaluate(&three_days("24.96", "30"), market_for(MarketTier::SuperLow), true);
    assert_eq!(d.action, Action::Maintain);
}

#[test]
fn test_margin_exactly_zero_descales() {
    let d = evaluate(&three_days("25", "30"), market_for(MarketTier::SuperLow), true);
    assert_eq!(d.action, Action::Descale);
    assert_eq!(d.target_budget, Some(dec("20")));

    let d = evaluate(&three_days("25", "10"), market_for(MarketTier::SuperLow), true);
    assert_eq!(d.action, Action::Kill);
}

#[test]
fn test_low_and_normal_grow_by_twenty_percent_past_the_ladder() {
    for tier in [MarketTier::Low, MarketTier::Normal] {
        let d = evaluate(&three_days("5", "400"), market_for(tier), true);
        assert_eq!(d.action, Action::Scale, "{}", tier);
        assert_eq!(d.target_budget, Some(dec("480")), "{}", tier);

        let d = evaluate(&three_days("30", "480"), market_for(tier), true);
        assert_eq!(d.action, Action::Descale, "{}", tier);
        assert_eq!(d.target_budget, Some(dec("400")), "{}", tier);
    }
}

#[test]
fn test_day_two_profitable_campaign_scales() {
    let history = vec![selling_day(0, "10", "15"), selling_day(1, "10", "15")];
    let d = evaluate(&history, market_for(MarketTier::Low), true);
    assert_eq!(d.day_index, 2);
    assert_eq!(d.action, Action::Scale);
    assert_eq!(d.target_budget, Some(dec("20")));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn test_evaluation_is_idempotent() {
    let engine = DecisionEngine::default();
    let histories = vec![
        day_one("12", "0.70", 0, 0),
        day_one("3", "0.50", 2, 0),
        three_days("15", "10"),
        three_days("27", "100"),
        vec![],
    ];
    for tier in MarketTier::ALL {
        for history in &histories {
            let first = engine.evaluate(history, market_for(tier), true);
            let second = engine.evaluate(history, market_for(tier), true);
            assert_eq!(first, second);
        }
    }
}

#[test]
fn test_day_one_kill_is_monotonic_in_spend() {
    let cpcs = ["0.30", "0.60", "0.65", "0.69", "0.72", "0.80", "0.95", "1.20"];
    for tier in MarketTier::ALL {
        for cpc in cpcs {
            for atc in 0..5 {
                let mut killed_at: Option<u32> = None;
                for spend in 0..=60u32 {
                    let history = day_one(&spend.to_string(), cpc, atc, 0);
                    let action = evaluate(&history, market_for(tier), false).action;
                    match killed_at {
                        Some(first) => assert_eq!(
                            action,
                            Action::Kill,
                            "{} cpc {} atc {}: killed at {} but not at {}",
                            tier,
                            cpc,
                            atc,
                            first,
                            spend
                        ),
                        None if action == Action::Kill => killed_at = Some(spend),
                        None => {}
                    }
                }
                // Every tier has an absolute spend ceiling on day 1
                assert!(killed_at.is_some(), "{} cpc {} atc {} never killed", tier, cpc, atc);
            }
        }
    }
}

#[test]
fn test_day_one_sale_overrides_every_kill() {
    for tier in MarketTier::ALL {
        for spend in ["0", "10", "25", "49", "100"] {
            for cpc in ["0.30", "0.70", "2.00"] {
                for atc in [0, 1, 6] {
                    for purchases in [1, 2, 5] {
                        let d = evaluate(&day_one(spend, cpc, atc, purchases), market_for(tier), true);
                        assert_eq!(d.action, Action::Maintain);
                    }
                }
            }
        }
    }
}

#[test]
fn test_ladder_round_trip_for_every_member() {
    let config = EngineConfig::default();
    for tier in MarketTier::ALL {
        let levels = &config.tier(tier).ladder.levels;
        for level in &levels[..levels.len() - 1] {
            let up = next_budget(tier, *level);
            assert!(up > *level);
            assert_eq!(prev_budget(tier, up), Some(*level), "{} from {}", tier, level);
        }
        assert_eq!(prev_budget(tier, levels[0]), None);
    }
}

#[test]
fn test_super_low_ladder_grows_linearly_past_ceiling() {
    assert_eq!(next_budget(MarketTier::SuperLow, dec("100")), dec("110"));
    assert_eq!(next_budget(MarketTier::SuperLow, dec("130")), dec("140"));
    assert_eq!(prev_budget(MarketTier::SuperLow, dec("130")), Some(dec("100")));
}
