//! Campaign Engine Library
//!
//! Budget decisions for paid-advertising campaigns: daily metrics, market
//! tier classification, day-indexed kill rules and budget ladder stepping.

pub mod config;
pub mod decision;
pub mod engine;
pub mod ladder;
pub mod market;
pub mod metrics;
pub mod portfolio;
pub mod rules;
pub mod types;


// Re-export main types for convenience
pub use config::{BadSignalPolicy, EngineConfig, MarginPolicy, TierProfile};
pub use decision::{Action, Decision};
pub use engine::{evaluate, DecisionEngine};
pub use ladder::{next_budget, prev_budget, BudgetLadder, LadderGrowth};
pub use market::{classify, MarketTier, TierBreakpoints};
pub use metrics::{
    aggregate_metrics, average_cpc, compute_metrics, Metrics, PeriodMetrics, DEFAULT_MARKET_CPC,
};
pub use portfolio::{CampaignDecision, CampaignHistory, Portfolio, PortfolioReport};
pub use rules::{Checkpoint, DayObservation, KillCondition, SpendGate};
pub use types::{normalize_history, DailyRow, EngineError, NumericInput, RawDailyRow, Result};
