//! Portfolio evaluation - one pass over every campaign in the market pool

use crate::decision::{Action, Decision};
use crate::engine::DecisionEngine;
use crate::market::MarketTier;
use crate::metrics::{aggregate_metrics, average_cpc, PeriodMetrics};
use crate::types::DailyRow;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Oldest-first history of one campaign/product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignHistory {
    pub campaign_id: String,
    pub rows: Vec<DailyRow>,
}

impl CampaignHistory {
    pub fn new(campaign_id: impl Into<String>, rows: Vec<DailyRow>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            rows,
        }
    }
}

/// Decision for one campaign alongside its period summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignDecision {
    pub campaign_id: String,
    pub decision: Decision,
    pub summary: PeriodMetrics,
}

/// Result of evaluating the whole pool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioReport {
    /// Mean CPC over every campaign in the pool
    pub market_cpc: Decimal,
    pub market_tier: MarketTier,
    pub decisions: Vec<CampaignDecision>,
    pub action_counts: BTreeMap<Action, usize>,
}

impl PortfolioReport {
    /// Campaigns the caller has to act on (kill or budget change)
    pub fn actionable(&self) -> impl Iterator<Item = &CampaignDecision> {
        self.decisions.iter().filter(|c| c.decision.is_actionable())
    }

    pub fn count(&self, action: Action) -> usize {
        self.action_counts.get(&action).copied().unwrap_or(0)
    }
}

/// Pool of campaigns treated as "the market" for classification
#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    campaigns: Vec<CampaignHistory>,
}

impl Portfolio {
    pub fn new(campaigns: Vec<CampaignHistory>) -> Self {
        Self { campaigns }
    }

    pub fn add(&mut self, campaign: CampaignHistory) {
        self.campaigns.push(campaign);
    }

    pub fn campaigns(&self) -> &[CampaignHistory] {
        &self.campaigns
    }

    /// Mean of positive CPC observations across every row in the pool
    pub fn market_cpc(&self) -> Decimal {
        average_cpc(self.campaigns.iter().flat_map(|c| c.rows.iter()))
    }

    /// Evaluate every campaign against the pool's market CPC
    pub fn evaluate(&self, engine: &DecisionEngine, is_day_complete: bool) -> PortfolioReport {
        let market_cpc = self.market_cpc();
        let market_tier = engine.classify(market_cpc);

        let decisions: Vec<CampaignDecision> = self
            .campaigns
            .iter()
            .map(|campaign| CampaignDecision {
                campaign_id: campaign.campaign_id.clone(),
                decision: engine.evaluate(&campaign.rows, market_cpc, is_day_complete),
                summary: aggregate_metrics(&campaign.rows),
            })
            .collect();

        let mut action_counts = BTreeMap::new();
        for entry in &decisions {
            *action_counts.entry(entry.decision.action).or_insert(0) += 1;
        }

        info!(
            campaigns = decisions.len(),
            %market_cpc,
            %market_tier,
            kills = action_counts.get(&Action::Kill).copied().unwrap_or(0),
            "Portfolio evaluated"
        );

        PortfolioReport {
            market_cpc,
            market_tier,
            decisions,
            action_counts,
        }
    }
}
