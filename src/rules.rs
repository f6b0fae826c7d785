//! Kill checkpoint tables
//!
//! Each tier lists its checkpoints in ascending spend order. A checkpoint
//! is reached once today's spend meets its gate; a reached checkpoint whose
//! condition holds kills the campaign. One loop evaluates every table.

use crate::metrics::row_cpc;
use crate::types::DailyRow;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Today's signals as seen by the kill rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayObservation {
    pub spend: Decimal,
    pub purchases: u32,
    pub add_to_cart: u32,
    pub cpc: Option<Decimal>,
}

impl From<&DailyRow> for DayObservation {
    fn from(row: &DailyRow) -> Self {
        Self {
            spend: row.spend(),
            purchases: row.purchases(),
            add_to_cart: row.add_to_cart(),
            cpc: row_cpc(row),
        }
    }
}

/// Spend level at which a checkpoint is evaluated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpendGate {
    /// Evaluated at any spend
    Immediate,
    /// Evaluated once spend reaches `spend`
    Fixed { spend: Decimal },
    /// Strong funnels (cheap clicks and enough add-to-carts) get the
    /// earlier `fast` checkpoint, everything else the later `slow` one
    Adaptive {
        fast: Decimal,
        slow: Decimal,
        cpc_below: Decimal,
        atc_at_least: u32,
    },
}

impl SpendGate {
    /// Spend threshold for today's signals, `None` when ungated
    pub fn threshold(&self, obs: &DayObservation) -> Option<Decimal> {
        match self {
            SpendGate::Immediate => None,
            SpendGate::Fixed { spend } => Some(*spend),
            SpendGate::Adaptive {
                fast,
                slow,
                cpc_below,
                atc_at_least,
            } => {
                let cheap_clicks = obs.cpc.map_or(false, |cpc| cpc < *cpc_below);
                if cheap_clicks && obs.add_to_cart >= *atc_at_least {
                    Some(*fast)
                } else {
                    Some(*slow)
                }
            }
        }
    }

    pub fn is_reached(&self, obs: &DayObservation) -> bool {
        self.threshold(obs).map_or(true, |threshold| obs.spend >= threshold)
    }
}

/// Condition under which a reached checkpoint kills.
/// An unknown CPC never satisfies a CPC condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KillCondition {
    NoSale,
    CpcAtLeast { threshold: Decimal },
    CpcAbove { threshold: Decimal },
    AtcBelow { count: u32 },
    All { conditions: Vec<KillCondition> },
}

impl KillCondition {
    pub fn holds(&self, obs: &DayObservation) -> bool {
        match self {
            KillCondition::NoSale => obs.purchases == 0,
            KillCondition::CpcAtLeast { threshold } => {
                obs.cpc.map_or(false, |cpc| cpc >= *threshold)
            }
            KillCondition::CpcAbove { threshold } => obs.cpc.map_or(false, |cpc| cpc > *threshold),
            KillCondition::AtcBelow { count } => obs.add_to_cart < *count,
            KillCondition::All { conditions } => conditions.iter().all(|c| c.holds(obs)),
        }
    }

    /// Human-readable account of the condition against today's values
    pub fn describe(&self, obs: &DayObservation) -> String {
        match self {
            KillCondition::NoSale => "no sale".to_string(),
            KillCondition::CpcAtLeast { threshold } => {
                format!("CPC {} ≥ {}", display_cpc(obs.cpc), threshold)
            }
            KillCondition::CpcAbove { threshold } => {
                format!("CPC {} > {}", display_cpc(obs.cpc), threshold)
            }
            KillCondition::AtcBelow { count } => {
                format!("ATC {} < {}", obs.add_to_cart, count)
            }
            KillCondition::All { conditions } => conditions
                .iter()
                .map(|c| c.describe(obs))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn display_cpc(cpc: Option<Decimal>) -> String {
    cpc.map(|c| c.normalize().to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

/// One row of a tier's kill table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Short identifier, recorded on the decision
    pub name: String,
    pub gate: SpendGate,
    pub kill_when: KillCondition,
}

impl Checkpoint {
    pub fn new(name: &str, gate: SpendGate, kill_when: KillCondition) -> Self {
        Self {
            name: name.to_string(),
            gate,
            kill_when,
        }
    }
}

/// The checkpoint that fired, with the spend threshold it was evaluated at
#[derive(Debug, Clone, Copy)]
pub struct FiredCheckpoint<'a> {
    pub checkpoint: &'a Checkpoint,
    pub spend_threshold: Option<Decimal>,
}

impl FiredCheckpoint<'_> {
    /// Kill reason, e.g. "€10 spent, no sale" or "CPC 0.7 ≥ 0.65, early kill"
    pub fn reason(&self, obs: &DayObservation, currency: &str) -> String {
        let detail = self.checkpoint.kill_when.describe(obs);
        match self.spend_threshold {
            Some(spend) => format!("{}{} spent, {}", currency, spend.normalize(), detail),
            None => format!("{}, early kill", detail),
        }
    }
}

/// Walk a table in order and return the first reached checkpoint that kills
pub fn first_kill<'a>(
    checkpoints: &'a [Checkpoint],
    obs: &DayObservation,
) -> Option<FiredCheckpoint<'a>> {
    checkpoints
        .iter()
        .filter(|cp| cp.gate.is_reached(obs))
        .find(|cp| cp.kill_when.holds(obs))
        .map(|checkpoint| FiredCheckpoint {
            checkpoint,
            spend_threshold: checkpoint.gate.threshold(obs),
        })
}
