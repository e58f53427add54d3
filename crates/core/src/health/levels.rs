//! Tier assignment: an upward pass over cumulative tier requirements followed
//! by retroactive caps for explicitly failed protection gates.

use serde::{Serialize, Serializer};

use crate::domain::level::Level;

use super::gates::{Gate, Gates};
use super::kpis::{Kpis, Metric};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Requirement {
    AtLeast(Metric, f64),
    AtMost(Metric, f64),
    Gate(Gate),
}

impl Requirement {
    pub fn label(self) -> String {
        match self {
            Self::AtLeast(metric, _) | Self::AtMost(metric, _) => metric.to_string(),
            Self::Gate(gate) => gate.to_string(),
        }
    }

    pub fn describe(self) -> String {
        match self {
            Self::AtLeast(_, threshold) => format!(">= {threshold}"),
            Self::AtMost(_, threshold) => format!("<= {threshold}"),
            Self::Gate(_) => "true".to_owned(),
        }
    }
}

/// Requirements to enter each tier above L1, lowest first.
pub const TIERS: &[(u8, &[Requirement])] = &[
    (2, &[Requirement::AtLeast(Metric::Sr, 0.01)]),
    (3, &[Requirement::AtLeast(Metric::Sr, 0.05)]),
    (4, &[Requirement::AtLeast(Metric::Sr, 0.10)]),
    (
        5,
        &[
            Requirement::AtLeast(Metric::EfMonths, 3.0),
            Requirement::AtMost(Metric::Hr, 0.40),
            Requirement::AtMost(Metric::Nmdsr, 0.10),
            Requirement::AtLeast(Metric::Lanw, 0.15),
            Requirement::Gate(Gate::HomeInsured),
        ],
    ),
    (
        6,
        &[
            Requirement::AtLeast(Metric::EfMonths, 4.0),
            Requirement::AtMost(Metric::DsrTotal, 0.20),
            Requirement::AtMost(Metric::DToA, 0.60),
            Requirement::AtLeast(Metric::PensionContribPct, 0.10),
            Requirement::Gate(Gate::IncomeProtection),
        ],
    ),
    (
        7,
        &[
            Requirement::AtLeast(Metric::Sr, 0.20),
            Requirement::AtLeast(Metric::EfMonths, 6.0),
            Requirement::AtMost(Metric::Hr, 0.35),
            Requirement::AtMost(Metric::DtiStock, 0.35),
            Requirement::AtLeast(Metric::Lanw, 0.25),
            Requirement::AtLeast(Metric::Invnw, 0.40),
            Requirement::AtLeast(Metric::CreditNorm, 0.60),
            Requirement::Gate(Gate::LifeCover),
        ],
    ),
    (
        8,
        &[
            Requirement::AtLeast(Metric::Rrr, 0.60),
            Requirement::AtMost(Metric::DsrTotal, 0.10),
            Requirement::AtMost(Metric::DToA, 0.40),
            Requirement::AtLeast(Metric::Invnw, 0.50),
            Requirement::AtLeast(Metric::Nwm, 5.0),
            Requirement::AtLeast(Metric::PensionContribPct, 0.15),
            Requirement::AtLeast(Metric::Ronw, 0.02),
        ],
    ),
    (9, &[Requirement::AtLeast(Metric::Rrr, 1.0), Requirement::AtLeast(Metric::Nwm, 25.0)]),
    (10, &[Requirement::AtLeast(Metric::Rrr, 1.2), Requirement::AtLeast(Metric::Nwm, 40.0)]),
];

/// Retroactive caps, applied in this order after the upward pass.
pub const CAPS: &[(Gate, u8, &str)] = &[
    (Gate::LifeCover, 7, "Life cover is below 5 years of needs for your dependants"),
    (Gate::IncomeProtection, 6, "Sick pay plus income protection covers less than 6 months"),
    (Gate::HomeInsured, 5, "Home insurance adequacy is not confirmed"),
];

fn has_cap(gate: Gate) -> bool {
    CAPS.iter().any(|(capped, _, _)| *capped == gate)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CheckValue {
    Number(f64),
    Flag(bool),
}

impl Serialize for CheckValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(value) => serializer.serialize_f64(*value),
            Self::Flag(value) => serializer.serialize_bool(*value),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChecklistItem {
    pub tier: Level,
    pub label: String,
    pub value: Option<CheckValue>,
    pub required: String,
    pub pass: bool,
    /// A failed gate whose cap rule takes effect after the upward pass.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deferred: bool,
}

impl ChecklistItem {
    fn blocks_promotion(&self) -> bool {
        !self.pass && !self.deferred
    }

    fn summary(&self) -> String {
        let value = match self.value {
            Some(CheckValue::Number(value)) => format!("{value:.2}"),
            Some(CheckValue::Flag(value)) => value.to_string(),
            None => "unknown".to_owned(),
        };
        format!("{} is {value}, needs {}", self.label, self.required)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LevelAssessment {
    pub level: Level,
    pub label: &'static str,
    /// Why the level was capped below what the upward pass reached.
    pub reasons: Vec<String>,
    /// Unmet requirements of the next tier.
    pub blockers: Vec<String>,
    pub checklist: Vec<ChecklistItem>,
}

pub trait LevelEngine: Send + Sync {
    fn assign(&self, kpis: &Kpis, gates: &Gates) -> LevelAssessment;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicLevelEngine;

impl LevelEngine for DeterministicLevelEngine {
    fn assign(&self, kpis: &Kpis, gates: &Gates) -> LevelAssessment {
        assign_level(kpis, gates)
    }
}

pub fn assign_level(kpis: &Kpis, gates: &Gates) -> LevelAssessment {
    let checklist = build_checklist(kpis, gates);

    let mut reached = Level::MIN;
    for (tier, _) in TIERS {
        let Some(candidate) = Level::new(*tier) else { break };
        let blocked = checklist
            .iter()
            .filter(|item| item.tier == candidate)
            .any(ChecklistItem::blocks_promotion);
        if blocked {
            break;
        }
        reached = candidate;
    }

    let mut level = reached;
    let mut reasons = Vec::new();
    for (gate, cap, reason) in CAPS {
        let Some(cap) = Level::new(*cap) else { continue };
        if gates.get(*gate) == Some(false) && level > cap {
            level = cap;
            reasons.push((*reason).to_owned());
        }
    }

    let blockers = level
        .next()
        .map(|next| {
            checklist
                .iter()
                .filter(|item| item.tier == next && !item.pass)
                .map(ChecklistItem::summary)
                .collect()
        })
        .unwrap_or_default();

    LevelAssessment { level, label: level.label(), reasons, blockers, checklist }
}

fn build_checklist(kpis: &Kpis, gates: &Gates) -> Vec<ChecklistItem> {
    let mut items = Vec::new();
    for (tier, requirements) in TIERS {
        let Some(tier) = Level::new(*tier) else { continue };
        for requirement in requirements.iter().copied() {
            let (value, pass, deferred) = match requirement {
                Requirement::AtLeast(metric, threshold) => {
                    let value = kpis.get(metric);
                    (value.map(CheckValue::Number), value.is_some_and(|v| v >= threshold), false)
                }
                Requirement::AtMost(metric, threshold) => {
                    let value = kpis.get(metric);
                    (value.map(CheckValue::Number), value.is_some_and(|v| v <= threshold), false)
                }
                Requirement::Gate(gate) => {
                    let value = gates.get(gate);
                    // undetermined gates do not hold a household back
                    let pass = value != Some(false);
                    (value.map(CheckValue::Flag), pass, !pass && has_cap(gate))
                }
            };
            items.push(ChecklistItem {
                tier,
                label: requirement.label(),
                value,
                required: requirement.describe(),
                pass,
                deferred,
            });
        }
    }
    items
}
