use serde::{Deserialize, Serialize};

use super::gates::{Gate, Gates};
use super::kpis::{Kpis, Metric};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    Protect,
    Save,
    Spend,
    Borrow,
    Grow,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub code: String,
    pub pillar: Pillar,
    pub title: String,
    pub why: String,
    pub steps: Vec<String>,
    /// Urgency in 0..=1.
    pub score: f64,
    #[serde(skip)]
    gate: bool,
}

impl Recommendation {
    pub fn is_gate(&self) -> bool {
        self.gate
    }
}

pub trait RecommendationEngine: Send + Sync {
    fn rank(&self, kpis: &Kpis, gates: &Gates, limit: usize) -> Vec<Recommendation>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DeterministicRecommendationEngine;

impl RecommendationEngine for DeterministicRecommendationEngine {
    fn rank(&self, kpis: &Kpis, gates: &Gates, limit: usize) -> Vec<Recommendation> {
        rank_recommendations(kpis, gates, limit)
    }
}

struct GateRule {
    gate: Gate,
    score: f64,
    pillar: Pillar,
    title: &'static str,
    why: &'static str,
    steps: &'static [&'static str],
}

const GATE_RULES: &[GateRule] = &[
    GateRule {
        gate: Gate::LifeCover,
        score: 1.0,
        pillar: Pillar::Protect,
        title: "Raise life cover to at least 5 years of household needs",
        why: "Your dependants rely on your income and current cover lasts under 5 years.",
        steps: &[
            "Get a term life quote this week",
            "Size the sum assured at 5 or more years of dependant needs",
        ],
    },
    GateRule {
        gate: Gate::IncomeProtection,
        score: 0.9,
        pillar: Pillar::Protect,
        title: "Secure 6 months of income continuity",
        why: "Sick pay plus income protection would cover less than 6 months.",
        steps: &[
            "Read your employer's sick pay policy",
            "Price income protection that covers essentials for 6 months",
        ],
    },
    GateRule {
        gate: Gate::HomeInsured,
        score: 0.8,
        pillar: Pillar::Protect,
        title: "Confirm your home is insured for its rebuild cost",
        why: "Home insurance adequacy is not confirmed.",
        steps: &[
            "Compare your sum insured with a rebuild cost estimate",
            "Raise the cover or switch policy if it falls short",
        ],
    },
    GateRule {
        gate: Gate::CurrentRatio,
        score: 0.7,
        pillar: Pillar::Save,
        title: "Hold enough cash for bills due in the next 12 months",
        why: "Liquid savings are below the liabilities due within a year.",
        steps: &[
            "List every payment due in the next 12 months",
            "Top up easy-access savings until they cover that list",
        ],
    },
];

#[derive(Clone, Copy)]
enum Direction {
    AtLeast,
    AtMost,
}

struct RatioRule {
    metric: Metric,
    direction: Direction,
    target: f64,
    span: f64,
    pillar: Pillar,
    title: &'static str,
    why: fn(f64) -> String,
    steps: &'static [&'static str],
}

fn pct(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

const RATIO_RULES: &[RatioRule] = &[
    RatioRule {
        metric: Metric::EfMonths,
        direction: Direction::AtLeast,
        target: 3.0,
        span: 3.0,
        pillar: Pillar::Save,
        title: "Build your emergency fund to 3 months of essentials",
        why: |value| format!("Your buffer covers about {value:.1} months of essential spending."),
        steps: &["Open a separate easy-access savings pot", "Automate a transfer of 5-10% of each pay"],
    },
    RatioRule {
        metric: Metric::Nmdsr,
        direction: Direction::AtMost,
        target: 0.10,
        span: 0.20,
        pillar: Pillar::Borrow,
        title: "Cut non-mortgage debt repayments to 10% of income or less",
        why: |value| format!("Non-mortgage repayments take about {} of net income.", pct(value)),
        steps: &["Consolidate the highest-rate balances", "Overpay the smallest balance each month"],
    },
    RatioRule {
        metric: Metric::Sr,
        direction: Direction::AtLeast,
        target: 0.20,
        span: 0.20,
        pillar: Pillar::Spend,
        title: "Lift your savings rate toward 20%",
        why: |value| format!("You currently save about {} of net income.", pct(value)),
        steps: &["Trim 1-2% from your largest spending categories", "Raise automatic saving by a fixed amount"],
    },
    RatioRule {
        metric: Metric::Hr,
        direction: Direction::AtMost,
        target: 0.40,
        span: 0.20,
        pillar: Pillar::Spend,
        title: "Bring housing costs to 40% of gross income or less",
        why: |value| format!("Housing takes about {} of gross income.", pct(value)),
        steps: &[
            "Renegotiate rent or review household bills",
            "Look at refinancing or a longer mortgage term",
        ],
    },
    RatioRule {
        metric: Metric::DsrTotal,
        direction: Direction::AtMost,
        target: 0.20,
        span: 0.30,
        pillar: Pillar::Borrow,
        title: "Reduce total debt servicing to 20% of income or less",
        why: |value| format!("Debt repayments take about {} of net income.", pct(value)),
        steps: &["Refinance to a lower rate where you can", "Send freed-up cash to the highest-rate debt"],
    },
    RatioRule {
        metric: Metric::DToA,
        direction: Direction::AtMost,
        target: 0.60,
        span: 0.40,
        pillar: Pillar::Borrow,
        title: "Get debt below 60% of your assets",
        why: |value| format!("Debt-to-asset ratio is about {value:.2}."),
        steps: &["Prioritise repayment over new borrowing", "Delay large new liabilities until the ratio improves"],
    },
    RatioRule {
        metric: Metric::Lanw,
        direction: Direction::AtLeast,
        target: 0.15,
        span: 0.15,
        pillar: Pillar::Save,
        title: "Keep at least 15% of net worth in liquid assets",
        why: |value| format!("Liquid assets are about {} of net worth.", pct(value)),
        steps: &["Hold part of new savings in cash", "Build the buffer before investing more"],
    },
    RatioRule {
        metric: Metric::Invnw,
        direction: Direction::AtLeast,
        target: 0.40,
        span: 0.40,
        pillar: Pillar::Grow,
        title: "Grow investable assets toward 40% of net worth",
        why: |value| format!("Investable assets are about {} of net worth.", pct(value)),
        steps: &["Automate a monthly investment", "Rebalance once a year to your target mix"],
    },
    RatioRule {
        metric: Metric::PensionContribPct,
        direction: Direction::AtLeast,
        target: 0.10,
        span: 0.10,
        pillar: Pillar::Grow,
        title: "Contribute at least 10% of gross pay to your pension",
        why: |value| format!("You contribute about {} of gross pay.", pct(value)),
        steps: &["Capture the full employer match first", "Raise salary sacrifice by 1-2%"],
    },
    RatioRule {
        metric: Metric::Rrr,
        direction: Direction::AtLeast,
        target: 0.60,
        span: 0.60,
        pillar: Pillar::Grow,
        title: "Lift retirement readiness to 60% or more",
        why: |value| format!("Projected retirement income meets about {} of your target.", pct(value)),
        steps: &["Increase your contribution rate by 1-2%", "Revisit your target retirement age or income"],
    },
];

/// Failing gates first, then ratio gaps by urgency. Ties keep insertion order.
pub fn rank_recommendations(kpis: &Kpis, gates: &Gates, limit: usize) -> Vec<Recommendation> {
    let mut items = Vec::new();

    for rule in GATE_RULES {
        if gates.get(rule.gate) == Some(false) {
            items.push(Recommendation {
                code: rule.gate.as_str().to_owned(),
                pillar: rule.pillar,
                title: rule.title.to_owned(),
                why: rule.why.to_owned(),
                steps: rule.steps.iter().map(|step| (*step).to_owned()).collect(),
                score: rule.score,
                gate: true,
            });
        }
    }

    for rule in RATIO_RULES {
        let Some(value) = kpis.get(rule.metric) else { continue };
        let gap = match rule.direction {
            Direction::AtLeast => rule.target - value,
            Direction::AtMost => value - rule.target,
        };
        if gap <= 0.0 {
            continue;
        }
        items.push(Recommendation {
            code: rule.metric.as_str().to_owned(),
            pillar: rule.pillar,
            title: rule.title.to_owned(),
            why: (rule.why)(value),
            steps: rule.steps.iter().map(|step| (*step).to_owned()).collect(),
            score: (gap / rule.span).clamp(0.0, 1.0),
            gate: false,
        });
    }

    items.sort_by(|left, right| {
        right.gate.cmp(&left.gate).then_with(|| right.score.total_cmp(&left.score))
    });
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use crate::health::gates::Gates;
    use crate::health::kpis::Kpis;

    use super::{rank_recommendations, DeterministicRecommendationEngine, Pillar, RecommendationEngine};

    #[test]
    fn failing_gate_outranks_maximal_ratio_gap() {
        let kpis = Kpis { ef_months: Some(0.0), sr: Some(-0.5), ..Kpis::default() };
        let gates = Gates { income_protection_ok: Some(false), ..Gates::default() };

        let ranked = rank_recommendations(&kpis, &gates, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].code, "income_protection_ok");
        assert!(ranked[0].is_gate());
        assert_eq!(ranked[1].code, "ef_months");
        assert_eq!(ranked[1].score, 1.0);
    }

    #[test]
    fn scores_are_normalised_gaps_and_cite_current_values() {
        let kpis = Kpis { ef_months: Some(1.5), hr: Some(0.45), ..Kpis::default() };
        let ranked = DeterministicRecommendationEngine.rank(&kpis, &Gates::default(), 5);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].code, "ef_months");
        assert!((ranked[0].score - 0.5).abs() < 1e-9);
        assert!(ranked[0].why.contains("1.5 months"));
        assert_eq!(ranked[0].pillar, Pillar::Save);
        assert!((ranked[1].score - 0.25).abs() < 1e-9);
        assert!(ranked[1].why.contains("45%"));
    }

    #[test]
    fn unknown_metrics_and_met_targets_produce_nothing() {
        let kpis = Kpis { ef_months: Some(6.0), sr: Some(0.25), ..Kpis::default() };
        assert!(rank_recommendations(&kpis, &Gates::default(), 3).is_empty());
    }

    #[test]
    fn list_never_exceeds_limit() {
        let kpis = Kpis {
            ef_months: Some(0.5),
            nmdsr: Some(0.3),
            sr: Some(0.0),
            hr: Some(0.6),
            dsr_total: Some(0.5),
            ..Kpis::default()
        };
        let gates = Gates {
            life_cover_ok: Some(false),
            income_protection_ok: Some(false),
            home_insured_ok: Some(false),
            current_ratio_ok: Some(false),
            ..Gates::default()
        };
        for limit in 0..4 {
            assert_eq!(rank_recommendations(&kpis, &gates, limit).len(), limit);
        }
        assert_eq!(rank_recommendations(&kpis, &gates, 1)[0].code, "life_cover_ok");
    }
}
