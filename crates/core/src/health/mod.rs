pub mod gates;
pub mod kpis;
pub mod levels;
pub mod normalize;
pub mod recommendations;

use serde::Serialize;

use crate::context::EngineContext;
use crate::domain::profile::Profile;

use self::{
    gates::{evaluate_gates, Gates},
    kpis::{compute_kpis, Kpis},
    levels::{DeterministicLevelEngine, LevelAssessment, LevelEngine},
    normalize::{normalize, Normalized},
    recommendations::{DeterministicRecommendationEngine, Recommendation, RecommendationEngine},
};

/// Everything derived from one profile. Never stored on its own.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthEvaluation {
    pub normalized: Normalized,
    pub kpis: Kpis,
    pub gates: Gates,
    pub level: LevelAssessment,
    pub recommendations: Vec<Recommendation>,
}

pub trait HealthRuntime: Send + Sync {
    fn evaluate(&self, profile: &Profile, context: &EngineContext) -> HealthEvaluation;
}

pub struct DeterministicHealthRuntime<L, R> {
    level_engine: L,
    recommendation_engine: R,
}

impl<L, R> DeterministicHealthRuntime<L, R> {
    pub fn new(level_engine: L, recommendation_engine: R) -> Self {
        Self { level_engine, recommendation_engine }
    }
}

pub type DefaultHealthRuntime =
    DeterministicHealthRuntime<DeterministicLevelEngine, DeterministicRecommendationEngine>;

impl Default for DefaultHealthRuntime {
    fn default() -> Self {
        Self::new(DeterministicLevelEngine, DeterministicRecommendationEngine)
    }
}

impl<L, R> HealthRuntime for DeterministicHealthRuntime<L, R>
where
    L: LevelEngine,
    R: RecommendationEngine,
{
    fn evaluate(&self, profile: &Profile, context: &EngineContext) -> HealthEvaluation {
        let normalized = normalize(profile);
        let kpis = compute_kpis(profile, &normalized, context);
        let gates = evaluate_gates(profile, &kpis);
        let level = self.level_engine.assign(&kpis, &gates);
        let recommendations =
            self.recommendation_engine.rank(&kpis, &gates, context.settings.recommendation_limit);

        HealthEvaluation { normalized, kpis, gates, level, recommendations }
    }
}

#[cfg(test)]
mod tests {
    use crate::context::EngineContext;
    use crate::domain::level::Level;
    use crate::domain::profile::Profile;
    use crate::domain::slot::SlotKey;
    use crate::health::{
        gates::Gates,
        kpis::Kpis,
        levels::{LevelAssessment, LevelEngine},
        recommendations::DeterministicRecommendationEngine,
        DefaultHealthRuntime, DeterministicHealthRuntime, HealthRuntime,
    };

    #[test]
    fn deterministic_runtime_returns_every_stage() {
        let profile = Profile::new()
            .with_number(SlotKey::NetIncomeMonthlySelf, 3000.0)
            .with_number(SlotKey::TotalExpensesMonthly, 2950.0)
            .with_number(SlotKey::EssentialExpensesMonthly, 2000.0)
            .with_number(SlotKey::CashLiquidTotal, 1000.0);

        let evaluation =
            DefaultHealthRuntime::default().evaluate(&profile, &EngineContext::for_year(2026));

        assert_eq!(evaluation.normalized.liquid_assets, Some(1000.0));
        assert!(evaluation.kpis.sr.is_some());
        assert_eq!(evaluation.level.level.tier(), 2);
        assert_eq!(evaluation.recommendations.len(), 2);
        assert_eq!(evaluation.recommendations[0].code, "sr");
        assert_eq!(evaluation.recommendations[1].code, "ef_months");
    }

    #[test]
    fn runtime_supports_explicit_engine_interfaces() {
        struct PinnedLevelEngine;

        impl LevelEngine for PinnedLevelEngine {
            fn assign(&self, _kpis: &Kpis, _gates: &Gates) -> LevelAssessment {
                let level = Level::MAX;
                LevelAssessment {
                    level,
                    label: level.label(),
                    reasons: Vec::new(),
                    blockers: Vec::new(),
                    checklist: Vec::new(),
                }
            }
        }

        let runtime =
            DeterministicHealthRuntime::new(PinnedLevelEngine, DeterministicRecommendationEngine);
        let evaluation = runtime.evaluate(&Profile::new(), &EngineContext::for_year(2026));

        assert_eq!(evaluation.level.level, Level::MAX);
        assert!(evaluation.recommendations.is_empty());
    }
}
