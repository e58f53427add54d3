use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::profile::Profile;
use crate::domain::slot::SlotKey;

use super::kpis::Kpis;

pub const LIFE_COVER_YEARS: f64 = 5.0;
pub const INCOME_CONTINUITY_MONTHS: f64 = 6.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    LifeCover,
    IncomeProtection,
    HomeInsured,
    CurrentRatio,
}

impl Gate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LifeCover => "life_cover_ok",
            Self::IncomeProtection => "income_protection_ok",
            Self::HomeInsured => "home_insured_ok",
            Self::CurrentRatio => "current_ratio_ok",
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protection and hygiene checks. `None` means not applicable or not yet
/// assessable, which is distinct from a failed `Some(false)`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gates {
    pub life_cover_ok: Option<bool>,
    pub income_protection_ok: Option<bool>,
    pub home_insured_ok: Option<bool>,
    pub current_ratio_ok: Option<bool>,
    pub notes: Vec<String>,
}

impl Gates {
    pub fn get(&self, gate: Gate) -> Option<bool> {
        match gate {
            Gate::LifeCover => self.life_cover_ok,
            Gate::IncomeProtection => self.income_protection_ok,
            Gate::HomeInsured => self.home_insured_ok,
            Gate::CurrentRatio => self.current_ratio_ok,
        }
    }
}

pub fn evaluate_gates(profile: &Profile, kpis: &Kpis) -> Gates {
    let mut gates = Gates::default();

    let dependants = profile.number(SlotKey::DependantsCount).unwrap_or(0.0);
    if dependants > 0.0 {
        gates.life_cover_ok = kpis.years_cover.map(|years| years >= LIFE_COVER_YEARS);
        if gates.life_cover_ok.is_none() {
            gates.notes.push(
                "Add life cover amount, liquid savings and debts to assess the life cover gate."
                    .to_owned(),
            );
        }
    } else {
        gates.notes.push("No dependants recorded; life cover gate does not apply.".to_owned());
    }

    gates.income_protection_ok =
        kpis.months_covered.map(|months| months >= INCOME_CONTINUITY_MONTHS);
    if gates.income_protection_ok.is_none() {
        gates.notes.push(
            "Add sick pay months and/or an income protection benefit to assess income continuity."
                .to_owned(),
        );
    }

    gates.home_insured_ok = profile.boolean(SlotKey::HomeInsuredOk);
    if gates.home_insured_ok.is_none() {
        gates.notes.push("Confirm whether your home is adequately insured.".to_owned());
    }

    gates.current_ratio_ok = kpis.current_ratio.map(|ratio| ratio >= 1.0);
    gates
}

#[cfg(test)]
mod tests {
    use crate::context::EngineContext;
    use crate::domain::profile::Profile;
    use crate::domain::slot::SlotKey;
    use crate::health::kpis::compute_kpis;
    use crate::health::normalize::normalize;

    use super::{evaluate_gates, Gate, Gates};

    fn gates_for(profile: &Profile) -> Gates {
        let normalized = normalize(profile);
        let kpis = compute_kpis(profile, &normalized, &EngineContext::for_year(2026));
        evaluate_gates(profile, &kpis)
    }

    #[test]
    fn life_cover_only_applies_with_dependants() {
        let base = Profile::new()
            .with_number(SlotKey::EssentialExpensesMonthly, 2000.0)
            .with_number(SlotKey::LifeInsuranceSum, 100_000.0);
        assert_eq!(gates_for(&base).get(Gate::LifeCover), None);

        // need = 2000 * 12 * 1.6 = 38_400 a year; 100k covers about 2.6 years
        let with_kids = base.clone().with_number(SlotKey::DependantsCount, 2.0);
        assert_eq!(gates_for(&with_kids).get(Gate::LifeCover), Some(false));

        let well_covered = with_kids.with_number(SlotKey::LifeInsuranceSum, 250_000.0);
        assert_eq!(gates_for(&well_covered).get(Gate::LifeCover), Some(true));
    }

    #[test]
    fn unknown_inputs_leave_gates_undetermined() {
        let gates = gates_for(&Profile::new());
        assert_eq!(gates.income_protection_ok, None);
        assert_eq!(gates.home_insured_ok, None);
        assert_eq!(gates.current_ratio_ok, None);
        assert!(!gates.notes.is_empty());
    }

    #[test]
    fn continuity_home_and_current_ratio_gates_evaluate() {
        let profile = Profile::new()
            .with_number(SlotKey::SickPayMonthsFull, 6.0)
            .with_bool(SlotKey::HomeInsuredOk, false)
            .with_number(SlotKey::CashLiquidTotal, 900.0)
            .with_number(SlotKey::ShortTermLiabilities12m, 1000.0);

        let gates = gates_for(&profile);
        assert_eq!(gates.income_protection_ok, Some(true));
        assert_eq!(gates.home_insured_ok, Some(false));
        assert_eq!(gates.current_ratio_ok, Some(false));
    }
}
