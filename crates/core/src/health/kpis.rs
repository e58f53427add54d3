use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::EngineContext;
use crate::domain::profile::Profile;
use crate::domain::slot::SlotKey;

use super::normalize::Normalized;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Hr,
    CurrentRatio,
    Sr,
    EfMonths,
    Lanw,
    Invnw,
    DsrTotal,
    Nmdsr,
    DtiStock,
    DToA,
    Nwm,
    CreditNorm,
    Ronw,
    PensionContribPct,
    YearsCover,
    MonthsCovered,
    Rrr,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hr => "hr",
            Self::CurrentRatio => "current_ratio",
            Self::Sr => "sr",
            Self::EfMonths => "ef_months",
            Self::Lanw => "lanw",
            Self::Invnw => "invnw",
            Self::DsrTotal => "dsr_total",
            Self::Nmdsr => "nmdsr",
            Self::DtiStock => "dti_stock",
            Self::DToA => "d_to_a",
            Self::Nwm => "nwm",
            Self::CreditNorm => "credit_norm",
            Self::Ronw => "ronw",
            Self::PensionContribPct => "pension_contrib_pct",
            Self::YearsCover => "years_cover",
            Self::MonthsCovered => "months_covered",
            Self::Rrr => "rrr",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiNote {
    pub metric: Metric,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub hr: Option<f64>,
    pub current_ratio: Option<f64>,
    pub sr: Option<f64>,
    pub ef_months: Option<f64>,
    pub lanw: Option<f64>,
    pub invnw: Option<f64>,
    pub dsr_total: Option<f64>,
    pub nmdsr: Option<f64>,
    pub dti_stock: Option<f64>,
    pub d_to_a: Option<f64>,
    pub nwm: Option<f64>,
    pub credit_norm: Option<f64>,
    pub ronw: Option<f64>,
    pub pension_contrib_pct: Option<f64>,
    pub years_cover: Option<f64>,
    pub months_covered: Option<f64>,
    pub rrr: Option<f64>,
    /// One entry per metric that could not be computed.
    pub notes: Vec<KpiNote>,
    /// Headline metrics (HR, SR, EF) still waiting on inputs.
    pub provisional: Vec<Metric>,
}

impl Kpis {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Hr => self.hr,
            Metric::CurrentRatio => self.current_ratio,
            Metric::Sr => self.sr,
            Metric::EfMonths => self.ef_months,
            Metric::Lanw => self.lanw,
            Metric::Invnw => self.invnw,
            Metric::DsrTotal => self.dsr_total,
            Metric::Nmdsr => self.nmdsr,
            Metric::DtiStock => self.dti_stock,
            Metric::DToA => self.d_to_a,
            Metric::Nwm => self.nwm,
            Metric::CreditNorm => self.credit_norm,
            Metric::Ronw => self.ronw,
            Metric::PensionContribPct => self.pension_contrib_pct,
            Metric::YearsCover => self.years_cover,
            Metric::MonthsCovered => self.months_covered,
            Metric::Rrr => self.rrr,
        }
    }

    fn set(&mut self, metric: Metric, value: Option<f64>) {
        let value = value.filter(|value| value.is_finite());
        let slot = match metric {
            Metric::Hr => &mut self.hr,
            Metric::CurrentRatio => &mut self.current_ratio,
            Metric::Sr => &mut self.sr,
            Metric::EfMonths => &mut self.ef_months,
            Metric::Lanw => &mut self.lanw,
            Metric::Invnw => &mut self.invnw,
            Metric::DsrTotal => &mut self.dsr_total,
            Metric::Nmdsr => &mut self.nmdsr,
            Metric::DtiStock => &mut self.dti_stock,
            Metric::DToA => &mut self.d_to_a,
            Metric::Nwm => &mut self.nwm,
            Metric::CreditNorm => &mut self.credit_norm,
            Metric::Ronw => &mut self.ronw,
            Metric::PensionContribPct => &mut self.pension_contrib_pct,
            Metric::YearsCover => &mut self.years_cover,
            Metric::MonthsCovered => &mut self.months_covered,
            Metric::Rrr => &mut self.rrr,
        };
        *slot = value;
    }

    /// Stores `value`, or records `missing` as the note when it is `None`.
    fn record(&mut self, metric: Metric, value: Option<f64>, missing: &str) {
        self.set(metric, value);
        if self.get(metric).is_none() {
            self.notes.push(KpiNote { metric, message: missing.to_owned() });
        }
    }
}

const PROVISIONAL: [Metric; 3] = [Metric::Hr, Metric::Sr, Metric::EfMonths];

pub fn compute_kpis(profile: &Profile, normalized: &Normalized, context: &EngineContext) -> Kpis {
    let mut kpis = Kpis::default();
    let n = normalized;

    let ni = n.net_income_monthly.filter(|value| *value > 0.0);
    let gi = n.gross_income_annual.filter(|value| *value > 0.0);
    let ess = n.essential_expenses_monthly.filter(|value| *value > 0.0);

    kpis.record(
        Metric::Hr,
        n.housing_cost_monthly.zip(gi).map(|(housing, gi)| housing / (gi / 12.0)),
        "Add gross annual income and rent or mortgage costs to compute the housing ratio.",
    );
    kpis.record(
        Metric::CurrentRatio,
        ratio(n.liquid_assets, n.short_term_liabilities_12m.filter(|value| *value > 0.0)),
        "Add liquid savings and liabilities due within 12 months to compute the current ratio.",
    );
    kpis.record(
        Metric::Sr,
        ni.zip(n.total_expenses_monthly).map(|(ni, exp)| (ni - exp) / ni),
        "Add monthly net income and total monthly expenses to compute the savings rate.",
    );
    kpis.record(
        Metric::EfMonths,
        ratio(n.liquid_assets, ess),
        "Add essential monthly expenses and liquid savings to compute emergency fund months.",
    );

    let nw = n.net_worth.filter(|value| *value != 0.0);
    kpis.record(
        Metric::Lanw,
        ratio(n.liquid_assets, nw),
        "Add assets, debts and liquid savings to compute liquid assets to net worth.",
    );
    kpis.record(
        Metric::Invnw,
        ratio(n.investable_assets, nw),
        "Add assets, debts and investment balances to compute investable assets to net worth.",
    );

    let other_payments = n.other_debt_payments_monthly.unwrap_or(0.0);
    let property_carry = (n.inv_prop_payments_total.unwrap_or(0.0)
        - n.net_rent_total.unwrap_or(0.0))
    .max(0.0);
    kpis.record(
        Metric::DsrTotal,
        ni.map(|ni| {
            (n.mortgage_payment_monthly.unwrap_or(0.0) + other_payments + property_carry) / ni
        }),
        "Add monthly net income to compute the debt servicing ratio.",
    );
    kpis.record(
        Metric::Nmdsr,
        ni.map(|ni| other_payments / ni),
        "Add monthly net income to compute non-mortgage debt servicing.",
    );
    kpis.record(
        Metric::DtiStock,
        ratio(n.total_debt_balance, gi),
        "Add debt balances and gross annual income to compute debt to income.",
    );
    kpis.record(
        Metric::DToA,
        ratio(n.total_liabilities, n.total_assets.filter(|value| *value > 0.0)),
        "Add total assets and total liabilities to compute debt to assets.",
    );
    kpis.record(
        Metric::Nwm,
        ratio(
            n.investable_assets,
            n.total_expenses_monthly.map(|exp| exp * 12.0).filter(|value| *value > 0.0),
        ),
        "Add monthly expenses and investable assets to compute the net-worth multiple.",
    );
    kpis.record(
        Metric::CreditNorm,
        credit_norm(profile),
        "Add a credit score with its provider or scale to compute the normalised credit score.",
    );

    let returns = profile.number(SlotKey::InvestmentReturns12m);
    let interest = profile.number(SlotKey::InterestPaid12m);
    let net_return = match (returns, interest) {
        (None, None) => None,
        (returns, interest) => Some(returns.unwrap_or(0.0) - interest.unwrap_or(0.0)),
    };
    kpis.record(
        Metric::Ronw,
        ratio(net_return, nw),
        "Add 12-month investment returns or interest paid, plus assets and debts, to compute return on net worth.",
    );
    kpis.record(
        Metric::PensionContribPct,
        profile.number(SlotKey::PensionContribPct),
        "Add your pension contribution percentage.",
    );
    kpis.record(
        Metric::YearsCover,
        years_cover(profile, normalized),
        "Add essential or total expenses to compute life cover years.",
    );
    kpis.record(
        Metric::MonthsCovered,
        months_covered(profile, ess),
        "Add sick pay months or an income protection benefit to compute income continuity.",
    );
    kpis.record(
        Metric::Rrr,
        retirement_readiness(profile, normalized, context),
        "Add retirement age, birth year and target retirement income to compute retirement readiness.",
    );

    kpis.provisional =
        PROVISIONAL.into_iter().filter(|metric| kpis.get(*metric).is_none()).collect();
    kpis
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(numerator), Some(denominator)) if denominator != 0.0 => Some(numerator / denominator),
        _ => None,
    }
}

/// Supplied 0..1 score wins; otherwise a raw score is rescaled over the
/// provider's band, falling back to the caller's min/max.
fn credit_norm(profile: &Profile) -> Option<f64> {
    if let Some(supplied) = profile.number(SlotKey::CreditScoreNormalised) {
        return Some(supplied.clamp(0.0, 1.0));
    }

    let raw = profile.number(SlotKey::CreditRawScore)?;
    let provider = profile.text(SlotKey::CreditProvider).unwrap_or("generic").to_ascii_lowercase();
    let mut min = profile.number(SlotKey::CreditMin);
    let mut max = profile.number(SlotKey::CreditMax);

    if provider.contains("fico") || provider.contains("vantage") {
        (min, max) = (Some(300.0), Some(850.0));
    } else if min.is_none() || max.is_none() {
        if provider.contains("experian") {
            (min, max) = (Some(0.0), Some(999.0));
        } else if provider.contains("equifax") {
            (min, max) = (Some(0.0), Some(1200.0));
        }
    }

    match (min, max) {
        (Some(min), Some(max)) if max > min => Some(((raw - min) / (max - min)).clamp(0.0, 1.0)),
        _ => None,
    }
}

/// Years of household need covered by life insurance plus liquid savings net
/// of debt.
fn years_cover(profile: &Profile, normalized: &Normalized) -> Option<f64> {
    let ess = normalized.essential_expenses_monthly;
    let exp = normalized.total_expenses_monthly;
    if ess.is_none() && exp.is_none() {
        return None;
    }

    let dependants = profile.number(SlotKey::DependantsCount).unwrap_or(0.0).max(0.0);
    let multiplier = (1.0 + 0.3 * dependants).min(2.0);
    let annual_need = ess.unwrap_or(0.0).max(0.6 * exp.unwrap_or(0.0)) * 12.0 * multiplier;
    if annual_need <= 0.0 {
        return None;
    }

    let resources = profile.number(SlotKey::LifeInsuranceSum).unwrap_or(0.0)
        + normalized.liquid_assets.unwrap_or(0.0)
        - normalized.total_debt_balance.unwrap_or(0.0);
    Some(resources / annual_need)
}

fn months_covered(profile: &Profile, essential: Option<f64>) -> Option<f64> {
    let full = profile.number(SlotKey::SickPayMonthsFull);
    let half = profile.number(SlotKey::SickPayMonthsHalf);
    let benefit = profile.number(SlotKey::IpMonthlyBenefit);
    if full.is_none() && half.is_none() && benefit.is_none() {
        return None;
    }

    let protection_months = match (benefit, essential) {
        (Some(benefit), Some(essential)) => {
            let cap = profile
                .number(SlotKey::IpBenefitPeriodYears)
                .filter(|years| *years > 0.0)
                .map_or(f64::INFINITY, |years| years * 12.0);
            (benefit / essential).min(cap)
        }
        _ => 0.0,
    };

    Some(full.unwrap_or(0.0) + 0.5 * half.unwrap_or(0.0) + protection_months)
}

/// Projected retirement income over target income.
fn retirement_readiness(
    profile: &Profile,
    normalized: &Normalized,
    context: &EngineContext,
) -> Option<f64> {
    let retire_age = profile.number(SlotKey::RetireAge)?;
    let birth_year = profile.number(SlotKey::BirthYear)?;
    let target = profile.number(SlotKey::RetireTargetIncomeAnnual).filter(|value| *value > 0.0)?;

    let current_age = f64::from(context.current_year) - birth_year;
    let horizon = (retire_age - current_age).max(0.0);

    let gross = normalized.gross_income_annual.unwrap_or(0.0);
    let contribution_rate = profile.number(SlotKey::PensionContribPct).unwrap_or(0.0)
        + profile.number(SlotKey::EmployerPensionPctSelf).unwrap_or(0.0)
        + profile.number(SlotKey::EmployerPensionPctPartner).unwrap_or(0.0);
    let contribution = contribution_rate * gross;

    let growth = context.settings.growth_real;
    let compound = (1.0 + growth).powf(horizon);
    let annuity = if growth == 0.0 { horizon } else { (compound - 1.0) / growth };
    let pot = normalized.investable_assets.unwrap_or(0.0) * compound + contribution * annuity;

    let projected = context.settings.safe_withdrawal_rate * pot
        + profile.number(SlotKey::StatePensionEstAnnual).unwrap_or(0.0);
    Some(projected / target)
}
