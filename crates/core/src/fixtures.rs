//! Reference households used by tests and the `scenarios` CLI command.

use std::fmt;
use std::str::FromStr;

use crate::domain::profile::Profile;
use crate::domain::slot::{Confidence, SlotKey, SlotValue};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scenario {
    /// Renter with a thin buffer; lands in the low tiers.
    RenterStarter,
    /// Mortgaged homeowner sitting on the L5/L6 boundary.
    HomeownerBuffer,
    /// Well-protected household with strong retirement readiness.
    ResilientHousehold,
}

impl Scenario {
    pub const ALL: [Scenario; 3] =
        [Scenario::RenterStarter, Scenario::HomeownerBuffer, Scenario::ResilientHousehold];

    pub fn code(self) -> &'static str {
        match self {
            Self::RenterStarter => "A",
            Self::HomeownerBuffer => "B",
            Self::ResilientHousehold => "C",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::RenterStarter => "renter starter",
            Self::HomeownerBuffer => "homeowner buffer",
            Self::ResilientHousehold => "resilient household",
        }
    }

    /// Birth years are relative to `current_year` so ages stay fixed.
    pub fn profile(self, current_year: i32) -> Profile {
        match self {
            Self::RenterStarter => renter_starter(current_year),
            Self::HomeownerBuffer => homeowner_buffer(current_year),
            Self::ResilientHousehold => resilient_household(current_year),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.title())
    }
}

impl FromStr for Scenario {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::RenterStarter),
            "B" => Ok(Self::HomeownerBuffer),
            "C" => Ok(Self::ResilientHousehold),
            other => Err(DomainError::InvariantViolation(format!(
                "unknown scenario `{other}` (expected A, B or C)"
            ))),
        }
    }
}

fn text(profile: Profile, key: SlotKey, value: &str) -> Profile {
    profile.with_slot(key, SlotValue::Text(value.to_owned()), Confidence::High)
}

fn renter_starter(current_year: i32) -> Profile {
    let profile = Profile::new()
        .with_number(SlotKey::NetIncomeMonthlySelf, 4000.0)
        .with_number(SlotKey::NetIncomeMonthlyPartner, 0.0)
        .with_number(SlotKey::TotalExpensesMonthly, 3000.0)
        .with_number(SlotKey::EssentialExpensesMonthly, 2000.0)
        .with_number(SlotKey::RentMonthly, 1500.0)
        .with_number(SlotKey::CashLiquidTotal, 3000.0)
        .with_number(SlotKey::TermDepositsLe3m, 0.0)
        .with_number(SlotKey::InvestmentsExHomeTotal, 20_000.0)
        .with_number(SlotKey::PensionBalanceTotal, 10_000.0)
        .with_number(SlotKey::OtherDebtPaymentsMonthlyTotal, 250.0)
        .with_number(SlotKey::OtherDebtBalancesTotal, 4000.0)
        .with_number(SlotKey::ShortTermLiabilities12m, 2000.0)
        .with_number(SlotKey::GrossIncomeAnnualSelf, 65_000.0)
        .with_number(SlotKey::RetireAge, 65.0)
        .with_number(SlotKey::BirthYear, f64::from(current_year - 35))
        .with_number(SlotKey::RetireTargetIncomeAnnual, 40_000.0)
        .with_slot(SlotKey::StatePensionEstAnnual, SlotValue::Number(12_000.0), Confidence::Low)
        .with_slot(SlotKey::PensionContribPct, SlotValue::Number(0.05), Confidence::Low);
    text(profile, SlotKey::HousingStatus, "rent")
}

fn homeowner_buffer(current_year: i32) -> Profile {
    let profile = Profile::new()
        .with_number(SlotKey::NetIncomeMonthlySelf, 7000.0)
        .with_number(SlotKey::NetIncomeMonthlyPartner, 3000.0)
        .with_number(SlotKey::TotalExpensesMonthly, 7000.0)
        .with_number(SlotKey::EssentialExpensesMonthly, 4200.0)
        .with_number(SlotKey::HomeValue, 450_000.0)
        .with_number(SlotKey::MortgagePaymentMonthly, 2800.0)
        .with_number(SlotKey::MortgageBalance, 400_000.0)
        .with_number(SlotKey::HousingRunningCostsMonthly, 500.0)
        .with_number(SlotKey::CashLiquidTotal, 20_000.0)
        .with_number(SlotKey::TermDepositsLe3m, 10_000.0)
        .with_number(SlotKey::InvestmentsExHomeTotal, 60_000.0)
        .with_number(SlotKey::PensionBalanceTotal, 60_000.0)
        .with_number(SlotKey::OtherDebtPaymentsMonthlyTotal, 300.0)
        .with_number(SlotKey::OtherDebtBalancesTotal, 6000.0)
        .with_number(SlotKey::ShortTermLiabilities12m, 5000.0)
        .with_number(SlotKey::GrossIncomeAnnualSelf, 110_000.0)
        .with_number(SlotKey::GrossIncomeAnnualPartner, 40_000.0)
        .with_number(SlotKey::DependantsCount, 1.0)
        .with_slot(SlotKey::LifeInsuranceSum, SlotValue::Number(150_000.0), Confidence::Low)
        .with_slot(SlotKey::HomeInsuredOk, SlotValue::Bool(true), Confidence::High)
        .with_number(SlotKey::RetireAge, 65.0)
        .with_number(SlotKey::BirthYear, f64::from(current_year - 42))
        .with_number(SlotKey::RetireTargetIncomeAnnual, 60_000.0)
        .with_slot(SlotKey::StatePensionEstAnnual, SlotValue::Number(14_000.0), Confidence::Low)
        .with_slot(SlotKey::PensionContribPct, SlotValue::Number(0.10), Confidence::Low);
    text(profile, SlotKey::HousingStatus, "own")
}

fn resilient_household(current_year: i32) -> Profile {
    let profile = Profile::new()
        .with_number(SlotKey::NetIncomeMonthlySelf, 11_000.0)
        .with_number(SlotKey::NetIncomeMonthlyPartner, 6000.0)
        .with_number(SlotKey::TotalExpensesMonthly, 7500.0)
        .with_number(SlotKey::EssentialExpensesMonthly, 5200.0)
        .with_number(SlotKey::HomeValue, 250_000.0)
        .with_number(SlotKey::MortgagePaymentMonthly, 1400.0)
        .with_number(SlotKey::MortgageBalance, 90_000.0)
        .with_number(SlotKey::HousingRunningCostsMonthly, 600.0)
        .with_number(SlotKey::CashLiquidTotal, 185_000.0)
        .with_number(SlotKey::TermDepositsLe3m, 50_000.0)
        .with_number(SlotKey::InvestmentsExHomeTotal, 280_000.0)
        .with_number(SlotKey::PensionBalanceTotal, 200_000.0)
        .with_number(SlotKey::OtherDebtPaymentsMonthlyTotal, 200.0)
        .with_number(SlotKey::OtherDebtBalancesTotal, 3000.0)
        .with_number(SlotKey::ShortTermLiabilities12m, 8000.0)
        .with_number(SlotKey::GrossIncomeAnnualSelf, 180_000.0)
        .with_number(SlotKey::GrossIncomeAnnualPartner, 90_000.0)
        .with_number(SlotKey::DependantsCount, 2.0)
        .with_number(SlotKey::LifeInsuranceSum, 500_000.0)
        .with_bool(SlotKey::IncomeProtectionHas, true)
        .with_number(SlotKey::IpMonthlyBenefit, 5200.0)
        .with_number(SlotKey::IpBenefitPeriodYears, 5.0)
        .with_slot(SlotKey::SickPayMonthsFull, SlotValue::Number(4.0), Confidence::Low)
        .with_slot(SlotKey::SickPayMonthsHalf, SlotValue::Number(2.0), Confidence::Low)
        .with_slot(SlotKey::HomeInsuredOk, SlotValue::Bool(true), Confidence::High)
        .with_number(SlotKey::RetireAge, 60.0)
        .with_number(SlotKey::BirthYear, f64::from(current_year - 45))
        .with_number(SlotKey::RetireTargetIncomeAnnual, 80_000.0)
        .with_slot(SlotKey::StatePensionEstAnnual, SlotValue::Number(15_000.0), Confidence::Low)
        .with_slot(SlotKey::PensionContribPct, SlotValue::Number(0.15), Confidence::Low)
        .with_slot(SlotKey::EmployerPensionPctSelf, SlotValue::Number(0.05), Confidence::Low)
        .with_slot(SlotKey::EmployerPensionPctPartner, SlotValue::Number(0.05), Confidence::Low)
        .with_number(SlotKey::CreditScoreNormalised, 0.72)
        .with_slot(SlotKey::InvestmentReturns12m, SlotValue::Number(40_000.0), Confidence::Low)
        .with_slot(SlotKey::InterestPaid12m, SlotValue::Number(12_000.0), Confidence::Low);
    text(profile, SlotKey::HousingStatus, "own")
}

#[cfg(test)]
mod tests {
    use super::Scenario;

    #[test]
    fn scenarios_parse_from_their_codes() {
        for scenario in Scenario::ALL {
            assert_eq!(scenario.code().parse::<Scenario>().expect("parse"), scenario);
        }
        assert_eq!("b".parse::<Scenario>().expect("parse"), Scenario::HomeownerBuffer);
        assert!("D".parse::<Scenario>().is_err());
    }

    #[test]
    fn birth_year_tracks_the_reference_year() {
        use crate::domain::slot::SlotKey;

        let profile = Scenario::RenterStarter.profile(2030);
        assert_eq!(profile.number(SlotKey::BirthYear), Some(1995.0));
    }
}
