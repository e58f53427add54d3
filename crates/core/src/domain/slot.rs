use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::DomainError;

/// Value shape a canonical slot accepts. Drives coercion of raw input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// Currency amount; may be negative only where the slot is a flow (returns, interest).
    Money,
    /// Fraction in 0..1; inputs above 1 or carrying `%` are read as percentages.
    Percent,
    Boolean,
    /// Four digit calendar year; small integers are read as an age.
    Year,
    /// Whole, non-negative count of months or people.
    Count,
    /// Plain number with no unit rules (ages, terms, raw credit scores).
    Number,
    Text,
    Properties,
}

impl SlotKind {
    /// Kinds a delta update may add to. Years are numbers but are only ever set.
    pub fn is_additive(self) -> bool {
        matches!(self, Self::Money | Self::Percent | Self::Count | Self::Number)
    }
}

macro_rules! slot_schema {
    ($($variant:ident => $name:literal : $kind:ident),+ $(,)?) => {
        /// Canonical household fact names. The set is closed; unknown input keys never
        /// become slots.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum SlotKey {
            $($variant),+
        }

        impl SlotKey {
            pub const ALL: &'static [SlotKey] = &[$(SlotKey::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(SlotKey::$variant => $name),+
                }
            }

            pub fn kind(self) -> SlotKind {
                match self {
                    $(SlotKey::$variant => SlotKind::$kind),+
                }
            }
        }
    };
}

slot_schema! {
    // demographics
    FullName => "full_name": Text,
    Email => "email": Text,
    Country => "country": Text,
    Postcode => "postcode": Text,
    BirthYear => "birth_year": Year,
    Partner => "partner": Boolean,
    DependantsCount => "dependants_count": Count,
    TaxResidency => "tax_residency": Text,
    EmploymentStatus => "employment_status": Text,

    // income and expenses
    NetIncomeMonthlySelf => "net_income_monthly_self": Money,
    NetIncomeMonthlyPartner => "net_income_monthly_partner": Money,
    GrossIncomeAnnualSelf => "gross_income_annual_self": Money,
    GrossIncomeAnnualPartner => "gross_income_annual_partner": Money,
    VariableIncomeAnnual => "variable_income_annual": Money,
    TotalExpensesMonthly => "total_expenses_monthly": Money,
    EssentialExpensesMonthly => "essential_expenses_monthly": Money,
    EmployerPensionPctSelf => "employer_pension_pct_self": Percent,
    EmployerPensionPctPartner => "employer_pension_pct_partner": Percent,
    SickPayMonthsFull => "sick_pay_months_full": Count,
    SickPayMonthsHalf => "sick_pay_months_half": Count,

    // housing
    HousingStatus => "housing_status": Text,
    RentMonthly => "rent_monthly": Money,
    HomeValue => "home_value": Money,
    MortgagePaymentMonthly => "mortgage_payment_monthly": Money,
    MortgageBalance => "mortgage_balance": Money,
    MortgageRatePct => "mortgage_rate_pct": Percent,
    MortgageFixed => "mortgage_fixed": Boolean,
    RateResetMonths => "rate_reset_months": Count,
    MortgageTermYears => "mortgage_term_years": Number,
    HousingRunningCostsMonthly => "housing_running_costs_monthly": Money,
    HousingTotalMonthly => "housing_total_monthly": Money,

    // debts
    OtherDebtPaymentsMonthlyTotal => "other_debt_payments_monthly_total": Money,
    OtherDebtBalancesTotal => "other_debt_balances_total": Money,
    ShortTermLiabilities12m => "short_term_liabilities_12m": Money,
    DebtsTotal => "debts_total": Money,

    // assets
    CashLiquidTotal => "cash_liquid_total": Money,
    EmergencySavingsLiquid => "emergency_savings_liquid": Money,
    TermDepositsLe3m => "term_deposits_le_3m": Money,
    InvestmentsExHomeTotal => "investments_ex_home_total": Money,
    InvestmentBalancesTotal => "investment_balances_total": Money,
    PensionBalanceTotal => "pension_balance_total": Money,
    InvestmentProperties => "investment_properties": Properties,
    AssetsTotal => "assets_total": Money,

    // protection
    LifeInsuranceHas => "life_insurance_has": Boolean,
    LifeInsuranceSum => "life_insurance_sum": Money,
    IncomeProtectionHas => "income_protection_has": Boolean,
    IpMonthlyBenefit => "ip_monthly_benefit": Money,
    IpWaitingPeriodDays => "ip_waiting_period_days": Count,
    IpBenefitPeriodYears => "ip_benefit_period_years": Number,
    Homeowner => "homeowner": Boolean,
    HomeInsuredOk => "home_insured_ok": Boolean,
    HomeInsuredSum => "home_insured_sum": Money,
    RebuildCostEstimate => "rebuild_cost_estimate": Money,

    // retirement
    RetireAge => "retire_age": Number,
    RetireTargetIncomeAnnual => "retire_target_income_annual": Money,
    StatePensionEstAnnual => "state_pension_est_annual": Money,
    PensionContribPct => "pension_contrib_pct": Percent,

    // credit and returns
    CreditScoreNormalised => "credit_score_normalised_0_1": Percent,
    CreditProvider => "credit_provider": Text,
    CreditRawScore => "credit_raw_score": Number,
    CreditMin => "credit_min": Number,
    CreditMax => "credit_max": Number,
    InvestmentReturns12m => "investment_returns_12m": Money,
    InterestPaid12m => "interest_paid_12m": Money,
}

impl SlotKey {
    /// Exact canonical-name lookup; aliases are resolved by the canonicalizer.
    pub fn from_canonical(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|key| key.as_str() == name)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotKey {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_canonical(value.trim())
            .ok_or_else(|| DomainError::UnknownSlot(value.trim().to_owned()))
    }
}

impl Serialize for SlotKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SlotKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    #[default]
    Med,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Med => "med",
            Self::High => "high",
        }
    }
}

impl FromStr for Confidence {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "med" | "medium" => Ok(Self::Med),
            "high" => Ok(Self::High),
            other => Err(DomainError::MalformedUpdate(format!(
                "unsupported confidence `{other}` (expected low|med|high)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InvestmentProperty {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub mortgage_balance: Option<f64>,
    #[serde(default)]
    pub net_rent_monthly: Option<f64>,
    #[serde(default)]
    pub payment_monthly: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Properties(Vec<InvestmentProperty>),
}

impl SlotValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) if value.is_finite() => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_properties(&self) -> Option<&[InvestmentProperty]> {
        match self {
            Self::Properties(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub value: Option<SlotValue>,
    #[serde(default)]
    pub confidence: Confidence,
}

impl Slot {
    pub fn new(value: Option<SlotValue>, confidence: Confidence) -> Self {
        Self { value, confidence }
    }

    pub fn number(value: f64, confidence: Confidence) -> Self {
        Self::new(Some(SlotValue::Number(value)), confidence)
    }
}
