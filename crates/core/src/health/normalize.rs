use serde::{Deserialize, Serialize};

use crate::domain::profile::Profile;
use crate::domain::slot::{InvestmentProperty, SlotKey};

/// Household totals derived from raw slots. Recomputed on every evaluation.
///
/// Every aggregate is `None` when all of its inputs are absent; a present
/// aggregate treats individually absent components as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Normalized {
    pub net_income_monthly: Option<f64>,
    pub gross_income_annual: Option<f64>,
    pub total_expenses_monthly: Option<f64>,
    pub essential_expenses_monthly: Option<f64>,

    pub liquid_assets: Option<f64>,
    pub investable_assets: Option<f64>,
    pub home_value: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub net_worth: Option<f64>,

    pub housing_cost_monthly: Option<f64>,
    pub rent_monthly: Option<f64>,
    pub mortgage_payment_monthly: Option<f64>,
    pub housing_running_costs_monthly: Option<f64>,
    pub other_debt_payments_monthly: Option<f64>,
    pub short_term_liabilities_12m: Option<f64>,

    pub property_value_total: Option<f64>,
    pub property_mortgage_total: Option<f64>,
    pub net_rent_total: Option<f64>,
    pub inv_prop_payments_total: Option<f64>,

    /// Component debt sum; unaffected by a declared `debts_total`.
    pub total_debt_balance: Option<f64>,
}

pub fn normalize(profile: &Profile) -> Normalized {
    let num = |key: SlotKey| profile.number(key);
    let properties = profile.properties(SlotKey::InvestmentProperties);

    let property_sum = |field: fn(&InvestmentProperty) -> Option<f64>| {
        properties.map(|items| {
            items.iter().filter_map(field).filter(|value| value.is_finite()).sum::<f64>()
        })
    };
    let property_value_total = property_sum(|item| item.value);
    let property_mortgage_total = property_sum(|item| item.mortgage_balance);
    let net_rent_total = property_sum(|item| item.net_rent_monthly);
    let inv_prop_payments_total = property_sum(|item| item.payment_monthly);

    let net_income_monthly =
        sum_present(&[num(SlotKey::NetIncomeMonthlySelf), num(SlotKey::NetIncomeMonthlyPartner)]);
    let gross_income_annual = sum_present(&[
        num(SlotKey::GrossIncomeAnnualSelf),
        num(SlotKey::GrossIncomeAnnualPartner),
    ]);

    let rent_monthly = num(SlotKey::RentMonthly);
    let mortgage_payment_monthly = num(SlotKey::MortgagePaymentMonthly);
    let housing_running_costs_monthly = num(SlotKey::HousingRunningCostsMonthly);
    let housing_cost_monthly = num(SlotKey::HousingTotalMonthly).or_else(|| {
        sum_present(&[rent_monthly, mortgage_payment_monthly, housing_running_costs_monthly])
    });

    let essential_expenses_monthly = num(SlotKey::EssentialExpensesMonthly);
    let other_debt_payments_monthly = num(SlotKey::OtherDebtPaymentsMonthlyTotal);
    let total_expenses_monthly = num(SlotKey::TotalExpensesMonthly).or_else(|| {
        sum_present(&[essential_expenses_monthly, housing_cost_monthly, other_debt_payments_monthly])
    });

    let liquid_assets = sum_present(&[
        num(SlotKey::CashLiquidTotal),
        num(SlotKey::EmergencySavingsLiquid),
        num(SlotKey::TermDepositsLe3m),
    ]);
    let investable_assets = sum_present(&[
        num(SlotKey::InvestmentsExHomeTotal),
        num(SlotKey::PensionBalanceTotal),
        num(SlotKey::InvestmentBalancesTotal),
    ]);
    let home_value = num(SlotKey::HomeValue);

    let total_assets = num(SlotKey::AssetsTotal).or_else(|| {
        sum_present(&[home_value, property_value_total, liquid_assets, investable_assets])
    });
    let total_debt_balance = sum_present(&[
        num(SlotKey::MortgageBalance),
        num(SlotKey::OtherDebtBalancesTotal),
        property_mortgage_total,
    ]);
    let total_liabilities = num(SlotKey::DebtsTotal).or(total_debt_balance);

    let net_worth = match (total_assets, total_liabilities) {
        (None, None) => None,
        (assets, liabilities) => Some(assets.unwrap_or(0.0) - liabilities.unwrap_or(0.0)),
    };

    Normalized {
        net_income_monthly,
        gross_income_annual,
        total_expenses_monthly,
        essential_expenses_monthly,
        liquid_assets,
        investable_assets,
        home_value,
        total_assets,
        total_liabilities,
        net_worth,
        housing_cost_monthly,
        rent_monthly,
        mortgage_payment_monthly,
        housing_running_costs_monthly,
        other_debt_payments_monthly,
        short_term_liabilities_12m: num(SlotKey::ShortTermLiabilities12m),
        property_value_total,
        property_mortgage_total,
        net_rent_total,
        inv_prop_payments_total,
        total_debt_balance,
    }
}

/// Sum of the present values, or `None` when every value is absent.
pub(crate) fn sum_present(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().fold(None, |total, value| Some(total.unwrap_or(0.0) + value))
}

#[cfg(test)]
mod tests {
    use crate::domain::profile::Profile;
    use crate::domain::slot::{Confidence, InvestmentProperty, SlotKey, SlotValue};

    use super::{normalize, sum_present};

    #[test]
    fn sum_present_distinguishes_zero_from_unknown() {
        assert_eq!(sum_present(&[None, None]), None);
        assert_eq!(sum_present(&[Some(0.0), None]), Some(0.0));
        assert_eq!(sum_present(&[Some(2.0), Some(3.5)]), Some(5.5));
    }

    #[test]
    fn empty_profile_normalizes_to_all_unknown() {
        let normalized = normalize(&Profile::new());
        assert_eq!(normalized.net_income_monthly, None);
        assert_eq!(normalized.liquid_assets, None);
        assert_eq!(normalized.total_assets, None);
        assert_eq!(normalized.net_worth, None);
        assert_eq!(normalized.total_expenses_monthly, None);
    }

    #[test]
    fn declared_totals_override_component_sums() {
        let profile = Profile::new()
            .with_number(SlotKey::HomeValue, 300_000.0)
            .with_number(SlotKey::CashLiquidTotal, 10_000.0)
            .with_number(SlotKey::MortgageBalance, 200_000.0)
            .with_number(SlotKey::AssetsTotal, 500_000.0)
            .with_number(SlotKey::DebtsTotal, 150_000.0);

        let normalized = normalize(&profile);
        assert_eq!(normalized.total_assets, Some(500_000.0));
        assert_eq!(normalized.total_liabilities, Some(150_000.0));
        assert_eq!(normalized.net_worth, Some(350_000.0));
        assert_eq!(normalized.total_debt_balance, Some(200_000.0));
    }

    #[test]
    fn housing_total_wins_and_expenses_derive_from_components() {
        let components = Profile::new()
            .with_number(SlotKey::RentMonthly, 1200.0)
            .with_number(SlotKey::HousingRunningCostsMonthly, 150.0)
            .with_number(SlotKey::EssentialExpensesMonthly, 1800.0)
            .with_number(SlotKey::OtherDebtPaymentsMonthlyTotal, 200.0);
        let normalized = normalize(&components);
        assert_eq!(normalized.housing_cost_monthly, Some(1350.0));
        assert_eq!(normalized.total_expenses_monthly, Some(3350.0));

        let declared = components.with_number(SlotKey::HousingTotalMonthly, 1500.0);
        assert_eq!(normalize(&declared).housing_cost_monthly, Some(1500.0));
    }

    #[test]
    fn investment_properties_feed_assets_debts_and_flows() {
        let properties = vec![
            InvestmentProperty {
                value: Some(250_000.0),
                mortgage_balance: Some(180_000.0),
                net_rent_monthly: Some(900.0),
                payment_monthly: Some(750.0),
            },
            InvestmentProperty { value: Some(100_000.0), ..InvestmentProperty::default() },
        ];
        let profile = Profile::new().with_slot(
            SlotKey::InvestmentProperties,
            SlotValue::Properties(properties),
            Confidence::High,
        );

        let normalized = normalize(&profile);
        assert_eq!(normalized.property_value_total, Some(350_000.0));
        assert_eq!(normalized.total_assets, Some(350_000.0));
        assert_eq!(normalized.total_liabilities, Some(180_000.0));
        assert_eq!(normalized.net_rent_total, Some(900.0));
        assert_eq!(normalized.inv_prop_payments_total, Some(750.0));
        assert_eq!(normalized.net_worth, Some(170_000.0));
    }
}
