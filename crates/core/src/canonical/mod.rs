//! Alias resolution and typed coercion of raw slot updates.

pub mod coerce;

use serde_json::{Map, Value};

use crate::context::EngineContext;
use crate::domain::slot::{Confidence, Slot, SlotKey};
use crate::errors::DomainError;

/// Synonyms accepted from intake clients, keyed by normalised input name.
pub const ALIASES: &[(&str, SlotKey)] = &[
    ("cash", SlotKey::CashLiquidTotal),
    ("cash_total", SlotKey::CashLiquidTotal),
    ("savings", SlotKey::CashLiquidTotal),
    ("term_deposit", SlotKey::TermDepositsLe3m),
    ("term_deposits", SlotKey::TermDepositsLe3m),
    ("fixed_savings", SlotKey::TermDepositsLe3m),
    ("emergency_fund", SlotKey::EmergencySavingsLiquid),
    ("investments", SlotKey::InvestmentsExHomeTotal),
    ("investments_total", SlotKey::InvestmentsExHomeTotal),
    ("investment_total", SlotKey::InvestmentsExHomeTotal),
    ("stocks_total", SlotKey::InvestmentsExHomeTotal),
    ("pension_balance", SlotKey::PensionBalanceTotal),
    ("pension_total", SlotKey::PensionBalanceTotal),
    ("pension_contribution", SlotKey::PensionContribPct),
    ("pension_pct", SlotKey::PensionContribPct),
    ("rent", SlotKey::RentMonthly),
    ("mortgage_payment", SlotKey::MortgagePaymentMonthly),
    ("essential_expenses", SlotKey::EssentialExpensesMonthly),
    ("total_expenses", SlotKey::TotalExpensesMonthly),
    ("other_debt_payments", SlotKey::OtherDebtPaymentsMonthlyTotal),
    ("other_debt_total", SlotKey::OtherDebtBalancesTotal),
    ("credit_score", SlotKey::CreditScoreNormalised),
    ("credit_score_normalized", SlotKey::CreditScoreNormalised),
    ("birthyear", SlotKey::BirthYear),
    ("year_of_birth", SlotKey::BirthYear),
    ("date_of_birth", SlotKey::BirthYear),
    ("dob", SlotKey::BirthYear),
    ("born", SlotKey::BirthYear),
    ("age", SlotKey::BirthYear),
    ("dependants", SlotKey::DependantsCount),
    ("dependents", SlotKey::DependantsCount),
    ("kids", SlotKey::DependantsCount),
    ("sick_pay", SlotKey::SickPayMonthsFull),
    ("sickpay", SlotKey::SickPayMonthsFull),
    ("sick_pay_months", SlotKey::SickPayMonthsFull),
    ("sickpay_months", SlotKey::SickPayMonthsFull),
    ("sick_pay_full", SlotKey::SickPayMonthsFull),
    ("sick_full", SlotKey::SickPayMonthsFull),
    ("full_sick_pay_months", SlotKey::SickPayMonthsFull),
    ("sick_pay_half", SlotKey::SickPayMonthsHalf),
    ("sick_half", SlotKey::SickPayMonthsHalf),
    ("half_sick_pay_months", SlotKey::SickPayMonthsHalf),
];

/// Lowercase, trim, and fold spaces and hyphens to underscores.
pub fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .chars()
        .map(|ch| if ch == ' ' || ch == '-' { '_' } else { ch })
        .collect()
}

/// Canonical names resolve to themselves; otherwise the alias table decides.
pub fn resolve_key(raw: &str) -> Option<SlotKey> {
    let key = normalize_key(raw);
    SlotKey::from_canonical(&key)
        .or_else(|| ALIASES.iter().find(|(alias, _)| *alias == key).map(|(_, slot)| *slot))
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawSlotInput {
    pub value: Value,
    pub confidence: Option<Confidence>,
}

impl RawSlotInput {
    pub fn new(value: Value) -> Self {
        Self { value, confidence: None }
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

/// Ordered raw inputs for an absolute merge, before alias resolution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AbsoluteUpdate {
    pub entries: Vec<(String, RawSlotInput)>,
}

impl AbsoluteUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.entries.push((key.into(), RawSlotInput::new(value)));
        self
    }

    pub fn with_confident(
        mut self,
        key: impl Into<String>,
        value: Value,
        confidence: Confidence,
    ) -> Self {
        self.entries.push((key.into(), RawSlotInput::new(value).with_confidence(confidence)));
        self
    }

    pub fn from_json(payload: &Value) -> Result<Self, DomainError> {
        Ok(Self { entries: parse_slot_inputs(payload)? })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalEntry {
    pub key: SlotKey,
    /// Input name as submitted, before alias resolution.
    pub source: String,
    pub slot: Slot,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanonicalUpdate {
    pub entries: Vec<CanonicalEntry>,
    /// Unrecognised input names with their raw values, in submission order.
    pub passthrough: Vec<(String, Value)>,
    pub notes: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Canonicalizer;

impl Canonicalizer {
    /// Rewrites raw entries under canonical slot names with kind-coerced values.
    ///
    /// Order is preserved so that a later entry for the same slot can win in an
    /// absolute merge. Values that cannot be coerced become `None` with a note.
    pub fn canonicalize<I>(&self, entries: I, context: &EngineContext) -> CanonicalUpdate
    where
        I: IntoIterator<Item = (String, RawSlotInput)>,
    {
        let mut update = CanonicalUpdate::default();

        for (name, raw) in entries {
            let Some(key) = resolve_key(&name) else {
                update.notes.push(format!("`{name}` is not a known slot; kept as passthrough"));
                update.passthrough.push((normalize_key(&name), raw.value));
                continue;
            };

            let value = if raw.value.is_null() {
                None
            } else {
                let coerced = coerce::coerce(key.kind(), &raw.value, context.current_year);
                if coerced.is_none() {
                    update.notes.push(format!(
                        "`{name}` value {} could not be read as {:?}; stored as unknown",
                        raw.value,
                        key.kind()
                    ));
                }
                coerced
            };

            update.entries.push(CanonicalEntry {
                key,
                source: name,
                slot: Slot::new(value, raw.confidence.unwrap_or_default()),
            });
        }

        update
    }

    pub fn canonicalize_update(
        &self,
        update: &AbsoluteUpdate,
        context: &EngineContext,
    ) -> CanonicalUpdate {
        self.canonicalize(update.entries.iter().cloned(), context)
    }

    /// Accepts `{"slots": {...}}` or a bare object of slot inputs.
    pub fn canonicalize_json(
        &self,
        payload: &Value,
        context: &EngineContext,
    ) -> Result<CanonicalUpdate, DomainError> {
        let update = AbsoluteUpdate::from_json(payload)?;
        Ok(self.canonicalize_update(&update, context))
    }
}

/// Splits a JSON update into ordered `(name, input)` pairs.
///
/// Each slot value is either a bare scalar or `{"value": .., "confidence": ..}`.
/// A top-level `confidences` map, when present, fills in missing confidences.
pub fn parse_slot_inputs(payload: &Value) -> Result<Vec<(String, RawSlotInput)>, DomainError> {
    let object = payload.as_object().ok_or_else(|| {
        DomainError::MalformedUpdate("update payload must be a JSON object".to_owned())
    })?;

    let (slots, confidences) = match object.get("slots") {
        Some(Value::Object(slots)) => (slots, parse_confidences(object.get("confidences"))?),
        Some(_) => {
            return Err(DomainError::MalformedUpdate("`slots` must be a JSON object".to_owned()))
        }
        None => (object, Map::new()),
    };

    let mut entries = Vec::with_capacity(slots.len());
    for (name, raw) in slots {
        let mut input = match raw {
            Value::Object(inner) if inner.contains_key("value") => {
                let confidence = match inner.get("confidence") {
                    Some(Value::String(text)) => Some(text.parse::<Confidence>()?),
                    Some(Value::Null) | None => None,
                    Some(other) => {
                        return Err(DomainError::MalformedUpdate(format!(
                            "confidence for `{name}` must be a string, got {other}"
                        )))
                    }
                };
                RawSlotInput {
                    value: inner.get("value").cloned().unwrap_or(Value::Null),
                    confidence,
                }
            }
            other => RawSlotInput::new(other.clone()),
        };

        if input.confidence.is_none() {
            if let Some(Value::String(text)) = confidences.get(name) {
                input.confidence = Some(text.parse::<Confidence>()?);
            }
        }
        entries.push((name.clone(), input));
    }

    Ok(entries)
}

pub(crate) fn parse_confidences(raw: Option<&Value>) -> Result<Map<String, Value>, DomainError> {
    match raw {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => {
            for (name, value) in map {
                if !value.is_string() {
                    return Err(DomainError::MalformedUpdate(format!(
                        "confidence for `{name}` must be a string"
                    )));
                }
            }
            Ok(map.clone())
        }
        Some(_) => {
            Err(DomainError::MalformedUpdate("`confidences` must be a JSON object".to_owned()))
        }
    }
}
