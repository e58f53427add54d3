//! Absolute and additive merges of canonical updates into a prior profile.
//!
//! Both modes are pure: the prior profile is never touched and the result is a
//! successor snapshot with `version + 1`.

use std::collections::BTreeMap;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::canonical::{self, coerce, normalize_key, resolve_key, CanonicalUpdate};
use crate::domain::profile::Profile;
use crate::domain::slot::{Confidence, Slot, SlotKey, SlotKind, SlotValue};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub profile: Profile,
    pub notes: Vec<String>,
}

/// One signed adjustment as submitted, before alias resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct DeltaEntry {
    pub key: String,
    pub amount: Value,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeltaUpdate {
    pub entries: Vec<DeltaEntry>,
    /// Confidence per input name (alias or canonical).
    pub confidences: BTreeMap<String, Confidence>,
}

impl DeltaUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delta(mut self, key: impl Into<String>, amount: f64) -> Self {
        self.entries.push(DeltaEntry { key: key.into(), amount: Value::from(amount) });
        self
    }

    pub fn with_confidence(mut self, key: impl Into<String>, confidence: Confidence) -> Self {
        self.confidences.insert(key.into(), confidence);
        self
    }

    /// Accepts `{"deltas": {...}, "confidences": {...}}` or a bare object of deltas.
    pub fn from_json(payload: &Value) -> Result<Self, DomainError> {
        let object = payload.as_object().ok_or_else(|| {
            DomainError::MalformedUpdate("delta payload must be a JSON object".to_owned())
        })?;

        let (deltas, confidences) = match object.get("deltas") {
            Some(Value::Object(deltas)) => {
                (deltas, canonical::parse_confidences(object.get("confidences"))?)
            }
            Some(_) => {
                return Err(DomainError::MalformedUpdate("`deltas` must be a JSON object".to_owned()))
            }
            None => (object, serde_json::Map::new()),
        };

        let mut update = Self::new();
        for (key, amount) in deltas {
            update.entries.push(DeltaEntry { key: key.clone(), amount: amount.clone() });
        }
        for (key, confidence) in &confidences {
            if let Value::String(text) = confidence {
                update.confidences.insert(key.clone(), text.parse()?);
            }
        }
        Ok(update)
    }

    fn confidence_for(&self, key: SlotKey) -> Option<Confidence> {
        self.confidences
            .iter()
            .find(|(name, _)| resolve_key(name) == Some(key))
            .map(|(_, confidence)| *confidence)
    }
}

/// Replaces each supplied slot wholesale. Within one update the last entry for
/// a key wins. Passthrough keys are stored in `extras`.
pub fn apply_absolute(prior: &Profile, update: &CanonicalUpdate) -> MergeOutcome {
    let mut slots = prior.slots().clone();
    let mut extras = prior.extras().clone();
    let mut notes = update.notes.clone();

    for entry in &update.entries {
        slots.insert(entry.key, entry.slot.clone());
    }
    for (name, value) in &update.passthrough {
        extras.insert(name.clone(), value.clone());
    }
    if !update.passthrough.is_empty() {
        notes.push(format!("{} unrecognised field(s) stored as extras", update.passthrough.len()));
    }

    MergeOutcome { profile: prior.successor(slots, extras), notes }
}

/// Adds signed amounts to additive slots. Repeated keys accumulate, results are
/// floored at zero, and a non-finite result keeps the current value.
///
/// Only money, number, percent and count slots take deltas. Percent deltas follow
/// the absolute reading (`5` and `"5%"` both mean 0.05) and counts stay whole.
/// Birth years are set, never shifted.
pub fn apply_delta(prior: &Profile, update: &DeltaUpdate) -> MergeOutcome {
    let mut slots = prior.slots().clone();
    let mut notes = Vec::new();

    for entry in &update.entries {
        let Some(key) = resolve_key(&entry.key) else {
            notes.push(format!("`{}` is not a known slot; delta ignored", entry.key));
            warn!(event_name = "merge.delta_unknown_key", key = %normalize_key(&entry.key), "dropping delta for unknown key");
            continue;
        };
        let kind = key.kind();
        if !kind.is_additive() {
            notes.push(format!("`{key}` cannot be adjusted by a delta; send an absolute value instead"));
            continue;
        }
        let Some(delta) = delta_amount(kind, &entry.amount) else {
            notes.push(format!("delta for `{key}` is not a number; ignored"));
            continue;
        };

        let current = slots.get(&key).and_then(|slot| slot.value.as_ref()).and_then(SlotValue::as_number);
        let base = current.unwrap_or(0.0);
        let mut next = match add_exact(base, delta) {
            Some(next) if next.is_finite() => next,
            _ => {
                notes.push(format!("delta for `{key}` produced a non-finite value; kept {base}"));
                base
            }
        };
        if next < 0.0 {
            notes.push(format!(
                "`{key}` would fall to {next} ({base} {delta:+}); clamped to 0, discarding {}",
                -next
            ));
            warn!(event_name = "merge.delta_clamped", key = %key, prior = base, delta, "negative balance clamped to zero");
            next = 0.0;
        }
        if kind == SlotKind::Count && next.fract() != 0.0 {
            let whole = coerce::floor_count(next) as f64;
            notes.push(format!("`{key}` is a whole count; {next} rounded down to {whole}"));
            next = whole;
        }

        let confidence = update.confidence_for(key).unwrap_or_default();
        slots.insert(key, Slot::number(next, confidence));
    }

    MergeOutcome { profile: prior.successor(slots, prior.extras().clone()), notes }
}

fn delta_amount(kind: SlotKind, raw: &Value) -> Option<f64> {
    let amount = coerce::number(raw)?;
    if kind != SlotKind::Percent {
        return Some(amount);
    }
    let marked = matches!(raw, Value::String(text) if text.contains('%'));
    if marked || amount.abs() > 1.0 {
        Some(amount / 100.0)
    } else {
        Some(amount)
    }
}

/// Decimal addition so that `x + d - d` returns exactly `x` for currency amounts.
fn add_exact(base: f64, delta: f64) -> Option<f64> {
    match (Decimal::from_f64(base), Decimal::from_f64(delta)) {
        (Some(base), Some(delta)) => base.checked_add(delta)?.to_f64(),
        _ => Some(base + delta),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::canonical::{Canonicalizer, RawSlotInput};
    use crate::context::EngineContext;
    use crate::domain::profile::Profile;
    use crate::domain::slot::{Confidence, SlotKey};

    use super::{apply_absolute, apply_delta, DeltaUpdate};

    #[test]
    fn absolute_merge_is_last_write_wins_and_defaults_confidence() {
        let prior = Profile::new().with_number(SlotKey::RentMonthly, 900.0);
        let update = Canonicalizer.canonicalize(
            vec![
                ("rent".to_owned(), RawSlotInput::new(json!(1000))),
                ("rent_monthly".to_owned(), RawSlotInput::new(json!(1100))),
                ("wishlist".to_owned(), RawSlotInput::new(json!(["boat"]))),
            ],
            &EngineContext::for_year(2026),
        );

        let outcome = apply_absolute(&prior, &update);
        let rent = outcome.profile.get(SlotKey::RentMonthly).expect("rent present");
        assert_eq!(rent.value.as_ref().and_then(|value| value.as_number()), Some(1100.0));
        assert_eq!(rent.confidence, Confidence::Med);
        assert_eq!(outcome.profile.version(), prior.version() + 1);
        assert_eq!(outcome.profile.extras().get("wishlist"), Some(&json!(["boat"])));
        assert_eq!(prior.number(SlotKey::RentMonthly), Some(900.0));
    }

    #[test]
    fn delta_accumulates_repeated_keys_and_clamps_at_zero() {
        let prior = Profile::new().with_number(SlotKey::CashLiquidTotal, 300.0);
        let update = DeltaUpdate::new()
            .with_delta("cash", -200.0)
            .with_delta("savings", -250.0)
            .with_delta("investments", 450.0)
            .with_confidence("investments", Confidence::High);

        let outcome = apply_delta(&prior, &update);
        assert_eq!(outcome.profile.number(SlotKey::CashLiquidTotal), Some(0.0));
        assert_eq!(outcome.profile.number(SlotKey::InvestmentsExHomeTotal), Some(450.0));
        assert_eq!(
            outcome.profile.get(SlotKey::InvestmentsExHomeTotal).map(|slot| slot.confidence),
            Some(Confidence::High)
        );
        assert!(outcome.notes.iter().any(|note| note.contains("clamped to 0")));
    }

    #[test]
    fn delta_skips_non_numeric_and_unknown_slots() {
        let prior = Profile::new().with_bool(SlotKey::HomeInsuredOk, true);
        let update = DeltaUpdate::new().with_delta("home_insured_ok", 1.0).with_delta("yacht", 5.0);

        let outcome = apply_delta(&prior, &update);
        assert_eq!(outcome.profile.boolean(SlotKey::HomeInsuredOk), Some(true));
        assert_eq!(outcome.notes.len(), 2);
    }

    #[test]
    fn delta_leaves_birth_year_untouched() {
        let prior = Profile::new().with_number(SlotKey::BirthYear, 1985.0);
        let outcome = apply_delta(&prior, &DeltaUpdate::new().with_delta("age", 35.0));

        assert_eq!(outcome.profile.number(SlotKey::BirthYear), Some(1985.0));
        assert!(outcome.notes[0].contains("absolute value"));

        let empty = apply_delta(&Profile::new(), &DeltaUpdate::new().with_delta("age", 35.0));
        assert_eq!(empty.profile.number(SlotKey::BirthYear), None);
    }

    #[test]
    fn count_deltas_stay_whole_and_non_negative() {
        let prior = Profile::new().with_number(SlotKey::DependantsCount, 1.0);

        let half = apply_delta(&Profile::new(), &DeltaUpdate::new().with_delta("dependants_count", 0.5));
        assert_eq!(half.profile.number(SlotKey::DependantsCount), Some(0.0));
        assert!(half.notes.iter().any(|note| note.contains("rounded down")));

        let more = apply_delta(&prior, &DeltaUpdate::new().with_delta("dependants_count", 1.5));
        assert_eq!(more.profile.number(SlotKey::DependantsCount), Some(2.0));

        let fewer = apply_delta(&prior, &DeltaUpdate::new().with_delta("dependants_count", -3.0));
        assert_eq!(fewer.profile.number(SlotKey::DependantsCount), Some(0.0));
    }

    #[test]
    fn percent_deltas_read_like_absolute_percentages() {
        let prior = Profile::new().with_number(SlotKey::PensionContribPct, 0.05);

        let whole = apply_delta(&prior, &DeltaUpdate::new().with_delta("pension_contrib_pct", 5.0));
        assert_eq!(whole.profile.number(SlotKey::PensionContribPct), Some(0.1));

        let fraction = apply_delta(&prior, &DeltaUpdate::new().with_delta("pension_contrib_pct", 0.01));
        assert_eq!(fraction.profile.number(SlotKey::PensionContribPct), Some(0.06));

        let lower = apply_delta(&prior, &DeltaUpdate::new().with_delta("pension_contrib_pct", -2.0));
        assert_eq!(lower.profile.number(SlotKey::PensionContribPct), Some(0.03));
    }

    #[test]
    fn delta_payload_parses_numeric_strings_and_confidences() {
        let update = DeltaUpdate::from_json(&json!({
            "deltas": {"cash": "-1,000", "pension_pct": "2%"},
            "confidences": {"cash": "low"}
        }))
        .expect("well formed");

        let prior = Profile::new()
            .with_number(SlotKey::CashLiquidTotal, 5000.0)
            .with_number(SlotKey::PensionContribPct, 0.05);
        let outcome = apply_delta(&prior, &update);
        assert_eq!(outcome.profile.number(SlotKey::CashLiquidTotal), Some(4000.0));
        assert_eq!(outcome.profile.number(SlotKey::PensionContribPct), Some(0.07));
        assert_eq!(
            outcome.profile.get(SlotKey::CashLiquidTotal).map(|slot| slot.confidence),
            Some(Confidence::Low)
        );

        assert!(DeltaUpdate::from_json(&json!("cash -5")).is_err());
        assert!(DeltaUpdate::from_json(&json!({"deltas": [1]})).is_err());
    }
}
