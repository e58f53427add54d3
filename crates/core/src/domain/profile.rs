use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::slot::{Confidence, InvestmentProperty, Slot, SlotKey, SlotValue};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HouseholdId(pub String);

/// Immutable snapshot of everything known about one household.
///
/// A merge never edits a profile in place; it produces a successor with
/// `version + 1`. Keys the engine does not recognise are carried in `extras`
/// untouched so newer clients can round-trip data through older engines.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    version: u64,
    #[serde(default)]
    slots: BTreeMap<SlotKey, Slot>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    extras: BTreeMap<String, Value>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by fixtures and tests; does not bump the version.
    pub fn with_slot(mut self, key: SlotKey, value: SlotValue, confidence: Confidence) -> Self {
        self.slots.insert(key, Slot::new(Some(value), confidence));
        self
    }

    pub fn with_number(self, key: SlotKey, value: f64) -> Self {
        self.with_slot(key, SlotValue::Number(value), Confidence::Med)
    }

    pub fn with_bool(self, key: SlotKey, value: bool) -> Self {
        self.with_slot(key, SlotValue::Bool(value), Confidence::Med)
    }

    pub(crate) fn successor(
        &self,
        slots: BTreeMap<SlotKey, Slot>,
        extras: BTreeMap<String, Value>,
    ) -> Self {
        Self { version: self.version + 1, slots, extras }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn slots(&self) -> &BTreeMap<SlotKey, Slot> {
        &self.slots
    }

    pub fn extras(&self) -> &BTreeMap<String, Value> {
        &self.extras
    }

    pub fn get(&self, key: SlotKey) -> Option<&Slot> {
        self.slots.get(&key)
    }

    pub fn value(&self, key: SlotKey) -> Option<&SlotValue> {
        self.slots.get(&key).and_then(|slot| slot.value.as_ref())
    }

    pub fn number(&self, key: SlotKey) -> Option<f64> {
        self.value(key).and_then(SlotValue::as_number)
    }

    pub fn boolean(&self, key: SlotKey) -> Option<bool> {
        self.value(key).and_then(SlotValue::as_bool)
    }

    pub fn text(&self, key: SlotKey) -> Option<&str> {
        self.value(key).and_then(SlotValue::as_text)
    }

    pub fn properties(&self, key: SlotKey) -> Option<&[InvestmentProperty]> {
        self.value(key).and_then(SlotValue::as_properties)
    }
}
