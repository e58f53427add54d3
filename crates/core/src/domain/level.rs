use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::DomainError;

const LEVEL_LABELS: [&str; 10] = [
    "Needs help",
    "Getting started",
    "Building basics",
    "Finding stability",
    "Gaining momentum",
    "On track",
    "Growing strong",
    "Wealth builder",
    "Almost there",
    "Financial freedom",
];

/// Progression tier, `L1` through `L10`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(u8);

impl Level {
    pub const MIN: Level = Level(1);
    pub const MAX: Level = Level(10);

    pub fn new(tier: u8) -> Option<Self> {
        (1..=10).contains(&tier).then_some(Self(tier))
    }

    pub fn tier(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        LEVEL_LABELS[usize::from(self.0 - 1)]
    }

    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl FromStr for Level {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix(['L', 'l']).unwrap_or(trimmed);
        digits
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| DomainError::InvariantViolation(format!("`{trimmed}` is not a level")))
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
