pub mod audit;
pub mod canonical;
pub mod config;
pub mod context;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod fixtures;
pub mod health;
pub mod merge;
pub mod store;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use canonical::{AbsoluteUpdate, CanonicalUpdate, Canonicalizer, RawSlotInput};
pub use config::{AppConfig, ConfigError, ConfigOverrides, EngineSettings, LoadOptions, LogFormat};
pub use context::EngineContext;
pub use domain::level::Level;
pub use domain::profile::{HouseholdId, Profile};
pub use domain::slot::{Confidence, InvestmentProperty, Slot, SlotKey, SlotKind, SlotValue};
pub use engine::{fingerprint, Engine, Snapshot};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use fixtures::Scenario;
pub use health::gates::{Gate, Gates};
pub use health::kpis::{Kpis, Metric};
pub use health::levels::{DeterministicLevelEngine, LevelAssessment, LevelEngine};
pub use health::normalize::Normalized;
pub use health::recommendations::{
    DeterministicRecommendationEngine, Pillar, Recommendation, RecommendationEngine,
};
pub use health::{DefaultHealthRuntime, DeterministicHealthRuntime, HealthEvaluation, HealthRuntime};
pub use merge::{DeltaUpdate, MergeOutcome};
pub use store::{InMemoryProfileStore, ProfileStore};
