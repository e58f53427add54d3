//! Pipeline facade: canonicalize, merge, derive, rank.
//!
//! Every call is a pure function of `(prior profile, update, context)`; the
//! optional audit sink and profile store are the only side effects and both
//! are passed in by the caller.

use serde::Serialize;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::canonical::{AbsoluteUpdate, CanonicalUpdate, Canonicalizer};
use crate::context::EngineContext;
use crate::domain::profile::{HouseholdId, Profile};
use crate::errors::ApplicationError;
use crate::health::gates::Gates;
use crate::health::kpis::Kpis;
use crate::health::levels::LevelAssessment;
use crate::health::normalize::Normalized;
use crate::health::recommendations::Recommendation;
use crate::health::{DefaultHealthRuntime, HealthEvaluation, HealthRuntime};
use crate::merge::{self, DeltaUpdate, MergeOutcome};
use crate::store::ProfileStore;

/// Engine output handed back to the host after every request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    pub profile: Profile,
    pub normalized: Normalized,
    pub kpis: Kpis,
    pub gates: Gates,
    pub level: LevelAssessment,
    pub recommendations: Vec<Recommendation>,
    pub merge_notes: Vec<String>,
    /// blake3 digest of the profile and engine settings; stable for identical inputs.
    pub fingerprint: String,
}

pub struct Engine<R = DefaultHealthRuntime> {
    runtime: R,
    canonicalizer: Canonicalizer,
    context: EngineContext,
}

impl Engine {
    pub fn new(context: EngineContext) -> Self {
        Self::with_runtime(DefaultHealthRuntime::default(), context)
    }
}

impl<R> Engine<R>
where
    R: HealthRuntime,
{
    pub fn with_runtime(runtime: R, context: EngineContext) -> Self {
        Self { runtime, canonicalizer: Canonicalizer, context }
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn evaluate(&self, profile: &Profile) -> Snapshot {
        self.snapshot(profile.clone(), Vec::new())
    }

    pub fn apply_absolute(&self, prior: &Profile, update: &AbsoluteUpdate) -> Snapshot {
        self.merge_absolute(prior, update).1
    }

    fn merge_absolute(&self, prior: &Profile, update: &AbsoluteUpdate) -> (CanonicalUpdate, Snapshot) {
        let canonical = self.canonicalizer.canonicalize_update(update, &self.context);
        let MergeOutcome { profile, notes } = merge::apply_absolute(prior, &canonical);
        tracing::debug!(
            event_name = "engine.absolute_applied",
            from_version = prior.version(),
            to_version = profile.version(),
            slots = canonical.entries.len(),
            passthrough = canonical.passthrough.len(),
            "absolute update merged"
        );
        let snapshot = self.snapshot(profile, notes);
        (canonical, snapshot)
    }

    pub fn apply_delta(&self, prior: &Profile, update: &DeltaUpdate) -> Snapshot {
        let MergeOutcome { profile, notes } = merge::apply_delta(prior, update);
        tracing::debug!(
            event_name = "engine.delta_applied",
            from_version = prior.version(),
            to_version = profile.version(),
            deltas = update.entries.len(),
            "delta update merged"
        );
        self.snapshot(profile, notes)
    }

    pub fn evaluate_with_audit<S>(&self, profile: &Profile, sink: &S, audit: &AuditContext) -> Snapshot
    where
        S: AuditSink + ?Sized,
    {
        let snapshot = self.evaluate(profile);
        emit_evaluated(sink, audit, &snapshot);
        snapshot
    }

    pub fn apply_absolute_with_audit<S>(
        &self,
        prior: &Profile,
        update: &AbsoluteUpdate,
        sink: &S,
        audit: &AuditContext,
    ) -> Snapshot
    where
        S: AuditSink + ?Sized,
    {
        let (canonical, snapshot) = self.merge_absolute(prior, update);
        emit_canonicalized(sink, audit, &canonical);
        emit_merged(sink, audit, "profile.absolute_applied", prior, &snapshot);
        emit_evaluated(sink, audit, &snapshot);
        snapshot
    }

    pub fn apply_delta_with_audit<S>(
        &self,
        prior: &Profile,
        update: &DeltaUpdate,
        sink: &S,
        audit: &AuditContext,
    ) -> Snapshot
    where
        S: AuditSink + ?Sized,
    {
        let snapshot = self.apply_delta(prior, update);
        emit_merged(sink, audit, "profile.delta_applied", prior, &snapshot);
        emit_evaluated(sink, audit, &snapshot);
        snapshot
    }

    /// Load, merge and save in one optimistic cycle. Every step is reported to
    /// `sink`, including a rejected or failed save.
    pub fn commit_absolute<P, S>(
        &self,
        store: &P,
        household: &HouseholdId,
        update: &AbsoluteUpdate,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<Snapshot, ApplicationError>
    where
        P: ProfileStore + ?Sized,
        S: AuditSink + ?Sized,
    {
        let prior = load_prior(store, household, sink, audit)?;
        let snapshot = self.apply_absolute_with_audit(&prior, update, sink, audit);
        persist(store, household, &prior, snapshot, sink, audit)
    }

    pub fn commit_delta<P, S>(
        &self,
        store: &P,
        household: &HouseholdId,
        update: &DeltaUpdate,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<Snapshot, ApplicationError>
    where
        P: ProfileStore + ?Sized,
        S: AuditSink + ?Sized,
    {
        let prior = load_prior(store, household, sink, audit)?;
        let snapshot = self.apply_delta_with_audit(&prior, update, sink, audit);
        persist(store, household, &prior, snapshot, sink, audit)
    }

    fn snapshot(&self, profile: Profile, merge_notes: Vec<String>) -> Snapshot {
        let HealthEvaluation { normalized, kpis, gates, level, recommendations } =
            self.runtime.evaluate(&profile, &self.context);
        let fingerprint = fingerprint(&profile, &self.context);

        Snapshot {
            profile,
            normalized,
            kpis,
            gates,
            level,
            recommendations,
            merge_notes,
            fingerprint,
        }
    }
}

/// Digest of everything that determines a snapshot.
pub fn fingerprint(profile: &Profile, context: &EngineContext) -> String {
    let mut hasher = blake3::Hasher::new();
    match serde_json::to_vec(&(profile, &context.settings, context.current_year)) {
        Ok(bytes) => {
            hasher.update(&bytes);
        }
        Err(_) => {
            hasher.update(format!("{profile:?}{context:?}").as_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

fn load_prior<P, S>(
    store: &P,
    household: &HouseholdId,
    sink: &S,
    audit: &AuditContext,
) -> Result<Profile, ApplicationError>
where
    P: ProfileStore + ?Sized,
    S: AuditSink + ?Sized,
{
    match store.load_latest(household) {
        Ok(prior) => Ok(prior.unwrap_or_default()),
        Err(error) => {
            sink.emit(
                AuditEvent::new(audit, "profile.load_failed", AuditCategory::Persistence, AuditOutcome::Failed)
                    .with_metadata("error", error.to_string()),
            );
            Err(error)
        }
    }
}

fn persist<P, S>(
    store: &P,
    household: &HouseholdId,
    prior: &Profile,
    snapshot: Snapshot,
    sink: &S,
    audit: &AuditContext,
) -> Result<Snapshot, ApplicationError>
where
    P: ProfileStore + ?Sized,
    S: AuditSink + ?Sized,
{
    let event = |event_type: &str, outcome: AuditOutcome| {
        AuditEvent::new(audit, event_type, AuditCategory::Persistence, outcome)
            .with_metadata("expected_version", prior.version().to_string())
            .with_metadata("version", snapshot.profile.version().to_string())
    };

    if let Err(error) = store.save(household, snapshot.profile.clone(), prior.version()) {
        tracing::warn!(
            event_name = "engine.commit_rejected",
            household_id = %household.0,
            expected_version = prior.version(),
            error = %error,
            "profile commit rejected"
        );
        let outcome = match error {
            ApplicationError::VersionConflict { .. } => AuditOutcome::Rejected,
            _ => AuditOutcome::Failed,
        };
        sink.emit(event("profile.commit_rejected", outcome).with_metadata("error", error.to_string()));
        return Err(error);
    }

    tracing::info!(
        event_name = "engine.committed",
        household_id = %household.0,
        version = snapshot.profile.version(),
        level = %snapshot.level.level,
        "profile committed"
    );
    sink.emit(event("profile.committed", AuditOutcome::Success));
    Ok(snapshot)
}

fn emit_canonicalized<S>(sink: &S, audit: &AuditContext, canonical: &CanonicalUpdate)
where
    S: AuditSink + ?Sized,
{
    sink.emit(
        AuditEvent::new(audit, "update.canonicalized", AuditCategory::Canonicalize, AuditOutcome::Success)
            .with_metadata("slots", canonical.entries.len().to_string())
            .with_metadata("passthrough", canonical.passthrough.len().to_string())
            .with_metadata("notes", canonical.notes.len().to_string()),
    );
}

fn emit_merged<S>(sink: &S, audit: &AuditContext, event_type: &str, prior: &Profile, snapshot: &Snapshot)
where
    S: AuditSink + ?Sized,
{
    sink.emit(
        AuditEvent::new(audit, event_type, AuditCategory::Merge, AuditOutcome::Success)
            .with_metadata("from_version", prior.version().to_string())
            .with_metadata("to_version", snapshot.profile.version().to_string())
            .with_metadata("notes", snapshot.merge_notes.len().to_string()),
    );
}

fn emit_evaluated<S>(sink: &S, audit: &AuditContext, snapshot: &Snapshot)
where
    S: AuditSink + ?Sized,
{
    tracing::info!(
        event_name = "engine.evaluated",
        correlation_id = %audit.correlation_id,
        household_id = audit.household_id.as_ref().map_or("unknown", |id| id.0.as_str()),
        level = %snapshot.level.level,
        fingerprint = %snapshot.fingerprint,
        "profile evaluated"
    );
    sink.emit(
        AuditEvent::new(audit, "profile.evaluated", AuditCategory::Evaluation, AuditOutcome::Success)
            .with_metadata("level", snapshot.level.level.to_string())
            .with_metadata("fingerprint", snapshot.fingerprint.clone())
            .with_metadata("recommendations", snapshot.recommendations.len().to_string()),
    );
}
