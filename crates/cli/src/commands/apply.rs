use std::path::PathBuf;

use clap::Args;
use prosper_core::{
    AbsoluteUpdate, AuditContext, AuditSink, DeltaUpdate, Engine, HouseholdId, InMemoryAuditSink,
    InterfaceError, Profile, Snapshot,
};
use serde_json::{json, Value};

use super::{
    correlation_id, engine_for, load_config, read_json, render_snapshot, snapshot_payload,
    write_json, CommandResult, EXIT_CONFIG, EXIT_CONFLICT, EXIT_INPUT, EXIT_IO,
};
use crate::store::FileProfileStore;
use crate::{GlobalArgs, UpdateMode};

#[derive(Clone, Debug, Args)]
pub struct ApplyArgs {
    #[arg(
        long,
        conflicts_with = "store",
        help = "Prior profile JSON file; omitted means an empty profile"
    )]
    pub profile: Option<PathBuf>,
    #[arg(long, help = "Update JSON file")]
    pub update: PathBuf,
    #[arg(long, value_enum, default_value_t = UpdateMode::Absolute)]
    pub mode: UpdateMode,
    #[arg(long, help = "Write the merged profile to this file")]
    pub out: Option<PathBuf>,
    #[arg(long, requires = "household", help = "Directory-backed profile store to commit into")]
    pub store: Option<PathBuf>,
    #[arg(long, requires = "store", help = "Household id inside --store")]
    pub household: Option<String>,
    #[arg(long, help = "Emit the full snapshot as JSON")]
    pub json: bool,
}

enum ParsedUpdate {
    Absolute(AbsoluteUpdate),
    Delta(DeltaUpdate),
}

pub fn run(global: &GlobalArgs, args: &ApplyArgs) -> CommandResult {
    let config = match load_config(global) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("apply", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };
    let engine = engine_for(&config);

    let update = match read_json(&args.update)
        .and_then(|payload| parse_update(args.mode, &payload).map_err(anyhow::Error::from))
    {
        Ok(update) => update,
        Err(error) => {
            return CommandResult::failure("apply", "invalid_update", format!("{error:#}"), EXIT_INPUT)
        }
    };

    let correlation_id = correlation_id();
    let sink = InMemoryAuditSink::default();
    let audit = AuditContext::new(
        args.household.as_ref().map(|household| HouseholdId(household.clone())),
        correlation_id.as_str(),
        "cli",
    );
    let snapshot = match (&args.store, &args.household) {
        (Some(root), Some(household)) => {
            let store = FileProfileStore::new(root);
            let household = HouseholdId(household.clone());
            let committed = match &update {
                ParsedUpdate::Absolute(update) => {
                    engine.commit_absolute(&store, &household, update, &sink, &audit)
                }
                ParsedUpdate::Delta(update) => engine.commit_delta(&store, &household, update, &sink, &audit),
            };
            match committed {
                Ok(snapshot) => snapshot,
                Err(error) => return interface_failure(error.into_interface(correlation_id), &sink),
            }
        }
        _ => {
            let prior = match &args.profile {
                Some(path) => match read_json(path).and_then(|raw| {
                    serde_json::from_value::<Profile>(raw).map_err(anyhow::Error::from)
                }) {
                    Ok(profile) => profile,
                    Err(error) => {
                        return CommandResult::failure(
                            "apply",
                            "invalid_profile",
                            format!("{error:#}"),
                            EXIT_INPUT,
                        )
                    }
                },
                None => Profile::new(),
            };
            apply_in_memory(&engine, &prior, &update, &sink, &audit)
        }
    };

    if let Some(out) = &args.out {
        if let Err(error) = write_json(out, &snapshot.profile) {
            return CommandResult::failure("apply", "io", format!("{error:#}"), EXIT_IO);
        }
    }

    if !args.json {
        return CommandResult::text(render_snapshot(&snapshot));
    }

    match snapshot_payload(&snapshot, &sink.events()) {
        Ok(data) => CommandResult::success_with(
            "apply",
            format!("profile v{} is at {}", snapshot.profile.version(), snapshot.level.level),
            Some(data),
        ),
        Err(error) => CommandResult::failure("apply", "serialization", error.to_string(), 1),
    }
}

fn parse_update(mode: UpdateMode, payload: &Value) -> Result<ParsedUpdate, prosper_core::DomainError> {
    match mode {
        UpdateMode::Absolute => AbsoluteUpdate::from_json(payload).map(ParsedUpdate::Absolute),
        UpdateMode::Delta => DeltaUpdate::from_json(payload).map(ParsedUpdate::Delta),
    }
}

fn apply_in_memory(
    engine: &Engine,
    prior: &Profile,
    update: &ParsedUpdate,
    sink: &dyn AuditSink,
    audit: &AuditContext,
) -> Snapshot {
    match update {
        ParsedUpdate::Absolute(update) => engine.apply_absolute_with_audit(prior, update, sink, audit),
        ParsedUpdate::Delta(update) => engine.apply_delta_with_audit(prior, update, sink, audit),
    }
}

fn interface_failure(error: InterfaceError, sink: &InMemoryAuditSink) -> CommandResult {
    let (error_class, exit_code) = match &error {
        InterfaceError::BadRequest { .. } => ("bad_request", EXIT_INPUT),
        InterfaceError::Conflict { .. } => ("conflict", EXIT_CONFLICT),
        InterfaceError::ServiceUnavailable { .. } => ("store_unavailable", EXIT_IO),
        InterfaceError::Internal { .. } => ("internal", 1),
    };
    tracing::warn!(
        event_name = "cli.apply_failed",
        correlation_id = %error.correlation_id(),
        error = %error,
        "apply command failed"
    );
    let data = serde_json::to_value(sink.events()).ok().map(|audit| json!({ "audit": audit }));
    CommandResult::failure_with(
        "apply",
        error_class,
        format!("{} ({error})", error.user_message()),
        exit_code,
        data,
    )
}
