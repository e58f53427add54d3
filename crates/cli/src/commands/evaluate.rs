use std::path::Path;

use prosper_core::{AuditContext, InMemoryAuditSink, Profile};

use super::{
    correlation_id, engine_for, load_config, read_json, render_snapshot, snapshot_payload,
    CommandResult, EXIT_CONFIG, EXIT_INPUT,
};
use crate::GlobalArgs;

pub fn run(global: &GlobalArgs, profile_path: &Path, json_output: bool) -> CommandResult {
    let config = match load_config(global) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("evaluate", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };

    let profile = match read_json(profile_path).and_then(|raw| {
        serde_json::from_value::<Profile>(raw).map_err(anyhow::Error::from)
    }) {
        Ok(profile) => profile,
        Err(error) => {
            return CommandResult::failure("evaluate", "invalid_profile", format!("{error:#}"), EXIT_INPUT)
        }
    };

    let engine = engine_for(&config);
    let sink = InMemoryAuditSink::default();
    let audit = AuditContext::new(None, correlation_id(), "cli");
    let snapshot = engine.evaluate_with_audit(&profile, &sink, &audit);

    if !json_output {
        return CommandResult::text(render_snapshot(&snapshot));
    }

    match snapshot_payload(&snapshot, &sink.events()) {
        Ok(data) => CommandResult::success_with(
            "evaluate",
            format!("profile v{} is at {}", snapshot.profile.version(), snapshot.level.level),
            Some(data),
        ),
        Err(error) => CommandResult::failure("evaluate", "serialization", error.to_string(), 1),
    }
}
