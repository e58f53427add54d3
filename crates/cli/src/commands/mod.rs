pub mod apply;
pub mod config;
pub mod evaluate;
pub mod scenarios;

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::Context;
use prosper_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use prosper_core::{ApplicationError, AuditEvent, Engine, EngineContext, Snapshot};
use serde::Serialize;
use serde_json::Value;

use crate::GlobalArgs;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_CONFLICT: u8 = 4;
pub const EXIT_IO: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with(command, message, None)
    }

    pub fn success_with(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with(command, error_class, message, exit_code, None)
    }

    pub fn failure_with(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn text(output: String) -> Self {
        Self { exit_code: 0, output }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Config file plus env, with `--year` taking precedence over both.
pub fn load_config(global: &GlobalArgs) -> Result<AppConfig, ApplicationError> {
    let config = AppConfig::load(LoadOptions {
        config_path: global.config.clone(),
        require_file: global.config.is_some(),
        overrides: ConfigOverrides { reference_year: global.year, ..ConfigOverrides::default() },
    })?;
    Ok(config)
}

pub fn engine_for(config: &AppConfig) -> Engine {
    Engine::new(EngineContext::from_settings(config.engine.clone()))
}

pub fn read_json(path: &Path) -> anyhow::Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read `{}`", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("`{}` is not valid JSON", path.display()))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("could not serialize output")?;
    fs::write(path, rendered + "\n")
        .with_context(|| format!("could not write `{}`", path.display()))
}

/// Snapshot JSON with the audit trail of the request under `audit`.
pub fn snapshot_payload(snapshot: &Snapshot, events: &[AuditEvent]) -> serde_json::Result<Value> {
    let mut data = serde_json::to_value(snapshot)?;
    if let Value::Object(fields) = &mut data {
        fields.insert("audit".to_owned(), serde_json::to_value(events)?);
    }
    Ok(data)
}

pub fn correlation_id() -> String {
    format!("cli-{}", uuid::Uuid::new_v4())
}

/// Human summary of a snapshot.
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let level = &snapshot.level;
    let _ = writeln!(out, "level: {} ({})", level.level, level.label);
    for reason in &level.reasons {
        let _ = writeln!(out, "  capped: {reason}");
    }
    for blocker in &level.blockers {
        let _ = writeln!(out, "  next tier needs: {blocker}");
    }

    let kpis = &snapshot.kpis;
    let _ = writeln!(out, "kpis:");
    for (label, value) in [
        ("savings rate", kpis.sr),
        ("emergency fund months", kpis.ef_months),
        ("housing ratio", kpis.hr),
        ("debt servicing", kpis.dsr_total),
        ("liquid / net worth", kpis.lanw),
        ("retirement readiness", kpis.rrr),
    ] {
        let rendered = value.map_or_else(|| "unknown".to_owned(), |value| format!("{value:.2}"));
        let _ = writeln!(out, "  {label}: {rendered}");
    }

    if snapshot.recommendations.is_empty() {
        let _ = writeln!(out, "next actions: none");
    } else {
        let _ = writeln!(out, "next actions:");
        for (index, recommendation) in snapshot.recommendations.iter().enumerate() {
            let _ = writeln!(out, "  {}. {} ({})", index + 1, recommendation.title, recommendation.why);
        }
    }

    for note in &snapshot.merge_notes {
        let _ = writeln!(out, "note: {note}");
    }
    out.trim_end().to_owned()
}
