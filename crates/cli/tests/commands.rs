use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use prosper_cli::commands::{apply, config, evaluate, scenarios};
use prosper_cli::{Cli, GlobalArgs, UpdateMode};
use prosper_core::{Profile, Scenario, SlotKey};
use serde_json::{json, Value};
use tempfile::TempDir;

fn workspace() -> (TempDir, GlobalArgs) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_path = dir.path().join("prosper.toml");
    fs::write(&config_path, "[engine]\nreference_year = 2026\nrecommendation_limit = 2\n")
        .expect("write config");
    let global = GlobalArgs { config: Some(config_path), year: None };
    (dir, global)
}

fn write(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).expect("render")).expect("write");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be JSON")
}

fn apply_args(update: PathBuf, mode: UpdateMode) -> apply::ApplyArgs {
    apply::ApplyArgs {
        profile: None,
        update,
        mode,
        out: None,
        store: None,
        household: None,
        json: true,
    }
}

#[test]
fn evaluate_reports_snapshot_for_profile_file() {
    let (dir, global) = workspace();
    let profile = serde_json::to_value(Scenario::RenterStarter.profile(2026)).expect("profile");
    let path = write(dir.path(), "household.json", &profile);

    let result = evaluate::run(&global, &path, true);
    assert_eq!(result.exit_code, 0, "{}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "evaluate");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["data"]["level"]["level"], "L4");
    assert_eq!(payload["data"]["recommendations"].as_array().map(Vec::len), Some(2));
    assert_eq!(payload["data"]["audit"][0]["category"], "Evaluation");
    assert_eq!(payload["data"]["audit"][0]["metadata"]["level"], "L4");
}

#[test]
fn evaluate_renders_human_summary_by_default() {
    let (dir, global) = workspace();
    let profile = serde_json::to_value(Scenario::HomeownerBuffer.profile(2026)).expect("profile");
    let path = write(dir.path(), "household.json", &profile);

    let result = evaluate::run(&global, &path, false);
    assert_eq!(result.exit_code, 0);
    assert!(result.output.starts_with("level: L5"), "{}", result.output);
    assert!(result.output.contains("next actions:"));
}

#[test]
fn evaluate_rejects_unreadable_profile() {
    let (dir, global) = workspace();
    let result = evaluate::run(&global, &dir.path().join("missing.json"), true);

    assert_eq!(result.exit_code, 3);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "invalid_profile");
}

#[test]
fn apply_absolute_writes_merged_profile() {
    let (dir, global) = workspace();
    let update = write(
        dir.path(),
        "update.json",
        &json!({"slots": {"savings": "£1,200", "rent": 950}, "confidences": {"savings": "high"}}),
    );
    let out = dir.path().join("merged.json");

    let mut args = apply_args(update, UpdateMode::Absolute);
    args.out = Some(out.clone());
    let result = apply::run(&global, &args);
    assert_eq!(result.exit_code, 0, "{}", result.output);

    let merged: Profile =
        serde_json::from_str(&fs::read_to_string(out).expect("read merged")).expect("profile");
    assert_eq!(merged.version(), 1);
    assert_eq!(merged.number(SlotKey::CashLiquidTotal), Some(1200.0));
    assert_eq!(merged.number(SlotKey::RentMonthly), Some(950.0));
}

#[test]
fn apply_delta_commits_through_file_store() {
    let (dir, global) = workspace();
    let store = dir.path().join("store");
    let seed = write(dir.path(), "seed.json", &json!({"cash": 1000, "investments": 500}));
    let delta = write(dir.path(), "delta.json", &json!({"deltas": {"cash": -300, "investments": 300}}));

    let mut seed_args = apply_args(seed, UpdateMode::Absolute);
    seed_args.store = Some(store.clone());
    seed_args.household = Some("hh-1".to_owned());
    assert_eq!(apply::run(&global, &seed_args).exit_code, 0);

    let mut delta_args = apply_args(delta, UpdateMode::Delta);
    delta_args.store = Some(store.clone());
    delta_args.household = Some("hh-1".to_owned());
    let result = apply::run(&global, &delta_args);
    assert_eq!(result.exit_code, 0, "{}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["profile"]["version"], 2);
    let trail: Vec<(&str, &str)> = payload["data"]["audit"]
        .as_array()
        .expect("audit trail")
        .iter()
        .filter_map(|event| Some((event["category"].as_str()?, event["outcome"].as_str()?)))
        .collect();
    assert_eq!(
        trail,
        vec![("Merge", "Success"), ("Evaluation", "Success"), ("Persistence", "Success")]
    );
    assert_eq!(payload["data"]["audit"][2]["household_id"], "hh-1");

    let stored: Profile =
        serde_json::from_str(&fs::read_to_string(store.join("hh-1.json")).expect("read store"))
            .expect("profile");
    assert_eq!(stored.number(SlotKey::CashLiquidTotal), Some(700.0));
    assert_eq!(stored.number(SlotKey::InvestmentsExHomeTotal), Some(800.0));
}

#[test]
fn apply_rejects_malformed_update() {
    let (dir, global) = workspace();
    let update = write(dir.path(), "update.json", &json!(["not", "an", "object"]));

    let result = apply::run(&global, &apply_args(update, UpdateMode::Delta));
    assert_eq!(result.exit_code, 3);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "invalid_update");
}

#[test]
fn scenarios_report_expected_levels() {
    let (_dir, global) = workspace();
    let result = scenarios::run(&global, None, true);
    assert_eq!(result.exit_code, 0, "{}", result.output);

    let payload = parse_payload(&result.output);
    let levels: Vec<&str> = payload["data"]
        .as_array()
        .expect("scenario list")
        .iter()
        .filter_map(|entry| entry["level"].as_str())
        .collect();
    assert_eq!(levels, vec!["L4", "L5", "L8"]);
    assert!(payload["data"][0]["checklist"].as_array().is_some_and(|items| !items.is_empty()));

    let unknown = scenarios::run(&global, Some("Z"), true);
    assert_eq!(unknown.exit_code, 3);
}

#[test]
fn config_attributes_file_sourced_values() {
    let (_dir, global) = workspace();
    let output = config::run(&global);

    assert!(output.contains("- engine.reference_year = 2026 (source: file ("), "{output}");
    assert!(output.contains("- engine.growth_real = 0.03 (source: default)"), "{output}");
}

#[test]
fn missing_config_file_is_a_configuration_failure() {
    let (dir, _) = workspace();
    let global = GlobalArgs { config: Some(dir.path().join("absent.toml")), year: None };

    let result = scenarios::run(&global, None, true);
    assert_eq!(result.exit_code, 2);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "config_validation");
    assert!(payload["message"].as_str().is_some_and(|message| message.starts_with("configuration failure")));
}

#[test]
fn apply_flags_for_store_and_profile_file_do_not_mix() {
    let household_without_store =
        Cli::try_parse_from(["prosper", "apply", "--update", "u.json", "--household", "hh-1"]);
    assert!(household_without_store.is_err());

    let profile_with_store = Cli::try_parse_from([
        "prosper", "apply", "--update", "u.json", "--profile", "p.json", "--store", "s", "--household", "hh-1",
    ]);
    assert!(profile_with_store.is_err());

    let committed = Cli::try_parse_from([
        "prosper", "apply", "--update", "u.json", "--store", "s", "--household", "hh-1",
    ]);
    assert!(committed.is_ok());
}
