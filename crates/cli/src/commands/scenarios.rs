use prosper_core::Scenario;
use serde_json::json;

use super::{engine_for, load_config, render_snapshot, CommandResult, EXIT_CONFIG, EXIT_INPUT};
use crate::GlobalArgs;

pub fn run(global: &GlobalArgs, only: Option<&str>, json_output: bool) -> CommandResult {
    let config = match load_config(global) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("scenarios", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };

    let selected: Vec<Scenario> = match only {
        Some(code) => match code.parse::<Scenario>() {
            Ok(scenario) => vec![scenario],
            Err(error) => {
                return CommandResult::failure("scenarios", "unknown_scenario", error.to_string(), EXIT_INPUT)
            }
        },
        None => Scenario::ALL.to_vec(),
    };

    let engine = engine_for(&config);
    let year = engine.context().current_year;
    let results: Vec<_> = selected
        .into_iter()
        .map(|scenario| (scenario, engine.evaluate(&scenario.profile(year))))
        .collect();

    if json_output {
        let data: Vec<_> = results
            .iter()
            .map(|(scenario, snapshot)| {
                json!({
                    "scenario": scenario.code(),
                    "title": scenario.title(),
                    "level": snapshot.level.level,
                    "reasons": snapshot.level.reasons,
                    "blockers": snapshot.level.blockers,
                    "checklist": snapshot.level.checklist,
                    "kpis": snapshot.kpis,
                    "gates": snapshot.gates,
                    "recommendations": snapshot.recommendations,
                })
            })
            .collect();
        return CommandResult::success_with(
            "scenarios",
            format!("evaluated {} scenario(s) for {year}", data.len()),
            Some(data.into()),
        );
    }

    let sections: Vec<String> = results
        .iter()
        .map(|(scenario, snapshot)| format!("== scenario {scenario}\n{}", render_snapshot(snapshot)))
        .collect();
    CommandResult::text(sections.join("\n\n"))
}
