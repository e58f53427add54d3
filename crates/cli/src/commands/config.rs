use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;

use super::load_config;
use crate::GlobalArgs;

pub fn run(global: &GlobalArgs) -> String {
    let config = match load_config(global) {
        Ok(config) => config,
        Err(error) => return error.to_string(),
    };

    let config_file_path = detect_config_path(global.config.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];

    lines.push(render_line(
        "engine.growth_real",
        &config.engine.growth_real.to_string(),
        source("engine.growth_real", &["PROSPER_ENGINE_GROWTH_REAL"]),
    ));
    lines.push(render_line(
        "engine.safe_withdrawal_rate",
        &config.engine.safe_withdrawal_rate.to_string(),
        source("engine.safe_withdrawal_rate", &["PROSPER_ENGINE_SAFE_WITHDRAWAL_RATE"]),
    ));
    lines.push(render_line(
        "engine.recommendation_limit",
        &config.engine.recommendation_limit.to_string(),
        source("engine.recommendation_limit", &["PROSPER_ENGINE_RECOMMENDATION_LIMIT"]),
    ));

    let reference_year = config
        .engine
        .reference_year
        .map_or_else(|| "<current year>".to_string(), |year| year.to_string());
    let year_source = if global.year.is_some() {
        "flag (--year)".to_string()
    } else {
        source("engine.reference_year", &["PROSPER_ENGINE_REFERENCE_YEAR"])
    };
    lines.push(render_line("engine.reference_year", &reference_year, year_source));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source("logging.level", &["PROSPER_LOGGING_LEVEL", "PROSPER_LOG_LEVEL"]),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format).to_ascii_lowercase(),
        source("logging.format", &["PROSPER_LOGGING_FORMAT", "PROSPER_LOG_FORMAT"]),
    ));

    lines.join("\n")
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from("prosper.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/prosper.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
