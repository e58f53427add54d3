use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_GROWTH_REAL: f64 = 0.03;
pub const DEFAULT_SAFE_WITHDRAWAL_RATE: f64 = 0.04;
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 2;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub engine: EngineSettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EngineSettings {
    /// Real (after-inflation) annual growth used to project the retirement pot.
    pub growth_real: f64,
    /// Share of the projected pot drawn as income each year in retirement.
    pub safe_withdrawal_rate: f64,
    pub recommendation_limit: usize,
    /// Calendar year used for age arithmetic. `None` means the current year.
    pub reference_year: Option<i32>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            growth_real: DEFAULT_GROWTH_REAL,
            safe_withdrawal_rate: DEFAULT_SAFE_WITHDRAWAL_RATE,
            recommendation_limit: DEFAULT_RECOMMENDATION_LIMIT,
            reference_year: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub growth_real: Option<f64>,
    pub safe_withdrawal_rate: Option<f64>,
    pub recommendation_limit: Option<usize>,
    pub reference_year: Option<i32>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("prosper.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(engine) = patch.engine {
            if let Some(growth_real) = engine.growth_real {
                self.engine.growth_real = growth_real;
            }
            if let Some(safe_withdrawal_rate) = engine.safe_withdrawal_rate {
                self.engine.safe_withdrawal_rate = safe_withdrawal_rate;
            }
            if let Some(recommendation_limit) = engine.recommendation_limit {
                self.engine.recommendation_limit = recommendation_limit;
            }
            if let Some(reference_year) = engine.reference_year {
                self.engine.reference_year = Some(reference_year);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PROSPER_ENGINE_GROWTH_REAL") {
            self.engine.growth_real = parse_f64("PROSPER_ENGINE_GROWTH_REAL", &value)?;
        }
        if let Some(value) = read_env("PROSPER_ENGINE_SAFE_WITHDRAWAL_RATE") {
            self.engine.safe_withdrawal_rate =
                parse_f64("PROSPER_ENGINE_SAFE_WITHDRAWAL_RATE", &value)?;
        }
        if let Some(value) = read_env("PROSPER_ENGINE_RECOMMENDATION_LIMIT") {
            self.engine.recommendation_limit =
                parse_usize("PROSPER_ENGINE_RECOMMENDATION_LIMIT", &value)?;
        }
        if let Some(value) = read_env("PROSPER_ENGINE_REFERENCE_YEAR") {
            self.engine.reference_year =
                Some(parse_i32("PROSPER_ENGINE_REFERENCE_YEAR", &value)?);
        }

        let log_level =
            read_env("PROSPER_LOGGING_LEVEL").or_else(|| read_env("PROSPER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("PROSPER_LOGGING_FORMAT").or_else(|| read_env("PROSPER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(growth_real) = overrides.growth_real {
            self.engine.growth_real = growth_real;
        }
        if let Some(safe_withdrawal_rate) = overrides.safe_withdrawal_rate {
            self.engine.safe_withdrawal_rate = safe_withdrawal_rate;
        }
        if let Some(recommendation_limit) = overrides.recommendation_limit {
            self.engine.recommendation_limit = recommendation_limit;
        }
        if let Some(reference_year) = overrides.reference_year {
            self.engine.reference_year = Some(reference_year);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_engine(&self.engine)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("prosper.toml"), PathBuf::from("config/prosper.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_engine(engine: &EngineSettings) -> Result<(), ConfigError> {
    if !engine.growth_real.is_finite() || engine.growth_real <= -0.5 || engine.growth_real > 0.5 {
        return Err(ConfigError::Validation(
            "engine.growth_real must be a finite rate in range (-0.5, 0.5]".to_string(),
        ));
    }

    if !engine.safe_withdrawal_rate.is_finite()
        || engine.safe_withdrawal_rate <= 0.0
        || engine.safe_withdrawal_rate > 0.2
    {
        return Err(ConfigError::Validation(
            "engine.safe_withdrawal_rate must be in range (0, 0.2]".to_string(),
        ));
    }

    if engine.recommendation_limit == 0 {
        return Err(ConfigError::Validation(
            "engine.recommendation_limit must be greater than zero".to_string(),
        ));
    }

    if let Some(year) = engine.reference_year {
        if !(1900..=2100).contains(&year) {
            return Err(ConfigError::Validation(
                "engine.reference_year must be in range 1900..=2100".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i32(key: &str, value: &str) -> Result<i32, ConfigError> {
    value.trim().parse::<i32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    engine: Option<EnginePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EnginePatch {
    growth_real: Option<f64>,
    safe_withdrawal_rate: Option<f64>,
    recommendation_limit: Option<usize>,
    reference_year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const ENGINE_VARS: &[&str] = &[
        "PROSPER_ENGINE_GROWTH_REAL",
        "PROSPER_ENGINE_SAFE_WITHDRAWAL_RATE",
        "PROSPER_ENGINE_RECOMMENDATION_LIMIT",
        "PROSPER_ENGINE_REFERENCE_YEAR",
        "PROSPER_LOGGING_LEVEL",
        "PROSPER_LOG_LEVEL",
        "PROSPER_LOGGING_FORMAT",
        "PROSPER_LOG_FORMAT",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_documented_engine_constants() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENGINE_VARS);

        let config = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure((config.engine.growth_real - 0.03).abs() < 1e-12, "growth default is 3%")?;
        ensure(
            (config.engine.safe_withdrawal_rate - 0.04).abs() < 1e-12,
            "withdrawal default is 4%",
        )?;
        ensure(config.engine.recommendation_limit == 2, "two recommendations by default")?;
        ensure(config.engine.reference_year.is_none(), "reference year follows the clock")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENGINE_VARS);
        env::set_var("TEST_PROSPER_LIMIT", "3");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("prosper.toml");
            fs::write(
                &path,
                r#"
[engine]
recommendation_limit = ${TEST_PROSPER_LIMIT}
growth_real = 0.025
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.engine.recommendation_limit == 3, "limit should come from env var")?;
            ensure(
                (config.engine.growth_real - 0.025).abs() < 1e-12,
                "growth should come from the file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_PROSPER_LIMIT"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENGINE_VARS);

        env::set_var("PROSPER_LOG_LEVEL", "warn");
        env::set_var("PROSPER_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(ENGINE_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENGINE_VARS);

        env::set_var("PROSPER_ENGINE_REFERENCE_YEAR", "2030");
        env::set_var("PROSPER_ENGINE_SAFE_WITHDRAWAL_RATE", "0.035");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("prosper.toml");
            fs::write(
                &path,
                r#"
[engine]
reference_year = 2026
safe_withdrawal_rate = 0.05
recommendation_limit = 4

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    recommendation_limit: Some(1),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.engine.recommendation_limit == 1, "override limit should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.engine.reference_year == Some(2030), "env year should beat the file")?;
            ensure(
                (config.engine.safe_withdrawal_rate - 0.035).abs() < 1e-12,
                "env withdrawal rate should beat the file",
            )?;
            Ok(())
        })();

        clear_vars(ENGINE_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENGINE_VARS);

        env::set_var("PROSPER_ENGINE_RECOMMENDATION_LIMIT", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("recommendation_limit")
            );
            ensure(has_message, "validation failure should mention recommendation_limit")
        })();

        clear_vars(ENGINE_VARS);
        result
    }

    #[test]
    fn unparsable_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ENGINE_VARS);

        env::set_var("PROSPER_ENGINE_GROWTH_REAL", "three percent");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "PROSPER_ENGINE_GROWTH_REAL", "error should name the variable")
            }
            other => Err(format!("expected invalid override error, got {other:?}")),
        };

        clear_vars(ENGINE_VARS);
        result
    }
}
