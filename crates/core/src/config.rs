use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::{FilterConfig, FilterConfigError, IgnoreList, DEFAULT_BUFFER_TIME_SECS};

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["backchannel.toml", "config/backchannel.toml"];

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub filter: FilterSettings,
    pub logging: LoggingConfig,
}

/// File- and env-loadable counterpart of [`FilterConfig`]. Custom policies
/// are code, so they are attached after loading.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterSettings {
    pub enabled: bool,
    pub ignore_list: IgnoreList,
    pub extra_ignore: Vec<String>,
    pub case_sensitive: bool,
    pub buffer_time_secs: f64,
    pub emit_events: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
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
    pub enabled: Option<bool>,
    pub case_sensitive: Option<bool>,
    pub buffer_time_secs: Option<f64>,
    pub ignore_list: Option<Vec<String>>,
    pub extra_ignore: Vec<String>,
    pub emit_events: Option<bool>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
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
    #[error(transparent)]
    Filter(#[from] FilterConfigError),
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ignore_list: IgnoreList::default(),
            extra_ignore: Vec::new(),
            case_sensitive: false,
            buffer_time_secs: DEFAULT_BUFFER_TIME_SECS,
            emit_events: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { filter: FilterSettings::default(), logging: LoggingConfig::default() }
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

impl FilterSettings {
    /// Builds and validates the engine config described by these settings.
    pub fn to_filter_config(&self) -> Result<FilterConfig, FilterConfigError> {
        let mut ignore_list = self.ignore_list.clone();
        ignore_list.extend(self.extra_ignore.iter().cloned());

        let mut config = FilterConfig {
            enabled: self.enabled,
            ignore_list,
            case_sensitive: self.case_sensitive,
            buffer_time: self.buffer_time_secs,
            custom_policy: None,
            emit_events: self.emit_events,
        };
        config.validate()?;
        Ok(config)
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn filter_config(&self) -> Result<FilterConfig, ConfigError> {
        Ok(self.filter.to_filter_config()?)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(filter) = patch.filter {
            if let Some(enabled) = filter.enabled {
                self.filter.enabled = enabled;
            }
            if let Some(ignore_list) = filter.ignore_list {
                self.filter.ignore_list = IgnoreList::new(ignore_list);
            }
            if let Some(extra_ignore) = filter.extra_ignore {
                self.filter.extra_ignore = extra_ignore;
            }
            if let Some(case_sensitive) = filter.case_sensitive {
                self.filter.case_sensitive = case_sensitive;
            }
            if let Some(buffer_time_secs) = filter.buffer_time_secs {
                self.filter.buffer_time_secs = buffer_time_secs;
            }
            if let Some(emit_events) = filter.emit_events {
                self.filter.emit_events = emit_events;
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
        if let Some(value) = read_env("BACKCHANNEL_FILTER_ENABLED") {
            self.filter.enabled = parse_bool("BACKCHANNEL_FILTER_ENABLED", &value)?;
        }
        if let Some(value) = read_env("BACKCHANNEL_FILTER_IGNORE_LIST") {
            self.filter.ignore_list = IgnoreList::new(split_list(&value));
        }
        if let Some(value) = read_env("BACKCHANNEL_FILTER_EXTRA_IGNORE") {
            self.filter.extra_ignore = split_list(&value);
        }
        if let Some(value) = read_env("BACKCHANNEL_FILTER_CASE_SENSITIVE") {
            self.filter.case_sensitive = parse_bool("BACKCHANNEL_FILTER_CASE_SENSITIVE", &value)?;
        }
        if let Some(value) = read_env("BACKCHANNEL_FILTER_BUFFER_TIME_SECS") {
            self.filter.buffer_time_secs =
                parse_f64("BACKCHANNEL_FILTER_BUFFER_TIME_SECS", &value)?;
        }
        if let Some(value) = read_env("BACKCHANNEL_FILTER_EMIT_EVENTS") {
            self.filter.emit_events = parse_bool("BACKCHANNEL_FILTER_EMIT_EVENTS", &value)?;
        }

        let log_level =
            read_env("BACKCHANNEL_LOGGING_LEVEL").or_else(|| read_env("BACKCHANNEL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BACKCHANNEL_LOGGING_FORMAT").or_else(|| read_env("BACKCHANNEL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(enabled) = overrides.enabled {
            self.filter.enabled = enabled;
        }
        if let Some(case_sensitive) = overrides.case_sensitive {
            self.filter.case_sensitive = case_sensitive;
        }
        if let Some(buffer_time_secs) = overrides.buffer_time_secs {
            self.filter.buffer_time_secs = buffer_time_secs;
        }
        if let Some(ignore_list) = overrides.ignore_list {
            self.filter.ignore_list = IgnoreList::new(ignore_list);
        }
        if !overrides.extra_ignore.is_empty() {
            self.filter.extra_ignore.extend(overrides.extra_ignore);
        }
        if let Some(emit_events) = overrides.emit_events {
            self.filter.emit_events = emit_events;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.filter.to_filter_config()?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Returns the config file `load` would read, if any exists.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
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

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    filter: Option<FilterPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct FilterPatch {
    enabled: Option<bool>,
    ignore_list: Option<Vec<String>>,
    extra_ignore: Option<Vec<String>>,
    case_sensitive: Option<bool>,
    buffer_time_secs: Option<f64>,
    emit_events: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
