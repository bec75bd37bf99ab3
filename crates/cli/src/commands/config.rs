use std::env;
use std::fs;
use std::path::Path;

use backchannel_core::config::{resolve_config_path, AppConfig, LoadOptions, LogFormat};
use backchannel_core::errors::ApplicationError;
use toml::Value;

use crate::commands::CommandResult;

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_error("config", &ApplicationError::from(error)),
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let filter = &config.filter;
    let lines = [
        "effective config (source precedence: env > file > default):".to_string(),
        render_line(
            "filter.enabled",
            &filter.enabled.to_string(),
            source("filter.enabled", &["BACKCHANNEL_FILTER_ENABLED"]),
        ),
        render_line(
            "filter.ignore_list",
            &format!("{} phrases", filter.ignore_list.len()),
            source("filter.ignore_list", &["BACKCHANNEL_FILTER_IGNORE_LIST"]),
        ),
        render_line(
            "filter.extra_ignore",
            &render_list(&filter.extra_ignore),
            source("filter.extra_ignore", &["BACKCHANNEL_FILTER_EXTRA_IGNORE"]),
        ),
        render_line(
            "filter.case_sensitive",
            &filter.case_sensitive.to_string(),
            source("filter.case_sensitive", &["BACKCHANNEL_FILTER_CASE_SENSITIVE"]),
        ),
        render_line(
            "filter.buffer_time_secs",
            &filter.buffer_time_secs.to_string(),
            source("filter.buffer_time_secs", &["BACKCHANNEL_FILTER_BUFFER_TIME_SECS"]),
        ),
        render_line(
            "filter.emit_events",
            &filter.emit_events.to_string(),
            source("filter.emit_events", &["BACKCHANNEL_FILTER_EMIT_EVENTS"]),
        ),
        render_line(
            "logging.level",
            &config.logging.level,
            source("logging.level", &["BACKCHANNEL_LOGGING_LEVEL", "BACKCHANNEL_LOG_LEVEL"]),
        ),
        render_line(
            "logging.format",
            format_name(config.logging.format),
            source("logging.format", &["BACKCHANNEL_LOGGING_FORMAT", "BACKCHANNEL_LOG_FORMAT"]),
        ),
    ];

    CommandResult { exit_code: 0, output: lines.join("\n") }
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
    if let Some(env_key) = env_keys.iter().find(|key| env_is_set(key)) {
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

/// Blank values are ignored by the loader, so they do not count as a source.
fn env_is_set(key: &str) -> bool {
    env::var(key).is_ok_and(|value| !value.trim().is_empty())
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

fn render_list(values: &[String]) -> String {
    if values.is_empty() {
        return "<none>".to_string();
    }
    format!("[{}]", values.join(", "))
}

fn format_name(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    }
}
