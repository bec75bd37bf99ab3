pub mod classify;
pub mod config;
pub mod doctor;
pub mod replay;

use backchannel_core::config::{AppConfig, LoadOptions};
use backchannel_core::errors::ApplicationError;
use backchannel_core::filter::InterruptionFilter;
use serde::Serialize;
use serde_json::Value;

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
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            hint: None,
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
        Self::failure_with_hint(command, error_class, message, None, exit_code)
    }

    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        Self::failure_with_hint(
            command,
            error.error_class(),
            error.to_string(),
            Some(error.user_message().to_string()),
            error.exit_code(),
        )
    }

    fn failure_with_hint(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        hint: Option<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            hint,
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Loads config and builds the engine, mapping failures to CLI errors.
pub fn load_filter(
    options: &LoadOptions,
) -> Result<(AppConfig, InterruptionFilter), ApplicationError> {
    let config = AppConfig::load(options.clone())?;
    let filter = InterruptionFilter::new(config.filter_config()?)?;
    Ok((config, filter))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
