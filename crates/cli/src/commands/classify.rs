use backchannel_core::config::LoadOptions;

use crate::commands::{load_filter, CommandResult};

pub fn run(options: &LoadOptions, text: &str, speaking: bool, state: Option<&str>) -> CommandResult {
    let filter = match load_filter(options) {
        Ok((_, filter)) => filter,
        Err(error) => return CommandResult::from_error("classify", &error),
    };

    let decision = filter.decide(text, speaking, state);
    let message = format!("{}: {}", decision.action(), decision.reason());

    match serde_json::to_value(&decision) {
        Ok(data) => CommandResult::success_with_data("classify", message, Some(data)),
        Err(error) => CommandResult::failure(
            "classify",
            "serialization",
            format!("failed to encode decision: {error}"),
            1,
        ),
    }
}
