use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use backchannel_core::config::LoadOptions;
use backchannel_core::errors::ApplicationError;
use backchannel_core::events::{EventSink, FilterEvent, TracingEventSink};
use backchannel_core::filter::{FilterAction, InterruptionFilter, Transcript};
use serde::{Deserialize, Serialize};

use crate::commands::{load_filter, CommandResult};

/// One JSON line of a replay file.
#[derive(Debug, Deserialize)]
struct ReplayLine {
    text: String,
    agent_speaking: bool,
    #[serde(default)]
    agent_state: Option<String>,
    #[serde(default = "default_is_final")]
    is_final: bool,
}

fn default_is_final() -> bool {
    true
}

#[derive(Debug, Default, Serialize)]
struct ReplaySummary {
    decided: usize,
    skipped_partial: usize,
    allowed: usize,
    filtered: usize,
    pending: usize,
}

/// Prints one decision per final transcript, then a summary payload.
pub fn run(options: &LoadOptions, path: &Path) -> CommandResult {
    let filter = match load_filter(options) {
        Ok((_, filter)) => filter,
        Err(error) => return CommandResult::from_error("replay", &error),
    };

    match replay_file(&filter, path) {
        Ok((lines, summary)) => {
            let message = format!(
                "replayed {} transcripts ({} filtered, {} allowed, {} partial skipped)",
                summary.decided, summary.filtered, summary.allowed, summary.skipped_partial
            );
            let data = serde_json::to_value(&summary).ok();
            let result = CommandResult::success_with_data("replay", message, data);
            let mut output = lines;
            output.push(result.output);
            CommandResult { exit_code: result.exit_code, output: output.join("\n") }
        }
        Err(error) => {
            let error = ApplicationError::Input(format!("{error:#}"));
            CommandResult::from_error("replay", &error)
        }
    }
}

fn replay_file(filter: &InterruptionFilter, path: &Path) -> Result<(Vec<String>, ReplaySummary)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read replay file `{}`", path.display()))?;

    let session_id = path.display().to_string();
    let sink = filter.config().emit_events.then_some(TracingEventSink);
    let mut lines = Vec::new();
    let mut summary = ReplaySummary::default();

    for (index, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: ReplayLine = serde_json::from_str(line)
            .with_context(|| format!("line {}: not a transcript record", index + 1))?;

        if !entry.is_final {
            summary.skipped_partial += 1;
            continue;
        }

        let transcript = Transcript {
            text: entry.text,
            agent_speaking: entry.agent_speaking,
            agent_state: entry.agent_state,
        };
        let decision = filter.evaluate(&transcript);
        if let Some(sink) = &sink {
            sink.emit(FilterEvent::from_decision(
                session_id.as_str(),
                transcript.text.as_str(),
                transcript.agent_speaking,
                &decision,
            ));
        }

        summary.decided += 1;
        match decision.action() {
            FilterAction::Filter => summary.filtered += 1,
            FilterAction::Allow => summary.allowed += 1,
            FilterAction::Pending => summary.pending += 1,
        }

        let record = serde_json::json!({
            "line": index + 1,
            "transcript": transcript,
            "decision": decision,
        });
        lines.push(record.to_string());
    }

    Ok((lines, summary))
}
