use backchannel_core::config::{AppConfig, LoadOptions};
use backchannel_core::filter::{FilterAction, InterruptionFilter, Transcript};
use serde::Serialize;

use crate::commands::CommandResult;

const COMMAND_PROBE: &str = "wait, please stop there";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

struct SmokeScenario {
    label: &'static str,
    transcript: Transcript,
    expected: FilterAction,
}

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Fail { 2 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    let loaded = AppConfig::load(options.clone())
        .and_then(|config| config.filter_config())
        .map_err(|error| error.to_string())
        .and_then(|filter_config| {
            InterruptionFilter::new(filter_config).map_err(|error| error.to_string())
        });

    match loaded {
        Ok(filter) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_ignore_vocabulary(&filter));
            checks.push(check_decision_smoke(&filter));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error,
            });
            for name in ["ignore_vocabulary", "decision_smoke"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_fail = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_fail { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_fail {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_ignore_vocabulary(filter: &InterruptionFilter) -> DoctorCheck {
    let configured = filter.config().ignore_list.len();
    let compiled = filter.vocabulary().len();

    if !filter.is_enabled() {
        return DoctorCheck {
            name: "ignore_vocabulary",
            status: CheckStatus::Skipped,
            details: "filtering is disabled".to_string(),
        };
    }

    if compiled == 0 {
        return DoctorCheck {
            name: "ignore_vocabulary",
            status: CheckStatus::Fail,
            details: format!("none of the {configured} configured phrases has any words"),
        };
    }

    DoctorCheck {
        name: "ignore_vocabulary",
        status: CheckStatus::Pass,
        details: format!("{compiled} distinct phrases compiled from {configured} entries"),
    }
}

fn check_decision_smoke(filter: &InterruptionFilter) -> DoctorCheck {
    if !filter.is_enabled() {
        return DoctorCheck {
            name: "decision_smoke",
            status: CheckStatus::Skipped,
            details: "filtering is disabled".to_string(),
        };
    }

    let scenarios = smoke_scenarios(filter);
    let failures: Vec<String> = scenarios
        .iter()
        .filter_map(|scenario| {
            let decision = filter.evaluate(&scenario.transcript);
            (decision.action() != scenario.expected).then(|| {
                format!(
                    "{} expected {} got {} ({})",
                    scenario.label,
                    scenario.expected,
                    decision.action(),
                    decision.reason()
                )
            })
        })
        .collect();

    if failures.is_empty() {
        DoctorCheck {
            name: "decision_smoke",
            status: CheckStatus::Pass,
            details: format!("{} scenarios matched", scenarios.len()),
        }
    } else {
        DoctorCheck { name: "decision_smoke", status: CheckStatus::Fail, details: failures.join("; ") }
    }
}

fn smoke_scenarios(filter: &InterruptionFilter) -> Vec<SmokeScenario> {
    let mut scenarios = vec![SmokeScenario {
        label: "silence_while_speaking",
        transcript: Transcript::new("", true),
        expected: FilterAction::Allow,
    }];

    let backchannel =
        filter.config().ignore_list.phrases().iter().find(|phrase| filter.is_ignore_list_only(phrase));
    if let Some(phrase) = backchannel {
        scenarios.push(SmokeScenario {
            label: "backchannel_while_speaking",
            transcript: Transcript::new(phrase.as_str(), true),
            expected: FilterAction::Filter,
        });
        scenarios.push(SmokeScenario {
            label: "backchannel_while_listening",
            transcript: Transcript::new(phrase.as_str(), false),
            expected: FilterAction::Allow,
        });
    }

    if !filter.is_ignore_list_only(COMMAND_PROBE) {
        scenarios.push(SmokeScenario {
            label: "command_while_speaking",
            transcript: Transcript::new(COMMAND_PROBE, true),
            expected: FilterAction::Allow,
        });
    }

    scenarios
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
