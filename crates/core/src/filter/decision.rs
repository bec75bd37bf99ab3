use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the caller should do with a transcript.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAction {
    /// Treat the transcript as a real interruption or user input.
    Allow,
    /// Drop the transcript; ongoing speech must continue.
    Filter,
    /// Reserved for buffered decisions. Never produced by the current policy.
    Pending,
}

impl FilterAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Filter => "filter",
            Self::Pending => "pending",
        }
    }
}

impl fmt::Display for FilterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which policy rule produced a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    Disabled,
    CustomPolicy,
    AgentNotSpeaking,
    Backchanneling,
    CommandWords,
    DefaultAllow,
}

impl DecisionRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::CustomPolicy => "custom_policy",
            Self::AgentNotSpeaking => "agent_not_speaking",
            Self::Backchanneling => "backchanneling",
            Self::CommandWords => "command_words",
            Self::DefaultAllow => "default_allow",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterDecision {
    action: FilterAction,
    reason: String,
    confidence: f32,
    metadata: BTreeMap<String, Value>,
}

impl FilterDecision {
    /// Builds a decision with confidence 1.0 and no metadata.
    pub fn new(action: FilterAction, reason: impl Into<String>) -> Self {
        Self { action, reason: reason.into(), confidence: 1.0, metadata: BTreeMap::new() }
    }

    pub fn allow(reason: impl Into<String>) -> Self {
        Self::new(FilterAction::Allow, reason)
    }

    pub fn filter(reason: impl Into<String>) -> Self {
        Self::new(FilterAction::Filter, reason)
    }

    /// Confidence is clamped into `[0.0, 1.0]`; NaN becomes 0.0.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub(crate) fn with_rule(self, rule: DecisionRule) -> Self {
        self.with_metadata("rule", rule.as_str())
    }

    pub fn action(&self) -> FilterAction {
        self.action
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    pub fn rule(&self) -> Option<&str> {
        self.metadata.get("rule").and_then(Value::as_str)
    }

    pub fn is_filtered(&self) -> bool {
        self.action == FilterAction::Filter
    }
}
