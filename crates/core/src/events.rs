use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::{FilterAction, FilterDecision};

/// Record of one filter decision, emitted when `emit_events` is on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterEvent {
    pub event_id: String,
    pub session_id: String,
    pub transcript: String,
    pub agent_speaking: bool,
    pub action: FilterAction,
    pub reason: String,
    pub confidence: f32,
    pub rule: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl FilterEvent {
    pub fn from_decision(
        session_id: impl Into<String>,
        transcript: impl Into<String>,
        agent_speaking: bool,
        decision: &FilterDecision,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            transcript: transcript.into(),
            agent_speaking,
            action: decision.action(),
            reason: decision.reason().to_string(),
            confidence: decision.confidence(),
            rule: decision.rule().map(str::to_string),
            occurred_at: Utc::now(),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: FilterEvent);
}

#[derive(Clone, Default)]
pub struct InMemoryEventSink {
    events: Arc<Mutex<Vec<FilterEvent>>>,
}

impl InMemoryEventSink {
    pub fn events(&self) -> Vec<FilterEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for InMemoryEventSink {
    fn emit(&self, event: FilterEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Forwards events to the `tracing` subscriber at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: FilterEvent) {
        tracing::info!(
            event_name = "filter.event",
            event_id = %event.event_id,
            session_id = %event.session_id,
            action = event.action.as_str(),
            rule = event.rule.as_deref().unwrap_or("unknown"),
            confidence = event.confidence,
            agent_speaking = event.agent_speaking,
            "{}",
            event.reason
        );
    }
}
