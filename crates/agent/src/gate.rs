use std::sync::Arc;

use backchannel_core::events::{EventSink, FilterEvent};
use backchannel_core::filter::{FilterAction, FilterDecision, InterruptionFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::speaking::{SpeakingState, LISTENING_LABEL, SPEAKING_LABEL};

/// A transcript as delivered by speech recognition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    pub text: String,
    #[serde(default = "default_is_final")]
    pub is_final: bool,
}

fn default_is_final() -> bool {
    true
}

impl TranscriptEvent {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_final: true }
    }

    pub fn partial(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_final: false }
    }
}

/// What the session should do with one transcript.
#[derive(Clone, Debug, PartialEq)]
pub enum GateOutcome {
    /// Partial transcript; decisions are only made on final ones.
    Ignored,
    /// Backchanneling (or a policy veto); keep talking.
    Filtered(FilterDecision),
    /// Real interruption while speaking; stop synthesis.
    Interrupt(FilterDecision),
    /// Agent was silent; handle as a normal user turn.
    UserTurn(FilterDecision),
}

impl GateOutcome {
    pub fn decision(&self) -> Option<&FilterDecision> {
        match self {
            Self::Ignored => None,
            Self::Filtered(decision) | Self::Interrupt(decision) | Self::UserTurn(decision) => {
                Some(decision)
            }
        }
    }

    pub fn outcome_key(&self) -> &'static str {
        match self {
            Self::Ignored => "ignored",
            Self::Filtered(_) => "filtered",
            Self::Interrupt(_) => "interrupt",
            Self::UserTurn(_) => "user_turn",
        }
    }
}

/// Sits between transcript producer and decision consumer for one session.
pub struct InterruptionGate {
    session_id: String,
    filter: Arc<InterruptionFilter>,
    speaking: SpeakingState,
    sink: Option<Arc<dyn EventSink>>,
}

impl InterruptionGate {
    pub fn new(filter: Arc<InterruptionFilter>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            filter,
            speaking: SpeakingState::default(),
            sink: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_speaking_state(mut self, speaking: SpeakingState) -> Self {
        self.speaking = speaking;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn speaking(&self) -> &SpeakingState {
        &self.speaking
    }

    pub fn filter(&self) -> &InterruptionFilter {
        &self.filter
    }

    /// True unless the transcript should be swallowed as backchanneling.
    /// Read-only: no event reaches the sink.
    pub fn should_allow_interruption(&self, transcript: &str) -> bool {
        self.decide(transcript, self.speaking.is_speaking()).action() != FilterAction::Filter
    }

    pub fn handle(&self, event: &TranscriptEvent) -> GateOutcome {
        if !event.is_final {
            return GateOutcome::Ignored;
        }

        let speaking = self.speaking.is_speaking();
        let decision = self.decide(&event.text, speaking);
        self.record(&event.text, speaking, &decision);

        if decision.is_filtered() {
            tracing::info!(
                event_name = "agent.transcript_filtered",
                session_id = %self.session_id,
                transcript = %event.text,
                reason = decision.reason(),
                "filtered backchanneling"
            );
            return GateOutcome::Filtered(decision);
        }

        tracing::info!(
            event_name = "agent.transcript_allowed",
            session_id = %self.session_id,
            transcript = %event.text,
            action = decision.action().as_str(),
            reason = decision.reason(),
            agent_speaking = speaking,
            "allowing input"
        );
        if speaking {
            GateOutcome::Interrupt(decision)
        } else {
            GateOutcome::UserTurn(decision)
        }
    }

    fn decide(&self, transcript: &str, speaking: bool) -> FilterDecision {
        let label = if speaking { SPEAKING_LABEL } else { LISTENING_LABEL };
        self.filter.decide(transcript, speaking, Some(label))
    }

    fn record(&self, transcript: &str, speaking: bool, decision: &FilterDecision) {
        if !self.filter.config().emit_events {
            return;
        }
        if let Some(sink) = &self.sink {
            sink.emit(FilterEvent::from_decision(
                self.session_id.as_str(),
                transcript,
                speaking,
                decision,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use backchannel_core::events::InMemoryEventSink;
    use backchannel_core::filter::{FilterConfig, IgnoreList, InterruptionFilter};

    use super::{GateOutcome, InterruptionGate, TranscriptEvent};

    fn build_gate(emit_events: bool) -> (InterruptionGate, InMemoryEventSink) {
        let filter = InterruptionFilter::new(FilterConfig {
            ignore_list: IgnoreList::from(["yeah", "ok", "uh-huh"]),
            emit_events,
            ..FilterConfig::default()
        })
        .expect("test config should validate");
        let sink = InMemoryEventSink::default();
        let gate = InterruptionGate::new(Arc::new(filter))
            .with_session_id("session-1")
            .with_event_sink(Arc::new(sink.clone()));
        (gate, sink)
    }

    #[test]
    fn partial_transcripts_are_ignored() {
        let (gate, sink) = build_gate(true);
        gate.speaking().set_speaking(true);

        assert_eq!(gate.handle(&TranscriptEvent::partial("stop")), GateOutcome::Ignored);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn backchannel_while_speaking_is_filtered() {
        let (gate, _) = build_gate(true);
        gate.speaking().set_speaking(true);

        let outcome = gate.handle(&TranscriptEvent::final_text("Uh-huh."));
        assert!(matches!(outcome, GateOutcome::Filtered(_)));
        assert!(!gate.should_allow_interruption("yeah"));
    }

    #[test]
    fn command_while_speaking_interrupts() {
        let (gate, _) = build_gate(true);
        gate.speaking().set_speaking(true);

        let outcome = gate.handle(&TranscriptEvent::final_text("wait, actually"));
        assert_eq!(outcome.outcome_key(), "interrupt");
        assert!(gate.should_allow_interruption("ok stop"));
    }

    #[test]
    fn silent_agent_treats_everything_as_user_turn() {
        let (gate, _) = build_gate(true);

        let outcome = gate.handle(&TranscriptEvent::final_text("yeah"));
        assert!(matches!(outcome, GateOutcome::UserTurn(_)));
        assert!(gate.should_allow_interruption("ok"));
    }

    #[test]
    fn events_follow_emit_flag() {
        let (gate, sink) = build_gate(true);
        gate.speaking().set_speaking(true);
        gate.handle(&TranscriptEvent::final_text("yeah"));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id, "session-1");
        assert!(events[0].agent_speaking);

        let (quiet_gate, quiet_sink) = build_gate(false);
        quiet_gate.handle(&TranscriptEvent::final_text("yeah"));
        assert!(quiet_sink.events().is_empty());
    }

    #[test]
    fn allow_query_does_not_record_events() {
        let (gate, sink) = build_gate(true);
        gate.speaking().set_speaking(true);

        assert!(!gate.should_allow_interruption("yeah"));
        assert!(gate.should_allow_interruption("wait"));
        assert!(sink.events().is_empty());

        gate.handle(&TranscriptEvent::final_text("wait"));
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn transcript_events_default_to_final_when_deserialized() {
        let event: TranscriptEvent =
            serde_json::from_str(r#"{"text":"hmm"}"#).expect("event should deserialize");
        assert!(event.is_final);
    }
}
