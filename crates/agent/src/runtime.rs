use anyhow::Result;
use async_trait::async_trait;
use backchannel_core::filter::FilterDecision;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::gate::{GateOutcome, InterruptionGate, TranscriptEvent};

/// Input to a session loop, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    SpeechStarted,
    SpeechEnded,
    Transcript(TranscriptEvent),
}

/// Acts on gate outcomes, e.g. by stopping or continuing synthesis.
#[async_trait]
pub trait DecisionConsumer: Send + Sync {
    /// The user genuinely interrupted; ongoing output should stop.
    async fn on_interrupt(&self, transcript: &str, decision: &FilterDecision) -> Result<()>;

    /// Backchanneling; ongoing output must continue.
    async fn on_filtered(&self, transcript: &str, decision: &FilterDecision) -> Result<()> {
        let _ = (transcript, decision);
        Ok(())
    }

    /// Input arrived while the agent was silent.
    async fn on_user_turn(&self, transcript: &str, decision: &FilterDecision) -> Result<()>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub ignored: usize,
    pub filtered: usize,
    pub interrupts: usize,
    pub user_turns: usize,
}

impl SessionSummary {
    fn record(&mut self, outcome: &GateOutcome) {
        match outcome {
            GateOutcome::Ignored => self.ignored += 1,
            GateOutcome::Filtered(_) => self.filtered += 1,
            GateOutcome::Interrupt(_) => self.interrupts += 1,
            GateOutcome::UserTurn(_) => self.user_turns += 1,
        }
    }
}

/// Drives one session until the producer drops its sender.
///
/// Speech boundaries update the gate's speaking flag before the next
/// transcript is judged. An interrupt also clears the flag, since the
/// consumer is expected to stop output.
pub async fn run_session<C>(
    gate: &InterruptionGate,
    mut events: mpsc::Receiver<SessionEvent>,
    consumer: &C,
) -> Result<SessionSummary>
where
    C: DecisionConsumer + ?Sized,
{
    let mut summary = SessionSummary::default();

    while let Some(event) = events.recv().await {
        let transcript = match event {
            SessionEvent::SpeechStarted => {
                gate.speaking().set_speaking(true);
                continue;
            }
            SessionEvent::SpeechEnded => {
                gate.speaking().set_speaking(false);
                continue;
            }
            SessionEvent::Transcript(transcript) => transcript,
        };

        let outcome = gate.handle(&transcript);
        summary.record(&outcome);

        match &outcome {
            GateOutcome::Ignored => {}
            GateOutcome::Filtered(decision) => {
                consumer.on_filtered(&transcript.text, decision).await?;
            }
            GateOutcome::Interrupt(decision) => {
                gate.speaking().set_speaking(false);
                consumer.on_interrupt(&transcript.text, decision).await?;
            }
            GateOutcome::UserTurn(decision) => {
                consumer.on_user_turn(&transcript.text, decision).await?;
            }
        }
    }

    tracing::info!(
        event_name = "agent.session_closed",
        session_id = gate.session_id(),
        filtered = summary.filtered,
        interrupts = summary.interrupts,
        user_turns = summary.user_turns,
        "session event stream closed"
    );

    Ok(summary)
}
