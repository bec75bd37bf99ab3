//! Agent-side wiring for the interruption filter.
//!
//! This crate connects the decision engine in `backchannel-core` to a voice
//! session:
//! - tracks whether the agent is currently speaking (`speaking`)
//! - judges final transcripts and drops partial ones (`gate`)
//! - drives a session from an event channel into a `DecisionConsumer`
//!   (`runtime`)
//!
//! # Contract
//!
//! The consumer owns speech output. On `Filtered` it keeps talking, on
//! `Interrupt` it stops, and on `UserTurn` it takes the turn as normal input.

pub mod gate;
pub mod runtime;
pub mod speaking;

pub use gate::{GateOutcome, InterruptionGate, TranscriptEvent};
pub use runtime::{run_session, DecisionConsumer, SessionEvent, SessionSummary};
pub use speaking::SpeakingState;
