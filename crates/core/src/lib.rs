//! Backchannel-aware interruption filtering for voice agents.
//!
//! The [`filter`] module holds the decision engine: it tells a voice agent
//! whether a listener's utterance ("yeah", "uh-huh") is passive
//! acknowledgement to ignore, or a real interruption ("stop", "wait") that
//! should halt speech. [`config`] loads engine settings from file and
//! environment, and [`events`] records decisions for observability.

pub mod config;
pub mod errors;
pub mod events;
pub mod filter;

pub use config::{AppConfig, ConfigError, ConfigOverrides, FilterSettings, LoadOptions, LogFormat};
pub use errors::ApplicationError;
pub use events::{EventSink, FilterEvent, InMemoryEventSink, TracingEventSink};
pub use filter::{
    policy_fn, FilterAction, FilterConfig, FilterConfigError, FilterDecision, IgnoreList,
    InterruptionFilter, InterruptionPolicy, PolicyError, Transcript, DEFAULT_IGNORE_LIST,
};
