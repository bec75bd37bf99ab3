//! Backchannel-aware interruption filtering.
//!
//! A transcript and the agent's speaking state go in, a [`FilterDecision`]
//! comes out. Everything here is synchronous and allocation-light so it can
//! sit between transcript arrival and a speech-halt action.

pub mod config;
pub mod decision;
pub mod engine;
pub mod ignore_list;
pub mod policy;
pub mod tokenizer;

pub use config::{FilterConfig, FilterConfigError, DEFAULT_BUFFER_TIME_SECS, MAX_BUFFER_TIME_SECS};
pub use decision::{DecisionRule, FilterAction, FilterDecision};
pub use engine::{InterruptionFilter, Transcript};
pub use ignore_list::{IgnoreList, IgnoreVocabulary, DEFAULT_IGNORE_LIST};
pub use policy::{policy_fn, InterruptionPolicy, PolicyError};
pub use tokenizer::tokenize;
