use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::config::{FilterConfig, FilterConfigError};
use super::decision::{DecisionRule, FilterDecision};
use super::ignore_list::{IgnoreList, IgnoreVocabulary};
use super::policy::{InterruptionPolicy, PolicyError};
use super::tokenizer::tokenize;

/// One finalized utterance plus the speaking state it arrived in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub agent_speaking: bool,
    #[serde(default)]
    pub agent_state: Option<String>,
}

impl Transcript {
    pub fn new(text: impl Into<String>, agent_speaking: bool) -> Self {
        Self { text: text.into(), agent_speaking, agent_state: None }
    }

    pub fn with_agent_state(mut self, agent_state: impl Into<String>) -> Self {
        self.agent_state = Some(agent_state.into());
        self
    }
}

/// Classifies transcripts as backchanneling or interruptions.
///
/// The engine holds only its validated configuration, so one instance can be
/// shared across tasks behind an `Arc`.
#[derive(Clone)]
pub struct InterruptionFilter {
    config: FilterConfig,
    vocabulary: IgnoreVocabulary,
}

impl Default for InterruptionFilter {
    fn default() -> Self {
        let mut config = FilterConfig::default();
        config.ignore_list.fold_case();
        Self::from_validated(config)
    }
}

impl std::fmt::Debug for InterruptionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptionFilter")
            .field("config", &self.config)
            .field("vocabulary_size", &self.vocabulary.len())
            .finish()
    }
}

impl InterruptionFilter {
    pub fn new(mut config: FilterConfig) -> Result<Self, FilterConfigError> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    /// Factory mirroring the common call shape: a missing ignore list falls
    /// back to the built-in backchanneling phrases.
    pub fn from_parts(
        ignore_list: Option<Vec<String>>,
        custom_policy: Option<Arc<dyn InterruptionPolicy>>,
        enabled: bool,
        case_sensitive: bool,
    ) -> Result<Self, FilterConfigError> {
        Self::new(FilterConfig {
            enabled,
            ignore_list: ignore_list.map(IgnoreList::new).unwrap_or_default(),
            case_sensitive,
            custom_policy,
            ..FilterConfig::default()
        })
    }

    fn from_validated(config: FilterConfig) -> Self {
        let vocabulary = IgnoreVocabulary::compile(&config.ignore_list, config.case_sensitive);

        tracing::debug!(
            event_name = "filter.initialized",
            enabled = config.enabled,
            ignore_list_size = vocabulary.len(),
            case_sensitive = config.case_sensitive,
            custom_policy = config.custom_policy.is_some(),
            "interruption filter initialized"
        );

        Self { config, vocabulary }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn vocabulary(&self) -> &IgnoreVocabulary {
        &self.vocabulary
    }

    fn tokens(&self, transcript: &str) -> Vec<String> {
        tokenize(transcript, self.config.case_sensitive)
    }

    /// True when the transcript has words and all of them are backchanneling.
    pub fn is_ignore_list_only(&self, transcript: &str) -> bool {
        self.vocabulary.covers(&self.tokens(transcript))
    }

    /// True when the transcript has words and at least one is not
    /// backchanneling. Blank input is neither ignore-only nor a command.
    pub fn has_command_words(&self, transcript: &str) -> bool {
        let tokens = self.tokens(transcript);
        !tokens.is_empty() && !self.vocabulary.covers(&tokens)
    }

    pub fn evaluate(&self, transcript: &Transcript) -> FilterDecision {
        self.decide(&transcript.text, transcript.agent_speaking, transcript.agent_state.as_deref())
    }

    pub fn decide(
        &self,
        transcript: &str,
        agent_speaking: bool,
        agent_state: Option<&str>,
    ) -> FilterDecision {
        let decision = self.decide_inner(transcript, agent_speaking, agent_state);

        tracing::trace!(
            event_name = "filter.decision",
            action = decision.action().as_str(),
            rule = decision.rule().unwrap_or("unknown"),
            agent_speaking,
            confidence = decision.confidence(),
            "interruption filter decision"
        );

        decision
    }

    fn decide_inner(
        &self,
        transcript: &str,
        agent_speaking: bool,
        agent_state: Option<&str>,
    ) -> FilterDecision {
        if !self.config.enabled {
            return FilterDecision::allow("Filtering disabled").with_rule(DecisionRule::Disabled);
        }

        if let Some(policy) = &self.config.custom_policy {
            match run_policy(policy.as_ref(), transcript, agent_state) {
                Ok(should_filter) => {
                    let decision = if should_filter {
                        FilterDecision::filter("Custom filter decision")
                    } else {
                        FilterDecision::allow("Custom filter decision")
                    };
                    return decision
                        .with_metadata("custom_filter", true)
                        .with_rule(DecisionRule::CustomPolicy);
                }
                Err(error) => {
                    tracing::error!(
                        event_name = "filter.custom_policy_failed",
                        error = %error,
                        transcription = transcript,
                        "custom filter failed, falling back to built-in rules"
                    );
                }
            }
        }

        if !agent_speaking {
            return FilterDecision::allow("Agent not speaking, processing as user input")
                .with_metadata("agent_speaking", false)
                .with_rule(DecisionRule::AgentNotSpeaking);
        }

        let tokens = self.tokens(transcript);
        if tokens.is_empty() {
            return FilterDecision::allow("Default allow")
                .with_confidence(0.5)
                .with_rule(DecisionRule::DefaultAllow);
        }

        if self.vocabulary.covers(&tokens) {
            return FilterDecision::filter("Backchanneling detected while agent speaking")
                .with_metadata("agent_speaking", true)
                .with_metadata("ignore_list_only", true)
                .with_metadata("transcription", transcript)
                .with_rule(DecisionRule::Backchanneling);
        }

        FilterDecision::allow("Command words detected, allowing interruption")
            .with_metadata("agent_speaking", true)
            .with_metadata("has_command_words", true)
            .with_metadata("transcription", transcript)
            .with_rule(DecisionRule::CommandWords)
    }
}

fn run_policy(
    policy: &dyn InterruptionPolicy,
    transcript: &str,
    agent_state: Option<&str>,
) -> Result<bool, PolicyError> {
    panic::catch_unwind(AssertUnwindSafe(|| policy.should_filter(transcript, agent_state)))
        .unwrap_or_else(|payload| Err(PolicyError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::{InterruptionFilter, Transcript};
    use crate::filter::config::{FilterConfig, FilterConfigError};
    use crate::filter::decision::FilterAction;
    use crate::filter::ignore_list::IgnoreList;
    use crate::filter::policy::{policy_fn, InterruptionPolicy, PolicyError};

    fn filter_with(words: &[&str]) -> InterruptionFilter {
        InterruptionFilter::new(FilterConfig {
            ignore_list: words.iter().copied().collect(),
            ..FilterConfig::default()
        })
        .expect("test config should validate")
    }

    #[test]
    fn default_filter_uses_built_in_list() {
        let filter = InterruptionFilter::default();

        assert!(filter.is_enabled());
        assert!(!filter.config().case_sensitive);
        assert!(!filter.vocabulary().is_empty());
        assert!(filter.is_ignore_list_only("Uh-huh, go on"));
    }

    #[test]
    fn from_parts_defaults_ignore_list_and_validates() {
        let filter = InterruptionFilter::from_parts(None, None, true, false)
            .expect("default parts should validate");
        assert!(filter.is_ignore_list_only("mhm"));

        let custom = InterruptionFilter::from_parts(
            Some(vec!["test".to_string(), "words".to_string()]),
            None,
            true,
            false,
        )
        .expect("custom list should validate");
        assert!(custom.vocabulary().contains_word("test"));
        assert!(custom.vocabulary().contains_word("words"));

        let empty = InterruptionFilter::from_parts(Some(Vec::new()), None, true, false);
        assert_eq!(empty.err(), Some(FilterConfigError::EmptyIgnoreList));
    }

    #[test]
    fn case_insensitive_filter_normalizes_ignore_list() {
        let filter = InterruptionFilter::from_parts(
            Some(vec!["YEAH".to_string(), "Ok".to_string(), "HMM".to_string()]),
            None,
            true,
            false,
        )
        .expect("config should validate");

        assert!(filter.vocabulary().contains_word("yeah"));
        assert!(filter.vocabulary().contains_word("ok"));
        assert!(filter.is_ignore_list_only("HMM"));
    }

    #[test]
    fn case_sensitive_filter_preserves_case() {
        let filter = InterruptionFilter::from_parts(
            Some(vec!["YEAH".to_string(), "Ok".to_string(), "HMM".to_string()]),
            None,
            true,
            true,
        )
        .expect("config should validate");

        assert!(filter.vocabulary().contains_word("YEAH"));
        assert!(filter.is_ignore_list_only("Ok"));
        assert!(!filter.is_ignore_list_only("ok"));
        assert!(filter.has_command_words("yeah"));
    }

    #[test]
    fn ignore_only_detection() {
        let filter = filter_with(&["yeah", "ok", "hmm"]);

        assert!(filter.is_ignore_list_only("yeah"));
        assert!(filter.is_ignore_list_only("ok hmm yeah"));
        assert!(filter.is_ignore_list_only("yeah!"));
        assert!(filter.is_ignore_list_only("ok."));
        assert!(filter.is_ignore_list_only("yeah, ok!"));
        assert!(!filter.is_ignore_list_only("yeah but wait"));
        assert!(!filter.is_ignore_list_only("stop"));
    }

    #[test]
    fn command_word_detection() {
        let filter = filter_with(&["yeah", "ok", "hmm"]);

        assert!(filter.has_command_words("stop"));
        assert!(filter.has_command_words("ok stop"));
        assert!(filter.has_command_words("yeah but wait"));
        assert!(!filter.has_command_words("yeah ok"));
        assert!(!filter.has_command_words("hmm yeah"));
    }

    #[test]
    fn blank_input_is_neither_ignore_only_nor_command() {
        let filter = InterruptionFilter::default();

        for text in ["", "   ", "\n\t", "...", "?!"] {
            assert!(!filter.is_ignore_list_only(text), "{text:?} should not be ignore-only");
            assert!(!filter.has_command_words(text), "{text:?} should not carry commands");
        }
    }

    #[test]
    fn disabled_filter_allows_everything() {
        let filter = InterruptionFilter::from_parts(None, None, false, false)
            .expect("disabled config should validate");

        for (text, speaking) in [("yeah", true), ("stop", true), ("", false), ("ok", false)] {
            let decision = filter.decide(text, speaking, Some("speaking"));
            assert_eq!(decision.action(), FilterAction::Allow);
            assert!(decision.reason().to_lowercase().contains("disabled"));
            assert_eq!(decision.confidence(), 1.0);
        }
    }

    #[test]
    fn silent_agent_allows_everything() {
        let filter = filter_with(&["yeah", "ok"]);

        for text in ["yeah", "stop", "", "ok ok ok"] {
            let decision = filter.decide(text, false, Some("listening"));
            assert_eq!(decision.action(), FilterAction::Allow);
            assert!(decision.reason().to_lowercase().contains("not speaking"));
            assert_eq!(decision.metadata().get("agent_speaking"), Some(&json!(false)));
        }
    }

    #[test]
    fn backchanneling_while_speaking_is_filtered() {
        let filter = filter_with(&["yeah", "ok"]);
        let decision = filter.decide("yeah!", true, Some("speaking"));

        assert_eq!(decision.action(), FilterAction::Filter);
        assert!(decision.reason().to_lowercase().contains("backchanneling"));
        assert_eq!(decision.confidence(), 1.0);
        assert_eq!(decision.metadata().get("transcription"), Some(&json!("yeah!")));
        assert_eq!(decision.rule(), Some("backchanneling"));
    }

    #[test]
    fn command_while_speaking_is_allowed() {
        let filter = filter_with(&["yeah", "ok"]);
        let decision = filter.decide("yeah but wait", true, Some("speaking"));

        assert_eq!(decision.action(), FilterAction::Allow);
        assert!(decision.reason().to_lowercase().contains("command"));
        assert_eq!(decision.metadata().get("has_command_words"), Some(&json!(true)));
        assert_eq!(decision.metadata().get("transcription"), Some(&json!("yeah but wait")));
    }

    #[test]
    fn punctuation_only_while_speaking_is_low_confidence_allow() {
        let filter = filter_with(&["yeah", "ok"]);
        let decision = filter.decide("...", true, None);

        assert_eq!(decision.action(), FilterAction::Allow);
        assert_eq!(decision.reason(), "Default allow");
        assert_eq!(decision.confidence(), 0.5);
        assert_eq!(decision.rule(), Some("default_allow"));
    }

    #[test]
    fn transcript_value_routes_through_decide() {
        let filter = filter_with(&["yeah", "ok"]);
        let transcript = Transcript::new("ok", true).with_agent_state("speaking");

        assert_eq!(filter.evaluate(&transcript).action(), FilterAction::Filter);
        assert_eq!(
            filter.evaluate(&Transcript::new("ok", false)).action(),
            FilterAction::Allow
        );
    }

    #[test]
    fn custom_policy_overrides_built_in_rules() {
        let config = FilterConfig {
            ignore_list: IgnoreList::from(["yeah"]),
            ..FilterConfig::default()
        }
        .with_custom_policy(policy_fn(|text, _state| Ok(text.contains("custom"))));
        let filter = InterruptionFilter::new(config).expect("config should validate");

        let filtered = filter.decide("custom input", true, Some("speaking"));
        assert_eq!(filtered.action(), FilterAction::Filter);
        assert_eq!(filtered.metadata().get("custom_filter"), Some(&json!(true)));

        let allowed = filter.decide("normal input", true, Some("speaking"));
        assert_eq!(allowed.action(), FilterAction::Allow);

        // built-in rules would filter this, the policy says otherwise
        assert_eq!(filter.decide("yeah", true, None).action(), FilterAction::Allow);
        // built-in rules would allow this, the policy filters it
        assert_eq!(filter.decide("custom", false, None).action(), FilterAction::Filter);
    }

    #[test]
    fn custom_policy_receives_agent_state() {
        let policy = policy_fn(|_text, state| Ok(state == Some("speaking")));
        let filter = InterruptionFilter::new(FilterConfig::default().with_custom_policy(policy))
            .expect("config should validate");

        assert_eq!(filter.decide("anything", true, Some("speaking")).action(), FilterAction::Filter);
        assert_eq!(filter.decide("anything", true, Some("thinking")).action(), FilterAction::Allow);
        assert_eq!(filter.decide("anything", true, None).action(), FilterAction::Allow);
    }

    #[test]
    fn failing_custom_policy_falls_back_to_built_in_rules() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let policy = policy_fn(move |_text, _state| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(PolicyError::failed("classifier offline"))
        });
        let filter = InterruptionFilter::new(
            FilterConfig { ignore_list: IgnoreList::from(["yeah"]), ..FilterConfig::default() }
                .with_custom_policy(policy),
        )
        .expect("config should validate");

        let decision = filter.decide("yeah", true, None);
        assert_eq!(decision.action(), FilterAction::Filter);
        assert!(decision.metadata().get("custom_filter").is_none());
        assert_eq!(filter.decide("stop", true, None).action(), FilterAction::Allow);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    struct PanickingPolicy;

    impl InterruptionPolicy for PanickingPolicy {
        fn should_filter(
            &self,
            _transcript: &str,
            _agent_state: Option<&str>,
        ) -> Result<bool, PolicyError> {
            panic!("policy bug")
        }
    }

    #[test]
    fn panicking_custom_policy_falls_back_to_built_in_rules() {
        let filter = InterruptionFilter::from_parts(
            Some(vec!["yeah".to_string()]),
            Some(Arc::new(PanickingPolicy)),
            true,
            false,
        )
        .expect("config should validate");

        assert_eq!(filter.decide("yeah", true, None).action(), FilterAction::Filter);
        assert_eq!(filter.decide("yeah", false, None).action(), FilterAction::Allow);
    }

    #[test]
    fn never_produces_pending() {
        let filter = InterruptionFilter::default();
        for text in ["", "yeah", "stop", "uh huh", "!!", "go on then"] {
            for speaking in [true, false] {
                assert_ne!(filter.decide(text, speaking, None).action(), FilterAction::Pending);
            }
        }
    }

    #[test]
    fn filter_is_shareable_across_threads() {
        let filter = Arc::new(filter_with(&["yeah", "ok"]));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let filter = Arc::clone(&filter);
                std::thread::spawn(move || filter.decide("ok", true, None).action())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().ok(), Some(FilterAction::Filter));
        }
    }
}
