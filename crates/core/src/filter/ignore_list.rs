use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::tokenizer::tokenize;

/// Common backchanneling phrases, grouped by category.
pub const DEFAULT_IGNORE_LIST: &[&str] = &[
    // acknowledgements
    "yeah", "yep", "yes", "yup", "ok", "okay", "hmm", "mhm", "mm", "mmm", "uh-huh", "uh huh",
    "ah", "aha", "oh", "ooh",
    // thinking sounds
    "um", "uh", "er", "erm",
    // agreement
    "right", "sure", "alright", "got it",
    // encouragement
    "go on", "continue", "i see",
];

/// Ordered list of phrases treated as backchanneling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IgnoreList(Vec<String>);

impl Default for IgnoreList {
    fn default() -> Self {
        Self(DEFAULT_IGNORE_LIST.iter().map(|phrase| phrase.to_string()).collect())
    }
}

impl IgnoreList {
    pub fn new(phrases: Vec<String>) -> Self {
        Self(phrases)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn phrases(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, phrase: &str) -> bool {
        self.0.iter().any(|existing| existing == phrase)
    }

    pub fn extend<I, S>(&mut self, phrases: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(phrases.into_iter().map(Into::into));
    }

    /// Lowercases every phrase. Idempotent.
    pub(crate) fn fold_case(&mut self) {
        for phrase in &mut self.0 {
            if phrase.chars().any(char::is_uppercase) {
                *phrase = phrase.to_lowercase();
            }
        }
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoreList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for IgnoreList {
    fn from(phrases: [S; N]) -> Self {
        phrases.into_iter().collect()
    }
}

impl From<Vec<String>> for IgnoreList {
    fn from(phrases: Vec<String>) -> Self {
        Self(phrases)
    }
}

/// An ignore list compiled into token phrases for matching.
///
/// Each phrase passes through the transcript tokenizer, so `"uh-huh"` matches
/// the token `uhhuh` and `"go on"` matches the two-token run `go on`.
#[derive(Clone, Debug, Default)]
pub struct IgnoreVocabulary {
    phrases: HashSet<Vec<String>>,
    longest: usize,
}

impl IgnoreVocabulary {
    pub fn compile(list: &IgnoreList, case_sensitive: bool) -> Self {
        let phrases: HashSet<Vec<String>> = list
            .phrases()
            .iter()
            .map(|phrase| tokenize(phrase, case_sensitive))
            .filter(|tokens| !tokens.is_empty())
            .collect();
        let longest = phrases.iter().map(Vec::len).max().unwrap_or(0);

        Self { phrases, longest }
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn contains_word(&self, token: &str) -> bool {
        self.phrases.iter().any(|phrase| phrase.len() == 1 && phrase[0] == token)
    }

    /// True when `tokens` is non-empty and splits entirely into known phrases.
    pub fn covers(&self, tokens: &[String]) -> bool {
        if tokens.is_empty() || self.phrases.is_empty() {
            return false;
        }

        // reachable[i]: tokens[..i] is a concatenation of phrases
        let mut reachable = vec![false; tokens.len() + 1];
        reachable[0] = true;
        for start in 0..tokens.len() {
            if !reachable[start] {
                continue;
            }
            let max_end = tokens.len().min(start + self.longest);
            for end in start + 1..=max_end {
                if !reachable[end] && self.phrases.contains(&tokens[start..end]) {
                    reachable[end] = true;
                }
            }
        }

        reachable[tokens.len()]
    }
}
