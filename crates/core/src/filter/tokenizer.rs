/// Splits a transcript into canonical word tokens.
///
/// ASCII punctuation is deleted in place rather than treated as a separator,
/// so `"yeah!"` yields `["yeah"]` and `"uh-huh"` yields `["uhhuh"]`. When
/// `case_sensitive` is false every token is lowercased.
pub fn tokenize(text: &str, case_sensitive: bool) -> Vec<String> {
    let normalized = normalize_case(text, case_sensitive);

    let mut sanitized = String::with_capacity(normalized.len());
    for character in normalized.chars() {
        if !character.is_ascii_punctuation() {
            sanitized.push(character);
        }
    }

    sanitized.split_whitespace().map(|token| token.to_string()).collect()
}

pub fn normalize_case(text: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}
