//! Phone Identifier Normalizer
//!
//! Turns loosely formatted phone numbers (`+1 234-567`) into the canonical
//! recipient identifier the messaging protocol addresses chats with
//! (`1234567@c.us`). No locale-aware validation happens here; malformed
//! input passes through and is rejected later by the session engine.

use std::fmt;

/// Suffix that marks an identifier as a one-to-one user chat.
pub const USER_SUFFIX: &str = "@c.us";

/// Canonical chat address for a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecipientId(String);

impl RecipientId {
    /// Normalize a free-form phone string.
    ///
    /// Strips every `+`, space and hyphen, then appends [`USER_SUFFIX`]
    /// unless it is already present. Re-normalizing the result is a no-op.
    pub fn normalize(raw: &str) -> Self {
        let mut id: String = raw
            .chars()
            .filter(|c| !matches!(c, '+' | ' ' | '-'))
            .collect();
        if !id.ends_with(USER_SUFFIX) {
            id.push_str(USER_SUFFIX);
        }
        Self(id)
    }

    /// The user part, without the chat suffix.
    pub fn user(&self) -> &str {
        self.0.strip_suffix(USER_SUFFIX).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("+1 234-567", "1234567@c.us")]
    #[case("33 6 12 34 56 78", "33612345678@c.us")]
    #[case("+44-20-7946-0958", "442079460958@c.us")]
    #[case("5511999887766", "5511999887766@c.us")]
    #[case("5511999887766@c.us", "5511999887766@c.us")]
    fn test_normalize(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(RecipientId::normalize(raw).as_str(), expected);
    }

    #[test]
    fn test_normalize_strips_all_separators() {
        let id = RecipientId::normalize("+ +1-2 3--4  5");
        let user = id.user();
        assert!(!user.contains(['+', ' ', '-']));
        assert!(id.as_str().ends_with(USER_SUFFIX));
        assert_eq!(user, "12345");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["+1 234-567", "", "abc", "+-- ", "99@c.us", "1-2@c.us"] {
            let once = RecipientId::normalize(raw);
            let twice = RecipientId::normalize(once.as_str());
            assert_eq!(once, twice, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_malformed_input_passes_through() {
        // No validation: empty and non-numeric strings still get a suffix
        assert_eq!(RecipientId::normalize("").as_str(), "@c.us");
        assert_eq!(RecipientId::normalize("not a number").as_str(), "notanumber@c.us");
    }

    #[test]
    fn test_user_part() {
        assert_eq!(RecipientId::normalize("+1 234").user(), "1234");
        assert_eq!(RecipientId::normalize("+1 234").to_string(), "1234@c.us");
    }
}
