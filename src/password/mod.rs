//! Password records and structural decomposition
//!
//! The aggregator only needs verdicts and components from a password, so the
//! analysis lives behind [`PasswordAnalyzer`]. [`StandardAnalyzer`] is the
//! implementation the CLI uses; callers with their own decomposition rules
//! plug in another implementation.

mod decompose;
mod filter;

pub use decompose::{leet_pattern, shift_pattern, split_password, StandardAnalyzer};
pub use filter::{is_legal_password, is_short_and_not_date, MAX_PASSWORD_LEN};

use serde::Deserialize;
use std::fmt;

/// One labeled credential entry from a country corpus file.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordRecord {
    /// Kept raw so numeric passwords (`123456` stored without quotes) survive.
    #[serde(default)]
    pub password: serde_json::Value,
    #[serde(default)]
    pub country: Option<String>,
}

impl PasswordRecord {
    /// The password as text, or `None` when it cannot be read as a scalar.
    ///
    /// A single trailing newline left over from line-based dumps is removed.
    pub fn password_text(&self) -> Option<String> {
        let raw = match &self.password {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        match raw.strip_suffix('\n') {
            Some(stripped) => Some(stripped.to_string()),
            None => Some(raw),
        }
    }
}

/// A password split into `prefix + base_word + suffix`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    pub prefix: String,
    pub base_word: String,
    pub suffix: String,
}

/// Character positions of uppercase letters in a base word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShiftPattern(pub Vec<usize>);

impl ShiftPattern {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ShiftPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", index)?;
        }
        f.write_str("]")
    }
}

/// One leet substitution found in a base word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeetSubstitution {
    /// Character position in the base word
    pub index: usize,
    /// The character as typed (e.g. `4`)
    pub leet: char,
    /// The letter it stands for (e.g. `a`)
    pub plain: char,
}

/// All leet substitutions of a base word, in position order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeetPattern(pub Vec<LeetSubstitution>);

impl LeetPattern {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LeetPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, sub) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "({}, '{}', '{}')", sub.index, sub.leet, sub.plain)?;
        }
        f.write_str("]")
    }
}

/// Verdicts and structural components for a password.
pub trait PasswordAnalyzer: Send + Sync {
    /// Whether the password is usable at all (charset, length).
    fn is_legal(&self, password: &str) -> bool;

    /// Whether the password is too short to be a real password or a date.
    fn is_short_and_not_date(&self, password: &str) -> bool;

    /// Split into prefix, base word and suffix.
    fn split(&self, password: &str) -> Decomposition;

    /// Capitalization pattern of a base word.
    fn shift_pattern(&self, base_word: &str) -> ShiftPattern;

    /// Leet pattern of a base word and the word with substitutions undone.
    fn leet_pattern(&self, base_word: &str) -> (LeetPattern, String);

    /// Fail-closed acceptance: legal and not flagged by the short-non-date rule.
    fn accepts(&self, password: &str) -> bool {
        self.is_legal(password) && !self.is_short_and_not_date(password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> PasswordRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_password_text_string() {
        let r = record(r#"{"email": "a@b.pl", "password": "hunter22\n", "country": "Poland"}"#);
        assert_eq!(r.password_text().as_deref(), Some("hunter22"));
        assert_eq!(r.country.as_deref(), Some("Poland"));
    }

    #[test]
    fn test_password_text_coerces_numbers() {
        let r = record(r#"{"password": 12345678}"#);
        assert_eq!(r.password_text().as_deref(), Some("12345678"));
    }

    #[test]
    fn test_password_text_unreadable() {
        assert!(record(r#"{"email": "x@y.fr"}"#).password_text().is_none());
        assert!(record(r#"{"password": null}"#).password_text().is_none());
        assert!(record(r#"{"password": ["a"]}"#).password_text().is_none());
    }

    #[test]
    fn test_only_one_trailing_newline_stripped() {
        let r = record(r#"{"password": "abcdefgh\n\n"}"#);
        assert_eq!(r.password_text().as_deref(), Some("abcdefgh\n"));
    }

    #[test]
    fn test_pattern_display() {
        assert_eq!(ShiftPattern(vec![]).to_string(), "[]");
        assert_eq!(ShiftPattern(vec![0, 3]).to_string(), "[0, 3]");
        let leet = LeetPattern(vec![
            LeetSubstitution { index: 1, leet: '@', plain: 'a' },
            LeetSubstitution { index: 5, leet: '0', plain: 'o' },
        ]);
        assert_eq!(leet.to_string(), "[(1, '@', 'a'), (5, '0', 'o')]");
    }
}
