//! Default structural decomposition

use super::filter::{is_legal_password, is_short_and_not_date};
use super::{Decomposition, LeetPattern, LeetSubstitution, PasswordAnalyzer, ShiftPattern};

/// Analyzer used by the CLI.
///
/// - prefix: leading run of non-letters
/// - suffix: trailing run of non-letters
/// - base word: everything between (the whole password if it has no letters)
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAnalyzer;

impl PasswordAnalyzer for StandardAnalyzer {
    fn is_legal(&self, password: &str) -> bool {
        is_legal_password(password)
    }

    fn is_short_and_not_date(&self, password: &str) -> bool {
        is_short_and_not_date(password)
    }

    fn split(&self, password: &str) -> Decomposition {
        split_password(password)
    }

    fn shift_pattern(&self, base_word: &str) -> ShiftPattern {
        shift_pattern(base_word)
    }

    fn leet_pattern(&self, base_word: &str) -> (LeetPattern, String) {
        leet_pattern(base_word)
    }
}

pub fn split_password(password: &str) -> Decomposition {
    let start = password
        .char_indices()
        .find(|(_, c)| c.is_alphabetic())
        .map(|(i, _)| i);

    let Some(start) = start else {
        return Decomposition {
            prefix: String::new(),
            base_word: password.to_string(),
            suffix: String::new(),
        };
    };

    let end = password
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_alphabetic())
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(password.len());

    Decomposition {
        prefix: password[..start].to_string(),
        base_word: password[start..end].to_string(),
        suffix: password[end..].to_string(),
    }
}

pub fn shift_pattern(base_word: &str) -> ShiftPattern {
    ShiftPattern(
        base_word
            .chars()
            .enumerate()
            .filter(|(_, c)| c.is_uppercase())
            .map(|(i, _)| i)
            .collect(),
    )
}

fn leet_plain(c: char) -> Option<char> {
    match c {
        '4' | '@' => Some('a'),
        '8' => Some('b'),
        '3' => Some('e'),
        '1' | '!' => Some('i'),
        '0' => Some('o'),
        '5' | '$' => Some('s'),
        '7' | '+' => Some('t'),
        _ => None,
    }
}

/// Undo leet substitutions inside a base word.
///
/// Letterless words (`123456`) are left alone: digits there are digits.
pub fn leet_pattern(base_word: &str) -> (LeetPattern, String) {
    if !base_word.chars().any(char::is_alphabetic) {
        return (LeetPattern::default(), base_word.to_string());
    }

    let mut subs = Vec::new();
    let mut plain_word = String::with_capacity(base_word.len());
    for (index, c) in base_word.chars().enumerate() {
        match leet_plain(c) {
            Some(plain) => {
                subs.push(LeetSubstitution {
                    index,
                    leet: c,
                    plain,
                });
                plain_word.push(plain);
            }
            None => plain_word.push(c),
        }
    }

    (LeetPattern(subs), plain_word)
}
