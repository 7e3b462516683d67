// src/matcher.rs
//! Ranked fuzzy matching of a pattern against a list of hints, backed by [`frizbee`].
//!
//! A hint matches when every character of the pattern appears in it, in order and ignoring case.
//! No typos are tolerated, a pattern character missing from the hint rejects it.

use std::cmp::Reverse;

/// A hint that matched the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Index of the hint in the searched slice.
    pub index: usize,
    /// Match quality, higher is better.
    pub score: u16,
}

/// Matcher configuration shared by every search.
fn config() -> frizbee::Config {
    frizbee::Config {
        max_typos: Some(0),
        sort: false,
        ..Default::default()
    }
}

/// Match `pattern` against every hint, returning the matches sorted best first.
///
/// Hints with equal scores keep their original order. An empty pattern matches nothing.
pub fn find<S: AsRef<str>>(pattern: &str, hints: &[S]) -> Vec<Match> {
    if pattern.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<Match> = frizbee::match_list(pattern, hints, &config())
        .into_iter()
        .filter_map(|m| {
            Some(Match {
                index: usize::try_from(m.index).ok()?,
                score: m.score,
            })
        })
        .collect();

    matches.sort_by_key(|m| (Reverse(m.score), m.index));
    matches
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn indexes(matches: &[Match]) -> Vec<usize> {
        matches.iter().map(|m| m.index).collect()
    }

    #[rstest]
    #[case::empty_pattern("", &["abc"])]
    #[case::missing_char("abz", &["abc", "xyz"])]
    #[case::out_of_order("cba", &["abc"])]
    #[case::no_hints("abc", &[])]
    fn test_no_match(#[case] pattern: &str, #[case] hints: &[&str]) {
        assert!(find(pattern, hints).is_empty());
    }

    #[test]
    fn test_case_insensitive_subsequence() {
        let hints = ["Euro EUR", "Yen JPY", "Dolar estadounidense USD"];
        assert_eq!(indexes(&find("jpy", &hints)), vec![1]);
        assert_eq!(indexes(&find("JPY", &hints)), vec![1]);
        assert_eq!(indexes(&find("dusd", &hints)), vec![2]);
    }

    #[test]
    fn test_sorted_best_first() {
        let hints = ["Dolar estadounidense USD", "u s d", "Yen JPY", "USD"];
        let matches = find("usd", &hints);
        assert_eq!(matches.len(), 3);
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn ties_keep_input_order() {
        let hints = ["Rupia INR", "Euro EUR", "Rupia INR", "Rupia INR"];
        assert_eq!(indexes(&find("rupia", &hints)), vec![0, 2, 3]);
    }
}
