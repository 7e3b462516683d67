//! Accent-insensitive fuzzy search over lists of named records.
//!
//! # Example
//!
//! ```
//! use fuzzy_search::search;
//!
//! let currencies = [("Euro", "EUR"), ("Rupia india", "INR"), ("Rupia pakistaní", "PKR")];
//! let found = search(&currencies, |(name, code)| format!("{name} {code}"), "rupia");
//! assert_eq!(found.len(), 2);
//! ```

pub mod matcher;
pub mod normalize;

pub use matcher::{Match, find};
pub use normalize::strip_diacritics;

/// Search `candidates` for `query`, returning the matching candidates best first.
///
/// `hint_fn` builds the text each candidate is matched against, usually its display name followed
/// by a short code. Diacritics are stripped from both the hints and the query.
pub fn search<'a, T, F>(candidates: &'a [T], hint_fn: F, query: &str) -> Vec<&'a T>
where
    F: Fn(&T) -> String,
{
    let hints: Vec<String> = candidates
        .iter()
        .map(|candidate| strip_diacritics(&hint_fn(candidate)))
        .collect();

    find(&strip_diacritics(query), &hints)
        .into_iter()
        .filter_map(|m| candidates.get(m.index))
        .collect()
}
