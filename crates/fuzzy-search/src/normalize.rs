// src/normalize.rs
//! Diacritic removal for accent-insensitive search

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Strip diacritics from `text`, turning `"Dólar"` into `"Dolar"`.
///
/// The text is decomposed, its combining marks removed and the remainder recomposed. Characters
/// without a decomposition (`ß`, `€`, emoji) are left as they are.
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}
