// src/rut.rs
//! Core RUT type, parsing and display

use std::{fmt, str::FromStr};

use crate::{
    checksum::{CheckDigit, compute_check_digit},
    error::ParseError,
};

/// Smallest number of digits in a RUT body.
pub const MIN_BODY_LENGTH: usize = 6;

/// Largest number of digits in a RUT body.
pub const MAX_BODY_LENGTH: usize = 9;

/// A Chilean national tax identifier (Rol Único Tributario).
///
/// Made of a numeric body and a trailing check digit. The check digit may be unset, which is the
/// case when the RUT was parsed while ignoring it; such a RUT is never valid.
///
/// # Example
/// ```
/// use rut::Rut;
///
/// let rut: Rut = "12.312.31-8".parse().unwrap();
/// assert!(rut.is_valid());
/// assert_eq!(rut.to_string(), "1231231-8");
/// assert_eq!(rut.to_pretty_string(), "1.231.231-8");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rut {
    /// The body, one decimal digit per element, most significant first.
    pub(crate) digits: Vec<u8>,
    /// The trailing check digit, if known.
    pub(crate) check_digit: Option<CheckDigit>,
}

impl Rut {
    /// Parse a RUT from free-form text, such as `12.345.678-5` or `12345678 5`.
    ///
    /// Only `0-9` and `k`/`K` are read, everything else is skipped. The check digit is the last
    /// alphanumeric character that is attached to the RUT, i.e. a RUT symbol or a character right
    /// after a RUT symbol or a dash. A stray letter in that place, as in `123123-a`, is reported as
    /// a bad check digit rather than silently skipped, while a detached trailing word, as in
    /// `12.312.31-8 CL`, is ignored.
    ///
    /// When `ignore_check_digit` is set every symbol is treated as part of the body and the check
    /// digit is left unset. The body must still have six to nine digits, so `123.123.123-1` is
    /// rejected with [`ParseError::InvalidLength`] in this mode even though all ten symbols are
    /// digits.
    pub fn parse(text: &str, ignore_check_digit: bool) -> Result<Self, ParseError> {
        if ignore_check_digit {
            let digits = parse_body(text)?;
            return Ok(Self {
                digits,
                check_digit: None,
            });
        }

        let (split, last) = check_symbol(text).ok_or(ParseError::InvalidLength)?;
        let (body, _) = text.split_at(split);
        let digits = parse_body(body)?;
        let check_digit = CheckDigit::from_char(last).ok_or(ParseError::InvalidCheckDigit)?;

        Ok(Self {
            digits,
            check_digit: Some(check_digit),
        })
    }

    /// Build a RUT from a number, computing its check digit.
    pub fn from_number(number: u64) -> Self {
        let digits = number
            .to_string()
            .bytes()
            .map(|b| b.saturating_sub(b'0'))
            .collect::<Vec<_>>();
        let check_digit = compute_check_digit(&digits);

        Self {
            digits,
            check_digit: Some(check_digit),
        }
    }

    /// The body digits, most significant first.
    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    /// The stored check digit, `None` when it was ignored while parsing.
    pub const fn check_digit(&self) -> Option<CheckDigit> {
        self.check_digit
    }

    /// Calculate the check digit expected for this body.
    pub fn calculate_check_digit(&self) -> CheckDigit {
        compute_check_digit(&self.digits)
    }

    /// Replace the stored check digit with the one calculated from the body, returning it.
    pub fn assign_check_digit(&mut self) -> CheckDigit {
        let check_digit = self.calculate_check_digit();
        self.check_digit = Some(check_digit);
        check_digit
    }

    /// Whether the stored check digit matches the body.
    pub fn is_valid(&self) -> bool {
        self.has_valid_length() && self.check_digit == Some(self.calculate_check_digit())
    }

    /// The body rendered as a plain string of digits, e.g. `12345678`.
    pub fn body_string(&self) -> String {
        self.digits
            .iter()
            .map(|d| char::from(b'0'.saturating_add(*d)))
            .collect()
    }

    /// Render as `<body>-<check digit>` without separators, e.g. `12345678-5`.
    ///
    /// Returns an empty string when the body length is out of bounds.
    pub fn to_canonical_string(&self) -> String {
        if !self.has_valid_length() {
            return String::new();
        }

        self.with_check_digit(self.body_string())
    }

    /// Render with the body grouped in thousands, e.g. `12.345.678-5`.
    ///
    /// Returns an empty string when the body length is out of bounds.
    pub fn to_pretty_string(&self) -> String {
        if !self.has_valid_length() {
            return String::new();
        }

        let body = self.body_string();
        let mut grouped = String::with_capacity(body.len().saturating_add(body.len() / 3));
        for (i, c) in body.chars().enumerate() {
            let remaining = body.len().saturating_sub(i);
            if i > 0 && remaining % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }

        self.with_check_digit(grouped)
    }

    /// Append `-<check digit>` when a check digit is present.
    fn with_check_digit(&self, mut body: String) -> String {
        if let Some(check_digit) = self.check_digit {
            body.push('-');
            body.push(check_digit.as_char());
        }
        body
    }

    /// Whether the body length is within the bounds of a real RUT.
    fn has_valid_length(&self) -> bool {
        (MIN_BODY_LENGTH..=MAX_BODY_LENGTH).contains(&self.digits.len())
    }
}

/// Whether `c` can appear in a RUT.
fn is_symbol(c: char) -> bool {
    c.is_ascii_digit() || c.eq_ignore_ascii_case(&'k')
}

/// Iterate over the characters of `text` that can appear in a RUT.
fn symbols(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().filter(|c| is_symbol(*c))
}

/// Find the byte offset and value of the check symbol in `text`.
///
/// Letters that are neither RUT symbols nor placed right after one or after a dash belong to
/// trailing text and are skipped.
fn check_symbol(text: &str) -> Option<(usize, char)> {
    let mut end = text.len();
    loop {
        let head = text.get(..end)?;
        let (index, c) = head.char_indices().rfind(|(_, c)| c.is_alphanumeric())?;
        let attached = is_symbol(c)
            || head
                .get(..index)?
                .chars()
                .next_back()
                .is_some_and(|previous| previous == '-' || is_symbol(previous));
        if attached {
            return Some((index, c));
        }
        end = index;
    }
}

/// Read the body digits from `text`. The symbol count is checked before any symbol is read.
fn parse_body(text: &str) -> Result<Vec<u8>, ParseError> {
    let count = symbols(text).count();
    if !(MIN_BODY_LENGTH..=MAX_BODY_LENGTH).contains(&count) {
        return Err(ParseError::InvalidLength);
    }

    symbols(text)
        .map(|c| {
            c.to_digit(10)
                .and_then(|d| u8::try_from(d).ok())
                .ok_or(ParseError::InvalidDigit)
        })
        .collect()
}

impl FromStr for Rut {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, false)
    }
}

impl TryFrom<String> for Rut {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl fmt::Display for Rut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

#[cfg(feature = "serde")]
/// Serializes a [`Rut`] as its canonical string and deserializes it through [`Rut::from_str`].
mod serde_impl {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};

    use super::Rut;

    impl Serialize for Rut {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(&self.to_canonical_string())
        }
    }

    impl<'de> Deserialize<'de> for Rut {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(D::Error::custom)
        }
    }
}
