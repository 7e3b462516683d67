// src/checksum.rs
//! Modulus 11 check digit ("dígito verificador") calculation

use std::fmt;

use crate::sequence::reverse_sequence;

/// The modulus of the checksum.
const MODULUS: u32 = 11;

/// The trailing verification symbol of a RUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckDigit {
    /// A decimal check digit, always in `0..=9`.
    Digit(u8),
    /// The `K` symbol, used when the checksum yields 10.
    K,
}

impl CheckDigit {
    /// Read a check digit from a single character, `k` is accepted in either case.
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'k' | 'K' => Some(Self::K),
            '0'..='9' => Some(Self::Digit(c as u8 - b'0')),
            _ => None,
        }
    }

    /// The character used when displaying the check digit.
    pub const fn as_char(self) -> char {
        match self {
            #[allow(clippy::arithmetic_side_effects, reason = "digit is always in 0..=9")]
            Self::Digit(d) => (b'0' + d) as char,
            Self::K => 'K',
        }
    }
}

impl fmt::Display for CheckDigit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Calculate the check digit for a RUT body.
///
/// Each digit is multiplied by its weight from [`reverse_sequence`], the products are summed and
/// the result is `11 - (sum mod 11)`, where 10 maps to `K` and 11 maps to `0`.
///
/// # Example
/// ```
/// use rut::checksum::{CheckDigit, compute_check_digit};
///
/// assert_eq!(compute_check_digit(&[1, 2, 3, 1, 2, 3, 1]), CheckDigit::Digit(8));
/// assert_eq!(compute_check_digit(&[1, 0, 0, 0, 0, 0, 5]), CheckDigit::K);
/// ```
pub fn compute_check_digit(digits: &[u8]) -> CheckDigit {
    let remainder = reverse_sequence(digits.len())
        .into_iter()
        .zip(digits)
        .fold(0_u32, |acc, (weight, &digit)| {
            #[allow(clippy::arithmetic_side_effects, reason = "bounded by the modulus")]
            let next = (acc + weight * u32::from(digit)) % MODULUS;
            next
        });

    match MODULUS.saturating_sub(remainder) {
        10 => CheckDigit::K,
        11 => CheckDigit::Digit(0),
        #[allow(clippy::cast_possible_truncation, reason = "value is in 1..=9")]
        value => CheckDigit::Digit(value as u8),
    }
}
