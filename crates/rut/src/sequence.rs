// src/sequence.rs
//! Weights used by the modulus 11 checksum

/// Smallest weight of the cycle.
const FIRST_WEIGHT: u32 = 2;

/// Largest weight of the cycle, the next weight after it wraps back to [`FIRST_WEIGHT`].
const LAST_WEIGHT: u32 = 7;

/// Build the weight sequence for a body of `length` digits.
///
/// Weights cycle through `2..=7` starting from the least significant digit, so the sequence is
/// built forwards and then reversed to line up with the body as written.
///
/// # Example
/// ```
/// use rut::sequence::reverse_sequence;
///
/// assert_eq!(reverse_sequence(7), vec![2, 7, 6, 5, 4, 3, 2]);
/// assert!(reverse_sequence(0).is_empty());
/// ```
pub fn reverse_sequence(length: usize) -> Vec<u32> {
    let mut sequence: Vec<u32> = (FIRST_WEIGHT..=LAST_WEIGHT).cycle().take(length).collect();
    sequence.reverse();
    sequence
}
