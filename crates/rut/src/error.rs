// src/error.rs
//! Error types for RUT parsing and generation

use thiserror::Error;

/// Reasons a string could not be read as a RUT.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseError {
    #[error("RUT length is out of bounds")]
    InvalidLength,
    #[error("Invalid digit in RUT body")]
    InvalidDigit,
    #[error("Invalid check digit")]
    InvalidCheckDigit,
}

/// Reasons a random RUT could not be generated.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum GenerationError {
    /// `min` is not lower than `max`, or the range reaches bodies shorter than six digits or
    /// longer than nine.
    #[error("Invalid range, min must be lower than max and both between 100000 and 1000000000")]
    InvalidRange,
}
