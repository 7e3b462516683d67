//! Parsing, validation, formatting and generation of Chilean RUTs (Rol Único Tributario).
//!
//! # Example
//!
//! ```
//! use rut::{Rut, RutDist};
//! use rand::distr::Distribution;
//!
//! let rut = Rut::parse("5.126.663-3", false).expect("well formed");
//! assert!(rut.is_valid());
//!
//! let dist = RutDist::new(500_000, 25_000_000).expect("valid range");
//! let generated = dist.sample(&mut rand::rng());
//! println!("Generated RUT: {}", generated.to_pretty_string());
//! ```

pub mod checksum;
pub mod distribution;
pub mod error;
pub mod rut;
pub mod sequence;

// Re-export main types for convenience
pub use checksum::{CheckDigit, compute_check_digit};
pub use distribution::{MAX_GENERATED_BODY, MIN_GENERATED_BODY, RutDist, generate};
pub use error::{GenerationError, ParseError};

pub use crate::rut::Rut;
