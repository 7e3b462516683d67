// src/distribution.rs
//! Random generation of valid RUTs

use std::ops::Range;

use rand::{Rng, distr::Distribution};

use crate::{Rut, error::GenerationError};

/// Smallest body that can be generated, the first with six digits.
pub const MIN_GENERATED_BODY: u64 = 100_000;

/// Exclusive upper bound of generated bodies, one past the largest with nine digits.
pub const MAX_GENERATED_BODY: u64 = 1_000_000_000;

/// Distribution of valid RUTs whose body is uniformly sampled from `min..max`.
///
/// # Example
/// ```
/// use rand::distr::Distribution;
/// use rut::RutDist;
///
/// let dist = RutDist::new(1_000_000, 25_000_000).unwrap();
/// let rut = dist.sample(&mut rand::rng());
/// assert!(rut.is_valid());
/// ```
#[derive(Debug, Clone)]
pub struct RutDist {
    /// The half-open range bodies are sampled from.
    range: Range<u64>,
}

impl RutDist {
    /// Create a new distribution, `min` is inclusive and `max` is exclusive.
    ///
    /// Both must lie within [`MIN_GENERATED_BODY`] and [`MAX_GENERATED_BODY`], so every sampled
    /// RUT has a body of six to nine digits.
    pub const fn new(min: u64, max: u64) -> Result<Self, GenerationError> {
        if min >= max || min < MIN_GENERATED_BODY || max > MAX_GENERATED_BODY {
            return Err(GenerationError::InvalidRange);
        }

        Ok(Self { range: min..max })
    }
}

impl Distribution<Rut> for RutDist {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Rut {
        Rut::from_number(rng.random_range(self.range.clone()))
    }
}

/// Generate a valid RUT whose body is in `min..max`, using the provided random source.
pub fn generate<R: Rng + ?Sized>(min: u64, max: u64, rng: &mut R) -> Result<Rut, GenerationError> {
    Ok(RutDist::new(min, max)?.sample(rng))
}
