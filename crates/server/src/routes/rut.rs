//! Handlers for `/api/v1/rut`: validation, check digit calculation, generation and SII lookups.

use axum::extract::{Query, State};
use rut::{MAX_GENERATED_BODY, MIN_GENERATED_BODY, Rut};
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    error::{ServerError, ServerResult},
    jsend::Success,
    upstream::EconomicActivity,
};

/// Default lower bound for generated bodies.
const DEFAULT_MIN: u64 = 500_000;

/// Default upper bound for generated bodies, exclusive.
const DEFAULT_MAX: u64 = 25_000_000;

/// Query of the endpoints taking a single RUT.
#[derive(Debug, Deserialize)]
pub struct RutQuery {
    /// The RUT as typed by the user, dots and dash optional.
    rut: Option<String>,
}

impl RutQuery {
    /// The provided RUT, or an error naming the missing parameter.
    fn rut(&self) -> ServerResult<&str> {
        self.rut
            .as_deref()
            .map(str::trim)
            .filter(|rut| !rut.is_empty())
            .ok_or(ServerError::MissingParameter { parameter: "rut" })
    }
}

/// Result of validating a RUT.
#[derive(Debug, Serialize)]
pub struct Validation {
    /// Whether the check digit matches the body.
    valid: bool,
    /// The RUT in canonical form.
    rut: String,
}

/// `GET /api/v1/rut/validate?rut=`
#[tracing::instrument]
pub async fn validate(Query(query): Query<RutQuery>) -> ServerResult<Success<Validation>> {
    let rut = Rut::parse(query.rut()?, false)?;

    Ok(Success(Validation {
        valid: rut.is_valid(),
        rut: rut.to_canonical_string(),
    }))
}

/// A calculated check digit.
#[derive(Debug, Serialize)]
pub struct Digit {
    /// The check digit, `0`-`9` or `K`.
    digit: String,
    /// The full RUT in canonical form.
    rut: String,
}

/// `GET /api/v1/rut/digit?rut=`, the RUT is read as a body only.
#[tracing::instrument]
pub async fn digit(Query(query): Query<RutQuery>) -> ServerResult<Success<Digit>> {
    let mut rut = Rut::parse(query.rut()?, true)?;
    let digit = rut.assign_check_digit();

    Ok(Success(Digit {
        digit: digit.to_string(),
        rut: rut.to_canonical_string(),
    }))
}

/// Query of the generation endpoint, both bounds optional.
#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    /// Inclusive lower bound of the body.
    min: Option<String>,
    /// Exclusive upper bound of the body.
    max: Option<String>,
}

/// A randomly generated valid RUT.
#[derive(Debug, Serialize)]
pub struct Generated {
    /// Canonical form, e.g. `12345678-5`.
    rut: String,
    /// Human form, e.g. `12.345.678-5`.
    pretty: String,
    /// The check digit.
    digit: String,
    /// The body digits.
    digits: String,
}

/// Read an optional numeric bound, falling back to `default` when absent.
fn bound(value: Option<&str>, parameter: &'static str, default: u64) -> ServerResult<u64> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(default),
        Some(value) => value
            .parse::<u64>()
            .map_err(|_| ServerError::InvalidParameter {
                parameter,
                reason: format!("{parameter} must be numeric"),
            }),
    }
}

/// `GET /api/v1/rut/generate?min=&max=`
#[tracing::instrument]
pub async fn generate(Query(query): Query<GenerateQuery>) -> ServerResult<Success<Generated>> {
    let min = bound(query.min.as_deref(), "min", DEFAULT_MIN)?;
    let max = bound(query.max.as_deref(), "max", DEFAULT_MAX)?;

    if min >= max {
        return Err(ServerError::InvalidRange(format!(
            "min must be lower than max ({max})"
        )));
    }
    if min < MIN_GENERATED_BODY || max > MAX_GENERATED_BODY {
        return Err(ServerError::InvalidRange(format!(
            "min and max must be between {MIN_GENERATED_BODY} and {MAX_GENERATED_BODY}"
        )));
    }

    let rut = rut::generate(min, max, &mut rand::rng())
        .map_err(|e| ServerError::InvalidRange(e.to_string()))?;
    let digit = rut
        .check_digit()
        .unwrap_or_else(|| rut.calculate_check_digit());

    Ok(Success(Generated {
        rut: rut.to_canonical_string(),
        pretty: rut.to_pretty_string(),
        digit: digit.to_string(),
        digits: rut.body_string(),
    }))
}

/// A taxpayer and its registered activities.
#[derive(Debug, Serialize)]
pub struct Activities {
    /// The RUT in canonical form.
    rut: String,
    /// Registered name, empty when the SII has no record.
    name: String,
    /// Registered economic activities.
    activities: Vec<EconomicActivity>,
}

/// `GET /api/v1/rut/activities?rut=`
#[tracing::instrument(skip(state))]
pub async fn activities(
    State(state): State<AppState>,
    Query(query): Query<RutQuery>,
) -> ServerResult<Success<Activities>> {
    let rut = Rut::parse(query.rut()?, false)?;
    let profile = state.activities.profile(&rut).await?;

    Ok(Success(Activities {
        rut: rut.to_canonical_string(),
        name: profile.name,
        activities: profile.activities,
    }))
}
