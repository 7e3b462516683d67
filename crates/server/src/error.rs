//! Error types for the server.

use std::collections::BTreeMap;

use axum::{
    Json,
    response::{IntoResponse, Response},
};

use crate::jsend::JSend;

/// A convienent wrapper over `Result`, specifically catering to a server error.
pub type ServerResult<T> = Result<T, ServerError>;

/// The only message shown to callers when something fails on our side or upstream.
const SERVER_ERROR_MESSAGE: &str = "unable to fetch the data";

/// A kitchen-sink error type for the server.
#[derive(Debug, thiserror::Error)]
#[allow(
    clippy::missing_docs_in_private_items,
    reason = "Error type is self explanatory"
)]
pub enum ServerError {
    // Configuration
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid environment variable: {0}: {1}, failed due to: {2}")]
    InvalidEnvVar(&'static str, String, String),

    // Specific Validation or User Errors
    #[error("no {parameter} was provided")]
    MissingParameter { parameter: &'static str },
    #[error("{reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
    #[error("the provided rut is invalid")]
    InvalidRut(#[from] rut::ParseError),
    #[error("{0}")]
    InvalidRange(String),
    #[error("No results matched the query")]
    NotFound,

    // Upstream and internal
    #[error("Unexpected upstream response: {0}")]
    Upstream(String),
    #[error("Internal server error: {0}")]
    Internal(String),

    // Wrapped errors
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error(transparent)]
    TokioIoError(#[from] tokio::io::Error),
    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
    #[error(transparent)]
    Base64Error(#[from] base64::DecodeError),
    #[error(transparent)]
    UrlError(#[from] url::ParseError),
}

impl ServerError {
    /// Get the name of a variant as a string, used for snapshots. Only used for testing.
    /// Should match name of the enum variant exactly, otherwise it's a bug.
    #[cfg(test)]
    const fn to_name(&self) -> &'static str {
        match &self {
            Self::MissingEnvVar(_) => "MissingEnvVar",
            Self::InvalidEnvVar(..) => "InvalidEnvVar",
            Self::MissingParameter { .. } => "MissingParameter",
            Self::InvalidParameter { .. } => "InvalidParameter",
            Self::InvalidRut(_) => "InvalidRut",
            Self::InvalidRange(_) => "InvalidRange",
            Self::NotFound => "NotFound",
            Self::Upstream(_) => "Upstream",
            Self::Internal(_) => "Internal",
            Self::ReqwestError(_) => "ReqwestError",
            Self::TokioIoError(_) => "TokioIoError",
            Self::SerdeJsonError(_) => "SerdeJsonError",
            Self::Base64Error(_) => "Base64Error",
            Self::UrlError(_) => "UrlError",
        }
    }

    /// Get the appropriate [`axum::http::StatusCode`] to be returned to the user based on the error
    /// variant.
    const fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::MissingParameter { .. }
            | Self::InvalidParameter { .. }
            | Self::InvalidRut(_)
            | Self::InvalidRange(_) => axum::http::StatusCode::BAD_REQUEST,
            Self::NotFound => axum::http::StatusCode::NOT_FOUND,
            Self::Upstream(_) | Self::ReqwestError(_) => axum::http::StatusCode::BAD_GATEWAY,
            Self::MissingEnvVar(_)
            | Self::InvalidEnvVar(..)
            | Self::Internal(_)
            | Self::TokioIoError(_)
            | Self::SerdeJsonError(_)
            | Self::Base64Error(_)
            | Self::UrlError(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The field a client error is attributed to in the JSend `fail` body.
    const fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingParameter { parameter } | Self::InvalidParameter { parameter, .. } => {
                Some(*parameter)
            }
            Self::InvalidRut(_) => Some("rut"),
            Self::InvalidRange(_) => Some("range"),
            _ => None,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(error = ?self, "Internal server error");
            let body: JSend<()> = JSend::Error {
                message: SERVER_ERROR_MESSAGE,
            };
            (status_code, Json(body)).into_response()
        } else {
            tracing::debug!(error = ?self, "Client error");
            let data = self
                .field()
                .map(|field| BTreeMap::from([(field, self.to_string())]));
            let body: JSend<()> = JSend::Fail { data };
            (status_code, Json(body)).into_response()
        }
    }
}
