//! The JSend envelope every API response is wrapped in.
//!
//! See <https://github.com/omniti-labs/jsend>. Successful responses carry their payload in `data`,
//! client errors carry a map of the offending field to a message, and server errors only carry a
//! generic message.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// A JSend response body.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JSend<T> {
    /// The request was handled, `data` holds the result.
    Success {
        /// The payload of the response.
        data: T,
    },
    /// The request was rejected because of the data it carried.
    Fail {
        /// The rejected fields and why, `null` when no single field was at fault.
        data: Option<BTreeMap<&'static str, String>>,
    },
    /// The request could not be handled because of a server side problem.
    Error {
        /// A message safe to show to the caller.
        message: &'static str,
    },
}

/// A successful response, rendered as `{"status":"success","data":...}` with a 200 status.
#[derive(Debug)]
pub struct Success<T>(pub T);

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(JSend::Success { data: self.0 })).into_response()
    }
}
