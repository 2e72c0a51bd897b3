use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to callers of the tracker. Both kinds are shown to the user as-is and
/// never retried.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The caller sent something we refuse to store or act on.
    #[error("{0}")]
    Validation(String),
    /// The session store (or the fallback cache behind it) could not be read or written.
    #[error("{0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl TrackerError {
    pub fn validation(message: impl Into<String>) -> Self {
        TrackerError::Validation(message.into())
    }
}

/// A malformed date, timestamp or metadata value. Callers replace the value with a safe
/// default instead of propagating this.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot parse {field} from '{raw}'")]
pub struct ParseError {
    pub field: &'static str,
    pub raw: String,
}

impl ParseError {
    pub fn new(field: &'static str, raw: impl Into<String>) -> Self {
        Self {
            field,
            raw: raw.into(),
        }
    }
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let status = match &self {
            TrackerError::Validation(_) => StatusCode::BAD_REQUEST,
            TrackerError::Persistence(err) => {
                error!("Persistence failure: {err:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Decodes a request body, reporting anything undecodable as a validation error.
pub(crate) fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, TrackerError> {
    serde_json::from_slice(body)
        .map_err(|err| TrackerError::validation(format!("malformed request body: {err}")))
}
