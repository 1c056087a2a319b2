//! Centralized error types for the Zonelink core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Application-wide error type for the Zonelink engine.
///
/// Stale slot callbacks are deliberately NOT represented here: a callback
/// whose slot id no longer matches the current occupant is discarded
/// silently, never surfaced as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum ZonelinkError {
    /// Session creation targeted a zone the control plane does not know.
    ///
    /// Surfaced to the caller; the cached session entry is cleared and the
    /// attempt is not retried automatically.
    #[error("Zone not found: {zone_id}")]
    ZoneNotFound { zone_id: String },

    /// A volume command arrived before any session existed for the zone.
    ///
    /// Such commands are dropped, never queued.
    #[error("No session established for zone {zone_id}")]
    SessionNotEstablished { zone_id: String },

    /// Volume operation attempted on a zone without single-output stepped
    /// volume control (grouped or fixed-volume zones).
    #[error("Grouped zone volume not supported: {zone_id}")]
    UnsupportedGroupedZone { zone_id: String },

    /// The request was in flight when the controller unpaired; its epoch is
    /// gone and the result must not be installed.
    #[error("Controller unpaired")]
    Unpaired,

    /// The control bridge is not connected or failed to process a request.
    #[error("Control gateway error: {0}")]
    Gateway(String),

    /// Server configuration error (missing required settings).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ZonelinkError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZoneNotFound { .. } => "zone_not_found",
            Self::SessionNotEstablished { .. } => "session_not_established",
            Self::UnsupportedGroupedZone { .. } => "unsupported_grouped_zone",
            Self::Unpaired => "unpaired",
            Self::Gateway(_) => "gateway_error",
            Self::Configuration(_) => "configuration_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ZoneNotFound { .. } => StatusCode::NOT_FOUND,
            Self::SessionNotEstablished { .. } | Self::UnsupportedGroupedZone { .. } => {
                StatusCode::CONFLICT
            }
            Self::Unpaired | Self::Gateway(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type ZonelinkResult<T> = Result<T, ZonelinkError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
}

impl IntoResponse for ZonelinkError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
