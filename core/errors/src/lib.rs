//! Transport-agnostic error kinds shared across Vigilante components.
//!
//! Every fallible operation in the Cluster Coordinator returns `anyhow::Result`, but the
//! HTTP façade (and tests asserting on failure semantics) need to recover *why* an operation
//! failed without downcasting through a pile of small per-condition error structs. This crate
//! provides a single [`VigilanceError`] carrying an [`ErrorKind`] plus a human message, and maps
//! each kind onto the HTTP status the façade should return.
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use actix_web::ResponseError;
use serde::Serialize;

/// Transport-agnostic classification of a failure (spec §7).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    /// Request failed validation (empty name, negative replicas, missing target peer, ...).
    InvalidArgument,

    /// Referenced collection, snapshot or pod does not exist.
    NotFound,

    /// Transport, connect or timeout failure talking to a node or the orchestrator.
    Unreachable,

    /// Operation rejected by a downstream system (e.g. a shard transfer already in progress).
    Conflict,

    /// A multi-target operation completed with at least one failing target.
    PartialFailure,

    /// The orchestrator rejected the request on RBAC grounds.
    PermissionDenied,

    /// Unexpected failure; logged with full context.
    Internal,
}

impl ErrorKind {
    /// HTTP status this error kind maps to at the façade boundary.
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unreachable => StatusCode::BAD_GATEWAY,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            // Partial failures are reported with HTTP 200 and `success=false` in the body
            // (spec §7), never surfaced as an HTTP error status.
            ErrorKind::PartialFailure => StatusCode::OK,
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Unreachable => "Unreachable",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::PartialFailure => "PartialFailure",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::Internal => "Internal",
        };
        write!(f, "{}", text)
    }
}

/// An error with a [`ErrorKind`] classification and a human readable message.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct VigilanteError {
    pub kind: ErrorKind,
    pub message: String,
}

impl VigilanteError {
    /// Build a new [`VigilanteError`] with the given kind and message.
    pub fn new<S>(kind: ErrorKind, message: S) -> Self
    where
        S: Into<String>,
    {
        VigilanteError {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for [`ErrorKind::InvalidArgument`].
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Shorthand for [`ErrorKind::NotFound`].
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Shorthand for [`ErrorKind::Unreachable`].
    pub fn unreachable<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Unreachable, message)
    }

    /// Shorthand for [`ErrorKind::Conflict`].
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Shorthand for [`ErrorKind::PermissionDenied`].
    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    /// Shorthand for [`ErrorKind::Internal`].
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

/// Look for a [`VigilanteError`] attached anywhere in an `anyhow::Error` error chain.
///
/// Falls back to [`ErrorKind::Internal`] when the error was not raised with a known kind
/// (probe-layer errors, for example, never reach this path: spec §7 keeps them inside
/// `NodeSample` and never propagates them as a `VigilanteError`).
pub fn classify(error: &anyhow::Error) -> (ErrorKind, String) {
    match error.downcast_ref::<VigilanteError>() {
        Some(known) => (known.kind, known.message.clone()),
        None => (ErrorKind::Internal, error.to_string()),
    }
}

/// Wrapper so an `anyhow::Error` carrying a [`VigilanteError`] can be returned directly from
/// an `actix-web` handler and rendered with the correct status code and JSON body.
#[derive(Debug)]
pub struct HttpError(pub anyhow::Error);

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<anyhow::Error> for HttpError {
    fn from(error: anyhow::Error) -> Self {
        HttpError(error)
    }
}

impl ResponseError for HttpError {
    fn status_code(&self) -> StatusCode {
        classify(&self.0).0.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let (kind, message) = classify(&self.0);
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": true,
            "kind": kind,
            "message": message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_kind() {
        let error = anyhow::Error::new(VigilanteError::not_found("collection 'docs' not found"));
        let (kind, message) = classify(&error);
        assert_eq!(kind, ErrorKind::NotFound);
        assert_eq!(message, "collection 'docs' not found");
    }

    #[test]
    fn classify_unknown_defaults_internal() {
        let error = anyhow::anyhow!("boom");
        let (kind, _) = classify(&error);
        assert_eq!(kind, ErrorKind::Internal);
    }

    #[test]
    fn status_codes_match_contract() {
        assert_eq!(ErrorKind::InvalidArgument.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::PartialFailure.status_code(), StatusCode::OK);
    }
}
