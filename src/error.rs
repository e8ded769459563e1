//!
//! # API Error Handling
//!
//! This module defines the error type `ApiError` used throughout the application.
//! It centralizes error management, providing a consistent way to handle and represent
//! the error conditions that can occur, from authentication failures to database issues.
//!
//! Every error carries a machine-readable `error_code` and a human-readable
//! `error_description`, serialized at the HTTP boundary as
//! `{"detail": {"error_code": ..., "error_description": ...}}`. Responses with
//! status 401 additionally carry a `WWW-Authenticate: Bearer` header so clients
//! know which authentication scheme to retry with.
//!
//! `ApiError` implements `actix_web::error::ResponseError` to seamlessly convert
//! application errors into HTTP responses, and provides `From` implementations for
//! `mongodb::error::Error`, `validator::ValidationErrors`, `bson::ser::Error` and
//! `jsonwebtoken::errors::Error` so handlers can use the `?` operator.

use actix_web::http::{header, StatusCode};
use actix_web::{error::ResponseError, HttpResponse};
use lazy_static::lazy_static;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::fmt;
use validator::ValidationErrors;

/// The `detail` payload of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    pub error_code: String,
    pub error_description: String,
}

impl ErrorDetail {
    pub fn new(error_code: &str, error_description: &str) -> Self {
        ErrorDetail {
            error_code: error_code.to_string(),
            error_description: error_description.to_string(),
        }
    }
}

lazy_static! {
    /// Default detail per status code, used when an error is raised without a
    /// more specific code.
    static ref RESPONSE_DETAILS: HashMap<u16, ErrorDetail> = HashMap::from([
        (
            401,
            ErrorDetail::new("invalid_token", "The access token is invalid."),
        ),
        (
            403,
            ErrorDetail::new(
                "unauthorized_access",
                "The access to this resource is unauthorized.",
            ),
        ),
        (
            404,
            ErrorDetail::new("item_not_found", "The item was not found."),
        ),
        (
            422,
            ErrorDetail::new("validation_error", "The request input is invalid."),
        ),
        (
            500,
            ErrorDetail::new(
                "internal_server_error",
                "An internal server error has occurred.",
            ),
        ),
    ]);
}

/// Returns the default [`ErrorDetail`] for a status code.
pub fn response_detail(status: StatusCode) -> ErrorDetail {
    RESPONSE_DETAILS
        .get(&status.as_u16())
        .cloned()
        .unwrap_or_else(|| {
            ErrorDetail::new(
                "internal_server_error",
                "An internal server error has occurred.",
            )
        })
}

/// Represents all error conditions the application reports to clients.
///
/// Each variant fixes the HTTP status; the carried [`ErrorDetail`] fixes the
/// body. Authentication failures (401) are kept distinct from authorization
/// denials (403) so clients can tell "get a new token" apart from "this
/// identity may not do that".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request is not authenticated (HTTP 401): missing, malformed,
    /// expired or otherwise unverifiable bearer token.
    Unauthorized(ErrorDetail),
    /// The authenticated identity lacks the required scope, role or
    /// ownership (HTTP 403).
    Forbidden(ErrorDetail),
    /// No record matches the requested identifier (HTTP 404).
    NotFound(ErrorDetail),
    /// The request input failed validation (HTTP 422).
    Validation(ErrorDetail),
    /// An upstream failure (database, identity provider) or an unexpected
    /// internal condition (HTTP 500). Full detail is logged server-side;
    /// the carried detail is what the client is allowed to see.
    Internal(ErrorDetail),
}

impl ApiError {
    /// Generic 401 with the default `invalid_token` detail.
    pub fn unauthorized() -> Self {
        ApiError::Unauthorized(response_detail(StatusCode::UNAUTHORIZED))
    }

    /// Distinguished 401 raised when the token's expiry claim is in the past,
    /// letting clients run a silent refresh instead of a re-authentication.
    pub fn expired_token() -> Self {
        ApiError::Unauthorized(ErrorDetail::new(
            "expired_token",
            "The access token has expired.",
        ))
    }

    /// Distinguished 401 raised when the request carries no usable
    /// `Authorization` header at all.
    pub fn authorization_header_not_found() -> Self {
        ApiError::Unauthorized(ErrorDetail::new(
            "authorization_header_not_found",
            "An Authorization header must be included in the request.",
        ))
    }

    pub fn forbidden() -> Self {
        ApiError::Forbidden(response_detail(StatusCode::FORBIDDEN))
    }

    pub fn not_found() -> Self {
        ApiError::NotFound(response_detail(StatusCode::NOT_FOUND))
    }

    pub fn validation(description: impl Into<String>) -> Self {
        ApiError::Validation(ErrorDetail {
            error_code: "validation_error".to_string(),
            error_description: description.into(),
        })
    }

    /// Opaque 500 with the default detail. Callers are expected to have
    /// logged the underlying cause already.
    pub fn internal() -> Self {
        ApiError::Internal(response_detail(StatusCode::INTERNAL_SERVER_ERROR))
    }

    /// 500 carrying an upstream error code and description, used when the
    /// identity provider reports a grant failure the client must see.
    pub fn upstream(error_code: &str, error_description: &str) -> Self {
        ApiError::Internal(ErrorDetail::new(error_code, error_description))
    }

    pub fn detail(&self) -> &ErrorDetail {
        match self {
            ApiError::Unauthorized(detail)
            | ApiError::Forbidden(detail)
            | ApiError::NotFound(detail)
            | ApiError::Validation(detail)
            | ApiError::Internal(detail) => detail,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let detail = self.detail();
        write!(
            f,
            "{} {}: {}",
            self.status_code(),
            detail.error_code,
            detail.error_description
        )
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if self.status_code() == StatusCode::UNAUTHORIZED {
            builder.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }
        builder.json(json!({ "detail": self.detail() }))
    }
}

/// Converts database driver errors into an opaque 500.
///
/// The full driver error is logged server-side; no storage detail reaches
/// the client.
impl From<mongodb::error::Error> for ApiError {
    fn from(error: mongodb::error::Error) -> ApiError {
        log::error!("Database operation failed: {}", error);
        ApiError::internal()
    }
}

/// Converts BSON serialization failures into an opaque 500.
impl From<bson::ser::Error> for ApiError {
    fn from(error: bson::ser::Error) -> ApiError {
        log::error!("BSON serialization failed: {}", error);
        ApiError::internal()
    }
}

/// Converts `validator::ValidationErrors` into a 422.
///
/// The per-field validation messages are preserved in the description.
impl From<ValidationErrors> for ApiError {
    fn from(error: ValidationErrors) -> ApiError {
        ApiError::validation(error.to_string())
    }
}

/// Converts `jsonwebtoken::errors::Error` into the error taxonomy.
///
/// Expiry maps to the distinguished `expired_token` code, key-material
/// problems are logged and surfaced as an opaque 500, and every other
/// signature/claim failure collapses into the generic 401.
impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(error: jsonwebtoken::errors::Error) -> ApiError {
        use jsonwebtoken::errors::ErrorKind;
        match error.kind() {
            ErrorKind::ExpiredSignature => ApiError::expired_token(),
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat | ErrorKind::Crypto(_) => {
                log::error!("Token decoding failed unexpectedly: {}", error);
                ApiError::internal()
            }
            _ => ApiError::unauthorized(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::unauthorized().status_code(), 401);
        assert_eq!(ApiError::expired_token().status_code(), 401);
        assert_eq!(ApiError::authorization_header_not_found().status_code(), 401);
        assert_eq!(ApiError::forbidden().status_code(), 403);
        assert_eq!(ApiError::not_found().status_code(), 404);
        assert_eq!(ApiError::validation("bad input").status_code(), 422);
        assert_eq!(ApiError::internal().status_code(), 500);
    }

    #[test]
    fn test_default_details() {
        assert_eq!(ApiError::unauthorized().detail().error_code, "invalid_token");
        assert_eq!(
            ApiError::forbidden().detail().error_code,
            "unauthorized_access"
        );
        assert_eq!(ApiError::not_found().detail().error_code, "item_not_found");
        assert_eq!(
            ApiError::internal().detail().error_code,
            "internal_server_error"
        );
        assert_eq!(
            response_detail(StatusCode::IM_A_TEAPOT).error_code,
            "internal_server_error"
        );
    }

    #[test]
    fn test_unauthorized_responses_carry_www_authenticate() {
        for error in [
            ApiError::unauthorized(),
            ApiError::expired_token(),
            ApiError::authorization_header_not_found(),
        ] {
            let response = error.error_response();
            assert_eq!(response.status(), 401);
            assert_eq!(
                response
                    .headers()
                    .get(header::WWW_AUTHENTICATE)
                    .and_then(|value| value.to_str().ok()),
                Some("Bearer")
            );
        }
        let response = ApiError::forbidden().error_response();
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[actix_web::test]
    async fn test_error_body_contract() {
        let response = ApiError::not_found().error_response();
        let body = actix_web::body::to_bytes(response.into_body())
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"]["error_code"], "item_not_found");
        assert_eq!(json["detail"]["error_description"], "The item was not found.");
    }

    #[test]
    fn test_expired_jwt_error_is_distinguished() {
        let error = ApiError::from(JwtError::from(ErrorKind::ExpiredSignature));
        assert_eq!(error.detail().error_code, "expired_token");

        let error = ApiError::from(JwtError::from(ErrorKind::InvalidSignature));
        assert_eq!(error.detail().error_code, "invalid_token");

        let error = ApiError::from(JwtError::from(ErrorKind::InvalidKeyFormat));
        assert_eq!(error.status_code(), 500);
    }

    #[test]
    fn test_validation_errors_preserve_messages() {
        let error = ApiError::validation("message: length must be between 10 and 500");
        assert_eq!(error.detail().error_code, "validation_error");
        assert!(error
            .detail()
            .error_description
            .contains("length must be between 10 and 500"));
    }
}
