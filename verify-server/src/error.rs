// verify-server/src/error.rs
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use common::credential::CredentialError;
use common::messages::ErrorResponse;
use thiserror::Error;

use crate::store::StoreError;

/// Failures at the sign-in boundary, each mapped to one HTTP status
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Signature verification failed")]
    Unauthorized,

    #[error("Challenge rejected")]
    ChallengeRejected,

    #[error("{}", .0.client_message())]
    IdentityResolutionFailed(#[from] StoreError),

    #[error("Failed to issue credential")]
    IssuanceFailed(#[source] CredentialError),

    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl ResponseError for VerifyError {
    fn status_code(&self) -> StatusCode {
        match self {
            VerifyError::BadRequest(_)
            | VerifyError::IdentityResolutionFailed(_)
            | VerifyError::IssuanceFailed(_) => StatusCode::BAD_REQUEST,
            VerifyError::Unauthorized | VerifyError::ChallengeRejected => StatusCode::UNAUTHORIZED,
            VerifyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Display never carries signing or transport internals; only the
        // store's own message is passed through
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            VerifyError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(VerifyError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            VerifyError::ChallengeRejected.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            VerifyError::IdentityResolutionFailed(StoreError::Timeout).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VerifyError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }

    #[test]
    fn test_issuance_failure_hides_details() {
        let err = VerifyError::IssuanceFailed(CredentialError::EmptySecret);
        assert_eq!(err.to_string(), "Failed to issue credential");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_message_passed_through() {
        let err = VerifyError::from(StoreError::Backend("duplicate key".into()));
        assert_eq!(err.to_string(), "duplicate key");
    }

    #[test]
    fn test_store_timeout_is_generic() {
        let err = VerifyError::from(StoreError::Timeout);
        assert_eq!(err.to_string(), "Identity store unavailable");
    }
}
