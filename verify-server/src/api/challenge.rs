// verify-server/src/api/challenge.rs
use actix_web::{web, HttpResponse};
use common::messages::{ChallengeResponse, ErrorResponse};

use crate::service::WalletVerifier;

/// `POST /challenge`: hand out a single-use nonce when enforcement is on
pub async fn issue_challenge(verifier: web::Data<WalletVerifier>) -> HttpResponse {
    if !verifier.enforces_challenges() {
        return HttpResponse::NotFound().json(ErrorResponse::new(
            "Server-issued challenges are not enabled",
        ));
    }

    match verifier.issue_challenge().await {
        Some(challenge) => HttpResponse::Ok().json(ChallengeResponse {
            nonce: challenge.nonce,
            expires_at: challenge.expires_at,
        }),
        None => HttpResponse::InternalServerError().json(ErrorResponse::new(
            "Internal server error",
        )),
    }
}
