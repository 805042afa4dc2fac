// verify-server/src/api/verify.rs
use actix_web::{web, HttpResponse};
use common::messages::{VerifyWalletRequest, VerifyWalletResponse};

use crate::error::VerifyError;
use crate::service::WalletVerifier;

/// `POST /verify-wallet`
pub async fn verify_wallet(
    body: web::Json<VerifyWalletRequest>,
    verifier: web::Data<WalletVerifier>,
) -> Result<HttpResponse, VerifyError> {
    let payload = body
        .into_inner()
        .into_payload()
        .map_err(|e| VerifyError::BadRequest(e.to_string()))?;

    let credential = verifier.verify(payload).await?;
    tracing::debug!(
        "Sign-in for {} succeeded, credential valid until {}",
        credential.address,
        credential.expires_at
    );

    Ok(HttpResponse::Ok().json(VerifyWalletResponse {
        token: credential.token,
        user_id: credential.user_id,
    }))
}
