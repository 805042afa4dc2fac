// verify-server/src/api/session.rs
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use common::credential::CredentialValidator;
use common::messages::{ErrorResponse, SessionResponse};

/// `GET /session`: report the identity behind a bearer credential
pub async fn current_session(
    req: HttpRequest,
    validator: web::Data<CredentialValidator>,
) -> HttpResponse {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return HttpResponse::Unauthorized().json(ErrorResponse::new("Missing bearer credential"));
    };

    match validator.validate(token) {
        Ok(claims) => HttpResponse::Ok().json(SessionResponse {
            issued_at: claims.issued_at(),
            expires_at: claims.expires_at(),
            user_id: claims.user_id,
        }),
        Err(e) => {
            tracing::debug!("Rejected credential: {}", e);
            HttpResponse::Unauthorized().json(ErrorResponse::new("Invalid or expired credential"))
        }
    }
}
