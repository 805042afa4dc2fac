// verify-server/src/api/mod.rs
pub mod challenge;
pub mod session;
pub mod verify;

use actix_web::{http::Method, web, HttpRequest, HttpResponse};
use common::messages::ErrorResponse;

use crate::cors::preflight;
use crate::error::VerifyError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/verify-wallet")
            .route(web::post().to(verify::verify_wallet))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/challenge")
            .route(web::post().to(challenge::issue_challenge))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/session")
            .route(web::get().to(session::current_session))
            .route(web::method(Method::OPTIONS).to(preflight))
            .default_service(web::to(method_not_allowed)),
    );
}

/// JSON extractor settings: bounded bodies, typed rejection on bad input
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .content_type_required(false)
        .error_handler(|err, _req| {
            tracing::debug!("Rejected request body: {}", err);
            VerifyError::BadRequest(err.to_string()).into()
        })
}

async fn method_not_allowed() -> Result<HttpResponse, VerifyError> {
    Err(VerifyError::MethodNotAllowed)
}

/// Unmatched routes: preflight for any path, 404 otherwise
pub async fn fallback(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        return preflight().await;
    }
    HttpResponse::NotFound().json(ErrorResponse::new("Not found"))
}
