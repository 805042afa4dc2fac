// verify-server/src/cors.rs
use actix_web::{http::header, middleware::DefaultHeaders, HttpResponse};

const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
const ALLOWED_METHODS: &str = "POST, GET, OPTIONS";

/// CORS headers attached to every response
pub fn cors_headers(allowed_origin: &str) -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed_origin.to_string()))
        .add((header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS))
        .add((header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS))
}

/// Preflight response: 200 with an empty body
pub async fn preflight() -> HttpResponse {
    HttpResponse::Ok().finish()
}
