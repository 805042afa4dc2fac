// verify-server/src/main.rs
mod api;
mod challenge_registry;
mod cors;
mod error;
mod identity_resolver;
mod middleware;
mod service;
mod signature;
mod store;

use actix::Actor;
use actix_web::{web, App, HttpServer};
use common::credential::{CredentialIssuer, CredentialValidator};
use common::{setup_tracing, Config, StoreBackend};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use challenge_registry::ChallengeRegistryActor;
use identity_resolver::IdentityResolver;
use middleware::RateLimiter;
use service::WalletVerifier;
use store::{IdentityStore, MemoryIdentityStore, RestIdentityStore};

fn invalid_config(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
}

fn build_store(config: &Config) -> io::Result<Arc<dyn IdentityStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory identity store; identities are lost on restart");
            Ok(Arc::new(MemoryIdentityStore::new()))
        }
        StoreBackend::Rest => {
            tracing::info!("Using identity store at {}", config.store.url);
            let store = RestIdentityStore::new(
                &config.store.url,
                &config.store.service_key,
                &config.store.table,
            )
            .map_err(invalid_config)?;
            Ok(Arc::new(store))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    setup_tracing(&std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

    let config = Config::from_env();
    tracing::debug!("Effective configuration: {:?}", config);

    config.validate().map_err(invalid_config)?;

    let secret = config.credential.jwt_secret.as_bytes();
    let issuer =
        CredentialIssuer::new(secret, config.credential.ttl_secs).map_err(invalid_config)?;
    let validator = CredentialValidator::new(secret).map_err(invalid_config)?;

    let resolver = IdentityResolver::new(
        build_store(&config)?,
        Duration::from_millis(config.store.timeout_ms),
    );
    let mut verifier = WalletVerifier::new(resolver, issuer);

    if config.challenge.enforce {
        let registry = ChallengeRegistryActor::new()
            .with_ttl(config.challenge.ttl_secs)
            .with_cleanup_interval(config.challenge.cleanup_interval_secs)
            .start();
        verifier = verifier.with_challenges(registry);
    } else {
        tracing::warn!(
            "Server-issued challenges disabled; captured sign-in requests can be replayed"
        );
    }

    let server_addr = config.server_addr.clone();
    let allowed_origin = config.allowed_origin.clone();
    let max_payload_bytes = config.max_payload_bytes;
    let rate_limiter = RateLimiter::from_config(&config.rate_limit);

    let verifier_data = web::Data::new(verifier);
    let validator_data = web::Data::new(validator);

    tracing::info!("Starting verify-server on {}", server_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(verifier_data.clone())
            .app_data(validator_data.clone())
            .app_data(api::json_config(max_payload_bytes))
            .app_data(web::PayloadConfig::new(max_payload_bytes))
            .wrap(rate_limiter.clone())
            .wrap(cors::cors_headers(&allowed_origin))
            .configure(api::configure)
            .default_service(web::to(api::fallback))
    })
    .bind(&server_addr)?
    .run()
    .await
}
