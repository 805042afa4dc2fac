// verify-server/src/middleware/rate_limiter.rs
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header, Method, StatusCode},
    Error, HttpResponse, ResponseError,
};
use common::messages::ErrorResponse;
use common::RateLimitConfig;
use dashmap::DashMap;
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Tracked clients before idle entries are pruned
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug)]
struct RateLimitExceeded {
    retry_after: u64,
}

impl fmt::Display for RateLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rate limit exceeded")
    }
}

impl ResponseError for RateLimitExceeded {
    fn status_code(&self) -> StatusCode {
        StatusCode::TOO_MANY_REQUESTS
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::TooManyRequests()
            .append_header((header::RETRY_AFTER, self.retry_after.to_string()))
            .json(ErrorResponse::new(
                "Rate limit exceeded. Please try again later.",
            ))
    }
}

/// Sliding-window request limit per client IP on selected path prefixes
#[derive(Debug, Clone)]
pub struct RateLimiter {
    paths: Vec<String>,
    max_requests: usize,
    window: Duration,
    // Key on `Forwarded`/`X-Forwarded-For` instead of the socket peer
    trust_forwarded_for: bool,
    store: Arc<DashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(paths: Vec<String>, max_requests: usize, window: Duration) -> Self {
        Self {
            paths,
            max_requests,
            window,
            trust_forwarded_for: false,
            store: Arc::new(DashMap::new()),
        }
    }

    /// Only for deployments behind a proxy that overwrites the forwarding headers
    pub fn with_trusted_proxy(mut self, trust_forwarded_for: bool) -> Self {
        self.trust_forwarded_for = trust_forwarded_for;
        self
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.paths.clone(),
            config.max_requests,
            Duration::from_secs(config.window_secs),
        )
        .with_trusted_proxy(config.trust_forwarded_for)
    }

    fn client_key(&self, req: &ServiceRequest) -> String {
        if self.trust_forwarded_for {
            if let Some(ip) = req.connection_info().realip_remote_addr() {
                return ip.to_string();
            }
        }
        req.peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn is_rate_limited(&self, ip: &str) -> bool {
        let now = Instant::now();

        if self.store.len() > PRUNE_THRESHOLD {
            let window = self.window;
            self.store
                .retain(|_, hits| hits.iter().any(|t| now.duration_since(*t) < window));
        }

        let mut hits = self.store.entry(ip.to_string()).or_default();
        hits.retain(|time| now.duration_since(*time) < self.window);

        if hits.len() >= self.max_requests {
            true
        } else {
            hits.push(now);
            false
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.clone(),
        }))
    }
}

pub struct RateLimiterMiddleware<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();
        // Preflights carry no credentials and must not eat into the sign-in budget
        let should_rate_limit = req.method() != Method::OPTIONS
            && self.limiter.paths.iter().any(|p| path.starts_with(p));

        if should_rate_limit {
            let ip = self.limiter.client_key(&req);

            if self.limiter.is_rate_limited(&ip) {
                tracing::warn!("Rate limit exceeded for IP: {}", ip);

                // Answered here so outer middleware still decorates the response
                let rejection = RateLimitExceeded {
                    retry_after: self.limiter.window.as_secs(),
                };
                let response = req
                    .into_response(rejection.error_response())
                    .map_into_right_body();
                return Box::pin(async { Ok(response) });
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}
