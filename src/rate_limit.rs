//! Fixed-window rate limiting per client IP, counted in the cache.
//!
//! The client is the socket peer. Forwarding headers are only honoured when the peer is one
//! of the configured trusted proxies, since anyone else can put whatever they like in them.

use std::rc::Rc;
use std::time::Duration;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue, RETRY_AFTER},
    Error, HttpResponse,
};
use chrono::Utc;
use futures::future::{ready, LocalBoxFuture, Ready};
use serde_json::json;

use crate::cache::{keys, CacheStore};
use crate::config::Config;

/// Outcome of counting one request against its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Unix timestamp (seconds) at which the window is reported to reset.
    pub reset_at: i64,
}

#[derive(Clone)]
pub struct RateLimiter {
    store: CacheStore,
    max_requests: u64,
    window: Duration,
    trusted_proxies: Vec<String>,
}

impl RateLimiter {
    pub fn new(store: CacheStore, max_requests: u64, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
            trusted_proxies: Vec::new(),
        }
    }

    pub fn from_config(store: CacheStore, config: &Config) -> Self {
        Self::new(
            store,
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_seconds),
        )
        .with_trusted_proxies(config.trusted_proxies.clone())
    }

    pub fn with_trusted_proxies(mut self, proxies: Vec<String>) -> Self {
        self.trusted_proxies = proxies;
        self
    }

    /// Address the request is counted against.
    pub fn client_ip(&self, req: &ServiceRequest) -> String {
        let Some(peer) = req.peer_addr().map(|addr| addr.ip().to_string()) else {
            return "unknown".to_string();
        };
        if !self.trusted_proxies.contains(&peer) {
            return peer;
        }
        req.connection_info()
            .realip_remote_addr()
            .map(String::from)
            .unwrap_or(peer)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Counts a request from `ip`. The first `max_requests` in a window are allowed.
    ///
    /// When the cache cannot be reached the request is let through.
    pub async fn check(&self, ip: &str) -> Decision {
        let reset_at = Utc::now().timestamp() + self.window.as_secs() as i64;
        let count = match self
            .store
            .incr_with_ttl(&keys::rate_limit(ip), self.window)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                log::warn!("rate limiter unavailable, allowing {}: {}", ip, e);
                0
            }
        };

        Decision {
            allowed: count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(count),
            reset_at,
        }
    }
}

/// Middleware applying a [`RateLimiter`] to every request it wraps.
pub struct RateLimit {
    limiter: Rc<RateLimiter>,
}

impl RateLimit {
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            limiter: Rc::new(limiter),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
            limiter: Rc::clone(&self.limiter),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
    limiter: Rc<RateLimiter>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = Rc::clone(&self.limiter);

        Box::pin(async move {
            let ip = limiter.client_ip(&req);
            let decision = limiter.check(&ip).await;

            if !decision.allowed {
                let window = limiter.window().as_secs();
                log::debug!("rate limit exceeded for {}", ip);
                let response = HttpResponse::TooManyRequests()
                    .insert_header((RETRY_AFTER, window.to_string()))
                    .json(json!({
                        "statusCode": 429,
                        "message": "Too Many Requests",
                        "retryAfter": window,
                    }));
                return Ok(req.into_response(response).map_into_right_body());
            }

            let mut res = service.call(req).await?;
            let headers = res.headers_mut();
            headers.insert(
                HeaderName::from_static("x-ratelimit-limit"),
                HeaderValue::from(decision.limit),
            );
            headers.insert(
                HeaderName::from_static("x-ratelimit-remaining"),
                HeaderValue::from(decision.remaining),
            );
            headers.insert(
                HeaderName::from_static("x-ratelimit-reset"),
                HeaderValue::from(decision.reset_at),
            );
            Ok(res.map_into_left_body())
        })
    }
}
