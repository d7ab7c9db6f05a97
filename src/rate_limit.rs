/// Rate limiting
///
/// Two global token buckets: one for requests carrying a bearer token and a
/// stricter one for anonymous traffic.
use crate::{
    api::middleware::extract_bearer_token,
    config::RateLimitConfig,
    context::AppContext,
    error::{FmsError, FmsResult},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Paths that are never throttled
const EXEMPT_PATHS: [&str; 3] = ["/health", "/health/ready", "/metrics"];

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    authenticated: Arc<DirectLimiter>,
    unauthenticated: Arc<DirectLimiter>,
    clock: DefaultClock,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let burst = non_zero(config.burst_size);

        let auth_quota = Quota::per_second(non_zero(config.authenticated_rps)).allow_burst(burst);
        // Anonymous burst never exceeds the anonymous rate
        let unauth_quota = Quota::per_second(non_zero(config.unauthenticated_rps))
            .allow_burst(burst.min(non_zero(config.unauthenticated_rps)));

        Self {
            enabled: config.enabled,
            authenticated: Arc::new(GovernorLimiter::direct(auth_quota)),
            unauthenticated: Arc::new(GovernorLimiter::direct(unauth_quota)),
            clock: DefaultClock::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check rate limit for a request with credentials
    pub fn check_authenticated(&self) -> FmsResult<()> {
        self.check(&self.authenticated)
    }

    /// Check rate limit for an anonymous request
    pub fn check_unauthenticated(&self) -> FmsResult<()> {
        self.check(&self.unauthenticated)
    }

    fn check(&self, limiter: &DirectLimiter) -> FmsResult<()> {
        limiter.check().map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            FmsError::RateLimitExceeded {
                // Retry-After is whole seconds
                retry_after: Duration::from_secs(wait.as_secs().max(1)),
            }
        })
    }
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, FmsError> {
    let limiter = &ctx.rate_limiter;
    if !limiter.is_enabled() || EXEMPT_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    // Only a well-formed bearer token earns the larger bucket
    let has_auth_header = extract_bearer_token(request.headers()).is_some();

    let result = if has_auth_header {
        limiter.check_authenticated()
    } else {
        limiter.check_unauthenticated()
    };

    if let Err(e) = result {
        tracing::warn!(
            path = %request.uri().path(),
            authenticated = has_auth_header,
            "rate_limit_exceeded"
        );
        return Err(e);
    }

    Ok(next.run(request).await)
}
