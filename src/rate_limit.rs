/// Rate Limiting System
use crate::{
    config::RateLimitSettings,
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    authenticated: Arc<DirectLimiter>,
    anonymous: Arc<DirectLimiter>,
    admin: Arc<DirectLimiter>,
}

/// Per-second quota; zero settings fall back to the given defaults
fn quota(rps: u32, default_rps: u32, burst: u32, default_burst: u32) -> Quota {
    let nonzero = |n: u32, default: u32| {
        NonZeroU32::new(n)
            .or_else(|| NonZeroU32::new(default))
            .unwrap_or(NonZeroU32::MIN)
    };
    Quota::per_second(nonzero(rps, default_rps)).allow_burst(nonzero(burst, default_burst))
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        let auth_quota = quota(settings.authenticated_rps, 100, settings.burst_size, 50);
        // Anonymous callers get a fifth of the burst, admins double
        let anon_quota = quota(settings.anonymous_rps, 10, settings.burst_size / 5, 10);
        let admin_quota = quota(
            settings.admin_rps,
            1000,
            settings.burst_size.saturating_mul(2),
            100,
        );

        Self {
            authenticated: Arc::new(GovernorLimiter::direct(auth_quota)),
            anonymous: Arc::new(GovernorLimiter::direct(anon_quota)),
            admin: Arc::new(GovernorLimiter::direct(admin_quota)),
        }
    }

    fn check(limiter: &DirectLimiter) -> AppResult<()> {
        limiter.check().map_err(|_| AppError::RateLimitExceeded {
            retry_after: Duration::from_secs(1),
        })
    }

    /// Check rate limit for authenticated user
    pub fn check_authenticated(&self) -> AppResult<()> {
        Self::check(&self.authenticated)
    }

    /// Check rate limit for anonymous caller
    pub fn check_anonymous(&self) -> AppResult<()> {
        Self::check(&self.anonymous)
    }

    /// Check rate limit for moderation endpoints
    pub fn check_admin(&self) -> AppResult<()> {
        Self::check(&self.admin)
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let has_auth_header = request.headers().contains_key(header::AUTHORIZATION);
    let is_admin = request.uri().path().starts_with("/api/admin");

    if is_admin && has_auth_header {
        ctx.rate_limiter.check_admin()?;
    } else if has_auth_header {
        ctx.rate_limiter.check_authenticated()?;
    } else {
        ctx.rate_limiter.check_anonymous()?;
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(burst_size: u32) -> RateLimitSettings {
        RateLimitSettings {
            enabled: true,
            authenticated_rps: 10,
            anonymous_rps: 5,
            admin_rps: 100,
            burst_size,
        }
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(&settings(50));

        assert!(limiter.check_authenticated().is_ok());
        assert!(limiter.check_anonymous().is_ok());
        assert!(limiter.check_admin().is_ok());
    }

    #[test]
    fn test_burst_limit() {
        let limiter = RateLimiter::new(&settings(5));

        for _ in 0..5 {
            assert!(limiter.check_authenticated().is_ok());
        }

        assert!(matches!(
            limiter.check_authenticated(),
            Err(AppError::RateLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_zero_settings_fall_back() {
        let limiter = RateLimiter::new(&RateLimitSettings {
            enabled: true,
            authenticated_rps: 0,
            anonymous_rps: 0,
            admin_rps: 0,
            burst_size: 0,
        });

        assert!(limiter.check_anonymous().is_ok());
    }
}
