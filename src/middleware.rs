use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    middleware::StateInformationMiddleware,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::config::LoginLimitConfig;

type KeyedLimiter =
    RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock, StateInformationMiddleware>;

const RATELIMIT_LIMIT: &str = "ratelimit-limit";
const RATELIMIT_REMAINING: &str = "ratelimit-remaining";
const RATELIMIT_RESET: &str = "ratelimit-reset";

/// Per-client-address gate for login attempts.
///
/// Each address may spend `max_requests` attempts in any span of `window`.
/// Spent attempts come back one at a time, `window` after they were used.
#[derive(Clone)]
pub struct LoginLimiter {
    inner: Arc<LimiterState>,
}

struct LimiterState {
    limiter: KeyedLimiter,
    limit: u32,
    status: StatusCode,
    message: String,
}

/// What a client has left after an accepted attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allowance {
    pub limit: u32,
    pub remaining: u32,
    /// Time until the full allowance is available again.
    pub reset: Duration,
}

impl LoginLimiter {
    pub fn new(config: &LoginLimitConfig) -> Self {
        Self::with_status(config, StatusCode::TOO_MANY_REQUESTS)
    }

    /// Like [`LoginLimiter::new`], answering rejected clients with `status`.
    pub fn with_status(config: &LoginLimitConfig, status: StatusCode) -> Self {
        let burst = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(config.window)
            .map(|quota| quota.allow_burst(burst))
            .unwrap_or_else(|| Quota::per_minute(burst));

        Self {
            inner: Arc::new(LimiterState {
                limiter: RateLimiter::keyed(quota).with_middleware::<StateInformationMiddleware>(),
                limit: burst.get(),
                status,
                message: format!(
                    "Too many login attempts from this IP, please try again after a {} second pause",
                    config.window.as_secs()
                ),
            }),
        }
    }

    pub fn message(&self) -> &str {
        &self.inner.message
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status
    }

    /// Records one attempt for `key`. On rejection, returns how long the
    /// client has to wait before the next attempt is allowed.
    pub fn check(&self, key: IpAddr) -> Result<Allowance, Duration> {
        let limiter = &self.inner.limiter;
        match limiter.check_key(&key) {
            Ok(snapshot) => {
                let quota = snapshot.quota();
                let limit = quota.burst_size().get();
                let remaining = snapshot.remaining_burst_capacity();
                Ok(Allowance {
                    limit,
                    remaining,
                    reset: quota.replenish_interval() * (limit - remaining),
                })
            }
            Err(not_until) => Err(not_until.wait_time_from(DefaultClock::default().now())),
        }
    }

    pub fn limit(&self) -> u32 {
        self.inner.limit
    }

    /// Forgets clients whose allowance has fully refilled.
    pub fn retain_recent(&self) {
        self.inner.limiter.retain_recent();
        self.inner.limiter.shrink_to_fit();
    }

    /// Runs [`LoginLimiter::retain_recent`] every `period` until aborted.
    pub fn spawn_pruning(&self, period: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                limiter.retain_recent();
            }
        })
    }

    pub fn tracked_clients(&self) -> usize {
        self.inner.limiter.len()
    }
}

fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs_f64().ceil() as u64
}

fn set_rate_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset: Duration) {
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(whole_seconds(reset)));
}

fn client_ip<B>(request: &Request<B>) -> IpAddr {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }
    forwarded_for(request.headers()).unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

pub async fn login_limiter<B>(
    State(limiter): State<LoginLimiter>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let ip = client_ip(&request);

    match limiter.check(ip) {
        Ok(allowance) => {
            let mut response = next.run(request).await;
            set_rate_limit_headers(
                response.headers_mut(),
                allowance.limit,
                allowance.remaining,
                allowance.reset,
            );
            response
        }
        Err(wait) => {
            let origin = request
                .headers()
                .get(header::ORIGIN)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            warn!(
                client = %ip,
                method = %request.method(),
                uri = %request.uri(),
                origin,
                "Too Many Requests: {}",
                limiter.message()
            );

            let mut response = (
                limiter.status(),
                Json(json!({ "message": limiter.message() })),
            )
                .into_response();
            let headers = response.headers_mut();
            set_rate_limit_headers(headers, limiter.limit(), 0, wait);
            headers.insert(
                header::RETRY_AFTER,
                HeaderValue::from(whole_seconds(wait).max(1)),
            );
            response
        }
    }
}
