use std::net::IpAddr;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;

use crate::error::AppError;
use crate::middleware::context::client_ip;
use crate::state::SharedState;

/// Fixed-window request limiter keyed by client IP.
pub struct ApiRateLimiter {
    /// ip -> (count, window_start)
    entries: DashMap<IpAddr, (u32, Instant)>,
    limit: u32,
    window: Duration,
}

impl ApiRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
        }
    }

    /// Check if request is allowed. Returns Ok(()) or Err with retry-after seconds.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let now = Instant::now();

        let mut entry = self.entries.entry(ip).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) >= self.window {
            *count = 1;
            *start = now;
            return Ok(());
        }

        if *count >= self.limit {
            let remaining = self.window.saturating_sub(now.duration_since(*start));
            return Err(remaining.as_secs().max(1));
        }

        *count += 1;
        Ok(())
    }

    /// Drop entries whose window has elapsed.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let window = self.window;
        self.entries
            .retain(|_, (_, start)| now.duration_since(*start) < window);
    }

    pub fn tracked(&self) -> usize {
        self.entries.len()
    }
}

pub async fn limit_requests(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&req, &state.config.trusted_proxies);

    if let Err(retry_after) = state.limiter.check(ip) {
        tracing::warn!("Rate limit exceeded for {ip}");
        return AppError::RateLimited(
            "Demasiadas solicitudes desde esta IP, por favor intente más tarde".to_string(),
            retry_after,
        )
        .into_response();
    }

    next.run(req).await
}
