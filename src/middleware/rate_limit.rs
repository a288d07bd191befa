use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{header::RETRY_AFTER, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    admitted: u32,
}

/// Fixed one-second window shared by every route behind the layer.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    per_second: u32,
    window: Arc<Mutex<Window>>,
}

impl RateLimiter {
    pub fn new(per_second: u32) -> Self {
        Self {
            per_second: per_second.max(1),
            window: Arc::new(Mutex::new(Window {
                opened_at: Instant::now(),
                admitted: 0,
            })),
        }
    }

    fn try_admit(&self, at: Instant) -> bool {
        let mut window = self
            .window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if at.duration_since(window.opened_at) >= Duration::from_secs(1) {
            window.opened_at = at;
            window.admitted = 0;
        }
        if window.admitted >= self.per_second {
            return false;
        }
        window.admitted += 1;
        true
    }
}

pub async fn rps_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.try_admit(Instant::now()) {
        tracing::debug!(path = %req.uri().path(), "request rate limited");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(RETRY_AFTER, "1")],
            Json(json!({ "error": "rate limit exceeded", "code": "rate_limited" })),
        )
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_limit_per_window() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();
        assert!(limiter.try_admit(start));
        assert!(limiter.try_admit(start));
        assert!(!limiter.try_admit(start));
        assert!(limiter.try_admit(start + Duration::from_millis(1001)));
    }

    #[test]
    fn zero_is_treated_as_one() {
        let limiter = RateLimiter::new(0);
        let start = Instant::now();
        assert!(limiter.try_admit(start));
        assert!(!limiter.try_admit(start));
    }
}
