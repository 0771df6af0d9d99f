//! Per-IP request throttling.
//!
//! Classic token-bucket: each client IP earns `rps` tokens per second
//! up to `burst`, and every request spends one. Buckets live in memory;
//! a background task evicts entries that have been idle long enough to
//! refill completely.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    touched: Instant,
}

/// Shared per-IP throttle state.
#[derive(Clone)]
pub struct IpThrottle {
    buckets: Arc<Mutex<HashMap<IpAddr, Bucket>>>,
    rps: f64,
    burst: f64,
}

impl IpThrottle {
    pub fn new(rps: f64, burst: f64) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rps,
            burst,
        }
    }

    /// Spend one token for `ip`. Returns `false` when the bucket is
    /// empty and the request should be rejected.
    pub async fn allow(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;

        let bucket = buckets.entry(ip).or_insert(Bucket {
            tokens: self.burst,
            touched: now,
        });

        let refill = now.duration_since(bucket.touched).as_secs_f64() * self.rps;
        bucket.tokens = (bucket.tokens + refill).min(self.burst);
        bucket.touched = now;

        if bucket.tokens < 1.0 {
            return false;
        }
        bucket.tokens -= 1.0;
        true
    }

    /// Drop buckets idle for at least `max_idle_secs`.
    pub async fn evict_idle(&self, max_idle_secs: f64) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        buckets.retain(|_, b| now.duration_since(b.touched).as_secs_f64() < max_idle_secs);
    }
}

/// Axum middleware applying the throttle to every request.
pub async fn throttle_middleware(
    State(throttle): State<IpThrottle>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(ip) = client_ip(&req) {
        if !throttle.allow(ip).await {
            warn!(ip = %ip, "rate limit exceeded");
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    Ok(next.run(req).await)
}

/// Try ConnectInfo first, then X-Forwarded-For, then X-Real-IP.
fn client_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    if let Some(connect_info) = req.extensions().get::<ConnectInfo<std::net::SocketAddr>>() {
        return Some(connect_info.0.ip());
    }

    let header_ip = |name: &str| -> Option<IpAddr> {
        let value = req.headers().get(name)?.to_str().ok()?;
        value.split(',').next()?.trim().parse().ok()
    };

    header_ip("x-forwarded-for").or_else(|| header_ip("x-real-ip"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_then_reject() {
        let throttle = IpThrottle::new(10.0, 3.0);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for _ in 0..3 {
            assert!(throttle.allow(ip).await);
        }
        assert!(!throttle.allow(ip).await);
    }

    #[tokio::test]
    async fn buckets_are_per_ip() {
        let throttle = IpThrottle::new(10.0, 1.0);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(throttle.allow(a).await);
        assert!(!throttle.allow(a).await);
        assert!(throttle.allow(b).await);
    }

    #[tokio::test]
    async fn eviction_clears_idle_buckets() {
        let throttle = IpThrottle::new(10.0, 3.0);
        let ip: IpAddr = "192.168.1.1".parse().unwrap();
        assert!(throttle.allow(ip).await);

        throttle.evict_idle(0.0).await;
        assert!(throttle.buckets.lock().await.is_empty());
    }
}
