use std::time::{Duration, Instant};

use moka::{Expiry, future::Cache};
use once_cell::sync::Lazy;

use crate::auth::jwt::now;

/// Keeps a revoked token id until the token would have expired anyway.
struct UntilTokenExpiry;

impl Expiry<String, usize> for UntilTokenExpiry {
    fn expire_after_create(&self, _jti: &String, exp: &usize, _created_at: Instant) -> Option<Duration> {
        Some(Duration::from_secs(exp.saturating_sub(now()) as u64))
    }
}

/// jti -> token expiry (unix seconds)
static REVOKED_SESSIONS: Lazy<Cache<String, usize>> = Lazy::new(|| {
    Cache::builder()
        .expire_after(UntilTokenExpiry)
        .build()
});

pub async fn revoke(jti: &str, exp: usize) {
    REVOKED_SESSIONS.insert(jti.to_string(), exp).await;
}

pub fn is_revoked(jti: &str) -> bool {
    REVOKED_SESSIONS.contains_key(jti)
}
