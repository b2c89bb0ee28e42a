//! Token-bucket rate limiting, keyed per host, for the token manager's HTTP
//! client (see §4.7 of the engine design). Tokens refill at a constant rate;
//! an empty bucket means the caller should back off.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

/// Refill tokens based on elapsed time and try to consume one. Returns
/// `true` if a token was consumed, `false` if rate-limited.
#[inline]
fn refill_and_try_consume(tokens: &mut f64, last_refill: &mut Instant, max_tokens: f64, window: Duration) -> bool {
    let now = Instant::now();
    let elapsed = now.duration_since(*last_refill);
    let refill = (elapsed.as_secs_f64() / window.as_secs_f64()) * max_tokens;
    *tokens = (*tokens + refill).min(max_tokens);
    *last_refill = now;

    if *tokens >= 1.0 {
        *tokens -= 1.0;
        true
    } else {
        false
    }
}

/// A token-bucket rate limiter keyed by an arbitrary type (conflux keys it
/// by request host). Each key gets its own independent bucket.
#[derive(Clone)]
pub struct RateLimiter<K> {
    buckets: Arc<DashMap<K, TokenBucket>>,
    max_tokens: f64,
    window: Duration,
}

impl<K: Eq + Hash + Clone> RateLimiter<K> {
    /// Allow `max` requests per `window` for each distinct key.
    pub fn new(max: u64, window: Duration) -> Self {
        Self { buckets: Arc::new(DashMap::new()), max_tokens: max as f64, window }
    }

    /// Try to consume one token for the given key. Returns `true` if the
    /// request is allowed, `false` if the caller should back off.
    pub fn try_acquire(&self, key: &K) -> bool {
        let mut entry = self
            .buckets
            .entry(key.clone())
            .or_insert_with(|| TokenBucket { tokens: self.max_tokens, last_refill: Instant::now() });

        let bucket = entry.value_mut();
        refill_and_try_consume(&mut bucket.tokens, &mut bucket.last_refill, self.max_tokens, self.window)
    }

    /// Wait until a token is available, polling at a fraction of the window.
    /// Used by the token manager's HTTP client so a saturated bucket
    /// back-pressures the caller instead of failing the request outright.
    pub async fn acquire(&self, key: &K) {
        loop {
            if self.try_acquire(key) {
                return;
            }
            tokio::time::sleep(self.window / (self.max_tokens.max(1.0) as u32).max(1)).await;
        }
    }
}
