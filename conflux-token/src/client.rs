//! HTTP client for source/destination connector calls (§4.7): per-host
//! concurrency limits, a token-bucket rate limit, exponential backoff with
//! jitter on transient failures, and a single re-authentication retry on 401.

use crate::error::TokenError;
use crate::token::TokenManager;
use conflux_rate_limit::RateLimiter;
use dashmap::DashMap;
use rand::Rng;
use reqwest::{Response, StatusCode};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(200);
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub requests_per_sec: u64,
    pub per_host_concurrency: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            requests_per_sec: 10,
            per_host_concurrency: 8,
        }
    }
}

pub struct RateLimitedHttpClient {
    limiter: RateLimiter<String>,
    host_semaphores: Arc<DashMap<String, Arc<Semaphore>>>,
    config: HttpClientConfig,
}

impl RateLimitedHttpClient {
    pub fn new(config: HttpClientConfig) -> Self {
        Self {
            limiter: RateLimiter::new(config.requests_per_sec, Duration::from_secs(1)),
            host_semaphores: Arc::new(DashMap::new()),
            config,
        }
    }

    fn semaphore_for(&self, host: &str) -> Arc<Semaphore> {
        self.host_semaphores
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.config.per_host_concurrency)))
            .clone()
    }

    /// Execute a request against `host`, retrying transient failures and
    /// refreshing credentials through `token_manager` on a single 401.
    ///
    /// `send` is called with the current bearer token on each attempt and
    /// must return a freshly-built request (headers can't be cloned across
    /// retries once consumed).
    pub async fn execute<F, Fut>(&self, host: &str, token_manager: &TokenManager, send: F) -> Result<Response, TokenError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Response, reqwest::Error>>,
    {
        let semaphore = self.semaphore_for(host);
        let mut reauthenticated = false;
        let mut last_status: Option<u16> = None;

        for attempt in 1..=self.config.max_attempts {
            self.limiter.acquire(&host.to_string()).await;
            let _permit = semaphore.acquire().await.expect("semaphore closed");

            let token = token_manager.access_token().await?;
            let response = send(token).await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            last_status = Some(status.as_u16());

            if status == StatusCode::UNAUTHORIZED && !reauthenticated {
                reauthenticated = true;
                token_manager.force_refresh().await?;
                continue;
            }

            if is_retryable(status) && attempt < self.config.max_attempts {
                let delay = retry_delay(&response, attempt, self.config.base_backoff, self.config.max_backoff);
                tracing::warn!(status = %status, attempt, delay_ms = delay.as_millis() as u64, "retrying transient HTTP failure");
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(TokenError::RetriesExhausted { attempts: attempt, last_status });
        }

        Err(TokenError::RetriesExhausted { attempts: self.config.max_attempts, last_status })
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn retry_delay(response: &Response, attempt: u32, base: Duration, max: Duration) -> Duration {
    if let Some(retry_after) = parse_retry_after(response) {
        return retry_after.min(max);
    }
    let exp = base.saturating_mul(1 << (attempt - 1).min(16));
    let jitter_ms = rand::thread_rng().gen_range(0..=(exp.as_millis() as u64 / 2).max(1));
    (exp + Duration::from_millis(jitter_ms)).min(max)
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    let header = response.headers().get(reqwest::header::RETRY_AFTER)?;
    let value = header.to_str().ok()?;
    value.parse::<u64>().ok().map(Duration::from_secs)
}
