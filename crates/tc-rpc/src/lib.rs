mod client;
mod retry;

pub use client::{RpcClient, TxReceipt, from_hex, to_hex, to_hex_prefixed};
pub use retry::{RetryPolicy, execute_with_retry};

use std::future::Future;
use tracing::warn;
use url::Url;

/// Errors from the fallback read path.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("http status {0}")]
    Status(u16),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("decode error: {0}")]
    Decode(String),
}

/// Ordered list of read-only fallback endpoints.
///
/// `execute_with_fallback` walks the list strictly in order, running the
/// operation under the retry executor per endpoint. When every endpoint
/// exhausts its attempts the *last* observed error is reported; later
/// failures say more about present conditions than the first one.
#[derive(Debug, Clone, Default)]
pub struct EndpointPool {
    endpoints: Vec<Url>,
}

impl EndpointPool {
    pub fn new(endpoints: Vec<Url>) -> Self {
        Self { endpoints }
    }

    /// Reads `TRACECORTEX_RPC_URLS` (comma-separated) at construction time.
    /// Unparseable entries are skipped with a warning.
    pub fn from_env() -> Self {
        let raw = std::env::var("TRACECORTEX_RPC_URLS").unwrap_or_default();
        let endpoints = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match entry.parse::<Url>() {
                Ok(url) => Some(url),
                Err(err) => {
                    warn!(endpoint = entry, %err, "skipping unparseable rpc url");
                    None
                }
            })
            .collect();
        Self { endpoints }
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    pub async fn execute_with_fallback<T, F, Fut>(
        &self,
        policy: &RetryPolicy,
        op: F,
    ) -> Result<T, RpcError>
    where
        F: Fn(Url) -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let mut last_error = RpcError::Transport("endpoint pool is empty".to_owned());
        for endpoint in &self.endpoints {
            match execute_with_retry(policy, || op(endpoint.clone())).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(endpoint = %endpoint, %err, "endpoint exhausted, advancing");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            backoff_factor: 2.0,
        }
    }

    fn pool_of(n: usize) -> EndpointPool {
        let endpoints = (0..n)
            .map(|index| format!("http://endpoint-{index}.invalid/").parse().unwrap())
            .collect();
        EndpointPool::new(endpoints)
    }

    #[tokio::test]
    async fn fallback_reaches_last_endpoint_and_reports_its_error() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("tc_rpc=debug")
            .try_init();

        let calls = Arc::new(AtomicUsize::new(0));
        let pool = pool_of(3);
        let seen = calls.clone();

        let result: Result<(), RpcError> = pool
            .execute_with_fallback(&fast_policy(2), |endpoint| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Err(RpcError::Transport(format!("down: {endpoint}")))
                }
            })
            .await;

        // 3 endpoints x 2 attempts each.
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        match result {
            Err(RpcError::Transport(message)) => {
                assert!(message.contains("endpoint-2"), "got: {message}")
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fallback_stops_at_first_healthy_endpoint() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = pool_of(3);
        let seen = calls.clone();

        let result = pool
            .execute_with_fallback(&fast_policy(2), |endpoint| {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    if endpoint.host_str() == Some("endpoint-2.invalid") {
                        Ok(endpoint.to_string())
                    } else {
                        Err(RpcError::Transport("down".to_owned()))
                    }
                }
            })
            .await
            .unwrap();

        assert!(result.contains("endpoint-2"));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn empty_pool_fails_without_calling_anything() {
        let pool = EndpointPool::default();
        let result: Result<(), RpcError> = pool
            .execute_with_fallback(&fast_policy(3), |_| async { Ok(()) })
            .await;
        assert!(matches!(result, Err(RpcError::Transport(_))));
    }
}
