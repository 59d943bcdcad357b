//! Backoff between service discovery passes.
//!
//! A discovery pass walks the candidate versions newest first. When a lookup
//! fails transiently (the service is restarting and not yet registered) the
//! pass is abandoned with [`RpcError::TransportRetryable`], and
//! [`retry_with_backoff`] runs a fresh pass after an exponentially growing,
//! jittered delay. Any other outcome ends discovery immediately.

use std::collections::hash_map::RandomState;
use std::future::Future;
use std::hash::BuildHasher;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::{log_debug, log_warn};
use crate::{Result, RpcError};

/// Discovery retry settings.
///
/// Configure through [`SessionConfig::discovery_retry`](crate::SessionConfig)
/// or the `discovery_retry_*` methods of
/// [`RadioConfigBuilder`](crate::RadioConfigBuilder).
///
/// # Example
///
/// ```
/// use radio_config_rpc::RetryConfig;
/// use std::time::Duration;
///
/// let retry_config = RetryConfig {
///     max_attempts: 5,
///     multiplier: 2.0,
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(10),
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Extra discovery passes after the first (0 = first pass only).
    pub max_attempts: u32,

    /// Growth factor of the delay between passes.
    pub multiplier: f32,

    /// Delay before the second pass.
    pub initial_delay: Duration,

    /// Upper bound on the delay between passes.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    /// 3 extra passes, starting at 100ms, doubling, capped at 5s.
    fn default() -> Self {
        // ---
        Self {
            max_attempts: 3,
            multiplier: 2.0,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Un-jittered delays before each extra pass.
    fn schedule(&self) -> Backoff {
        Backoff {
            next: self.initial_delay,
            multiplier: f64::from(self.multiplier),
            max: self.max_delay,
            remaining: self.max_attempts,
        }
    }
}

/// Capped exponential delay sequence of bounded length.
struct Backoff {
    next: Duration,
    multiplier: f64,
    max: Duration,
    remaining: u32,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        // ---
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let delay = self.next.min(self.max);
        self.next = Duration::from_secs_f64(delay.as_secs_f64() * self.multiplier).min(self.max);
        Some(delay)
    }
}

/// Run discovery passes until one succeeds, fails permanently, or the retry
/// budget is spent.
///
/// Without a `retry_config` exactly one pass runs. Only
/// [`RpcError::TransportRetryable`] starts another pass; the last transient
/// error is returned once the budget is spent.
pub(crate) async fn retry_with_backoff<F, Fut, T>(
    retry_config: Option<&RetryConfig>,
    mut pass: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    // ---
    let mut delays = match retry_config {
        Some(cfg) => cfg.schedule(),
        None => return pass().await,
    };

    let mut attempt = 1u32;
    loop {
        let details = match pass().await {
            Err(RpcError::TransportRetryable(details)) => details,
            outcome => return outcome,
        };

        let Some(delay) = delays.next() else {
            log_warn!("discovery gave up after {attempt} passes: {details}");
            return Err(RpcError::TransportRetryable(details));
        };

        let delay = apply_jitter(delay);
        log_debug!("discovery pass {attempt} interrupted ({details}), next pass in {delay:?}");

        sleep(delay).await;
        attempt += 1;
    }
}

/// Scale `delay` by a random factor in `[0.75, 1.25)`.
fn apply_jitter(delay: Duration) -> Duration {
    // ---
    let seed = RandomState::new().hash_one(std::time::SystemTime::now());
    let factor = 0.75 + (seed % 1000) as f64 / 2000.0;
    delay.mul_f64(factor)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::HalVersion;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            multiplier: 2.0,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
        }
    }

    fn interrupted() -> RpcError {
        RpcError::TransportRetryable("lookup interrupted".into())
    }

    #[test]
    fn test_schedule_grows_and_caps() {
        // ---
        let cfg = RetryConfig {
            max_attempts: 5,
            multiplier: 3.0,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        };
        let delays: Vec<u64> = cfg.schedule().map(|d| d.as_millis() as u64).collect();
        assert_eq!(delays, vec![10, 30, 50, 50, 50]);
        assert_eq!(fast(0).schedule().count(), 0);
    }

    #[tokio::test]
    async fn test_no_config_runs_one_pass() {
        // ---
        let passes = AtomicU32::new(0);

        let result: Result<()> = retry_with_backoff(None, || {
            passes.fetch_add(1, Ordering::SeqCst);
            async { Err(interrupted()) }
        })
        .await;

        assert_eq!(result, Err(interrupted()));
        assert_eq!(passes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_passes_until_service_registers() {
        // ---
        let passes = AtomicU32::new(0);

        let result = retry_with_backoff(Some(&fast(3)), || {
            let pass = passes.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if pass < 3 {
                    Err(interrupted())
                } else {
                    Ok(HalVersion::V1_3)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(HalVersion::V1_3));
        assert_eq!(passes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        // ---
        let passes = AtomicU32::new(0);

        let result: Result<()> = retry_with_backoff(Some(&fast(2)), || {
            passes.fetch_add(1, Ordering::SeqCst);
            async { Err(interrupted()) }
        })
        .await;

        assert_eq!(result, Err(interrupted()));
        assert_eq!(passes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unavailable_ends_discovery() {
        // ---
        let passes = AtomicU32::new(0);

        let result: Result<()> = retry_with_backoff(Some(&RetryConfig::default()), || {
            passes.fetch_add(1, Ordering::SeqCst);
            async { Err(RpcError::Unavailable) }
        })
        .await;

        assert_eq!(result, Err(RpcError::Unavailable));
        assert_eq!(passes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delay_cap_bounds_total_wait() {
        // ---
        let cfg = RetryConfig {
            max_attempts: 5,
            multiplier: 10.0,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(50),
        };
        let start = Instant::now();

        let _: Result<()> = retry_with_backoff(Some(&cfg), || async { Err(interrupted()) }).await;

        // 10 + 4 * 50ms, at most +25% jitter each
        let elapsed = start.elapsed();
        assert!(elapsed < Duration::from_millis(400), "waited {elapsed:?}");
    }

    #[test]
    fn test_jitter_bounds() {
        // ---
        for _ in 0..100 {
            let jittered = apply_jitter(Duration::from_millis(100));
            assert!(jittered >= Duration::from_millis(75), "{jittered:?}");
            assert!(jittered < Duration::from_millis(125), "{jittered:?}");
        }
    }

    #[test]
    fn test_config_from_json() {
        // ---
        let json = r#"{
            "max_attempts": 4,
            "multiplier": 1.5,
            "initial_delay": { "secs": 0, "nanos": 50000000 },
            "max_delay": { "secs": 2, "nanos": 0 }
        }"#;

        let cfg: RetryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.max_attempts, 4);
        assert_eq!(cfg.initial_delay, Duration::from_millis(50));
        assert_eq!(cfg.max_delay, Duration::from_secs(2));
    }
}
