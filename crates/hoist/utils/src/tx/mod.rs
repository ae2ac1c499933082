pub mod deployer;
pub mod error;
pub mod invoker;
pub mod waiter;

use std::future::Future;
use std::time::Duration;

use alloy_primitives::U256;

/// The transaction configuration to use when sending a transaction.
///
/// Fixed for the whole run: every submission prices work at `gas_price` and
/// pads the estimate with the same `gas_margin`.
#[derive(Debug, Copy, Clone)]
pub struct TxnConfig {
    /// Price per unit of gas, in wei.
    pub gas_price: U256,
    /// Flat amount of gas added on top of the estimate.
    pub gas_margin: u64,
    /// Attempts for the (read-only) gas estimation round-trip.
    pub estimate_attempts: usize,
    /// First backoff delay between estimation attempts; doubles per retry.
    pub estimate_backoff: Duration,
    /// How long to wait for a submitted transaction to be mined.
    pub receipt_timeout: Duration,
    /// Poll interval while waiting for the receipt.
    pub receipt_interval: Duration,
}

impl TxnConfig {
    pub const DEFAULT_GAS_MARGIN: u64 = 100;

    pub fn new(gas_price: U256) -> Self {
        Self { gas_price, ..Default::default() }
    }
}

impl Default for TxnConfig {
    fn default() -> Self {
        Self {
            gas_price: U256::ZERO,
            gas_margin: Self::DEFAULT_GAS_MARGIN,
            estimate_attempts: 3,
            estimate_backoff: Duration::from_secs(1),
            receipt_timeout: Duration::from_secs(120),
            receipt_interval: Duration::from_millis(1000),
        }
    }
}

/// Retries `op` up to `attempts` times, doubling the delay after each
/// failure. Only safe for idempotent round-trips such as gas estimation.
pub async fn retry_with_backoff<T, E, F, Fut>(
    attempts: usize,
    base_delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delay = base_delay;
    let mut tries = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                tries += 1;
                if tries >= attempts.max(1) {
                    return Err(err);
                }
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn backoff_stops_after_attempts_run_out() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), &str> =
            retry_with_backoff(3, Duration::from_millis(10), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("nope")
            })
            .await;

        assert_eq!(result.unwrap_err(), "nope");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_returns_first_success() {
        let calls = AtomicUsize::new(0);
        let result = retry_with_backoff(5, Duration::from_millis(10), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 { Err("transient") } else { Ok(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
