use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use alloy_primitives::B256;
use futures::FutureExt;
use thiserror::Error;
use tokio::time::{Instant, Interval};

use crate::provider::{Provider, ProviderError, TransactionReceipt};

#[derive(Debug, Error)]
pub enum TransactionWaitingError {
    #[error("timed out waiting for the receipt of {0:#x}")]
    Timeout(B256),
    #[error("transaction {0:#x} reverted")]
    Reverted(B256),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

type ReceiptFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<TransactionReceipt>, ProviderError>> + Send + 'a>>;

/// A future that polls the environment until the transaction is mined.
///
/// The receipt is requested every `interval` until one shows up or `timeout`
/// elapses. A receipt with a failed execution status resolves to
/// [`TransactionWaitingError::Reverted`] rather than being handed back.
pub struct TransactionWaiter<'a, P>
where
    P: Provider,
{
    tx_hash: B256,
    provider: &'a P,
    interval: Interval,
    timeout: Duration,
    started_at: Option<Instant>,
    future: Option<ReceiptFuture<'a>>,
}

impl<'a, P> TransactionWaiter<'a, P>
where
    P: Provider + Send + Sync,
{
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
    const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

    pub fn new(tx_hash: B256, provider: &'a P) -> Self {
        Self {
            provider,
            tx_hash,
            future: None,
            started_at: None,
            timeout: Self::DEFAULT_TIMEOUT,
            interval: tokio::time::interval_at(
                Instant::now() + Self::DEFAULT_INTERVAL,
                Self::DEFAULT_INTERVAL,
            ),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = tokio::time::interval_at(Instant::now() + interval, interval);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl<'a, P> Future for TransactionWaiter<'a, P>
where
    P: Provider + Send + Sync,
{
    type Output = Result<TransactionReceipt, TransactionWaitingError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let started_at = *this.started_at.get_or_insert_with(Instant::now);

        loop {
            if started_at.elapsed() > this.timeout {
                return Poll::Ready(Err(TransactionWaitingError::Timeout(this.tx_hash)));
            }

            if let Some(mut flush) = this.future.take() {
                match flush.poll_unpin(cx) {
                    Poll::Ready(Ok(Some(receipt))) => {
                        if receipt.succeeded() {
                            return Poll::Ready(Ok(receipt));
                        }
                        return Poll::Ready(Err(TransactionWaitingError::Reverted(this.tx_hash)));
                    }

                    // Not mined yet, keep polling.
                    Poll::Ready(Ok(None)) => {}

                    Poll::Ready(Err(e)) => {
                        return Poll::Ready(Err(TransactionWaitingError::Provider(e)));
                    }

                    Poll::Pending => {
                        this.future = Some(flush);
                        return Poll::Pending;
                    }
                }
            }

            if this.interval.poll_tick(cx).is_ready() {
                this.future = Some(Box::pin(this.provider.transaction_receipt(this.tx_hash)));
            } else {
                break;
            }
        }

        Poll::Pending
    }
}
