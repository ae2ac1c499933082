//! Invoker for method calls against already-deployed contracts.

use alloy_primitives::{Address, B256, U256};
use tracing::trace;

use crate::provider::{Provider, TransactionRequest};
use crate::tx::error::TransactionError;
use crate::tx::waiter::TransactionWaiter;
use crate::tx::{retry_with_backoff, TxnConfig};

#[derive(Debug)]
pub struct InvokeOutput {
    pub transaction_hash: B256,
}

/// Submits state-mutating calls to an existing contract, one at a time.
#[derive(Debug)]
pub struct Invoker<'a, P>
where
    P: Provider + Send + Sync,
{
    /// The provider submissions go through.
    pub provider: &'a P,
    /// The account the wallet endpoint signs for.
    pub sender: Address,
    /// The transaction configuration.
    pub txn_config: TxnConfig,
}

impl<'a, P> Invoker<'a, P>
where
    P: Provider + Send + Sync,
{
    pub fn new(provider: &'a P, sender: Address, txn_config: TxnConfig) -> Self {
        Self { provider, sender, txn_config }
    }

    /// Calls `to` with the ABI-encoded `calldata`, returning once mined.
    pub async fn invoke(
        &self,
        to: Address,
        calldata: String,
    ) -> Result<InvokeOutput, TransactionError> {
        let mut request = TransactionRequest {
            from: self.sender,
            to: Some(to),
            gas: None,
            gas_price: None,
            data: calldata,
        };

        let estimate = retry_with_backoff(
            self.txn_config.estimate_attempts,
            self.txn_config.estimate_backoff,
            || self.provider.estimate_gas(&request),
        )
        .await
        .map_err(TransactionError::Estimation)?;

        request.gas = Some(estimate + U256::from(self.txn_config.gas_margin));
        request.gas_price = Some(self.txn_config.gas_price);

        let transaction_hash = self
            .provider
            .send_transaction(&request)
            .await
            .map_err(TransactionError::Submission)?;

        trace!(
            transaction_hash = format!("{transaction_hash:#x}"),
            to = format!("{to:#x}"),
            "Submitted call transaction."
        );

        TransactionWaiter::new(transaction_hash, self.provider)
            .with_timeout(self.txn_config.receipt_timeout)
            .with_interval(self.txn_config.receipt_interval)
            .await?;

        Ok(InvokeOutput { transaction_hash })
    }
}
