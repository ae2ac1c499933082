//! The deployer is in charge of getting new contracts onto the chain.

use alloy_primitives::{Address, B256, U256};
use tracing::trace;

use crate::provider::{Provider, TransactionRequest};
use crate::tx::error::TransactionError;
use crate::tx::waiter::TransactionWaiter;
use crate::tx::{retry_with_backoff, TxnConfig};

#[derive(Debug)]
pub struct DeployOutput {
    pub transaction_hash: B256,
    pub contract_address: Address,
}

/// Submits contract-creation transactions: estimate, send, await receipt.
#[derive(Debug)]
pub struct Deployer<'a, P>
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

impl<'a, P> Deployer<'a, P>
where
    P: Provider + Send + Sync,
{
    pub fn new(provider: &'a P, sender: Address, txn_config: TxnConfig) -> Self {
        Self { provider, sender, txn_config }
    }

    /// Deploys the given init code (constructor arguments already appended),
    /// returning once the creation transaction is mined.
    pub async fn deploy(&self, init_code: String) -> Result<DeployOutput, TransactionError> {
        let mut request = TransactionRequest {
            from: self.sender,
            to: None,
            gas: None,
            gas_price: None,
            data: init_code,
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
            gas = %request.gas.unwrap_or_default(),
            "Submitted creation transaction."
        );

        let receipt = TransactionWaiter::new(transaction_hash, self.provider)
            .with_timeout(self.txn_config.receipt_timeout)
            .with_interval(self.txn_config.receipt_interval)
            .await?;

        let contract_address = receipt
            .contract_address
            .ok_or(TransactionError::MissingContractAddress(transaction_hash))?;

        trace!(
            contract_address = format!("{contract_address:#x}"),
            "Creation transaction confirmed."
        );

        Ok(DeployOutput { transaction_hash, contract_address })
    }
}
