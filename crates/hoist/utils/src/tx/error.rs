use alloy_primitives::B256;
use thiserror::Error;

use crate::provider::ProviderError;
use crate::tx::waiter::TransactionWaitingError;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("gas estimation failed")]
    Estimation(#[source] ProviderError),
    #[error("transaction submission failed")]
    Submission(#[source] ProviderError),
    #[error(transparent)]
    Waiting(#[from] TransactionWaitingError),
    #[error("wallet endpoint exposed no account to sign with")]
    NoAccount,
    #[error("transaction {0:#x} was confirmed without a contract address")]
    MissingContractAddress(B256),
}
