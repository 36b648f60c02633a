//! # Ledger Traits
//!
//! The two narrow interfaces the protocol consumes. Both are object-safe
//! and `Send + Sync` so they can be shared as `Arc<dyn _>` across
//! concurrent issuances.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatepass_core::{AccountId, Timestamp, TransactionId};

use crate::transaction::{DataEntry, SignedEnvelope};

/// Current state of a source account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub account_id: AccountId,
    /// Last consumed sequence number.
    pub sequence: u64,
}

/// Base fee per operation, in the ledger's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fee(pub u32);

/// Accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub transaction_id: TransactionId,
}

/// Ledger metadata for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
    pub id: TransactionId,
    pub successful: bool,
    /// Text memo, if the transaction carried one.
    pub memo: Option<String>,
    pub source_account: String,
    pub created_at: Timestamp,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("account {account} not found on the ledger")]
    NotFound { account: String },
    #[error("ledger unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("malformed account response: {reason}")]
    Malformed { reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The ledger definitively refused the transaction.
    #[error("transaction rejected by ledger: {code}")]
    Rejected { code: String },
    /// No answer in time. The transaction may still land.
    #[error("submission timed out; outcome unknown")]
    Timeout,
    #[error("ledger unavailable: {reason}")]
    Unavailable { reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("transaction not found")]
    NotFound,
    #[error("ledger query timed out")]
    Timeout,
    #[error("ledger unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("malformed ledger response: {reason}")]
    Malformed { reason: String },
}

/// Source of account sequence numbers and fee parameters.
#[async_trait]
pub trait AccountAccessor: Send + Sync {
    async fn load_account(&self, account: &AccountId) -> Result<AccountState, AccountError>;

    async fn base_fee(&self) -> Result<Fee, AccountError>;
}

/// Submission and query access to the ledger.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Submit a signed envelope. Implementations make exactly one attempt.
    async fn submit(&self, envelope: &SignedEnvelope) -> Result<SubmitResponse, SubmitError>;

    async fn get_transaction(&self, id: &TransactionId) -> Result<TxRecord, QueryError>;

    /// Data entries written by the transaction, in operation order.
    async fn get_operations(&self, id: &TransactionId) -> Result<Vec<DataEntry>, QueryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn traits_are_object_safe() {
        fn assert_rpc(_: Option<Arc<dyn LedgerRpc>>) {}
        fn assert_accessor(_: Option<Arc<dyn AccountAccessor>>) {}
        assert_rpc(None);
        assert_accessor(None);
    }

    #[test]
    fn error_messages_name_the_failure() {
        let e = SubmitError::Rejected {
            code: "tx_bad_seq".into(),
        };
        assert!(e.to_string().contains("tx_bad_seq"));
        assert!(SubmitError::Timeout.to_string().contains("unknown"));
    }
}
