//! # In-Memory Ledger
//!
//! A deterministic, in-process ledger implementing [`AccountAccessor`] and
//! [`LedgerRpc`]. It applies the same acceptance rules a real ledger would
//! check for a pass transaction (network, signatures present, sequence,
//! fee, time bounds) so rejection paths can be exercised without a network.
//! Signatures are required to be present but are not cryptographically
//! verified.
//!
//! Test hooks let callers tamper with stored entries, inject failures, and
//! delay submissions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use gatepass_core::{AccountId, Timestamp, TransactionId};

use crate::network::Network;
use crate::rpc::{
    AccountAccessor, AccountError, AccountState, Fee, LedgerRpc, QueryError, SubmitError,
    SubmitResponse, TxRecord,
};
use crate::transaction::{DataEntry, SignedEnvelope};

/// How accepted transactions are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxIdScheme {
    /// Lowercase hex transaction hash, as a real ledger assigns.
    Hash,
    /// `{prefix}1`, `{prefix}2`, ... in acceptance order.
    Sequential { prefix: String },
}

#[derive(Debug, Clone)]
struct StoredTransaction {
    record: TxRecord,
    entries: Vec<DataEntry>,
}

#[derive(Debug)]
struct LedgerState {
    accounts: HashMap<AccountId, u64>,
    base_fee: u32,
    transactions: HashMap<TransactionId, StoredTransaction>,
    accepted: u64,
    fail_next_submit: Option<SubmitError>,
    submit_delay: Option<Duration>,
    offline: bool,
}

/// In-process ledger for tests and offline runs.
#[derive(Debug)]
pub struct InMemoryLedger {
    network: Network,
    id_scheme: TxIdScheme,
    state: Mutex<LedgerState>,
    submissions: AtomicU64,
}

impl InMemoryLedger {
    /// Default base fee, matching the public network minimum.
    pub const DEFAULT_BASE_FEE: u32 = 100;

    pub fn new(network: Network) -> Self {
        Self {
            network,
            id_scheme: TxIdScheme::Hash,
            state: Mutex::new(LedgerState {
                accounts: HashMap::new(),
                base_fee: Self::DEFAULT_BASE_FEE,
                transactions: HashMap::new(),
                accepted: 0,
                fail_next_submit: None,
                submit_delay: None,
                offline: false,
            }),
            submissions: AtomicU64::new(0),
        }
    }

    /// Name accepted transactions `{prefix}1`, `{prefix}2`, ...
    pub fn with_sequential_ids(mut self, prefix: impl Into<String>) -> Self {
        self.id_scheme = TxIdScheme::Sequential {
            prefix: prefix.into(),
        };
        self
    }

    pub fn with_account(self, account: AccountId, sequence: u64) -> Self {
        self.fund_account(account, sequence);
        self
    }

    pub fn with_base_fee(self, fee: u32) -> Self {
        self.state.lock().base_fee = fee;
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Create or reset an account.
    pub fn fund_account(&self, account: AccountId, sequence: u64) {
        self.state.lock().accounts.insert(account, sequence);
    }

    pub fn account_sequence(&self, account: &AccountId) -> Option<u64> {
        self.state.lock().accounts.get(account).copied()
    }

    /// Replace the stored entries of a transaction.
    pub fn set_operations(&self, id: &TransactionId, entries: Vec<DataEntry>) {
        if let Some(tx) = self.state.lock().transactions.get_mut(id) {
            tx.entries = entries;
        }
    }

    /// Replace the stored memo of a transaction.
    pub fn set_memo(&self, id: &TransactionId, memo: Option<String>) {
        if let Some(tx) = self.state.lock().transactions.get_mut(id) {
            tx.record.memo = memo;
        }
    }

    pub fn set_successful(&self, id: &TransactionId, successful: bool) {
        if let Some(tx) = self.state.lock().transactions.get_mut(id) {
            tx.record.successful = successful;
        }
    }

    /// Store a transaction directly, bypassing submission.
    pub fn insert_transaction(&self, record: TxRecord, entries: Vec<DataEntry>) {
        self.state
            .lock()
            .transactions
            .insert(record.id.clone(), StoredTransaction { record, entries });
    }

    /// Fail the next submission with `error` without applying it.
    pub fn fail_next_submit(&self, error: SubmitError) {
        self.state.lock().fail_next_submit = Some(error);
    }

    /// Delay every submission by `delay` before it is applied.
    pub fn set_submit_delay(&self, delay: Option<Duration>) {
        self.state.lock().submit_delay = delay;
    }

    /// Make every call fail as unavailable.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    /// Number of submissions received, accepted or not.
    pub fn submit_count(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn transaction_count(&self) -> usize {
        self.state.lock().transactions.len()
    }

    fn unavailable() -> String {
        "in-memory ledger is offline".to_string()
    }

    fn apply(&self, envelope: &SignedEnvelope) -> Result<SubmitResponse, SubmitError> {
        let reject = |code: &str| SubmitError::Rejected {
            code: code.to_string(),
        };
        let tx = envelope.transaction().map_err(|_| reject("tx_malformed"))?;
        let hash = envelope.hash().map_err(|_| reject("tx_malformed"))?;
        if envelope.network() != &self.network {
            return Err(reject("tx_bad_auth"));
        }
        if envelope.signatures().is_empty() {
            return Err(reject("tx_bad_auth"));
        }

        let now = Timestamp::now();
        let mut state = self.state.lock();
        if let Some(err) = state.fail_next_submit.take() {
            return Err(err);
        }
        if state.offline {
            return Err(SubmitError::Unavailable {
                reason: Self::unavailable(),
            });
        }
        let current = *state
            .accounts
            .get(&tx.source_account)
            .ok_or_else(|| reject("tx_no_source_account"))?;
        if tx.sequence != current.saturating_add(1) {
            return Err(reject("tx_bad_seq"));
        }
        let min_fee = u64::from(state.base_fee) * tx.operation_count().max(1) as u64;
        if u64::from(tx.fee) < min_fee {
            return Err(reject("tx_insufficient_fee"));
        }
        let now_secs = u64::try_from(now.epoch_secs()).unwrap_or(0);
        if tx.time_bounds.is_expired_at(now_secs) {
            return Err(reject("tx_too_late"));
        }
        if now_secs < tx.time_bounds.min_time {
            return Err(reject("tx_too_early"));
        }

        state.accepted += 1;
        let raw_id = match &self.id_scheme {
            TxIdScheme::Hash => hash.to_hex(),
            TxIdScheme::Sequential { prefix } => format!("{prefix}{}", state.accepted),
        };
        let id = TransactionId::new(raw_id).map_err(|_| reject("tx_internal_error"))?;
        state.accounts.insert(tx.source_account.clone(), tx.sequence);
        state.transactions.insert(
            id.clone(),
            StoredTransaction {
                record: TxRecord {
                    id: id.clone(),
                    successful: true,
                    memo: Some(tx.memo.as_str().to_string()).filter(|m| !m.is_empty()),
                    source_account: tx.source_account.to_string(),
                    created_at: now,
                },
                entries: tx.entries,
            },
        );
        tracing::info!(transaction_id = %id, "in-memory ledger accepted transaction");
        Ok(SubmitResponse { transaction_id: id })
    }

    fn stored(&self, id: &TransactionId) -> Result<StoredTransaction, QueryError> {
        let state = self.state.lock();
        if state.offline {
            return Err(QueryError::Unavailable {
                reason: Self::unavailable(),
            });
        }
        state
            .transactions
            .get(id)
            .cloned()
            .ok_or(QueryError::NotFound)
    }
}

#[async_trait]
impl AccountAccessor for InMemoryLedger {
    async fn load_account(&self, account: &AccountId) -> Result<AccountState, AccountError> {
        let state = self.state.lock();
        if state.offline {
            return Err(AccountError::Unavailable {
                reason: Self::unavailable(),
            });
        }
        state
            .accounts
            .get(account)
            .map(|&sequence| AccountState {
                account_id: account.clone(),
                sequence,
            })
            .ok_or_else(|| AccountError::NotFound {
                account: account.to_string(),
            })
    }

    async fn base_fee(&self) -> Result<Fee, AccountError> {
        let state = self.state.lock();
        if state.offline {
            return Err(AccountError::Unavailable {
                reason: Self::unavailable(),
            });
        }
        Ok(Fee(state.base_fee))
    }
}

#[async_trait]
impl LedgerRpc for InMemoryLedger {
    async fn submit(&self, envelope: &SignedEnvelope) -> Result<SubmitResponse, SubmitError> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.lock().submit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.apply(envelope);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "in-memory ledger refused submission");
        }
        result
    }

    async fn get_transaction(&self, id: &TransactionId) -> Result<TxRecord, QueryError> {
        self.stored(id).map(|tx| tx.record)
    }

    async fn get_operations(&self, id: &TransactionId) -> Result<Vec<DataEntry>, QueryError> {
        self.stored(id).map(|tx| tx.entries)
    }
}
