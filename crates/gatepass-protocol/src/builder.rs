//! # Transaction Builder
//!
//! Turns an [`UnsignedEntrySet`] into an [`UnsignedPassTransaction`] bound
//! to a source account, network and fee, and encodes it to XDR exactly
//! once.
//!
//! Building is pure. The only I/O is [`TransactionBuilder::prepare`], which
//! loads the account sequence and base fee up front so that a stale or
//! missing account is reported before anything is signed.

use std::time::Duration;

use thiserror::Error;

use gatepass_core::{AccountId, IdentityFacts, PassId, PhotoReference, Timestamp};
use gatepass_ledger::{
    AccountAccessor, AccountState, DataEntry, EntryError, EnvelopeError, Fee, Network,
    TimeBounds, UnsignedPassTransaction,
};

use crate::codec::{self, EncodingError, UnsignedEntrySet, KEY_GATE_PASS_ID};

/// Account and fee parameters read from the ledger before building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    pub account: AccountState,
    pub base_fee: Fee,
}

/// A built transaction together with the XDR bytes that will be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTransaction {
    pub transaction: UnsignedPassTransaction,
    pub bytes: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("could not load source account state: {reason}")]
    StaleAccountState { reason: String },
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("invalid ledger entry: {0}")]
    InvalidEntry(#[from] EntryError),
    #[error("failed to encode transaction: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("transaction fee overflows")]
    FeeOverflow,
    #[error("account sequence overflows")]
    SequenceOverflow,
    #[error("validity window of {timeout:?} from {now} is not representable")]
    TimeBoundsOverflow { now: Timestamp, timeout: Duration },
}

/// Builds pass transactions for one network.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    network: Network,
    timeout: Duration,
}

impl TransactionBuilder {
    /// How long a built transaction stays submittable.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(network: Network) -> Self {
        Self {
            network,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Load the source account and base fee.
    pub async fn prepare(
        &self,
        accounts: &dyn AccountAccessor,
        source: &AccountId,
    ) -> Result<LedgerState, BuildError> {
        let account = accounts
            .load_account(source)
            .await
            .map_err(|e| BuildError::StaleAccountState {
                reason: e.to_string(),
            })?;
        let base_fee = accounts
            .base_fee()
            .await
            .map_err(|e| BuildError::StaleAccountState {
                reason: e.to_string(),
            })?;
        tracing::debug!(
            account = %source,
            sequence = account.sequence,
            base_fee = base_fee.0,
            "loaded source account"
        );
        Ok(LedgerState { account, base_fee })
    }

    /// Encode the facts and build the transaction, valid from now.
    pub fn build(
        &self,
        facts: &IdentityFacts,
        photo: &PhotoReference,
        pass_id: &PassId,
        state: &LedgerState,
    ) -> Result<BuiltTransaction, BuildError> {
        self.build_at(facts, photo, pass_id, state, Timestamp::now())
    }

    pub fn build_at(
        &self,
        facts: &IdentityFacts,
        photo: &PhotoReference,
        pass_id: &PassId,
        state: &LedgerState,
        now: Timestamp,
    ) -> Result<BuiltTransaction, BuildError> {
        let entry_set = codec::encode(facts, photo)?;
        self.assemble(entry_set, pass_id, state, now)
    }

    /// Attach an already encoded entry set to the account.
    ///
    /// The `gate_pass_id` entry goes first, followed by the fact entries in
    /// codec order. One operation per entry.
    pub fn assemble(
        &self,
        entry_set: UnsignedEntrySet,
        pass_id: &PassId,
        state: &LedgerState,
        now: Timestamp,
    ) -> Result<BuiltTransaction, BuildError> {
        let mut entries = Vec::with_capacity(entry_set.entries.len() + 1);
        entries.push(DataEntry::new(KEY_GATE_PASS_ID, pass_id.as_str())?);
        entries.extend(entry_set.entries);

        let sequence = state
            .account
            .sequence
            .checked_add(1)
            .ok_or(BuildError::SequenceOverflow)?;
        let ops = u32::try_from(entries.len()).map_err(|_| BuildError::FeeOverflow)?;
        let fee = state
            .base_fee
            .0
            .checked_mul(ops)
            .ok_or(BuildError::FeeOverflow)?;
        // max_time 0 would mean "never expires", so overflow is an error.
        let max_time = now
            .checked_add(self.timeout)
            .and_then(|t| u64::try_from(t.epoch_secs()).ok())
            .ok_or(BuildError::TimeBoundsOverflow {
                now,
                timeout: self.timeout,
            })?;

        let transaction = UnsignedPassTransaction {
            source_account: state.account.account_id.clone(),
            sequence,
            fee,
            network: self.network.clone(),
            memo: entry_set.memo,
            entries,
            time_bounds: TimeBounds::until(max_time),
        };
        let bytes = transaction.to_bytes()?;
        Ok(BuiltTransaction { transaction, bytes })
    }
}
