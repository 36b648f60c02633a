//! # gatepass-ledger: Ledger Boundary for the Gate Pass Stack
//!
//! Everything the protocol knows about the ledger lives here: the
//! transaction data model, the two narrow traits the protocol consumes, and
//! two implementations of those traits.
//!
//! ## Data Model
//!
//! - [`Network`]: which ledger a transaction is valid on, identified by its
//!   passphrase.
//! - [`DataEntry`] / [`Memo`] / [`TimeBounds`]: the fields a pass
//!   transaction carries, with the ledger's size limits enforced at
//!   construction.
//! - [`UnsignedPassTransaction`]: encoded exactly once as an XDR
//!   `Transaction`. Those bytes are what the signing agent sees.
//! - [`SignedEnvelope`]: the signed wrapper, carried as a base64 XDR
//!   `TransactionEnvelope`.
//!
//! ## Traits
//!
//! - [`AccountAccessor`]: account sequence and base fee.
//! - [`LedgerRpc`]: submit, get transaction, get operations.
//!
//! ## Implementations
//!
//! - [`HorizonClient`]: Horizon-style REST gateway over `reqwest`.
//! - [`InMemoryLedger`]: deterministic in-process ledger used by tests and
//!   the CLI's offline mode.
//!
//! Raw transport errors never leave this crate. Every failure is mapped to
//! [`AccountError`], [`SubmitError`] or [`QueryError`] at the boundary.

pub mod config;
pub mod horizon;
pub mod memory;
pub mod network;
pub mod rpc;
pub mod transaction;

pub use config::{ConfigError, HorizonConfig};
pub use horizon::HorizonClient;
pub use memory::{InMemoryLedger, TxIdScheme};
pub use network::Network;
pub use rpc::{
    AccountAccessor, AccountError, AccountState, Fee, LedgerRpc, QueryError, SubmitError,
    SubmitResponse, TxRecord,
};
pub use transaction::{
    transaction_hash, DataEntry, EntryError, EnvelopeError, EnvelopeSignature, Memo,
    SignedEnvelope, TimeBounds, UnsignedPassTransaction,
};

/// The Stellar XDR types pass transactions are encoded with.
pub use stellar_xdr::curr as xdr;
