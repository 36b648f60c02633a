//! # Horizon REST Client
//!
//! Implements [`AccountAccessor`] and [`LedgerRpc`] against a Horizon-style
//! gateway.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/accounts/{id}` | Load account sequence |
//! | GET    | `/fee_stats` | Base fee |
//! | POST   | `/transactions` (form `tx`) | Submit envelope |
//! | GET    | `/transactions/{id}` | Transaction metadata |
//! | GET    | `/transactions/{id}/operations` | Data entries |
//!
//! Queries retry transient transport failures. Submission makes exactly one
//! attempt; a gateway timeout (HTTP 504) or a client-side timeout is
//! reported as [`SubmitError::Timeout`] because the transaction may still
//! be applied.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use serde::Deserialize;

use gatepass_core::retry::retry_send;
use gatepass_core::{AccountId, Timestamp, TransactionId};

use crate::config::{ConfigError, HorizonConfig};
use crate::network::Network;
use crate::rpc::{
    AccountAccessor, AccountError, AccountState, Fee, LedgerRpc, QueryError, SubmitError,
    SubmitResponse, TxRecord,
};
use crate::transaction::{DataEntry, SignedEnvelope};

/// Horizon returns at most 200 records per page; a pass has four.
const OPERATIONS_PAGE_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
struct HorizonAccount {
    sequence: String,
}

#[derive(Debug, Deserialize)]
struct HorizonFeeStats {
    last_ledger_base_fee: String,
}

#[derive(Debug, Deserialize)]
struct HorizonSubmitted {
    hash: String,
}

#[derive(Debug, Default, Deserialize)]
struct HorizonProblem {
    #[serde(default)]
    extras: Option<ProblemExtras>,
}

#[derive(Debug, Deserialize)]
struct ProblemExtras {
    #[serde(default)]
    result_codes: Option<ResultCodes>,
}

#[derive(Debug, Deserialize)]
struct ResultCodes {
    #[serde(default)]
    transaction: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HorizonTransaction {
    hash: String,
    successful: bool,
    #[serde(default)]
    memo_type: Option<String>,
    #[serde(default)]
    memo: Option<String>,
    source_account: String,
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct OperationsPage {
    #[serde(rename = "_embedded")]
    embedded: Embedded,
}

#[derive(Debug, Deserialize)]
struct Embedded {
    records: Vec<OperationRecord>,
}

#[derive(Debug, Deserialize)]
struct OperationRecord {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

/// Client for a Horizon-style ledger gateway.
#[derive(Debug, Clone)]
pub struct HorizonClient {
    http: reqwest::Client,
    base_url: url::Url,
    network: Network,
}

impl HorizonClient {
    pub fn new(config: HorizonConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self {
            http,
            base_url: config.horizon_url,
            network: config.network,
        })
    }

    /// Network this gateway serves.
    pub fn network(&self) -> &Network {
        &self.network
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, reqwest::Error> {
        retry_send("horizon query", |_: &reqwest::Error| true, || {
            self.http.get(url).send()
        })
        .await
    }
}

fn query_transport(e: reqwest::Error) -> QueryError {
    if e.is_timeout() {
        QueryError::Timeout
    } else {
        QueryError::Unavailable {
            reason: e.to_string(),
        }
    }
}

fn account_transport(e: reqwest::Error) -> AccountError {
    AccountError::Unavailable {
        reason: e.to_string(),
    }
}

/// 400 means Horizon could not parse the id, so no such transaction exists.
fn query_status(status: StatusCode) -> Result<(), QueryError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Err(QueryError::NotFound),
        StatusCode::GATEWAY_TIMEOUT => Err(QueryError::Timeout),
        s => Err(QueryError::Unavailable {
            reason: format!("HTTP {s}"),
        }),
    }
}

#[async_trait]
impl AccountAccessor for HorizonClient {
    async fn load_account(&self, account: &AccountId) -> Result<AccountState, AccountError> {
        let url = self.url(&format!("accounts/{account}"));
        let resp = self.get(&url).await.map_err(account_transport)?;
        match resp.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(AccountError::NotFound {
                    account: account.to_string(),
                })
            }
            s => {
                return Err(AccountError::Unavailable {
                    reason: format!("HTTP {s}"),
                })
            }
        }
        let body: HorizonAccount = resp.json().await.map_err(|e| AccountError::Malformed {
            reason: e.to_string(),
        })?;
        let sequence = body.sequence.parse().map_err(|_| AccountError::Malformed {
            reason: format!("sequence {:?} is not an integer", body.sequence),
        })?;
        tracing::debug!(account = %account, sequence, "loaded account state");
        Ok(AccountState {
            account_id: account.clone(),
            sequence,
        })
    }

    async fn base_fee(&self) -> Result<Fee, AccountError> {
        let resp = self
            .get(&self.url("fee_stats"))
            .await
            .map_err(account_transport)?;
        if !resp.status().is_success() {
            return Err(AccountError::Unavailable {
                reason: format!("HTTP {}", resp.status()),
            });
        }
        let body: HorizonFeeStats = resp.json().await.map_err(|e| AccountError::Malformed {
            reason: e.to_string(),
        })?;
        body.last_ledger_base_fee
            .parse()
            .map(Fee)
            .map_err(|_| AccountError::Malformed {
                reason: format!("base fee {:?} is not an integer", body.last_ledger_base_fee),
            })
    }
}

#[async_trait]
impl LedgerRpc for HorizonClient {
    async fn submit(&self, envelope: &SignedEnvelope) -> Result<SubmitResponse, SubmitError> {
        let encoded = envelope.to_base64().map_err(|e| SubmitError::Rejected {
            code: format!("tx_malformed: {e}"),
        })?;
        let resp = self
            .http
            .post(self.url("transactions"))
            .form(&[("tx", encoded.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmitError::Timeout
                } else {
                    SubmitError::Unavailable {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = resp.status();
        if status.is_success() {
            let body: HorizonSubmitted = resp.json().await.map_err(|e| SubmitError::Unavailable {
                reason: format!("unreadable submit response: {e}"),
            })?;
            let transaction_id =
                TransactionId::new(body.hash).map_err(|e| SubmitError::Unavailable {
                    reason: format!("ledger returned an invalid transaction id: {e}"),
                })?;
            tracing::info!(transaction_id = %transaction_id, "ledger accepted transaction");
            return Ok(SubmitResponse { transaction_id });
        }
        match status {
            StatusCode::BAD_REQUEST => {
                let problem: HorizonProblem = resp.json().await.unwrap_or_default();
                let code = problem
                    .extras
                    .and_then(|x| x.result_codes)
                    .and_then(|r| r.transaction)
                    .unwrap_or_else(|| "tx_malformed".to_string());
                tracing::warn!(code = %code, "ledger rejected transaction");
                Err(SubmitError::Rejected { code })
            }
            StatusCode::GATEWAY_TIMEOUT => Err(SubmitError::Timeout),
            s => Err(SubmitError::Unavailable {
                reason: format!("HTTP {s}"),
            }),
        }
    }

    async fn get_transaction(&self, id: &TransactionId) -> Result<TxRecord, QueryError> {
        let resp = self
            .get(&self.url(&format!("transactions/{id}")))
            .await
            .map_err(query_transport)?;
        query_status(resp.status())?;
        let body: HorizonTransaction = resp.json().await.map_err(|e| QueryError::Malformed {
            reason: e.to_string(),
        })?;
        let memo = match body.memo_type.as_deref() {
            Some("text") => body.memo,
            _ => None,
        };
        Ok(TxRecord {
            id: TransactionId::new(body.hash).map_err(|e| QueryError::Malformed {
                reason: e.to_string(),
            })?,
            successful: body.successful,
            memo,
            source_account: body.source_account,
            created_at: Timestamp::parse_lenient(&body.created_at).map_err(|e| {
                QueryError::Malformed {
                    reason: e.to_string(),
                }
            })?,
        })
    }

    async fn get_operations(&self, id: &TransactionId) -> Result<Vec<DataEntry>, QueryError> {
        let url = self.url(&format!(
            "transactions/{id}/operations?limit={OPERATIONS_PAGE_LIMIT}"
        ));
        let resp = self.get(&url).await.map_err(query_transport)?;
        query_status(resp.status())?;
        let page: OperationsPage = resp.json().await.map_err(|e| QueryError::Malformed {
            reason: e.to_string(),
        })?;

        page.embedded
            .records
            .into_iter()
            .filter(|op| op.kind == "manage_data")
            .map(decode_manage_data)
            .collect()
    }
}

fn decode_manage_data(op: OperationRecord) -> Result<DataEntry, QueryError> {
    let malformed = |reason: String| QueryError::Malformed { reason };
    let key = op
        .name
        .ok_or_else(|| malformed("manage_data operation without a name".into()))?;
    let raw = match op.value.as_deref() {
        None | Some("") => Vec::new(),
        Some(v) => STANDARD
            .decode(v)
            .map_err(|e| malformed(format!("entry {key:?} is not base64: {e}")))?,
    };
    let value = String::from_utf8(raw)
        .map_err(|_| malformed(format!("entry {key:?} is not UTF-8")))?;
    DataEntry::new(key, value).map_err(|e| malformed(e.to_string()))
}
