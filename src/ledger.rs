// 📒 Payout Ledger - Append-only record of authorized payouts
// At most one record per farmer, ever. Records are hash-chained so a
// rewritten or reordered history is detectable.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Mutex;

/// Default compensation per payout (INR)
pub const DEFAULT_PAYOUT_AMOUNT: f64 = 5000.0;

/// `previous_hash` of the first record in a ledger
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

// ============================================================================
// TRANSACTION ID
// ============================================================================

/// Opaque authorization token, unique across all ledgers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Fresh random (v4 UUID backed) identifier
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        TransactionId(format!("TXN-{}", hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TransactionId {
    fn from(value: String) -> Self {
        TransactionId(value)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// PAYOUT RECORD
// ============================================================================

/// What the authorizer asks the ledger to record
#[derive(Debug, Clone, PartialEq)]
pub struct PayoutRequest {
    pub farmer_id: String,
    pub reason: String,
    pub amount: f64,
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub transaction_id: TransactionId,
    pub timestamp: DateTime<Utc>,
    pub farmer_id: String,
    pub amount: f64,
    pub reason: String,

    /// Hash of the preceding record (GENESIS_HASH for the first)
    pub previous_hash: String,

    /// SHA-256 over this record's fields and `previous_hash`
    pub record_hash: String,
}

impl PayoutRecord {
    /// Stamp a request with a new id and the current time, chained after `previous_hash`
    pub fn seal(request: &PayoutRequest, previous_hash: &str) -> Self {
        let mut record = PayoutRecord {
            transaction_id: TransactionId::generate(),
            timestamp: Utc::now(),
            farmer_id: request.farmer_id.clone(),
            amount: request.amount,
            reason: request.reason.clone(),
            previous_hash: previous_hash.to_string(),
            record_hash: String::new(),
        };
        record.record_hash = record.compute_hash();
        record
    }

    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}|{}",
            self.previous_hash,
            self.transaction_id,
            self.timestamp.to_rfc3339(),
            self.farmer_id,
            self.amount,
            self.reason
        ));
        format!("{:x}", hasher.finalize())
    }
}

/// Check the hash chain of a ledger snapshot (insertion order)
pub fn verify_chain(records: &[PayoutRecord]) -> bool {
    let mut previous = GENESIS_HASH;

    for record in records {
        if record.previous_hash != previous || record.compute_hash() != record.record_hash {
            return false;
        }
        previous = &record.record_hash;
    }

    true
}

/// Hash the next record must chain onto
pub fn chain_tip(records: &[PayoutRecord]) -> &str {
    records
        .last()
        .map(|r| r.record_hash.as_str())
        .unwrap_or(GENESIS_HASH)
}

// ============================================================================
// LEDGER STORE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AppendOutcome {
    Appended(PayoutRecord),

    /// Farmer already has a record; nothing was written
    Duplicate,
}

/// Append-only log of payouts
///
/// `append_if_absent` must perform the duplicate check and the append as one
/// atomic step; concurrent callers for the same farmer get exactly one
/// `Appended`. Errors are backend failures only.
pub trait LedgerStore: Send + Sync {
    fn append_if_absent(&self, request: &PayoutRequest) -> Result<AppendOutcome>;

    /// Snapshot of all records in insertion order
    fn read_all(&self) -> Result<Vec<PayoutRecord>>;
}

/// Process-lifetime ledger
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    records: Mutex<Vec<PayoutRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for InMemoryLedger {
    fn append_if_absent(&self, request: &PayoutRequest) -> Result<AppendOutcome> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("payout ledger lock poisoned"))?;

        if records.iter().any(|r| r.farmer_id == request.farmer_id) {
            return Ok(AppendOutcome::Duplicate);
        }

        let record = PayoutRecord::seal(request, chain_tip(&records));
        records.push(record.clone());

        Ok(AppendOutcome::Appended(record))
    }

    fn read_all(&self) -> Result<Vec<PayoutRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("payout ledger lock poisoned"))?;
        Ok(records.clone())
    }
}

// ============================================================================
// TESTS
// ============================================================================
