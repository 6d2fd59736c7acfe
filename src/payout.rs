// 💸 Payout Authorizer - Drought Classifier → Payout Ledger
// Entry point for one monitoring cycle. A duplicate payout is an expected
// outcome, reported as a typed error and never a panic.

use crate::drought::{check_farmer, DroughtThresholds, DroughtVerdict};
use crate::ledger::{AppendOutcome, LedgerStore, PayoutRecord, PayoutRequest, TransactionId};
use crate::notification::payout_message;
use crate::observation::Observation;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PayoutError {
    /// Farmer already has a ledger record; nothing was written
    #[error("Payout already processed for this farmer recently")]
    Duplicate { farmer_id: String },

    /// Backing store failed (durable ledgers only)
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Result of one monitoring cycle for one farmer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// No drought detected (includes "No data"); ledger untouched
    NoDrought { verdict: DroughtVerdict },

    /// New ledger record plus the farmer-facing message for it
    Paid {
        verdict: DroughtVerdict,
        record: PayoutRecord,
        notification: String,
    },

    /// Drought detected but the farmer was already paid
    Blocked { verdict: DroughtVerdict, reason: String },
}

impl CycleOutcome {
    pub fn verdict(&self) -> &DroughtVerdict {
        match self {
            CycleOutcome::NoDrought { verdict }
            | CycleOutcome::Paid { verdict, .. }
            | CycleOutcome::Blocked { verdict, .. } => verdict,
        }
    }
}

pub struct PayoutAuthorizer<L: LedgerStore> {
    ledger: L,
    amount: f64,
}

impl<L: LedgerStore> PayoutAuthorizer<L> {
    /// `amount` is the payout used by `run_cycle`
    pub fn new(ledger: L, amount: f64) -> Self {
        PayoutAuthorizer { ledger, amount }
    }

    /// Record a payout unless the farmer already has one
    pub fn authorize(
        &self,
        farmer_id: &str,
        reason: &str,
        amount: f64,
    ) -> Result<TransactionId, PayoutError> {
        self.authorize_record(farmer_id, reason, amount)
            .map(|record| record.transaction_id)
    }

    fn authorize_record(
        &self,
        farmer_id: &str,
        reason: &str,
        amount: f64,
    ) -> Result<PayoutRecord, PayoutError> {
        let request = PayoutRequest {
            farmer_id: farmer_id.to_string(),
            reason: reason.to_string(),
            amount,
        };

        match self.ledger.append_if_absent(&request)? {
            AppendOutcome::Appended(record) => {
                tracing::info!(
                    farmer_id,
                    transaction_id = %record.transaction_id,
                    amount,
                    "payout authorized"
                );
                Ok(record)
            }
            AppendOutcome::Duplicate => {
                tracing::warn!(farmer_id, "payout blocked: farmer already paid");
                Err(PayoutError::Duplicate {
                    farmer_id: farmer_id.to_string(),
                })
            }
        }
    }

    /// Read-only snapshot in insertion order
    pub fn get_ledger(&self) -> Result<Vec<PayoutRecord>, PayoutError> {
        Ok(self.ledger.read_all()?)
    }

    pub fn payout_count(&self) -> Result<usize, PayoutError> {
        Ok(self.get_ledger()?.len())
    }

    pub fn total_disbursed(&self) -> Result<f64, PayoutError> {
        Ok(self.get_ledger()?.iter().map(|r| r.amount).sum())
    }

    /// Classify the farmer and, on drought, attempt a payout of the default amount
    pub fn run_cycle(
        &self,
        observations: &[Observation],
        farmer_id: &str,
        thresholds: &DroughtThresholds,
    ) -> Result<CycleOutcome, PayoutError> {
        let verdict = check_farmer(observations, farmer_id, thresholds);

        if !verdict.is_drought {
            return Ok(CycleOutcome::NoDrought { verdict });
        }

        match self.authorize_record(farmer_id, &verdict.reason, self.amount) {
            Ok(record) => {
                let notification = payout_message(&record);
                Ok(CycleOutcome::Paid {
                    verdict,
                    record,
                    notification,
                })
            }
            Err(e @ PayoutError::Duplicate { .. }) => Ok(CycleOutcome::Blocked {
                verdict,
                reason: e.to_string(),
            }),
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
