// Drought Payout Agent - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod observation;   // Observation feed (read-only input)
pub mod drought;       // Drought Classifier
pub mod ledger;        // Payout Ledger (append-only, hash-chained)
pub mod db;            // SQLite-backed ledger store
pub mod payout;        // Payout Authorizer
pub mod forecast;      // Rainfall Forecaster
pub mod risk;          // Risk Scorer
pub mod notification;  // Farmer payout message
pub mod config;        // Monitor thresholds as data
pub mod agent;         // Long-lived service object for hosts

// Re-export commonly used types
pub use observation::{Observation, load_csv, for_farmer, farmer_ids, latest};
pub use drought::{
    DroughtThresholds, DroughtVerdict, VerdictKind,
    classify_drought, check_farmer, trailing_dry_streak,
};
pub use ledger::{
    TransactionId, PayoutRecord, PayoutRequest, AppendOutcome,
    LedgerStore, InMemoryLedger, verify_chain,
    DEFAULT_PAYOUT_AMOUNT, GENESIS_HASH,
};
pub use db::{SqliteLedger, setup_database};
pub use payout::{PayoutAuthorizer, PayoutError, CycleOutcome};
pub use forecast::{LinearModel, RainfallForecaster, ForecastPoint, ForecastError, round2, MAX_HORIZON_DAYS};
pub use risk::{score_risk, RiskLevel};
pub use notification::payout_message;
pub use config::MonitorConfig;
pub use agent::{InsuranceAgent, FarmerReport, AgentSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
