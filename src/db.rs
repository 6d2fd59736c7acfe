// 🗄️ SQLite Ledger - Durable payout log (WAL mode)
// Check-and-append runs in one IMMEDIATE transaction, so the write lock is
// held from the duplicate check through the insert, across processes too.
// The UNIQUE index on farmer_id stays as a backstop.

use crate::ledger::{AppendOutcome, LedgerStore, PayoutRecord, PayoutRequest, GENESIS_HASH};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Payouts Table (append-only; rows are never updated or deleted)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS payouts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            farmer_id TEXT UNIQUE NOT NULL,
            amount REAL NOT NULL,
            reason TEXT NOT NULL,
            previous_hash TEXT NOT NULL,
            record_hash TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_payouts_timestamp ON payouts(timestamp)",
        [],
    )?;

    Ok(())
}

/// `LedgerStore` backed by a SQLite database
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open ledger database: {:?}", db_path))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn).context("Failed to initialize ledger schema")?;
        Ok(SqliteLedger {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("ledger connection lock poisoned"))
    }
}

impl LedgerStore for SqliteLedger {
    fn append_if_absent(&self, request: &PayoutRequest) -> Result<AppendOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let already_paid = tx
            .query_row(
                "SELECT 1 FROM payouts WHERE farmer_id = ?1",
                params![request.farmer_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if already_paid {
            // Dropping the transaction rolls it back
            return Ok(AppendOutcome::Duplicate);
        }

        let tip: Option<String> = tx
            .query_row(
                "SELECT record_hash FROM payouts ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let previous_hash = tip.unwrap_or_else(|| GENESIS_HASH.to_string());

        let record = PayoutRecord::seal(request, &previous_hash);

        tx.execute(
            "INSERT INTO payouts (
                transaction_id, timestamp, farmer_id, amount, reason, previous_hash, record_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.transaction_id.as_str(),
                record.timestamp.to_rfc3339(),
                record.farmer_id,
                record.amount,
                record.reason,
                record.previous_hash,
                record.record_hash,
            ],
        )
        .with_context(|| format!("Failed to record payout for {}", request.farmer_id))?;

        tx.commit()?;
        Ok(AppendOutcome::Appended(record))
    }

    fn read_all(&self) -> Result<Vec<PayoutRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT transaction_id, timestamp, farmer_id, amount, reason, previous_hash, record_hash
             FROM payouts
             ORDER BY id ASC",
        )?;

        let records = stmt
            .query_map([], |row| {
                let transaction_id: String = row.get(0)?;
                let timestamp_str: String = row.get(1)?;

                let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?
                    .with_timezone(&Utc);

                Ok(PayoutRecord {
                    transaction_id: transaction_id.into(),
                    timestamp,
                    farmer_id: row.get(2)?,
                    amount: row.get(3)?,
                    reason: row.get(4)?,
                    previous_hash: row.get(5)?,
                    record_hash: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}
