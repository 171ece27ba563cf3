// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail — append-only SQLite log of every print dispatch outcome.
//
// Schema:
//   dispatch_log(
//     id             INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp      TEXT    NOT NULL,   -- RFC 3339
//     action         TEXT    NOT NULL,   -- "delivered", "exhausted", ...
//     report_id      INTEGER NOT NULL,
//     token          TEXT    NOT NULL,   -- idempotency token
//     transport      TEXT,               -- transport that settled the job
//     payload_digest TEXT    NOT NULL,   -- SHA-256 hex digest
//     success        INTEGER NOT NULL,   -- 0 = failure, 1 = success
//     details        TEXT                -- optional free-form context
//   )

use std::path::Path;

use chrono::Utc;
use iotprint_core::error::IotPrintError;
use iotprint_core::types::{IdempotencyToken, ReportId, TransportKind};
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS dispatch_log (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp      TEXT    NOT NULL,
    action         TEXT    NOT NULL,
    report_id      INTEGER NOT NULL,
    token          TEXT    NOT NULL,
    transport      TEXT,
    payload_digest TEXT    NOT NULL,
    success        INTEGER NOT NULL,
    details        TEXT
);";

const SELECT_COLUMNS: &str =
    "SELECT id, timestamp, action, report_id, token, transport, payload_digest, success, details
     FROM dispatch_log";

/// Convert a `rusqlite::Error` into an `IotPrintError::Database`.
fn db_err(e: rusqlite::Error) -> IotPrintError {
    IotPrintError::Database(e.to_string())
}

/// How a dispatch ended, as recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchAction {
    /// A transport delivered the job.
    Delivered,
    /// Every transport failed; the user was notified.
    Exhausted,
    /// The server was unreachable; the chain was aborted.
    TransportFailed,
    /// No printers were selected; default printing takes over.
    Fallthrough,
}

impl DispatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::Exhausted => "exhausted",
            Self::TransportFailed => "transport_failed",
            Self::Fallthrough => "fallthrough",
        }
    }

    fn succeeded(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// One audit record to append.
#[derive(Debug, Clone)]
pub struct DispatchRecord<'a> {
    pub action: DispatchAction,
    pub report_id: ReportId,
    pub token: &'a IdempotencyToken,
    pub transport: Option<TransportKind>,
    pub payload_digest: &'a str,
    pub details: Option<&'a str>,
}

/// A single entry in the audit log, used for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub report_id: i64,
    pub token: String,
    pub transport: Option<String>,
    pub payload_digest: String,
    pub success: bool,
    pub details: Option<String>,
}

impl AuditEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            action: row.get(2)?,
            report_id: row.get(3)?,
            token: row.get(4)?,
            transport: row.get(5)?,
            payload_digest: row.get(6)?,
            success: row.get::<_, i32>(7)? != 0,
            details: row.get(8)?,
        })
    }
}

/// Append-only dispatch audit log backed by a SQLite database.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `path`.
    ///
    /// The `dispatch_log` table is created automatically if it does not
    /// already exist.  WAL mode is enabled for better concurrent-read
    /// performance.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IotPrintError> {
        let conn = Connection::open(path).map_err(db_err)?;

        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self, IotPrintError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory audit log opened");
        Ok(Self { conn })
    }

    /// Append a dispatch outcome.
    #[instrument(skip(self, record), fields(
        action = record.action.as_str(),
        report_id = %record.report_id,
        token = %record.token,
    ))]
    pub fn record(&self, record: &DispatchRecord<'_>) -> Result<(), IotPrintError> {
        let timestamp = Utc::now().to_rfc3339();
        let success_int: i32 = if record.action.succeeded() { 1 } else { 0 };

        self.conn
            .execute(
                "INSERT INTO dispatch_log
                 (timestamp, action, report_id, token, transport, payload_digest, success, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    timestamp,
                    record.action.as_str(),
                    record.report_id.0,
                    record.token.as_str(),
                    record.transport.map(|t| t.as_str()),
                    record.payload_digest,
                    success_int,
                    record.details,
                ],
            )
            .map_err(db_err)?;

        debug!("audit entry recorded");
        Ok(())
    }

    /// All entries for one idempotency token, oldest first.
    pub fn entries_for_token(&self, token: &str) -> Result<Vec<AuditEntry>, IotPrintError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE token = ?1 ORDER BY id ASC"))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![token], AuditEntry::from_row)
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// Retrieve the most recent `limit` entries, ordered newest-first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>, IotPrintError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1"))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![limit], AuditEntry::from_row)
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// Return the total number of entries in the audit log.
    pub fn count(&self) -> Result<u64, IotPrintError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM dispatch_log", [], |row| row.get(0))
            .map_err(db_err)
    }
}
