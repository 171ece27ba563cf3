// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer-selection cache.
//
// Remembers, per report, which printers the user picked in the selection
// wizard so the wizard only opens the first time a report is printed.
// Entries live under a fixed namespace and never expire; the fallback
// orchestrator removes an entry when delivery fails so the next print asks
// again.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::{debug, info, instrument};

use iotprint_core::error::{IotPrintError, Result};
use iotprint_core::types::{DeviceId, PrinterSelection, ReportId};

/// SQLite schema for the selections table.
const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS printer_selections (
        namespace TEXT NOT NULL,
        report_id INTEGER NOT NULL,
        device_ids TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (namespace, report_id)
    )
"#;

/// Local persistent cache of printer selections, keyed by report.
pub trait SelectionStore: Send + Sync {
    fn get(&self, report_id: ReportId) -> Result<Option<PrinterSelection>>;

    /// Insert or replace the selection for its report.
    fn set(&self, selection: &PrinterSelection) -> Result<()>;

    /// Returns whether an entry was removed.
    fn remove(&self, report_id: ReportId) -> Result<bool>;

    /// Every cached selection, ordered by report id.
    fn list(&self) -> Result<Vec<PrinterSelection>>;

    /// Drop every entry of this store. Returns the number removed.
    fn clear(&self) -> Result<usize>;
}

/// Selection cache backed by a SQLite database.
///
/// `rusqlite::Connection` is `Send` but not `Sync`, so it sits behind a
/// mutex; every operation is a single short statement.
pub struct SqliteSelectionStore {
    conn: Mutex<Connection>,
    namespace: String,
}

impl SqliteSelectionStore {
    /// Open (or create) the selection database at the given path.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), namespace = %namespace))]
    pub fn open(path: impl AsRef<std::path::Path>, namespace: &str) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| IotPrintError::Database(format!("open: {e}")))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| IotPrintError::Database(format!("WAL pragma: {e}")))?;

        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| IotPrintError::Database(format!("create table: {e}")))?;

        info!("selection store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            namespace: namespace.to_owned(),
        })
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory(namespace: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| IotPrintError::Database(format!("open in-memory: {e}")))?;

        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| IotPrintError::Database(format!("create table: {e}")))?;

        debug!("in-memory selection store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            namespace: namespace.to_owned(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| IotPrintError::Database("selection store lock poisoned".into()))?;
        f(&*conn)
    }
}

impl SelectionStore for SqliteSelectionStore {
    #[instrument(skip(self), fields(report_id = %report_id))]
    fn get(&self, report_id: ReportId) -> Result<Option<PrinterSelection>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT report_id, device_ids FROM printer_selections
                     WHERE namespace = ?1 AND report_id = ?2",
                )
                .map_err(|e| IotPrintError::Database(format!("prepare get: {e}")))?;

            let mut rows = stmt
                .query_map(params![self.namespace, report_id.0], row_to_selection)
                .map_err(|e| IotPrintError::Database(format!("query get: {e}")))?;

            match rows.next() {
                Some(Ok(selection)) => Ok(Some(selection)),
                Some(Err(e)) => Err(IotPrintError::Database(format!("row parse: {e}"))),
                None => Ok(None),
            }
        })
    }

    #[instrument(skip(self, selection), fields(report_id = %selection.report_id))]
    fn set(&self, selection: &PrinterSelection) -> Result<()> {
        let ids: Vec<i64> = selection.device_ids().iter().map(|d| d.0).collect();
        let ids_json = serde_json::to_string(&ids)?;
        let now = Utc::now().to_rfc3339();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO printer_selections (namespace, report_id, device_ids, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(namespace, report_id)
                 DO UPDATE SET device_ids = excluded.device_ids, updated_at = excluded.updated_at",
                params![self.namespace, selection.report_id.0, ids_json, now],
            )
            .map_err(|e| IotPrintError::Database(format!("upsert selection: {e}")))?;
            Ok(())
        })?;

        info!(devices = ?ids, "printer selection stored");
        Ok(())
    }

    #[instrument(skip(self), fields(report_id = %report_id))]
    fn remove(&self, report_id: ReportId) -> Result<bool> {
        let rows = self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM printer_selections WHERE namespace = ?1 AND report_id = ?2",
                params![self.namespace, report_id.0],
            )
            .map_err(|e| IotPrintError::Database(format!("delete selection: {e}")))
        })?;

        debug!(removed = rows > 0, "printer selection removed");
        Ok(rows > 0)
    }

    #[instrument(skip(self))]
    fn list(&self) -> Result<Vec<PrinterSelection>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT report_id, device_ids FROM printer_selections
                     WHERE namespace = ?1 ORDER BY report_id ASC",
                )
                .map_err(|e| IotPrintError::Database(format!("prepare list: {e}")))?;

            stmt.query_map(params![self.namespace], row_to_selection)
                .map_err(|e| IotPrintError::Database(format!("query list: {e}")))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| IotPrintError::Database(format!("collect rows: {e}")))
        })
    }

    #[instrument(skip(self))]
    fn clear(&self) -> Result<usize> {
        let rows = self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM printer_selections WHERE namespace = ?1",
                params![self.namespace],
            )
            .map_err(|e| IotPrintError::Database(format!("clear selections: {e}")))
        })?;

        info!(removed = rows, "printer selections cleared");
        Ok(rows)
    }
}

/// Map a `(report_id, device_ids)` row to a `PrinterSelection`.
fn row_to_selection(row: &rusqlite::Row<'_>) -> rusqlite::Result<PrinterSelection> {
    let report_id: i64 = row.get(0)?;
    let ids_json: String = row.get(1)?;

    let ids: Vec<i64> = serde_json::from_str(&ids_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(PrinterSelection::new(
        ReportId(report_id),
        ids.into_iter().map(DeviceId),
    ))
}

/// Process-local selection cache, lost on exit.
#[derive(Default)]
pub struct MemorySelectionStore {
    entries: Mutex<BTreeMap<ReportId, PrinterSelection>>,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<ReportId, PrinterSelection>>> {
        self.entries
            .lock()
            .map_err(|_| IotPrintError::Database("selection cache lock poisoned".into()))
    }
}

impl SelectionStore for MemorySelectionStore {
    fn get(&self, report_id: ReportId) -> Result<Option<PrinterSelection>> {
        Ok(self.entries()?.get(&report_id).cloned())
    }

    fn set(&self, selection: &PrinterSelection) -> Result<()> {
        self.entries()?
            .insert(selection.report_id, selection.clone());
        Ok(())
    }

    fn remove(&self, report_id: ReportId) -> Result<bool> {
        Ok(self.entries()?.remove(&report_id).is_some())
    }

    fn list(&self) -> Result<Vec<PrinterSelection>> {
        Ok(self.entries()?.values().cloned().collect())
    }

    fn clear(&self) -> Result<usize> {
        let mut entries = self.entries()?;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}
