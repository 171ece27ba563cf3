// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local state of the print relay: configuration file, printer-selection cache
// and dispatch audit trail, all kept in the data directory.

use std::path::{Path, PathBuf};

use iotprint_core::RelayConfig;
use iotprint_core::error::Result;
use iotprint_core::types::{PrinterSelection, ReportId};
use iotprint_dispatch::{SelectionStore, SqliteSelectionStore};
use iotprint_security::audit::{AuditEntry, AuditLog};
use tracing::{info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";
const SELECTIONS_DB: &str = "selections.db";
const AUDIT_DB: &str = "audit.db";

pub struct AppServices {
    data_dir: PathBuf,
    config: RelayConfig,
    selections: SqliteSelectionStore,
    audit_log: AuditLog,
}

impl AppServices {
    /// Open every store under the data directory (`explicit` overrides the
    /// default location).
    pub fn init(explicit: Option<&Path>) -> Result<Self> {
        let dir = data_dir::data_dir(explicit)?;
        info!(path = %dir.display(), "initialising app services");

        let config = load_config(&dir).unwrap_or_default();
        let selections = SqliteSelectionStore::open(dir.join(SELECTIONS_DB), &config.cache_namespace)?;
        let audit_log = AuditLog::open(dir.join(AUDIT_DB))?;

        Ok(Self {
            data_dir: dir,
            config,
            selections,
            audit_log,
        })
    }

    // -- Config --------------------------------------------------------------

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    /// Write the current configuration to `config.json`.
    pub fn save_config(&self) -> Result<PathBuf> {
        persist_config(&self.data_dir, &self.config)?;
        Ok(self.config_path())
    }

    // -- Selection cache -----------------------------------------------------

    pub fn selections(&self) -> Result<Vec<PrinterSelection>> {
        self.selections.list()
    }

    pub fn forget_selection(&self, report_id: ReportId) -> Result<bool> {
        self.selections.remove(report_id)
    }

    pub fn clear_selections(&self) -> Result<usize> {
        self.selections.clear()
    }

    // -- Audit ---------------------------------------------------------------

    pub fn recent_audit_entries(&self, limit: u32) -> Result<Vec<AuditEntry>> {
        self.audit_log.recent_entries(limit)
    }

    pub fn audit_count(&self) -> Result<u64> {
        self.audit_log.count()
    }
}

// -- Config file persistence -------------------------------------------------

fn load_config(data_dir: &Path) -> Option<RelayConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &RelayConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
