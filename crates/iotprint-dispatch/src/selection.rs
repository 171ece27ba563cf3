// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer selection resolver.
//
// Answers "which printers does this report go to?" from the selection cache,
// or by asking the user through the selection wizard on a cache miss.

use std::sync::Arc;

use iotprint_bridge::{PrinterWizard, UiState};
use iotprint_core::error::Result;
use iotprint_core::types::{PrinterSelection, ReportId};
use tracing::{debug, info, instrument};

use crate::store::SelectionStore;
use crate::wizard::WizardBroker;

/// Releases a blocked UI for as long as it lives, re-blocking it on drop.
///
/// A UI that was not blocked at acquisition is left untouched.
pub struct UiUnblockGuard<'a> {
    ui: &'a dyn UiState,
    was_blocked: bool,
}

impl<'a> UiUnblockGuard<'a> {
    pub fn acquire(ui: &'a dyn UiState) -> Self {
        let was_blocked = ui.is_blocked();
        if was_blocked {
            ui.unblock();
        }
        Self { ui, was_blocked }
    }

    pub fn was_blocked(&self) -> bool {
        self.was_blocked
    }
}

impl Drop for UiUnblockGuard<'_> {
    fn drop(&mut self) {
        if self.was_blocked {
            self.ui.block();
        }
    }
}

/// Resolves the printer selection of a report.
pub struct SelectionResolver {
    store: Arc<dyn SelectionStore>,
    broker: WizardBroker,
    wizard: Arc<dyn PrinterWizard>,
    ui: Arc<dyn UiState>,
}

impl SelectionResolver {
    pub fn new(
        store: Arc<dyn SelectionStore>,
        broker: WizardBroker,
        wizard: Arc<dyn PrinterWizard>,
        ui: Arc<dyn UiState>,
    ) -> Self {
        Self {
            store,
            broker,
            wizard,
            ui,
        }
    }

    /// Cached selection for `report_id`, or the user's pick from the wizard.
    ///
    /// `Ok(None)` means the user dismissed the wizard (or confirmed without
    /// picking anything) and default printing should take over; the cache is
    /// left untouched in that case.
    #[instrument(skip(self), fields(report_id = %report_id))]
    pub async fn resolve(&self, report_id: ReportId) -> Result<Option<PrinterSelection>> {
        if let Some(selection) = self.store.get(report_id)? {
            debug!(devices = selection.device_ids().len(), "selection cache hit");
            return Ok(Some(selection));
        }

        let mut pending = self.broker.begin(report_id)?;

        // The user cannot pick a printer through a blocked UI.
        let _unblocked = UiUnblockGuard::acquire(self.ui.as_ref());

        self.wizard.open(pending.request()).await?;
        info!(request = %pending.request().id, "printer selection wizard opened");

        let selected = match pending.wait().await {
            Some(ids) if !ids.is_empty() => ids,
            _ => {
                info!("printer selection dismissed");
                return Ok(None);
            }
        };

        let selection = PrinterSelection::new(report_id, selected);
        self.store.set(&selection)?;
        Ok(Some(selection))
    }
}
