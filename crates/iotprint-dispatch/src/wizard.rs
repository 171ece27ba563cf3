// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wizard broker: request/response completion for the printer selection
// wizard.
//
// Each wizard launch registers a one-shot slot keyed by a fresh request id.
// The host completes the slot with the user's answer; the waiting resolver
// gets exactly that answer and nothing else. Dropping the waiting side
// removes the slot, so no completion handler outlives its request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use iotprint_bridge::WizardRequest;
use iotprint_core::error::{IotPrintError, Result};
use iotprint_core::types::{DeviceId, ReportId, WizardRequestId};
use tokio::sync::oneshot;
use tracing::{debug, warn};

type Answer = Option<Vec<DeviceId>>;
type PendingMap = HashMap<WizardRequestId, oneshot::Sender<Answer>>;

/// Routes wizard answers to the resolver awaiting them.
#[derive(Clone, Default)]
pub struct WizardBroker {
    pending: Arc<Mutex<PendingMap>>,
}

impl WizardBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new wizard request for `report_id`.
    pub fn begin(&self, report_id: ReportId) -> Result<PendingSelection> {
        let request = WizardRequest {
            id: WizardRequestId::new(),
            report_id,
        };
        let (tx, rx) = oneshot::channel();
        self.lock()?.insert(request.id, tx);
        debug!(request = %request.id, report_id = %report_id, "wizard request registered");

        Ok(PendingSelection {
            request,
            rx,
            pending: Arc::clone(&self.pending),
        })
    }

    /// Deliver the user's answer. `None` means the wizard was dismissed.
    ///
    /// Returns `false` when no request with that id is waiting (already
    /// answered, or its waiter went away).
    pub fn complete(&self, id: WizardRequestId, selected: Option<Vec<DeviceId>>) -> bool {
        let sender = match self.lock() {
            Ok(mut pending) => pending.remove(&id),
            Err(e) => {
                warn!(error = %e, "cannot complete wizard request");
                None
            }
        };
        match sender {
            Some(tx) => tx.send(selected).is_ok(),
            None => {
                debug!(request = %id, "no pending wizard request");
                false
            }
        }
    }

    pub fn cancel(&self, id: WizardRequestId) -> bool {
        self.complete(id, None)
    }

    /// Number of wizard requests still waiting for an answer.
    pub fn pending_count(&self) -> usize {
        self.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, PendingMap>> {
        self.pending
            .lock()
            .map_err(|_| IotPrintError::Wizard("wizard broker lock poisoned".into()))
    }
}

/// The waiting side of one wizard request.
pub struct PendingSelection {
    request: WizardRequest,
    rx: oneshot::Receiver<Answer>,
    pending: Arc<Mutex<PendingMap>>,
}

impl PendingSelection {
    pub fn request(&self) -> &WizardRequest {
        &self.request
    }

    /// Wait for the answer. A request dropped without an answer counts as
    /// cancelled.
    pub async fn wait(&mut self) -> Answer {
        (&mut self.rx).await.unwrap_or(None)
    }
}

impl Drop for PendingSelection {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&self.request.id);
        }
    }
}
