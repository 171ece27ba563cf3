// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job dispatcher: entry point of a print request.
//
// Builds the print job with a fresh idempotency token, resolves the printers,
// and runs the fallback chain while the UI is blocked. Returns whether the
// request was handled; `false` lets the caller fall back to default printing.

use std::sync::{Arc, Mutex};

use iotprint_bridge::{PrintBridge, UiState};
use iotprint_core::config::RelayConfig;
use iotprint_core::error::Result;
use iotprint_core::types::{PrintJob, RecordId, RenderPayload, ReportAction, ReportId, TransportKind};
use iotprint_security::audit::{DispatchAction, DispatchRecord};
use iotprint_security::{AuditLog, generate_token, payload_digest};
use tracing::{debug, info, instrument, warn};

use crate::fallback::{FallbackOrchestrator, FallbackOutcome};
use crate::selection::SelectionResolver;
use crate::store::SelectionStore;
use crate::wizard::WizardBroker;

pub struct JobDispatcher {
    resolver: SelectionResolver,
    orchestrator: FallbackOrchestrator,
    ui: Arc<dyn UiState>,
    audit: Option<Arc<Mutex<AuditLog>>>,
    audit_enabled: bool,
}

impl JobDispatcher {
    /// Dispatcher over the host collaborators in `bridge`, with the
    /// transports and policies of `config`.
    pub fn new(
        config: &RelayConfig,
        bridge: &PrintBridge,
        store: Arc<dyn SelectionStore>,
        broker: WizardBroker,
    ) -> Self {
        let resolver = SelectionResolver::new(
            Arc::clone(&store),
            broker,
            Arc::clone(&bridge.wizard),
            Arc::clone(&bridge.ui),
        );
        let orchestrator = FallbackOrchestrator::from_bridge(config, bridge, store);
        let mut dispatcher = Self::from_parts(resolver, orchestrator, Arc::clone(&bridge.ui));
        dispatcher.audit_enabled = config.audit_enabled;
        dispatcher
    }

    pub fn from_parts(
        resolver: SelectionResolver,
        orchestrator: FallbackOrchestrator,
        ui: Arc<dyn UiState>,
    ) -> Self {
        Self {
            resolver,
            orchestrator,
            ui,
            audit: None,
            audit_enabled: true,
        }
    }

    /// Record every dispatch outcome in `audit`, unless auditing is
    /// switched off in the configuration.
    pub fn with_audit(mut self, audit: Arc<Mutex<AuditLog>>) -> Self {
        if self.audit_enabled {
            self.audit = Some(audit);
        } else {
            debug!("dispatch audit disabled by configuration");
        }
        self
    }

    pub fn resolver(&self) -> &SelectionResolver {
        &self.resolver
    }

    /// Print `record_ids` of `report_id`.
    ///
    /// `Ok(true)` once the fallback chain completed, delivered or not (an
    /// exhausted chain has already notified the user). `Ok(false)` when no
    /// printer was selected. Transport-level failures are returned as errors.
    #[instrument(skip(self, record_ids, payload), fields(report_id = %report_id))]
    pub async fn dispatch(
        &self,
        report_id: ReportId,
        record_ids: Vec<RecordId>,
        payload: RenderPayload,
    ) -> Result<bool> {
        let token = generate_token()?;
        let job = PrintJob::new(report_id, record_ids, payload, token);
        debug!(token = %job.token(), records = job.record_ids().len(), "print job created");

        let Some(selection) = self.resolver.resolve(report_id).await? else {
            info!("no printer selected, falling through to default printing");
            self.record_outcome(&job, DispatchAction::Fallthrough, None, None);
            return Ok(false);
        };

        self.ui.block();
        match self.orchestrator.run(&job, &selection).await {
            Ok(FallbackOutcome::Delivered { transport, .. }) => {
                self.ui.unblock();
                self.record_outcome(&job, DispatchAction::Delivered, Some(transport), None);
                Ok(true)
            }
            Ok(FallbackOutcome::Exhausted { attempts }) => {
                self.ui.unblock();
                let details = format!("{attempts} transports failed");
                self.record_outcome(&job, DispatchAction::Exhausted, None, Some(&details));
                Ok(true)
            }
            Err(err) => {
                let details = err.to_string();
                self.record_outcome(&job, DispatchAction::TransportFailed, None, Some(&details));
                Err(err)
            }
        }
    }

    /// Handle a report action. Reports without IoT devices are not ours.
    pub async fn handle_report_action(&self, action: &ReportAction) -> Result<bool> {
        if action.device_ids.is_empty() {
            return Ok(false);
        }
        self.dispatch(action.report_id, action.active_ids.clone(), action.data.clone())
            .await
    }

    fn record_outcome(
        &self,
        job: &PrintJob,
        action: DispatchAction,
        transport: Option<TransportKind>,
        details: Option<&str>,
    ) {
        let Some(audit) = &self.audit else {
            return;
        };
        let digest = payload_digest(job.payload());
        let record = DispatchRecord {
            action,
            report_id: job.report_id(),
            token: job.token(),
            transport,
            payload_digest: &digest,
            details,
        };
        let written = match audit.lock() {
            Ok(log) => log.record(&record),
            Err(_) => {
                warn!("audit log lock poisoned");
                return;
            }
        };
        if let Err(e) = written {
            warn!(error = %e, "failed to record dispatch outcome");
        }
    }
}
