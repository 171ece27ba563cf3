// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fallback orchestrator: try each transport in priority order until one
// delivers the job.
//
// Failures are split in two classes:
//   - transport-level (`kind() == Some("server")`): the server itself is
//     unreachable or rejected the cached printers. The chain stops at once, the cached selection is dropped,
//     the UI is released and the error goes back to the caller.
//   - device-level (anything else): logged, and the next transport is tried
//     with the very same job.
// When every transport failed the user gets one "Failed to send to printer."
// notification, the cached selection is dropped, and the call succeeds.

use std::sync::Arc;

use iotprint_bridge::{Notifier, PrintBridge, UiState};
use iotprint_core::config::RelayConfig;
use iotprint_core::error::{IotPrintError, Result, SERVER_KIND};
use iotprint_core::types::{Notification, PrintJob, PrinterSelection, ReportId, TransportKind};
use tracing::{debug, error, info, instrument, warn};

use crate::store::SelectionStore;
use crate::transport::{Transport, build_transports};

/// Message of the notification shown when every transport failed.
pub const EXHAUSTED_MESSAGE: &str = "Failed to send to printer.";

/// How a failed attempt affects the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The channel is unreachable; abort the chain.
    Transport,
    /// The device (or something unclassified) failed; try the next transport.
    Device,
}

pub fn classify_failure(err: &IotPrintError) -> FailureClass {
    match err.kind() {
        Some(SERVER_KIND) => FailureClass::Transport,
        _ => FailureClass::Device,
    }
}

/// What happened to the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Delivered,
    DeviceFailed,
    TransportFailed,
}

/// Position of a job in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackState {
    #[default]
    Idle,
    /// Trying the transport at this index.
    Attempting(usize),
    /// The transport at this index delivered the job.
    Succeeded(usize),
    /// The transport at this index hit a transport-level failure.
    Aborted(usize),
    /// Every transport failed at device level.
    Failed,
}

impl FallbackState {
    /// Leave `Idle` for the first transport of a chain of `total`.
    pub fn start(self, total: usize) -> Self {
        match self {
            Self::Idle if total == 0 => Self::Failed,
            Self::Idle => Self::Attempting(0),
            other => other,
        }
    }

    pub fn on(self, step: Step, total: usize) -> Self {
        match (self, step) {
            (Self::Attempting(i), Step::Delivered) => Self::Succeeded(i),
            (Self::Attempting(i), Step::TransportFailed) => Self::Aborted(i),
            (Self::Attempting(i), Step::DeviceFailed) if i + 1 < total => Self::Attempting(i + 1),
            (Self::Attempting(_), Step::DeviceFailed) => Self::Failed,
            (other, _) => other,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Aborted(_) | Self::Failed)
    }
}

/// Result of a chain that did not abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackOutcome {
    Delivered {
        transport: TransportKind,
        /// Index of the transport in the chain.
        attempt: usize,
    },
    /// Every transport failed; the user was notified.
    Exhausted { attempts: usize },
}

pub struct FallbackOrchestrator {
    transports: Vec<Arc<dyn Transport>>,
    store: Arc<dyn SelectionStore>,
    notifier: Arc<dyn Notifier>,
    ui: Arc<dyn UiState>,
}

impl FallbackOrchestrator {
    pub fn new(
        transports: Vec<Arc<dyn Transport>>,
        store: Arc<dyn SelectionStore>,
        notifier: Arc<dyn Notifier>,
        ui: Arc<dyn UiState>,
    ) -> Self {
        Self {
            transports,
            store,
            notifier,
            ui,
        }
    }

    /// Orchestrator over the transports configured in `config`.
    pub fn from_bridge(
        config: &RelayConfig,
        bridge: &PrintBridge,
        store: Arc<dyn SelectionStore>,
    ) -> Self {
        Self::new(
            build_transports(config, bridge),
            store,
            Arc::clone(&bridge.notifier),
            Arc::clone(&bridge.ui),
        )
    }

    pub fn transport_kinds(&self) -> Vec<TransportKind> {
        self.transports.iter().map(|t| t.kind()).collect()
    }

    #[instrument(skip_all, fields(report_id = %job.report_id(), token = %job.token()))]
    pub async fn run(&self, job: &PrintJob, selection: &PrinterSelection) -> Result<FallbackOutcome> {
        let total = self.transports.len();
        let mut state = FallbackState::Idle.start(total);

        while let FallbackState::Attempting(attempt) = state {
            let transport = &self.transports[attempt];
            info!(attempt, transport = %transport.kind(), "attempting transport");

            let step = match transport.deliver(job, selection).await {
                Ok(()) => Step::Delivered,
                Err(err) => match classify_failure(&err) {
                    FailureClass::Transport => {
                        state = state.on(Step::TransportFailed, total);
                        error!(attempt, transport = %transport.kind(), error = %err, ?state, "transport-level failure, aborting");
                        self.invalidate(job.report_id());
                        self.ui.unblock();
                        return Err(err);
                    }
                    FailureClass::Device => {
                        warn!(attempt, transport = %transport.kind(), error = %err, "send failed, trying next transport");
                        Step::DeviceFailed
                    }
                },
            };
            state = state.on(step, total);
        }

        if let FallbackState::Succeeded(attempt) = state {
            let transport = self.transports[attempt].kind();
            info!(attempt, %transport, "job delivered");
            return Ok(FallbackOutcome::Delivered { transport, attempt });
        }

        warn!(attempts = total, "every transport failed");
        self.notifier.notify(Notification::danger(EXHAUSTED_MESSAGE));
        self.invalidate(job.report_id());
        Ok(FallbackOutcome::Exhausted { attempts: total })
    }

    /// Drop the cached selection so the next print asks again. A store
    /// failure here must not hide the failure being handled.
    fn invalidate(&self, report_id: ReportId) {
        match self.store.remove(report_id) {
            Ok(true) => info!(%report_id, "cached printer selection invalidated"),
            Ok(false) => debug!(%report_id, "no cached printer selection to invalidate"),
            Err(e) => warn!(%report_id, error = %e, "failed to invalidate printer selection"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iotprint_core::types::{DeviceId, NotificationSeverity, RenderPayload};

    use crate::testing::{Behaviour, Harness, ScriptedTransport, token};

    fn job() -> PrintJob {
        PrintJob::new(ReportId(9), vec![1], RenderPayload::default(), token())
    }

    fn selection() -> PrinterSelection {
        PrinterSelection::new(ReportId(9), [DeviceId(1)])
    }

    struct Chain {
        harness: Harness,
        first: Arc<ScriptedTransport>,
        second: Arc<ScriptedTransport>,
        orchestrator: FallbackOrchestrator,
    }

    fn chain(first: Behaviour, second: Behaviour) -> Chain {
        let harness = Harness::new();
        harness.store.set(&selection()).unwrap();
        harness.ui.block();
        let first = Arc::new(ScriptedTransport::new(TransportKind::Longpoll, first));
        let second = Arc::new(ScriptedTransport::new(TransportKind::Socket, second));
        let transports: Vec<Arc<dyn Transport>> = vec![first.clone(), second.clone()];
        let orchestrator = harness.orchestrator(transports);
        Chain {
            harness,
            first,
            second,
            orchestrator,
        }
    }

    #[test]
    fn classification_follows_error_kind() {
        assert_eq!(
            classify_failure(&IotPrintError::Server("502".into())),
            FailureClass::Transport
        );
        assert_eq!(
            classify_failure(&IotPrintError::DeviceLookup("gone".into())),
            FailureClass::Device
        );
        assert_eq!(
            classify_failure(&IotPrintError::StaleSelection {
                missing: vec!["404".into()],
            }),
            FailureClass::Transport
        );
        assert_eq!(
            classify_failure(&IotPrintError::DeviceTimeout {
                identifier: "p".into(),
                secs: 60
            }),
            FailureClass::Device
        );
    }

    #[test]
    fn state_transitions() {
        let s = FallbackState::Idle.start(2);
        assert_eq!(s, FallbackState::Attempting(0));
        let s = s.on(Step::DeviceFailed, 2);
        assert_eq!(s, FallbackState::Attempting(1));
        assert_eq!(s.on(Step::Delivered, 2), FallbackState::Succeeded(1));
        assert_eq!(s.on(Step::DeviceFailed, 2), FallbackState::Failed);
        assert_eq!(s.on(Step::TransportFailed, 2), FallbackState::Aborted(1));
        assert_eq!(FallbackState::Idle.start(0), FallbackState::Failed);
        assert!(FallbackState::Failed.on(Step::Delivered, 2).is_terminal());
    }

    #[tokio::test]
    async fn first_success_skips_the_rest() {
        let c = chain(Behaviour::Succeed, Behaviour::Succeed);

        let outcome = c.orchestrator.run(&job(), &selection()).await.unwrap();

        assert_eq!(
            outcome,
            FallbackOutcome::Delivered {
                transport: TransportKind::Longpoll,
                attempt: 0
            }
        );
        assert_eq!(c.first.calls(), 1);
        assert_eq!(c.second.calls(), 0);
        assert!(c.harness.store.get(ReportId(9)).unwrap().is_some());
    }

    #[tokio::test]
    async fn server_failure_aborts_the_chain() {
        let c = chain(Behaviour::FailServer, Behaviour::Succeed);

        let err = c.orchestrator.run(&job(), &selection()).await.unwrap_err();

        assert_eq!(err.kind(), Some("server"));
        assert_eq!(c.second.calls(), 0);
        assert!(c.harness.store.get(ReportId(9)).unwrap().is_none());
        assert!(!c.harness.ui.is_blocked());
        assert!(c.harness.notifier.notifications().is_empty());
    }

    #[tokio::test]
    async fn device_failure_falls_back_with_the_same_token() {
        let c = chain(Behaviour::FailDevice, Behaviour::Succeed);

        let outcome = c.orchestrator.run(&job(), &selection()).await.unwrap();

        assert_eq!(
            outcome,
            FallbackOutcome::Delivered {
                transport: TransportKind::Socket,
                attempt: 1
            }
        );
        assert_eq!(c.first.tokens(), vec![token()]);
        assert_eq!(c.second.tokens(), vec![token()]);
        assert!(c.harness.store.get(ReportId(9)).unwrap().is_some());
    }

    #[tokio::test]
    async fn exhaustion_notifies_once_and_returns_normally() {
        let c = chain(Behaviour::FailDevice, Behaviour::FailDevice);

        let outcome = c.orchestrator.run(&job(), &selection()).await.unwrap();

        assert_eq!(outcome, FallbackOutcome::Exhausted { attempts: 2 });
        assert_eq!(c.harness.notifier.count(NotificationSeverity::Danger), 1);
        assert_eq!(c.harness.notifier.notifications()[0].message, EXHAUSTED_MESSAGE);
        assert!(c.harness.store.get(ReportId(9)).unwrap().is_none());
        // The UI is released by the caller, not the orchestrator.
        assert!(c.harness.ui.is_blocked());
    }

    #[tokio::test]
    async fn server_failure_on_second_transport_still_aborts() {
        let c = chain(Behaviour::FailDevice, Behaviour::FailServer);

        let err = c.orchestrator.run(&job(), &selection()).await.unwrap_err();

        assert_eq!(err.kind(), Some("server"));
        assert_eq!(c.harness.notifier.count(NotificationSeverity::Danger), 0);
        assert!(c.harness.store.get(ReportId(9)).unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_chain_is_exhausted_immediately() {
        let harness = Harness::new();
        let orchestrator = harness.orchestrator(Vec::new());

        let outcome = orchestrator.run(&job(), &selection()).await.unwrap();

        assert_eq!(outcome, FallbackOutcome::Exhausted { attempts: 0 });
        assert_eq!(harness.notifier.count(NotificationSeverity::Danger), 1);
    }
}
