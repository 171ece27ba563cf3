// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Trait definitions for the services the print relay consumes.
//
// The relay never talks to the server, the UI or the boxes directly: each
// collaborator is a trait so the host application can plug in its own RPC
// client, UI toolkit and device transport.

use std::sync::Arc;

use async_trait::async_trait;
use iotprint_core::error::Result;
use iotprint_core::types::{
    DeviceAddress, DeviceEndpoint, DeviceId, IdempotencyToken, JobDescriptor, Notification,
    PrintJob, RecordId, RenderPayload, ReportId, WizardRequestId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Resolves stored printer ids into device endpoints.
#[async_trait]
pub trait DeviceLookup: Send + Sync {
    /// Fails when any of `printer_ids` no longer exists.
    async fn resolve_devices(&self, printer_ids: &[DeviceId]) -> Result<Vec<DeviceEndpoint>>;
}

/// Arguments of a render-and-dispatch call.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub report_id: ReportId,
    pub devices: &'a [DeviceEndpoint],
    pub record_ids: &'a [RecordId],
    pub payload: &'a RenderPayload,
    pub token: &'a IdempotencyToken,
    /// When false the server returns one descriptor per device for the
    /// caller to deliver; when true it pushes the documents itself.
    pub use_socket: bool,
}

/// Server-side report rendering.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    /// Render the report and return the per-device documents.
    ///
    /// Errors whose `kind()` is `"server"` mean the server itself is
    /// unreachable.
    async fn render_and_send(&self, request: RenderRequest<'_>) -> Result<Vec<JobDescriptor>>;
}

/// Job queue of the persistent box socket.
#[async_trait]
pub trait SocketJobQueue: Send + Sync {
    async fn submit(&self, printer_ids: &[DeviceId], job: &PrintJob, use_socket: bool)
    -> Result<()>;
}

/// A request to let the user pick printers for a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardRequest {
    pub id: WizardRequestId,
    pub report_id: ReportId,
}

/// Launches the printer selection wizard.
///
/// `open` returns once the wizard is on screen; the user's answer is
/// delivered separately, keyed by the request id.
#[async_trait]
pub trait PrinterWizard: Send + Sync {
    async fn open(&self, request: &WizardRequest) -> Result<()>;
}

/// User-facing notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// The caller's busy/blocked UI state.
pub trait UiState: Send + Sync {
    fn is_blocked(&self) -> bool;
    fn block(&self);
    fn unblock(&self);
}

/// Payload of one device action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAction {
    pub session_id: Uuid,
    /// Per-device idempotent id the box deduplicates on.
    pub idempotency_id: String,
    pub print_id: IdempotencyToken,
    pub document: Vec<u8>,
}

/// Something a device reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub address: DeviceAddress,
    /// Session the event answers, if any.
    pub session_id: Option<Uuid>,
    pub kind: DeviceEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceEventKind {
    /// The job with this idempotent id was accepted.
    Ack { idempotency_id: String },
    /// The job with this idempotent id failed on the device.
    Failed {
        idempotency_id: String,
        message: String,
    },
    /// Out-of-band report (status change, balance ticket, ...).
    Status(serde_json::Value),
}

/// Transport to the devices hosted on the boxes.
#[async_trait]
pub trait DeviceChannel: Send + Sync {
    /// Send one action to the device at `address`.
    async fn send(&self, address: &DeviceAddress, action: &DeviceAction) -> Result<()>;

    /// Stream of events from all devices reachable through this channel.
    fn subscribe(&self) -> broadcast::Receiver<DeviceEvent>;
}

/// Every collaborator the relay needs, bundled for wiring at startup.
#[derive(Clone)]
pub struct PrintBridge {
    pub lookup: Arc<dyn DeviceLookup>,
    pub renderer: Arc<dyn ReportRenderer>,
    pub socket_queue: Arc<dyn SocketJobQueue>,
    pub wizard: Arc<dyn PrinterWizard>,
    pub notifier: Arc<dyn Notifier>,
    pub ui: Arc<dyn UiState>,
    pub channel: Arc<dyn DeviceChannel>,
}
