// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Long-poll transport.
//
// 1. Resolve the selected printer ids into device endpoints.
// 2. Ask the server to render the report, one document per device, without
//    pushing anything itself.
// 3. Deliver the documents one device at a time through a fresh device
//    session each, waiting for every acknowledgment. The first failing
//    device aborts the rest of the attempt.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use iotprint_bridge::{DeviceChannel, DeviceLookup, Notifier, PrintBridge, RenderRequest, ReportRenderer};
use iotprint_core::config::RelayConfig;
use iotprint_core::error::{IotPrintError, Result};
use iotprint_core::types::{
    DeviceEndpoint, Notification, PrintJob, PrinterSelection, TransportKind,
};
use tracing::{debug, info, instrument};

use crate::device::DeviceController;
use crate::transport::Transport;

pub struct LongpollTransport {
    lookup: Arc<dyn DeviceLookup>,
    renderer: Arc<dyn ReportRenderer>,
    channel: Arc<dyn DeviceChannel>,
    notifier: Arc<dyn Notifier>,
    ack_timeout: Option<Duration>,
    announce: bool,
}

impl LongpollTransport {
    pub fn new(bridge: &PrintBridge, config: &RelayConfig) -> Self {
        Self {
            lookup: Arc::clone(&bridge.lookup),
            renderer: Arc::clone(&bridge.renderer),
            channel: Arc::clone(&bridge.channel),
            notifier: Arc::clone(&bridge.notifier),
            ack_timeout: config.device_ack_timeout(),
            announce: config.announce_devices,
        }
    }

    /// Resolve every selected printer, failing when any of them is gone.
    async fn resolve(&self, selection: &PrinterSelection) -> Result<Vec<DeviceEndpoint>> {
        let wanted = selection.device_ids();
        let devices = self.lookup.resolve_devices(wanted).await?;

        let missing: Vec<String> = wanted
            .iter()
            .filter(|id| !devices.iter().any(|d| d.id == **id))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(IotPrintError::StaleSelection { missing });
        }
        Ok(devices)
    }
}

#[async_trait]
impl Transport for LongpollTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Longpoll
    }

    #[instrument(skip_all, fields(report_id = %job.report_id(), token = %job.token()))]
    async fn deliver(&self, job: &PrintJob, selection: &PrinterSelection) -> Result<()> {
        let devices = self.resolve(selection).await?;

        let descriptors = self
            .renderer
            .render_and_send(RenderRequest {
                report_id: job.report_id(),
                devices: &devices,
                record_ids: job.record_ids(),
                payload: job.payload(),
                token: job.token(),
                use_socket: false,
            })
            .await?;
        debug!(jobs = descriptors.len(), "report rendered for long-poll delivery");

        for descriptor in descriptors {
            if self.announce {
                self.notifier.notify(Notification::info(format!(
                    "Sending to printer {}...",
                    descriptor.display_name
                )));
            }

            let controller = DeviceController::new(
                Arc::clone(&self.channel),
                descriptor.address,
                self.ack_timeout,
            );
            controller
                .action(&descriptor.idempotency_id, job.token(), descriptor.document)
                .await?;
        }

        info!("all devices acknowledged");
        Ok(())
    }
}
