// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistent-socket transport: hand the whole job to the box socket queue in
// one call. The call's outcome is the attempt's outcome.

use std::sync::Arc;

use async_trait::async_trait;
use iotprint_bridge::{PrintBridge, SocketJobQueue};
use iotprint_core::error::Result;
use iotprint_core::types::{PrintJob, PrinterSelection, TransportKind};
use tracing::{debug, instrument};

use crate::transport::Transport;

pub struct SocketTransport {
    queue: Arc<dyn SocketJobQueue>,
}

impl SocketTransport {
    pub fn new(bridge: &PrintBridge) -> Self {
        Self {
            queue: Arc::clone(&bridge.socket_queue),
        }
    }
}

#[async_trait]
impl Transport for SocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    #[instrument(skip_all, fields(report_id = %job.report_id(), token = %job.token()))]
    async fn deliver(&self, job: &PrintJob, selection: &PrinterSelection) -> Result<()> {
        // The queue pushes the job itself; the server must not send it again.
        self.queue.submit(selection.device_ids(), job, false).await?;
        debug!(devices = selection.device_ids().len(), "job queued on box socket");
        Ok(())
    }
}
