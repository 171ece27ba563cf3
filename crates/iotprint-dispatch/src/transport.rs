// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport strategies of the fallback chain.

use std::sync::Arc;

use async_trait::async_trait;
use iotprint_bridge::PrintBridge;
use iotprint_core::config::RelayConfig;
use iotprint_core::error::Result;
use iotprint_core::types::{PrintJob, PrinterSelection, TransportKind};

use crate::longpoll::LongpollTransport;
use crate::socket::SocketTransport;

/// One way of getting a print job to its devices.
///
/// Attempts are stateless: everything a transport needs comes from the job
/// and the selection, and every transport of a chain sees the same job.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    async fn deliver(&self, job: &PrintJob, selection: &PrinterSelection) -> Result<()>;
}

/// Build the transports named by `config`, in its priority order.
pub fn build_transports(config: &RelayConfig, bridge: &PrintBridge) -> Vec<Arc<dyn Transport>> {
    config
        .transport_order()
        .into_iter()
        .map(|kind| -> Arc<dyn Transport> {
            match kind {
                TransportKind::Longpoll => Arc::new(LongpollTransport::new(bridge, config)),
                TransportKind::Socket => Arc::new(SocketTransport::new(bridge)),
            }
        })
        .collect()
}
