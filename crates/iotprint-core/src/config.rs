// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Relay configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::TransportKind;

/// Persistent relay settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Key namespace of the printer-selection cache.
    pub cache_namespace: String,
    /// Transports tried in order until one delivers the job.
    pub transport_order: Vec<TransportKind>,
    /// How long to wait for a device to acknowledge a job. `None` waits
    /// indefinitely.
    pub device_ack_timeout_secs: Option<u64>,
    /// Notify the user before each long-poll device send.
    pub announce_devices: bool,
    /// Record dispatch outcomes in the audit trail.
    pub audit_enabled: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            cache_namespace: "odoo-iot-linked_reports".into(),
            transport_order: vec![TransportKind::Longpoll, TransportKind::Socket],
            device_ack_timeout_secs: Some(60),
            announce_devices: true,
            audit_enabled: true,
        }
    }
}

impl RelayConfig {
    /// Configured transport order with repeats removed.
    pub fn transport_order(&self) -> Vec<TransportKind> {
        let mut order = Vec::with_capacity(self.transport_order.len());
        for kind in &self.transport_order {
            if !order.contains(kind) {
                order.push(*kind);
            }
        }
        order
    }

    pub fn device_ack_timeout(&self) -> Option<Duration> {
        self.device_ack_timeout_secs.map(Duration::from_secs)
    }
}
