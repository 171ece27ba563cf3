// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device controller: one session with one device on an IoT box.
//
// `action` sends a job and suspends until the device acknowledges it or
// reports a failure for it. Out-of-band device events (status changes,
// balance tickets) go to listeners registered with `add_listener` and never
// settle a pending action.

use std::sync::Arc;
use std::time::Duration;

use iotprint_bridge::{DeviceAction, DeviceChannel, DeviceEvent, DeviceEventKind};
use iotprint_core::error::{IotPrintError, Result};
use iotprint_core::types::{DeviceAddress, IdempotencyToken};
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// A live channel to one device. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSession {
    pub address: DeviceAddress,
    pub session_id: Uuid,
}

impl DeviceSession {
    fn open(address: DeviceAddress) -> Self {
        Self {
            address,
            session_id: Uuid::new_v4(),
        }
    }

    /// Whether `event` comes from this session's device and is not
    /// addressed to another session.
    fn owns(&self, event: &DeviceEvent) -> bool {
        event.address == self.address && event.session_id.is_none_or(|id| id == self.session_id)
    }
}

pub struct DeviceController {
    channel: Arc<dyn DeviceChannel>,
    session: DeviceSession,
    ack_timeout: Option<Duration>,
}

impl DeviceController {
    /// Open a session with the device at `address`. `ack_timeout` bounds
    /// each `action`; `None` waits for as long as the device takes.
    pub fn new(
        channel: Arc<dyn DeviceChannel>,
        address: DeviceAddress,
        ack_timeout: Option<Duration>,
    ) -> Self {
        Self {
            channel,
            session: DeviceSession::open(address),
            ack_timeout,
        }
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    /// Send one document and wait for the device's verdict on it.
    #[instrument(skip(self, print_id, document), fields(
        device = %self.session.address,
        idempotency_id = %idempotency_id,
    ))]
    pub async fn action(
        &self,
        idempotency_id: &str,
        print_id: &IdempotencyToken,
        document: Vec<u8>,
    ) -> Result<()> {
        // Subscribe before sending so a fast acknowledgment is not missed.
        let mut events = self.channel.subscribe();

        let action = DeviceAction {
            session_id: self.session.session_id,
            idempotency_id: idempotency_id.to_owned(),
            print_id: print_id.clone(),
            document,
        };
        self.channel.send(&self.session.address, &action).await?;
        debug!(bytes = action.document.len(), "device action sent");

        let outcome = self.await_outcome(&mut events, idempotency_id);
        match self.ack_timeout {
            Some(limit) => tokio::time::timeout(limit, outcome).await.map_err(|_| {
                warn!(secs = limit.as_secs(), "device did not answer in time");
                IotPrintError::DeviceTimeout {
                    identifier: self.session.address.identifier.clone(),
                    secs: limit.as_secs(),
                }
            })?,
            None => outcome.await,
        }
    }

    async fn await_outcome(
        &self,
        events: &mut Receiver<DeviceEvent>,
        idempotency_id: &str,
    ) -> Result<()> {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "device event stream lagged");
                    continue;
                }
                Err(RecvError::Closed) => {
                    return Err(IotPrintError::ChannelClosed(format!(
                        "event stream of {} closed before the device answered",
                        self.session.address
                    )));
                }
            };
            if !self.session.owns(&event) {
                continue;
            }

            match event.kind {
                DeviceEventKind::Ack { idempotency_id: id } if id == idempotency_id => {
                    info!("device acknowledged job");
                    return Ok(());
                }
                DeviceEventKind::Failed {
                    idempotency_id: id,
                    message,
                } if id == idempotency_id => {
                    warn!(%message, "device rejected job");
                    return Err(IotPrintError::Device {
                        identifier: self.session.address.identifier.clone(),
                        message,
                    });
                }
                _ => {}
            }
        }
    }

    /// Forward this device's out-of-band status events to `callback` until
    /// the returned handle is dropped. Must be called inside a tokio runtime.
    pub fn add_listener<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&serde_json::Value) + Send + 'static,
    {
        let mut events = self.channel.subscribe();
        let address = self.session.address.clone();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(DeviceEvent {
                        address: from,
                        kind: DeviceEventKind::Status(status),
                        ..
                    }) if from == address => callback(&status),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(device = %address, skipped, "device listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(device = %address, "device listener stopped");
        });

        ListenerHandle { task }
    }
}

/// Keeps a device listener registered; dropping it removes the listener.
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
