// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Headless bridge implementations.
//
// Used when the relay runs without a UI (kiosk daemons, CI) and as building
// blocks for host integrations: notifications are kept in memory and
// mirrored to the log, the UI block is a flag, and the loopback channel
// answers every device action itself.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use iotprint_core::error::{IotPrintError, Result};
use iotprint_core::types::{DeviceAddress, Notification, NotificationSeverity};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::traits::{DeviceAction, DeviceChannel, DeviceEvent, DeviceEventKind, Notifier, UiState};

/// Capacity of the loopback event channel.
const EVENT_CAPACITY: usize = 64;

/// Keeps every notification and mirrors it to the log.
#[derive(Default)]
pub struct MemoryNotifier {
    log: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the notifications emitted so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Number of notifications with the given severity.
    pub fn count(&self, severity: NotificationSeverity) -> usize {
        self.log
            .lock()
            .map(|log| log.iter().filter(|n| n.severity == severity).count())
            .unwrap_or(0)
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            NotificationSeverity::Info => info!(message = %notification.message, "notification"),
            NotificationSeverity::Warning | NotificationSeverity::Danger => {
                warn!(message = %notification.message, severity = ?notification.severity, "notification")
            }
        }
        if let Ok(mut log) = self.log.lock() {
            log.push(notification);
        }
    }
}

/// UI block state held in a flag.
#[derive(Default)]
pub struct FlagUi {
    blocked: AtomicBool,
}

impl FlagUi {
    pub fn new(blocked: bool) -> Self {
        Self {
            blocked: AtomicBool::new(blocked),
        }
    }
}

impl UiState for FlagUi {
    fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    fn block(&self) {
        self.blocked.store(true, Ordering::SeqCst);
    }

    fn unblock(&self) {
        self.blocked.store(false, Ordering::SeqCst);
    }
}

/// Device channel that answers its own actions.
///
/// Every action is acknowledged unless a failure message was registered for
/// the target device, in which case a `Failed` event is published instead.
pub struct LoopbackChannel {
    events: broadcast::Sender<DeviceEvent>,
    failures: Mutex<HashMap<String, String>>,
    sent: Mutex<Vec<(DeviceAddress, DeviceAction)>>,
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackChannel {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events,
            failures: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Make every action for `identifier` fail with `message`.
    pub fn fail_device(&self, identifier: &str, message: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(identifier.to_owned(), message.to_owned());
        }
    }

    /// Publish an out-of-band event, as a device would.
    pub fn emit(&self, event: DeviceEvent) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(event);
    }

    /// Actions sent so far, in order.
    pub fn sent(&self) -> Vec<(DeviceAddress, DeviceAction)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DeviceChannel for LoopbackChannel {
    async fn send(&self, address: &DeviceAddress, action: &DeviceAction) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| IotPrintError::ChannelClosed("loopback state poisoned".into()))?
            .push((address.clone(), action.clone()));

        let failure = self
            .failures
            .lock()
            .ok()
            .and_then(|f| f.get(&address.identifier).cloned());

        let kind = match failure {
            Some(message) => DeviceEventKind::Failed {
                idempotency_id: action.idempotency_id.clone(),
                message,
            },
            None => DeviceEventKind::Ack {
                idempotency_id: action.idempotency_id.clone(),
            },
        };
        debug!(device = %address, "loopback answering device action");
        self.emit(DeviceEvent {
            address: address.clone(),
            session_id: Some(action.session_id),
            kind,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }
}
