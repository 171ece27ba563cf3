// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iotprint-dispatch — Printer selection, device sessions, and the
// long-poll/socket fallback chain that delivers a print job to the IoT boxes.
// Host services come in through the traits of `iotprint-bridge`.

pub mod device;
pub mod dispatcher;
pub mod fallback;
pub mod handler;
pub mod longpoll;
pub mod selection;
pub mod socket;
pub mod store;
pub mod transport;
pub mod wizard;

#[cfg(test)]
mod testing;

pub use device::{DeviceController, DeviceSession, ListenerHandle};
pub use dispatcher::JobDispatcher;
pub use fallback::{FallbackOrchestrator, FallbackOutcome};
pub use handler::{HandlerChain, HandlerOutcome, ReportHandler};
pub use selection::SelectionResolver;
pub use store::{MemorySelectionStore, SelectionStore, SqliteSelectionStore};
pub use transport::{Transport, build_transports};
pub use wizard::{PendingSelection, WizardBroker};
