// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iotprint-bridge — Interfaces to the host application.
//
// The host supplies the RPC client, UI and device transport by implementing
// the traits in `traits`. `memory` holds headless implementations for
// embedding the relay without a UI.

pub mod memory;
pub mod traits;

pub use traits::*;
