// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// iotprint-security — Idempotency tokens, payload fingerprints and the
// append-only dispatch audit trail.

pub mod audit;
pub mod integrity;
pub mod token;

pub use audit::AuditLog;
pub use integrity::{hash_bytes, payload_digest};
pub use token::generate_token;
