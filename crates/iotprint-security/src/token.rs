// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Idempotency token generation.
//
// A token is 8 bytes from the OS CSPRNG, hex encoded. It travels with every
// transport attempt of one print request so that a box receiving the job over
// both long-polling and the socket prints it once.

use iotprint_core::error::{IotPrintError, Result};
use iotprint_core::types::{IdempotencyToken, TOKEN_BYTES};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::debug;

/// Draw a fresh idempotency token.
pub fn generate_token() -> Result<IdempotencyToken> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill(&mut bytes)
        .map_err(|e| IotPrintError::Entropy(format!("token generation failed: {e}")))?;

    let token = IdempotencyToken::parse(&hex::encode(bytes))?;
    debug!(%token, "idempotency token generated");
    Ok(token)
}
