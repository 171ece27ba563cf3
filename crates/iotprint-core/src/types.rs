// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for IoT report printing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{IotPrintError, Result};

/// Identifier of a report action on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportId(pub i64);

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an IoT device (printer) record on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub i64);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a business record the report is printed for.
pub type RecordId = i64;

/// Number of random bytes behind an idempotency token.
pub const TOKEN_BYTES: usize = 8;

/// Opaque token attached to a print job so a device can discard a job that
/// reaches it twice (once per transport).
///
/// Always `2 * TOKEN_BYTES` lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyToken(String);

impl IdempotencyToken {
    /// Validate and wrap a hex token.
    pub fn parse(raw: &str) -> Result<Self> {
        let valid = raw.len() == TOKEN_BYTES * 2
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(Self(raw.to_owned()))
        } else {
            Err(IotPrintError::InvalidToken(raw.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Per-device idempotent id: `<token>_<device id>`.
    pub fn for_device(&self, device: DeviceId) -> String {
        format!("{}_{}", self.0, device)
    }
}

impl TryFrom<String> for IdempotencyToken {
    type Error = IotPrintError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<IdempotencyToken> for String {
    fn from(token: IdempotencyToken) -> Self {
        token.0
    }
}

impl std::fmt::Display for IdempotencyToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The printers chosen for one report, in the order the user picked them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterSelection {
    pub report_id: ReportId,
    device_ids: Vec<DeviceId>,
}

impl PrinterSelection {
    /// Build a selection, dropping repeated device ids but keeping the first
    /// occurrence's position.
    pub fn new(report_id: ReportId, device_ids: impl IntoIterator<Item = DeviceId>) -> Self {
        let mut ordered: Vec<DeviceId> = Vec::new();
        for id in device_ids {
            if !ordered.contains(&id) {
                ordered.push(id);
            }
        }
        Self {
            report_id,
            device_ids: ordered,
        }
    }

    pub fn device_ids(&self) -> &[DeviceId] {
        &self.device_ids
    }

    pub fn is_empty(&self) -> bool {
        self.device_ids.is_empty()
    }
}

/// What the renderer should print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderPayload {
    /// Report data handed to the server-side renderer.
    Data(serde_json::Value),
    /// An already-rendered document, shipped as-is.
    Document(Vec<u8>),
}

impl Default for RenderPayload {
    fn default() -> Self {
        Self::Data(serde_json::Value::Object(serde_json::Map::new()))
    }
}

/// One logical print request. Immutable once built; the same value (and so
/// the same token) is handed to every transport attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    report_id: ReportId,
    record_ids: Vec<RecordId>,
    payload: RenderPayload,
    token: IdempotencyToken,
}

impl PrintJob {
    pub fn new(
        report_id: ReportId,
        record_ids: Vec<RecordId>,
        payload: RenderPayload,
        token: IdempotencyToken,
    ) -> Self {
        Self {
            report_id,
            record_ids,
            payload,
            token,
        }
    }

    pub fn report_id(&self) -> ReportId {
        self.report_id
    }

    pub fn record_ids(&self) -> &[RecordId] {
        &self.record_ids
    }

    pub fn payload(&self) -> &RenderPayload {
        &self.payload
    }

    pub fn token(&self) -> &IdempotencyToken {
        &self.token
    }
}

/// Network address of the box hosting a device, plus the device identifier
/// on that box.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    pub address: String,
    pub identifier: String,
}

impl std::fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address, self.identifier)
    }
}

/// A printer as resolved by the device lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEndpoint {
    pub id: DeviceId,
    /// Identifier of the device on its box.
    pub identifier: String,
    pub name: String,
    /// Identifier of the box hosting the device.
    pub box_identifier: String,
    pub display_name: String,
}

/// One rendered document bound for one device, as returned by the
/// render-and-dispatch service for long-poll delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub address: DeviceAddress,
    pub display_name: String,
    pub document: Vec<u8>,
    /// Per-device idempotent id (see [`IdempotencyToken::for_device`]).
    pub idempotency_id: String,
}

impl JobDescriptor {
    /// Descriptor for `endpoint` hosted at `box_address`.
    pub fn for_device(
        box_address: &str,
        endpoint: &DeviceEndpoint,
        document: Vec<u8>,
        token: &IdempotencyToken,
    ) -> Self {
        Self {
            address: DeviceAddress {
                address: box_address.to_owned(),
                identifier: endpoint.identifier.clone(),
            },
            display_name: endpoint.name.clone(),
            document,
            idempotency_id: token.for_device(endpoint.id),
        }
    }
}

/// Transport strategies of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Ask the server for rendered documents, then push each one to its
    /// device over long-polling.
    Longpoll,
    /// Hand the whole job to the server, which pushes it to the boxes over
    /// their persistent socket.
    Socket,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Longpoll => "longpoll",
            Self::Socket => "socket",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of a user notification (drives colour in the UI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSeverity {
    Info,
    Warning,
    Danger,
}

/// A message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: NotificationSeverity,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: NotificationSeverity::Info,
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: NotificationSeverity::Danger,
        }
    }
}

/// A report print request as raised by the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportAction {
    pub report_id: ReportId,
    /// Devices configured on the report. Empty means "not an IoT report".
    pub device_ids: Vec<String>,
    pub active_ids: Vec<RecordId>,
    pub data: RenderPayload,
}

/// Correlates a wizard launch with its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WizardRequestId(pub Uuid);

impl WizardRequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WizardRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WizardRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_accepts_sixteen_lowercase_hex() {
        let token = IdempotencyToken::parse("0123456789abcdef").unwrap();
        assert_eq!(token.as_str(), "0123456789abcdef");
    }

    #[test]
    fn token_rejects_bad_shapes() {
        assert!(IdempotencyToken::parse("0123").is_err());
        assert!(IdempotencyToken::parse("0123456789ABCDEF").is_err());
        assert!(IdempotencyToken::parse("0123456789abcdeg").is_err());
    }

    #[test]
    fn token_deserialization_validates() {
        let ok: IdempotencyToken = serde_json::from_str("\"00112233aabbccdd\"").unwrap();
        assert_eq!(ok.to_string(), "00112233aabbccdd");
        assert!(serde_json::from_str::<IdempotencyToken>("\"nope\"").is_err());
    }

    #[test]
    fn per_device_idempotent_id() {
        let token = IdempotencyToken::parse("00112233aabbccdd").unwrap();
        assert_eq!(token.for_device(DeviceId(7)), "00112233aabbccdd_7");
    }

    #[test]
    fn selection_dedups_preserving_order() {
        let sel = PrinterSelection::new(ReportId(1), [DeviceId(3), DeviceId(1), DeviceId(3)]);
        assert_eq!(sel.device_ids(), &[DeviceId(3), DeviceId(1)]);
        assert!(!sel.is_empty());
        assert!(PrinterSelection::new(ReportId(1), []).is_empty());
    }

    #[test]
    fn descriptor_for_device() {
        let token = IdempotencyToken::parse("00112233aabbccdd").unwrap();
        let endpoint = DeviceEndpoint {
            id: DeviceId(4),
            identifier: "usb_printer_4".into(),
            name: "Label printer".into(),
            box_identifier: "aa:bb".into(),
            display_name: "[Shop] Label printer".into(),
        };
        let desc = JobDescriptor::for_device("10.0.0.5", &endpoint, vec![1, 2], &token);
        assert_eq!(desc.address.to_string(), "10.0.0.5/usb_printer_4");
        assert_eq!(desc.idempotency_id, "00112233aabbccdd_4");
        assert_eq!(desc.display_name, "Label printer");
    }
}
