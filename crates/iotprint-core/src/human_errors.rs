// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for shop-floor users.
//
// Every technical error is mapped to plain English with a clear suggestion
// and the notification severity the UI should use for it.

use crate::error::IotPrintError;
use crate::types::{Notification, NotificationSeverity};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip, box rebooting — trying again may work.
    Transient,
    /// User must do something (pick printers again, add paper, close cover).
    ActionRequired,
    /// Retrying will not help.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether trying the same print again may succeed.
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    /// Notification carrying this error, coloured by severity.
    pub fn notification(&self) -> Notification {
        let severity = match self.severity {
            Severity::Transient | Severity::ActionRequired => NotificationSeverity::Warning,
            Severity::Permanent => NotificationSeverity::Danger,
        };
        Notification {
            message: format!("{} {}", self.message, self.suggestion),
            severity,
        }
    }
}

/// Convert an `IotPrintError` into a `HumanError`.
pub fn humanize_error(err: &IotPrintError) -> HumanError {
    match err {
        IotPrintError::Server(_) => HumanError {
            message: "The server can't be reached right now.".into(),
            suggestion: "Check the network connection, then print again. Your printer choice has been reset.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        IotPrintError::DeviceLookup(_) => HumanError {
            message: "The printers for this document couldn't be looked up.".into(),
            suggestion: "Try again in a moment.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        IotPrintError::StaleSelection { .. } => HumanError {
            message: "One of the printers used for this document is no longer available.".into(),
            suggestion: "Print again to choose new printers.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        IotPrintError::Render(detail) => HumanError {
            message: "The document couldn't be prepared for printing.".into(),
            suggestion: format!("Make sure the report is linked to an IoT printer. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        IotPrintError::SocketQueue(_) | IotPrintError::ChannelClosed(_) => HumanError {
            message: "The IoT box didn't accept the print job.".into(),
            suggestion: "Check the IoT box is switched on and connected, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        IotPrintError::Device { message, .. } => humanize_device_error(message),

        IotPrintError::DeviceTimeout { .. } => HumanError {
            message: "The printer didn't respond in time.".into(),
            suggestion: "The printer might be busy or turned off. Check it's on and connected, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        IotPrintError::Wizard(_) => HumanError {
            message: "The printer selection window couldn't be opened.".into(),
            suggestion: "Reload the page and try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        IotPrintError::InvalidToken(_)
        | IotPrintError::Entropy(_)
        | IotPrintError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        IotPrintError::Database(_) | IotPrintError::Io(_) => HumanError {
            message: "Saved printer choices couldn't be read or written.".into(),
            suggestion: "Try again. If this keeps happening, clear the saved printer choices.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}

/// Parse a device-reported error into a human-readable message.
fn humanize_device_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("paper") && (lower.contains("out") || lower.contains("empty")) {
        HumanError {
            message: "The printer is out of paper.".into(),
            suggestion: "Please load a new roll or add paper, then print again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else if lower.contains("cover") || lower.contains("door") {
        HumanError {
            message: "The printer cover is open.".into(),
            suggestion: "Close the cover, then print again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "The printer had a problem.".into(),
            suggestion: format!("Try again. If this keeps happening, restart the printer. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
