// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Report action handlers, composed into an ordered chain at startup.
//
// Each handler either handles a report action or lets it fall through to the
// next one. When no handler takes it, the host prints the default way.

use std::sync::Arc;

use async_trait::async_trait;
use iotprint_core::error::Result;
use iotprint_core::types::ReportAction;
use tracing::{debug, instrument};

use crate::dispatcher::JobDispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    Handled,
    Fallthrough,
}

impl From<bool> for HandlerOutcome {
    fn from(handled: bool) -> Self {
        if handled { Self::Handled } else { Self::Fallthrough }
    }
}

#[async_trait]
pub trait ReportHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, action: &ReportAction) -> Result<HandlerOutcome>;
}

#[async_trait]
impl ReportHandler for JobDispatcher {
    fn name(&self) -> &str {
        "iot_report_action_handler"
    }

    async fn handle(&self, action: &ReportAction) -> Result<HandlerOutcome> {
        self.handle_report_action(action).await.map(HandlerOutcome::from)
    }
}

/// Handlers in the order they are consulted.
#[derive(Default, Clone)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn ReportHandler>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` after the ones already registered.
    pub fn with(mut self, handler: Arc<dyn ReportHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Offer `action` to each handler in turn; the first that handles it
    /// wins. Errors stop the chain.
    #[instrument(skip_all, fields(report_id = %action.report_id))]
    pub async fn handle(&self, action: &ReportAction) -> Result<HandlerOutcome> {
        for handler in &self.handlers {
            if handler.handle(action).await? == HandlerOutcome::Handled {
                debug!(handler = handler.name(), "report action handled");
                return Ok(HandlerOutcome::Handled);
            }
        }
        Ok(HandlerOutcome::Fallthrough)
    }
}
