// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted host collaborators shared by the unit tests of this crate.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use iotprint_bridge::memory::{FlagUi, LoopbackChannel, MemoryNotifier};
use iotprint_bridge::{
    DeviceAction, DeviceChannel, DeviceEvent, DeviceEventKind, DeviceLookup, PrintBridge,
    PrinterWizard, RenderRequest, ReportRenderer, SocketJobQueue, UiState, WizardRequest,
};
use iotprint_core::error::{IotPrintError, Result};
use iotprint_core::types::{
    DeviceAddress, DeviceEndpoint, DeviceId, IdempotencyToken, JobDescriptor, PrintJob,
    PrinterSelection, RecordId, TransportKind,
};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::fallback::FallbackOrchestrator;
use crate::selection::SelectionResolver;
use crate::store::MemorySelectionStore;
use crate::transport::Transport;
use crate::wizard::WizardBroker;

pub const BOX_ADDRESS: &str = "10.0.0.5";

pub fn token() -> IdempotencyToken {
    IdempotencyToken::parse("0123456789abcdef").unwrap()
}

/// How a scripted collaborator answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    Succeed,
    /// Fail with a transport-level (`server`) error.
    FailServer,
    /// Fail with an unclassified error.
    FailDevice,
}

impl Behaviour {
    fn outcome(self, device_error: impl FnOnce() -> IotPrintError) -> Result<()> {
        match self {
            Self::Succeed => Ok(()),
            Self::FailServer => Err(IotPrintError::Server("502 Bad Gateway".into())),
            Self::FailDevice => Err(device_error()),
        }
    }
}

/// Transport that answers as scripted and records the tokens it saw.
pub struct ScriptedTransport {
    kind: TransportKind,
    behaviour: Behaviour,
    tokens: Mutex<Vec<IdempotencyToken>>,
}

impl ScriptedTransport {
    pub fn new(kind: TransportKind, behaviour: Behaviour) -> Self {
        Self {
            kind,
            behaviour,
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn tokens(&self) -> Vec<IdempotencyToken> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn deliver(&self, job: &PrintJob, _selection: &PrinterSelection) -> Result<()> {
        self.tokens.lock().unwrap().push(job.token().clone());
        self.behaviour.outcome(|| IotPrintError::Device {
            identifier: "printer_1".into(),
            message: "paper out".into(),
        })
    }
}

/// Knows devices 1 to 3, named "Printer <id>" on box `BOX_ADDRESS`.
pub struct FakeLookup {
    behaviour: Mutex<Behaviour>,
    duplicate_first: AtomicBool,
}

impl FakeLookup {
    fn new() -> Self {
        Self {
            behaviour: Mutex::new(Behaviour::Succeed),
            duplicate_first: AtomicBool::new(false),
        }
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    /// Answer every lookup with the first known endpoint listed twice.
    pub fn duplicate_first(&self) {
        self.duplicate_first.store(true, Ordering::SeqCst);
    }

    pub fn endpoint(id: DeviceId) -> DeviceEndpoint {
        DeviceEndpoint {
            id,
            identifier: format!("printer_{id}"),
            name: format!("Printer {id}"),
            box_identifier: "box_1".into(),
            display_name: format!("Printer {id} (box_1)"),
        }
    }
}

#[async_trait]
impl DeviceLookup for FakeLookup {
    async fn resolve_devices(&self, printer_ids: &[DeviceId]) -> Result<Vec<DeviceEndpoint>> {
        let behaviour = *self.behaviour.lock().unwrap();
        behaviour.outcome(|| IotPrintError::DeviceLookup("lookup failed".into()))?;
        let mut found: Vec<DeviceEndpoint> = printer_ids
            .iter()
            .filter(|id| (1..=3).contains(&id.0))
            .map(|id| Self::endpoint(*id))
            .collect();
        if self.duplicate_first.load(Ordering::SeqCst) {
            if let Some(first) = found.first().cloned() {
                found.push(first);
            }
        }
        Ok(found)
    }
}

#[derive(Debug, Clone)]
pub struct RenderCall {
    pub devices: Vec<DeviceId>,
    pub token: IdempotencyToken,
    pub use_socket: bool,
}

/// Renders one fixed document per device.
pub struct FakeRenderer {
    behaviour: Mutex<Behaviour>,
    requests: Mutex<Vec<RenderCall>>,
}

impl FakeRenderer {
    fn new() -> Self {
        Self {
            behaviour: Mutex::new(Behaviour::Succeed),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn requests(&self) -> Vec<RenderCall> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportRenderer for FakeRenderer {
    async fn render_and_send(&self, request: RenderRequest<'_>) -> Result<Vec<JobDescriptor>> {
        self.requests.lock().unwrap().push(RenderCall {
            devices: request.devices.iter().map(|d| d.id).collect(),
            token: request.token.clone(),
            use_socket: request.use_socket,
        });
        let behaviour = *self.behaviour.lock().unwrap();
        behaviour.outcome(|| IotPrintError::Render("template error".into()))?;
        Ok(request
            .devices
            .iter()
            .map(|d| JobDescriptor::for_device(BOX_ADDRESS, d, b"%PDF-1.7".to_vec(), request.token))
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct SocketCall {
    pub printer_ids: Vec<DeviceId>,
    pub token: IdempotencyToken,
    pub record_ids: Vec<RecordId>,
    pub use_socket: bool,
}

pub struct FakeSocketQueue {
    behaviour: Mutex<Behaviour>,
    calls: Mutex<Vec<SocketCall>>,
}

impl FakeSocketQueue {
    fn new() -> Self {
        Self {
            behaviour: Mutex::new(Behaviour::Succeed),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behaviour(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    pub fn calls(&self) -> Vec<SocketCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocketJobQueue for FakeSocketQueue {
    async fn submit(&self, printer_ids: &[DeviceId], job: &PrintJob, use_socket: bool) -> Result<()> {
        self.calls.lock().unwrap().push(SocketCall {
            printer_ids: printer_ids.to_vec(),
            token: job.token().clone(),
            record_ids: job.record_ids().to_vec(),
            use_socket,
        });
        let behaviour = *self.behaviour.lock().unwrap();
        behaviour.outcome(|| IotPrintError::SocketQueue("box offline".into()))
    }
}

/// Wizard that answers through the broker as soon as it is opened, noting
/// whether the UI was blocked at that moment.
pub struct AnsweringWizard {
    broker: WizardBroker,
    answer: Option<Vec<DeviceId>>,
    ui: Arc<dyn UiState>,
    ui_states: Mutex<Vec<bool>>,
}

impl AnsweringWizard {
    pub fn new(broker: WizardBroker, answer: Option<Vec<DeviceId>>, ui: Arc<dyn UiState>) -> Self {
        Self {
            broker,
            answer,
            ui,
            ui_states: Mutex::new(Vec::new()),
        }
    }

    pub fn opened(&self) -> usize {
        self.ui_states.lock().unwrap().len()
    }

    pub fn ui_blocked_when_opened(&self) -> Vec<bool> {
        self.ui_states.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrinterWizard for AnsweringWizard {
    async fn open(&self, request: &WizardRequest) -> Result<()> {
        self.ui_states.lock().unwrap().push(self.ui.is_blocked());
        self.broker.complete(request.id, self.answer.clone());
        Ok(())
    }
}

/// Device channel that never answers, apart from the scripted noise it
/// publishes after each send.
pub struct SilentChannel {
    events: broadcast::Sender<DeviceEvent>,
    noise: Vec<DeviceEventKind>,
    foreign_session: bool,
    sent: AtomicUsize,
}

impl SilentChannel {
    /// Noise addressed to no session in particular.
    pub fn with_noise(noise: Vec<DeviceEventKind>) -> Self {
        Self::build(noise, false)
    }

    /// Noise addressed to some other session.
    pub fn from_foreign_session(noise: Vec<DeviceEventKind>) -> Self {
        Self::build(noise, true)
    }

    fn build(noise: Vec<DeviceEventKind>, foreign_session: bool) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            events,
            noise,
            foreign_session,
            sent: AtomicUsize::new(0),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceChannel for SilentChannel {
    async fn send(&self, address: &DeviceAddress, _action: &DeviceAction) -> Result<()> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        for kind in &self.noise {
            let _ = self.events.send(DeviceEvent {
                address: address.clone(),
                session_id: self.foreign_session.then(Uuid::new_v4),
                kind: kind.clone(),
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }
}

/// A full set of fakes wired into a `PrintBridge`.
pub struct Harness {
    pub bridge: PrintBridge,
    pub lookup: Arc<FakeLookup>,
    pub renderer: Arc<FakeRenderer>,
    pub socket_queue: Arc<FakeSocketQueue>,
    pub wizard: Arc<AnsweringWizard>,
    pub notifier: Arc<MemoryNotifier>,
    pub ui: Arc<FlagUi>,
    pub channel: Arc<LoopbackChannel>,
    pub broker: WizardBroker,
    pub store: Arc<MemorySelectionStore>,
}

impl Harness {
    /// Harness whose wizard is always dismissed.
    pub fn new() -> Self {
        Self::with_answer(None)
    }

    pub fn with_answer(answer: Option<Vec<DeviceId>>) -> Self {
        let broker = WizardBroker::new();
        let ui = Arc::new(FlagUi::new(false));
        let lookup = Arc::new(FakeLookup::new());
        let renderer = Arc::new(FakeRenderer::new());
        let socket_queue = Arc::new(FakeSocketQueue::new());
        let wizard = Arc::new(AnsweringWizard::new(broker.clone(), answer, ui.clone()));
        let notifier = Arc::new(MemoryNotifier::new());
        let channel = Arc::new(LoopbackChannel::new());

        let bridge = PrintBridge {
            lookup: lookup.clone(),
            renderer: renderer.clone(),
            socket_queue: socket_queue.clone(),
            wizard: wizard.clone(),
            notifier: notifier.clone(),
            ui: ui.clone(),
            channel: channel.clone(),
        };

        Self {
            bridge,
            lookup,
            renderer,
            socket_queue,
            wizard,
            notifier,
            ui,
            channel,
            broker,
            store: Arc::new(MemorySelectionStore::new()),
        }
    }

    pub fn resolver(&self) -> SelectionResolver {
        SelectionResolver::new(
            self.store.clone(),
            self.broker.clone(),
            self.wizard.clone(),
            self.ui.clone(),
        )
    }

    pub fn orchestrator(&self, transports: Vec<Arc<dyn Transport>>) -> FallbackOrchestrator {
        FallbackOrchestrator::new(
            transports,
            self.store.clone(),
            self.notifier.clone(),
            self.ui.clone(),
        )
    }
}
