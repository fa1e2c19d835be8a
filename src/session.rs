//! Session lifecycle.
//!
//! One session runs from participant registration to shutdown:
//! `Loading -> WaitingForReady -> Trading -> ShuttingDown -> Terminated`.
//! The controller is the sole consumer of inbound messages and owns the
//! ledger and every order book; each order is processed to completion
//! before the next message is consumed, which totally orders all observed
//! events without any locking.

use crate::config::ExchangeConfig;
use crate::engine::EngineRegistry;
use crate::event_log::EventLog;
use crate::ledger::InMemoryLedger;
use crate::messages::{InboundMessage, OrderRequest, OutboundMessage, Shutdown};
use crate::transport::{Transport, TransportError, CHANNEL_BROADCAST};
use crate::types::ClientId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    WaitingForReady,
    Trading,
    ShuttingDown,
    Terminated,
}

/// Participant registry, consulted once while loading. Production loads
/// the competition roster; tests and the demo use [`FixedRoster`].
pub trait ClientSource {
    fn load(&self) -> Vec<ClientId>;
}

#[derive(Debug, Clone)]
pub struct FixedRoster {
    ids: Vec<ClientId>,
}

impl FixedRoster {
    pub fn new(ids: impl IntoIterator<Item = ClientId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl ClientSource for FixedRoster {
    fn load(&self) -> Vec<ClientId> {
        self.ids.clone()
    }
}

/// Cooperative stop flag, observed at the top of each consume cycle. A
/// blocked read is unblocked by the transport disconnecting.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_signaled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An init message arrived while trading. Protocol violation, fatal.
    #[error("unexpected init message from {0} during trading")]
    UnexpectedInit(ClientId),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Drives one exchange session over a transport.
pub struct Session<T: Transport> {
    config: ExchangeConfig,
    transport: T,
    ledger: InMemoryLedger,
    registry: EngineRegistry,
    state: SessionState,
    shutdown: ShutdownHandle,
    event_log: Option<EventLog>,
}

impl<T: Transport> Session<T> {
    pub fn new(config: ExchangeConfig, transport: T) -> Self {
        let ledger = InMemoryLedger::new(config.starting_capital, config.shorts_allowed);
        Self {
            config,
            transport,
            ledger,
            registry: EngineRegistry::new(),
            state: SessionState::Loading,
            shutdown: ShutdownHandle::new(),
            event_log: None,
        }
    }

    /// Attach an audit log recording every published message.
    pub fn with_event_log(mut self, event_log: EventLog) -> Self {
        self.event_log = Some(event_log);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }

    /// Mutable ledger access for scenario seeding before trading starts.
    pub fn ledger_mut(&mut self) -> &mut InMemoryLedger {
        &mut self.ledger
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Run the whole lifecycle: load the roster, wait for the ready
    /// barrier, trade until the bus closes or the stop flag is raised,
    /// then notify every active participant.
    pub fn execute(&mut self, source: &dyn ClientSource) -> Result<(), SessionError> {
        self.load_clients(source);
        self.wait_for_ready()?;
        self.run()
    }

    /// Register every participant from the roster.
    pub fn load_clients(&mut self, source: &dyn ClientSource) {
        debug_assert_eq!(self.state, SessionState::Loading);
        let ids = source.load();
        for id in ids {
            self.ledger.add_client(id);
        }
        info!(clients = self.ledger.len(), "roster loaded");
        self.state = SessionState::WaitingForReady;
    }

    /// Consume exactly `expected_clients` messages before opening trading.
    /// Ready reports activate their sender; anything else is logged and
    /// still consumes a slot.
    pub fn wait_for_ready(&mut self) -> Result<(), SessionError> {
        debug_assert_eq!(self.state, SessionState::WaitingForReady);
        for _ in 0..self.config.expected_clients {
            match self.transport.recv()? {
                InboundMessage::Init(init) => {
                    info!(
                        client = %init.client_uid,
                        ready = init.ready,
                        "client reported in"
                    );
                    if init.ready {
                        self.ledger.mark_active(&init.client_uid);
                    }
                }
                InboundMessage::Order(req) => {
                    info!(
                        client = %req.client_uid,
                        "market order before initialization complete, ignoring"
                    );
                }
                InboundMessage::Error(err) => {
                    error!("bus error during ready phase: {}", err.message);
                }
            }
        }
        info!("all clients reported, opening trading");
        self.state = SessionState::Trading;
        Ok(())
    }

    /// Trading loop. Returns when the stop flag is raised or the bus
    /// disconnects; an init message mid-session is a protocol violation
    /// and aborts instead.
    pub fn run(&mut self) -> Result<(), SessionError> {
        debug_assert_eq!(self.state, SessionState::Trading);
        loop {
            if self.shutdown.is_signaled() {
                info!("stop flag raised, closing session");
                break;
            }

            let message = match self.transport.recv() {
                Ok(message) => message,
                Err(TransportError::Disconnected) => {
                    info!("bus disconnected, closing session");
                    break;
                }
                Err(err) => {
                    warn!("transport error, message discarded: {err}");
                    continue;
                }
            };

            match message {
                InboundMessage::Order(request) => self.handle_order(request),
                InboundMessage::Init(init) => {
                    error!(
                        client = %init.client_uid,
                        "init message during trading, aborting session"
                    );
                    return Err(SessionError::UnexpectedInit(init.client_uid));
                }
                InboundMessage::Error(err) => {
                    error!("bus error: {}", err.message);
                }
            }
        }

        self.shutdown_clients();
        Ok(())
    }

    fn handle_order(&mut self, request: OrderRequest) {
        info!(
            client = %request.client_uid,
            ticker = %request.ticker,
            side = %request.side,
            price = %request.price,
            quantity = %request.quantity,
            "market order received"
        );
        let (matches, updates) = self.registry.route(request, &mut self.ledger);
        for m in matches {
            self.publish(CHANNEL_BROADCAST, OutboundMessage::Match(m), None);
        }
        for update in updates {
            self.publish(CHANNEL_BROADCAST, OutboundMessage::ObUpdate(update), None);
        }
    }

    /// Publish one message, best effort, mirrored to the audit log.
    fn publish(&mut self, channel: &str, message: OutboundMessage, uid: Option<&ClientId>) {
        let payload = message.encode();
        if let Err(err) = self.transport.publish(channel, &payload) {
            warn!(%channel, "publish failed: {err}");
        }
        if let Some(log) = &mut self.event_log {
            match &message {
                OutboundMessage::ObUpdate(update) => log.log("ob_update", update, uid),
                OutboundMessage::Match(m) => log.log("match", m, uid),
                OutboundMessage::Shutdown(s) => log.log("shutdown", s, uid),
            }
        }
    }

    /// Notify every active participant on its own channel, then terminate.
    fn shutdown_clients(&mut self) {
        self.state = SessionState::ShuttingDown;
        let active: Vec<ClientId> = self
            .ledger
            .clients(true)
            .into_iter()
            .map(|c| c.id.clone())
            .collect();
        for uid in active {
            info!(client = %uid, "shutting down client");
            let notice = OutboundMessage::Shutdown(Shutdown {
                client_uid: uid.clone(),
            });
            let channel = uid.as_str().to_string();
            self.publish(&channel, notice, Some(&uid));
        }
        if let Some(log) = &mut self.event_log {
            log.flush();
        }
        self.state = SessionState::Terminated;
        info!("session terminated");
    }
}
