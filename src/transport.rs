//! Message bus boundary.
//!
//! The session controller only ever talks to the bus through the
//! [`Transport`] trait: one blocking consume call and one fire-and-forget
//! publish. Production would back this with the competition message broker;
//! [`InMemoryTransport`] backs the tests and the demo binary.

use crate::messages::InboundMessage;
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Channel every participant subscribes to for matches and book updates.
pub const CHANNEL_BROADCAST: &str = "market_updates";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The bus connection is gone; no further messages will arrive.
    #[error("message bus disconnected")]
    Disconnected,

    #[error("publish to {channel} failed: {reason}")]
    PublishFailed { channel: String, reason: String },
}

/// Bus capabilities the session controller depends on.
pub trait Transport {
    /// Block until the next inbound message. Payloads that fail to decode
    /// surface as [`InboundMessage::Error`], not as `Err`; `Err` means the
    /// connection itself is gone.
    fn recv(&mut self) -> Result<InboundMessage, TransportError>;

    /// Publish a payload to a named channel.
    fn publish(&mut self, channel: &str, payload: &str) -> Result<(), TransportError>;
}

type PublishedMap = Arc<Mutex<HashMap<String, Vec<String>>>>;

/// In-process bus: an unbounded queue of raw inbound payloads plus a
/// recording of everything published, per channel.
#[derive(Debug)]
pub struct InMemoryTransport {
    rx: Receiver<String>,
    published: PublishedMap,
}

impl InMemoryTransport {
    /// Build a transport together with the handle participants use to feed
    /// it. Dropping every handle clone disconnects the transport.
    pub fn pair() -> (InMemoryTransport, BusHandle) {
        let (tx, rx) = channel();
        let published: PublishedMap = Arc::new(Mutex::new(HashMap::new()));
        let transport = InMemoryTransport {
            rx,
            published: published.clone(),
        };
        let handle = BusHandle {
            tx,
            published: PublishedLog(published),
        };
        (transport, handle)
    }
}

impl Transport for InMemoryTransport {
    fn recv(&mut self) -> Result<InboundMessage, TransportError> {
        let raw = self.rx.recv().map_err(|_| TransportError::Disconnected)?;
        Ok(InboundMessage::decode(&raw))
    }

    fn publish(&mut self, channel: &str, payload: &str) -> Result<(), TransportError> {
        self.published
            .lock()
            .expect("publish log lock poisoned")
            .entry(channel.to_string())
            .or_default()
            .push(payload.to_string());
        Ok(())
    }
}

/// Producer side of an [`InMemoryTransport`]. Cloneable so several scripted
/// participants can share the queue.
#[derive(Debug, Clone)]
pub struct BusHandle {
    tx: Sender<String>,
    published: PublishedLog,
}

impl BusHandle {
    /// Queue a raw payload exactly as it would arrive off the wire.
    pub fn send_raw(&self, raw: impl Into<String>) {
        // a send only fails when the transport is gone; scripted senders
        // simply stop in that case
        let _ = self.tx.send(raw.into());
    }

    /// Queue a well-formed message.
    pub fn send(&self, message: &InboundMessage) {
        self.send_raw(serde_json::to_string(message).expect("inbound messages always serialize"));
    }

    /// A view of everything published, usable after this handle is gone.
    pub fn publications(&self) -> PublishedLog {
        self.published.clone()
    }
}

/// Read-only view of published payloads, by channel.
#[derive(Debug, Clone)]
pub struct PublishedLog(PublishedMap);

impl PublishedLog {
    pub fn channel(&self, name: &str) -> Vec<String> {
        self.0
            .lock()
            .expect("publish log lock poisoned")
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .0
            .lock()
            .expect("publish log lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
