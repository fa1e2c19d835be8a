//! Wire messages exchanged with participants over the message bus.
//!
//! Inbound traffic decodes into a tagged variant; anything that fails to
//! decode (or carries a non-positive price or quantity) is turned into the
//! locally synthesized `Error` variant so the consume loop can log it and
//! move on.

use crate::types::{ClientId, Price, Side, Ticker};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One message consumed from the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Init(InitMessage),
    #[serde(rename = "market_order")]
    Order(OrderRequest),
    /// Synthesized locally on decode failure. Never sent by peers.
    Error(BusError),
}

impl InboundMessage {
    /// Decode a raw bus payload. Total: malformed input becomes `Error`.
    pub fn decode(raw: &str) -> InboundMessage {
        match serde_json::from_str::<InboundMessage>(raw) {
            Ok(InboundMessage::Order(req)) if !req.is_valid() => {
                InboundMessage::Error(BusError {
                    message: format!(
                        "market order from {} has non-positive price or quantity",
                        req.client_uid
                    ),
                })
            }
            Ok(msg) => msg,
            Err(err) => InboundMessage::Error(BusError {
                message: err.to_string(),
            }),
        }
    }
}

/// Sent once by each participant before trading starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitMessage {
    pub client_uid: ClientId,
    pub ready: bool,
}

/// A participant's order as it arrives, before sequencing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_uid: ClientId,
    pub ticker: Ticker,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl OrderRequest {
    pub fn is_valid(&self) -> bool {
        self.price > Decimal::ZERO && self.quantity > Decimal::ZERO
    }
}

/// Local stand-in for a message that could not be consumed or decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusError {
    pub message: String,
}

/// One message published back to participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    ObUpdate(ObUpdate),
    Match(Match),
    Shutdown(Shutdown),
}

impl OutboundMessage {
    pub fn encode(&self) -> String {
        serde_json::to_string(self).expect("outbound messages always serialize")
    }
}

/// Announcement of a change in resting volume at a price level.
/// `quantity == 0` means the resting order at that price/side is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObUpdate {
    pub ticker: Ticker,
    pub side: Side,
    pub price: Price,
    pub quantity: Decimal,
}

/// An executed trade. `side` is the aggressor's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub ticker: Ticker,
    pub buyer_uid: ClientId,
    pub seller_uid: ClientId,
    pub side: Side,
    pub price: Price,
    pub quantity: Decimal,
}

impl Match {
    /// Cash the buyer pays and the seller receives.
    pub fn notional(&self) -> Decimal {
        self.price.value() * self.quantity
    }

    /// The client that initiated this trade.
    pub fn aggressor_uid(&self) -> &ClientId {
        match self.side {
            Side::Buy => &self.buyer_uid,
            Side::Sell => &self.seller_uid,
        }
    }
}

/// Per-participant termination notice, delivered on the client's own channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shutdown {
    pub client_uid: ClientId,
}
