//! Per-ticker order book with price-time priority.
//!
//! Each side is a binary heap ordered so that the top is the best resting
//! order: highest price first for bids, lowest first for asks, earlier
//! arrival (`seq`) winning every price tie. Orders are immutable once
//! booked; there is no cancellation, so no keyed lookup is needed.

use crate::types::{ClientId, Price, Side, Ticker};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// An order after sequencing. `seq` is assigned once on arrival and
/// preserved when a partially filled residual is rebooked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub ticker: Ticker,
    pub client_id: ClientId,
    pub side: Side,
    pub price: Price,
    pub quantity: Decimal,
    pub seq: u64,
}

impl MarketOrder {
    /// True when `self` and `other` are opposite sides of the same ticker
    /// and their prices cross (bid >= ask).
    pub fn can_match(&self, other: &MarketOrder) -> bool {
        if self.ticker != other.ticker || self.side == other.side {
            return false;
        }
        let (bid, ask) = match self.side {
            Side::Buy => (self, other),
            Side::Sell => (other, self),
        };
        bid.price >= ask.price
    }
}

// Heap wrappers carrying the side-specific priority. seq is unique per
// book, so the orderings below are total.

#[derive(Debug, Clone)]
struct Bid(MarketOrder);

impl PartialEq for Bid {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Bid {}

impl PartialOrd for Bid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bid {
    // higher price first, earlier seq breaking ties
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .price
            .cmp(&other.0.price)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

#[derive(Debug, Clone)]
struct Ask(MarketOrder);

impl PartialEq for Ask {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ask {}

impl PartialOrd for Ask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ask {
    // lower price first, earlier seq breaking ties
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .price
            .cmp(&self.0.price)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

/// Resting orders for one ticker.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    bids: BinaryHeap<Bid>,
    asks: BinaryHeap<Ask>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resting order on its own side.
    pub fn push(&mut self, order: MarketOrder) {
        debug_assert!(order.quantity > Decimal::ZERO, "resting orders have volume");
        match order.side {
            Side::Buy => self.bids.push(Bid(order)),
            Side::Sell => self.asks.push(Ask(order)),
        }
    }

    /// Top of book by priority.
    pub fn peek(&self, side: Side) -> Option<&MarketOrder> {
        match side {
            Side::Buy => self.bids.peek().map(|b| &b.0),
            Side::Sell => self.asks.peek().map(|a| &a.0),
        }
    }

    pub fn pop(&mut self, side: Side) -> Option<MarketOrder> {
        match side {
            Side::Buy => self.bids.pop().map(|b| b.0),
            Side::Sell => self.asks.pop().map(|a| a.0),
        }
    }

    pub fn len(&self, side: Side) -> usize {
        match side {
            Side::Buy => self.bids.len(),
            Side::Sell => self.asks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Best resting price on a side, if any.
    pub fn best(&self, side: Side) -> Option<Price> {
        self.peek(side).map(|o| o.price)
    }

    /// Unordered view of one side's resting orders.
    pub fn orders(&self, side: Side) -> impl Iterator<Item = &MarketOrder> {
        let (bids, asks) = match side {
            Side::Buy => (Some(self.bids.iter()), None),
            Side::Sell => (None, Some(self.asks.iter())),
        };
        bids.into_iter()
            .flatten()
            .map(|b| &b.0)
            .chain(asks.into_iter().flatten().map(|a| &a.0))
    }
}
