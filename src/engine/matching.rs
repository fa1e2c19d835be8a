//! Per-ticker matching loop.
//!
//! An arriving order is matched against the opposite side of the book in
//! strict price-time priority. Each candidate trade is validated against
//! the ledger: a failure on the aggressor's side ends the whole order, a
//! failure on the passive's side evicts that resting order and matching
//! continues with the next top of book.

use crate::book::{MarketOrder, OrderBook};
use crate::ledger::Ledger;
use crate::messages::{Match, ObUpdate};
use crate::types::{Side, Ticker};
use rust_decimal::Decimal;
use tracing::debug;

/// Matching engine for a single ticker. Owns that ticker's book.
#[derive(Debug)]
pub struct MatchingEngine {
    ticker: Ticker,
    book: OrderBook,
}

impl MatchingEngine {
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            book: OrderBook::new(),
        }
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    fn ob_update(&self, order: &MarketOrder, quantity: Decimal) -> ObUpdate {
        ObUpdate {
            ticker: self.ticker.clone(),
            side: order.side,
            price: order.price,
            quantity,
        }
    }

    /// True when the aggressor could not execute its full notional even
    /// against an infinitely deep book. Checked before touching the book
    /// so a rejection leaves no trace.
    fn rejects_outright<L: Ledger>(&self, aggressor: &MarketOrder, ledger: &L) -> bool {
        match aggressor.side {
            Side::Buy => {
                let notional = aggressor.price.value() * aggressor.quantity;
                notional > ledger.capital(&aggressor.client_id).value()
            }
            Side::Sell => {
                !ledger.shorts_allowed()
                    && ledger.position(&aggressor.client_id, &self.ticker) < aggressor.quantity
            }
        }
    }

    /// Match one arriving order to completion.
    ///
    /// Returns every executed trade and every book change, each in the
    /// order it occurred. A rejected aggressor returns empty vectors and
    /// leaves the book and ledger untouched.
    pub fn match_order<L: Ledger>(
        &mut self,
        mut aggressor: MarketOrder,
        ledger: &mut L,
    ) -> (Vec<Match>, Vec<ObUpdate>) {
        let mut matches = Vec::new();
        let mut updates = Vec::new();

        if self.rejects_outright(&aggressor, ledger) {
            debug!(
                client = %aggressor.client_id,
                ticker = %self.ticker,
                side = %aggressor.side,
                "order rejected: aggressor cannot cover its own notional"
            );
            return (matches, updates);
        }

        let passive_side = aggressor.side.opposite();

        loop {
            let crosses = self
                .book
                .peek(passive_side)
                .map(|top| top.can_match(&aggressor))
                .unwrap_or(false);
            if !crosses {
                break;
            }

            let mut passive = self
                .book
                .pop(passive_side)
                .expect("peeked side cannot be empty");

            let quantity = passive.quantity.min(aggressor.quantity);
            let (buyer_uid, seller_uid) = match aggressor.side {
                Side::Buy => (aggressor.client_id.clone(), passive.client_id.clone()),
                Side::Sell => (passive.client_id.clone(), aggressor.client_id.clone()),
            };
            // price-maker wins: trades print at the resting order's price
            let candidate = Match {
                ticker: self.ticker.clone(),
                buyer_uid,
                seller_uid,
                side: aggressor.side,
                price: passive.price,
                quantity,
            };

            if let Some(failing) = ledger.validate_match(&candidate) {
                if failing == aggressor.side {
                    // the aggressor cannot continue; restore the popped
                    // passive (original seq keeps its time priority) so the
                    // book is left exactly as found
                    self.book.push(passive);
                    debug!(
                        client = %aggressor.client_id,
                        ticker = %self.ticker,
                        "aggressor failed validation mid-match, aborting order"
                    );
                    return (matches, updates);
                }
                // stale passive: its owner can no longer honor the trade.
                // evicted permanently, no update published.
                debug!(
                    client = %passive.client_id,
                    ticker = %self.ticker,
                    price = %passive.price,
                    "evicting stale resting order"
                );
                continue;
            }

            ledger.apply_match(&candidate);
            updates.push(self.ob_update(&passive, Decimal::ZERO));
            matches.push(candidate);

            passive.quantity -= quantity;
            aggressor.quantity -= quantity;

            if passive.quantity > Decimal::ZERO {
                // aggressor fully consumed; rebook the residual passive
                // under its original seq
                updates.push(self.ob_update(&passive, passive.quantity));
                self.book.push(passive);
                return (matches, updates);
            }
            if aggressor.quantity.is_zero() {
                return (matches, updates);
            }
        }

        if aggressor.quantity > Decimal::ZERO {
            updates.push(self.ob_update(&aggressor, aggressor.quantity));
            self.book.push(aggressor);
        }

        (matches, updates)
    }
}
