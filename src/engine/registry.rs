//! Routing of arriving orders to per-ticker engines.

use super::matching::MatchingEngine;
use crate::book::MarketOrder;
use crate::ledger::Ledger;
use crate::messages::{Match, ObUpdate, OrderRequest};
use crate::types::{Price, Ticker};
use std::collections::HashMap;
use tracing::debug;

/// Owns one [`MatchingEngine`] per ticker and the session-wide arrival
/// counter. Two tickers never share a book.
#[derive(Debug, Default)]
pub struct EngineRegistry {
    engines: HashMap<Ticker, MatchingEngine>,
    next_seq: u64,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create engines for a declared symbol set. Unknown tickers are
    /// still created lazily on first arrival.
    pub fn with_tickers(tickers: impl IntoIterator<Item = Ticker>) -> Self {
        let engines = tickers
            .into_iter()
            .map(|t| (t.clone(), MatchingEngine::new(t)))
            .collect();
        Self {
            engines,
            next_seq: 0,
        }
    }

    /// Stamp the next arrival sequence number on a validated request and
    /// hand it to the ticker's engine.
    pub fn route<L: Ledger>(
        &mut self,
        request: OrderRequest,
        ledger: &mut L,
    ) -> (Vec<Match>, Vec<ObUpdate>) {
        let seq = self.next_seq;
        self.next_seq += 1;

        let order = MarketOrder {
            ticker: request.ticker.clone(),
            client_id: request.client_uid,
            side: request.side,
            price: Price::new_unchecked(request.price),
            quantity: request.quantity,
            seq,
        };

        let engine = self
            .engines
            .entry(request.ticker)
            .or_insert_with_key(|ticker| {
                debug!(%ticker, "creating order book on first arrival");
                MatchingEngine::new(ticker.clone())
            });
        engine.match_order(order, ledger)
    }

    pub fn engine(&self, ticker: &Ticker) -> Option<&MatchingEngine> {
        self.engines.get(ticker)
    }

    pub fn engines(&self) -> impl Iterator<Item = &MatchingEngine> {
        self.engines.values()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
