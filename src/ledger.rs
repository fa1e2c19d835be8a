//! Capital and inventory bookkeeping.
//!
//! The ledger is the single source of truth for participant solvency. Every
//! candidate trade is validated against it before execution, and applied
//! trades move cash and inventory atomically between the two sides.

use crate::messages::Match;
use crate::types::{ClientId, Quote, Side, Ticker};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One participant's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    /// Set when the participant reports ready. Inactive clients cannot sell.
    pub active: bool,
    pub capital: Quote,
    pub positions: HashMap<Ticker, Decimal>,
}

impl Client {
    pub fn new(id: ClientId, capital: Quote) -> Self {
        Self {
            id,
            active: false,
            capital,
            positions: HashMap::new(),
        }
    }

    pub fn position(&self, ticker: &Ticker) -> Decimal {
        self.positions.get(ticker).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Ledger capabilities the matching engine depends on. Production uses
/// [`InMemoryLedger`]; engine tests inject a scripted mock.
pub trait Ledger {
    fn capital(&self, id: &ClientId) -> Quote;
    fn position(&self, id: &ClientId, ticker: &Ticker) -> Decimal;
    fn shorts_allowed(&self) -> bool;

    /// Check whether both sides of a candidate trade can execute.
    /// Returns the failing side, or `None` if the trade is feasible.
    /// When both sides fail, the aggressor's side is returned so the
    /// engine aborts the whole aggressor.
    fn validate_match(&self, m: &Match) -> Option<Side>;

    /// Move cash and inventory for a validated trade. Must only be called
    /// after a successful [`validate_match`](Ledger::validate_match) and is
    /// never partially applied.
    fn apply_match(&mut self, m: &Match);
}

/// In-memory ledger holding every participant's cash and positions.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    clients: HashMap<ClientId, Client>,
    starting_capital: Quote,
    shorts_allowed: bool,
}

impl InMemoryLedger {
    pub fn new(starting_capital: Decimal, shorts_allowed: bool) -> Self {
        Self {
            clients: HashMap::new(),
            starting_capital: Quote::new(starting_capital),
            shorts_allowed,
        }
    }

    /// Register a participant with the starting capital. Idempotent:
    /// re-adding an existing client leaves its record untouched.
    pub fn add_client(&mut self, id: ClientId) {
        let capital = self.starting_capital;
        self.clients
            .entry(id.clone())
            .or_insert_with(|| Client::new(id, capital));
    }

    /// Flip a participant to active. Unknown ids are ignored.
    pub fn mark_active(&mut self, id: &ClientId) {
        if let Some(client) = self.clients.get_mut(id) {
            client.active = true;
        }
    }

    pub fn get(&self, id: &ClientId) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// All clients with the given activity state, in id order.
    pub fn clients(&self, active: bool) -> Vec<&Client> {
        let mut out: Vec<&Client> = self
            .clients
            .values()
            .filter(|c| c.active == active)
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Sum of all cash. Exactly preserved across any applied trade.
    pub fn total_capital(&self) -> Quote {
        self.clients
            .values()
            .fold(Quote::zero(), |acc, c| acc.add(c.capital))
    }

    /// Sum of all inventory in one ticker. Exactly preserved across any
    /// applied trade.
    pub fn total_position(&self, ticker: &Ticker) -> Decimal {
        self.clients.values().map(|c| c.position(ticker)).sum()
    }

    /// Overwrite a client's cash. Scenario seeding only.
    pub fn set_capital(&mut self, id: &ClientId, capital: Decimal) {
        if let Some(client) = self.clients.get_mut(id) {
            client.capital = Quote::new(capital);
        }
    }

    /// Overwrite a client's inventory in one ticker. Scenario seeding only.
    pub fn set_position(&mut self, id: &ClientId, ticker: Ticker, quantity: Decimal) {
        if let Some(client) = self.clients.get_mut(id) {
            client.positions.insert(ticker, quantity);
        }
    }
}

impl Ledger for InMemoryLedger {
    fn capital(&self, id: &ClientId) -> Quote {
        self.clients
            .get(id)
            .map(|c| c.capital)
            .unwrap_or_else(Quote::zero)
    }

    fn position(&self, id: &ClientId, ticker: &Ticker) -> Decimal {
        self.clients
            .get(id)
            .map(|c| c.position(ticker))
            .unwrap_or(Decimal::ZERO)
    }

    fn shorts_allowed(&self) -> bool {
        self.shorts_allowed
    }

    fn validate_match(&self, m: &Match) -> Option<Side> {
        let buyer_ok = self.capital(&m.buyer_uid).value() >= m.notional();

        let seller = self.clients.get(&m.seller_uid);
        let seller_active = seller.map(|c| c.active).unwrap_or(false);
        let seller_holds = self.shorts_allowed
            || self.position(&m.seller_uid, &m.ticker) >= m.quantity;
        let seller_ok = seller_active && seller_holds;

        match (buyer_ok, seller_ok) {
            (true, true) => None,
            (false, true) => Some(Side::Buy),
            (true, false) => Some(Side::Sell),
            (false, false) => Some(m.side),
        }
    }

    fn apply_match(&mut self, m: &Match) {
        let notional = Quote::new(m.notional());

        let buyer = self
            .clients
            .get_mut(&m.buyer_uid)
            .expect("apply_match: buyer not registered");
        buyer.capital = buyer.capital.sub(notional);
        assert!(
            !buyer.capital.is_negative(),
            "ledger corrupt: buyer {} capital went negative",
            m.buyer_uid
        );
        *buyer
            .positions
            .entry(m.ticker.clone())
            .or_insert(Decimal::ZERO) += m.quantity;

        let shorts_allowed = self.shorts_allowed;
        let seller = self
            .clients
            .get_mut(&m.seller_uid)
            .expect("apply_match: seller not registered");
        seller.capital = seller.capital.add(notional);
        let position = seller
            .positions
            .entry(m.ticker.clone())
            .or_insert(Decimal::ZERO);
        *position -= m.quantity;
        assert!(
            shorts_allowed || *position >= Decimal::ZERO,
            "ledger corrupt: seller {} position in {} went negative",
            m.seller_uid,
            m.ticker
        );
    }
}
