//! Solvency laws.
//!
//! A trade only happens when both sides can honor it, and a rejection of
//! any kind must leave the ledger and the book exactly as they were.

use exchange_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::cell::RefCell;
use std::collections::VecDeque;

fn seeded_ledger(positions: &[(&str, Decimal)]) -> InMemoryLedger {
    let mut ledger = InMemoryLedger::new(dec!(1000), false);
    for id in ["a", "b", "c"] {
        ledger.add_client(ClientId::from(id));
        ledger.mark_active(&ClientId::from(id));
    }
    for (id, quantity) in positions {
        ledger.set_position(&ClientId::from(*id), Ticker::from("X"), *quantity);
    }
    ledger
}

fn order(client: &str, side: Side, price: Decimal, quantity: Decimal, seq: u64) -> MarketOrder {
    MarketOrder {
        ticker: Ticker::from("X"),
        client_id: ClientId::from(client),
        side,
        price: Price::new_unchecked(price),
        quantity,
        seq,
    }
}

fn book_snapshot(engine: &MatchingEngine) -> Vec<(ClientId, Side, Decimal, Decimal, u64)> {
    let mut orders: Vec<_> = engine
        .book()
        .orders(Side::Buy)
        .chain(engine.book().orders(Side::Sell))
        .map(|o| (o.client_id.clone(), o.side, o.price.value(), o.quantity, o.seq))
        .collect();
    orders.sort();
    orders
}

#[test]
fn rejected_buy_aggressor_is_a_complete_noop() {
    let mut ledger = seeded_ledger(&[("b", dec!(5))]);
    ledger.set_capital(&ClientId::from("a"), dec!(49));
    let mut engine = MatchingEngine::new(Ticker::from("X"));
    engine.match_order(order("b", Side::Sell, dec!(10), dec!(5), 0), &mut ledger);

    let ledger_before = ledger.clone();
    let book_before = book_snapshot(&engine);

    let (matches, updates) =
        engine.match_order(order("a", Side::Buy, dec!(10), dec!(5), 1), &mut ledger);

    assert!(matches.is_empty());
    assert!(updates.is_empty());
    assert_eq!(book_snapshot(&engine), book_before);
    assert_eq!(ledger.total_capital(), ledger_before.total_capital());
    assert_eq!(
        ledger.capital(&ClientId::from("a")),
        ledger_before.capital(&ClientId::from("a"))
    );
}

#[test]
fn rejected_sell_aggressor_is_a_complete_noop() {
    let mut ledger = seeded_ledger(&[("c", dec!(2))]);
    let mut engine = MatchingEngine::new(Ticker::from("X"));
    engine.match_order(order("a", Side::Buy, dec!(10), dec!(5), 0), &mut ledger);

    let book_before = book_snapshot(&engine);
    let (matches, updates) =
        engine.match_order(order("c", Side::Sell, dec!(10), dec!(5), 1), &mut ledger);

    assert!(matches.is_empty());
    assert!(updates.is_empty());
    assert_eq!(book_snapshot(&engine), book_before);
    assert_eq!(ledger.position(&ClientId::from("c"), &Ticker::from("X")), dec!(2));
}

// Scripted ledger for failure modes the in-memory ledger cannot reach: its
// pre-trade check already bounds what the matching loop can spend.
struct ScriptedLedger {
    verdicts: RefCell<VecDeque<Option<Side>>>,
    applied: usize,
}

impl ScriptedLedger {
    fn new(verdicts: impl IntoIterator<Item = Option<Side>>) -> Self {
        Self {
            verdicts: RefCell::new(verdicts.into_iter().collect()),
            applied: 0,
        }
    }
}

impl Ledger for ScriptedLedger {
    fn capital(&self, _id: &ClientId) -> Quote {
        Quote::new(dec!(1_000_000))
    }

    fn position(&self, _id: &ClientId, _ticker: &Ticker) -> Decimal {
        dec!(1_000_000)
    }

    fn shorts_allowed(&self) -> bool {
        false
    }

    fn validate_match(&self, _m: &Match) -> Option<Side> {
        self.verdicts
            .borrow_mut()
            .pop_front()
            .expect("verdict script exhausted")
    }

    fn apply_match(&mut self, _m: &Match) {
        self.applied += 1;
    }
}

#[test]
fn rejected_aggressor_mid_loop_leaves_book_intact() {
    let mut engine = MatchingEngine::new(Ticker::from("X"));
    let mut setup = ScriptedLedger::new([]);
    engine.match_order(order("b", Side::Sell, dec!(10), dec!(5), 0), &mut setup);
    let book_before = book_snapshot(&engine);

    // the aggressor fails validation on the very first candidate
    let mut scripted = ScriptedLedger::new([Some(Side::Buy)]);
    let (matches, updates) =
        engine.match_order(order("a", Side::Buy, dec!(10), dec!(5), 1), &mut scripted);

    assert!(matches.is_empty());
    assert!(updates.is_empty());
    assert_eq!(scripted.applied, 0);
    assert_eq!(book_snapshot(&engine), book_before);
}

#[test]
fn eviction_touches_neither_ledger_nor_wire() {
    let mut ledger = seeded_ledger(&[("b", dec!(5)), ("c", dec!(5))]);
    let mut engine = MatchingEngine::new(Ticker::from("X"));
    engine.match_order(order("b", Side::Sell, dec!(10), dec!(5), 0), &mut ledger);
    engine.match_order(order("c", Side::Sell, dec!(10), dec!(5), 1), &mut ledger);

    // b's inventory is gone by the time a's bid arrives
    ledger.set_position(&ClientId::from("b"), Ticker::from("X"), dec!(0));
    let b_capital_before = ledger.capital(&ClientId::from("b"));

    let (matches, updates) =
        engine.match_order(order("a", Side::Buy, dec!(10), dec!(5), 2), &mut ledger);

    // exactly one update: the zero-out of c's filled order. the eviction of
    // b's order is invisible on the wire.
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].seller_uid, ClientId::from("c"));
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].quantity, dec!(0));
    assert_eq!(ledger.capital(&ClientId::from("b")), b_capital_before);
}

#[test]
fn shorts_allowed_lets_sellers_run_negative() {
    let mut ledger = InMemoryLedger::new(dec!(1000), true);
    for id in ["a", "b"] {
        ledger.add_client(ClientId::from(id));
        ledger.mark_active(&ClientId::from(id));
    }
    let mut engine = MatchingEngine::new(Ticker::from("X"));

    engine.match_order(order("a", Side::Buy, dec!(10), dec!(5), 0), &mut ledger);
    let (matches, _) =
        engine.match_order(order("b", Side::Sell, dec!(10), dec!(5), 1), &mut ledger);

    assert_eq!(matches.len(), 1);
    assert_eq!(ledger.position(&ClientId::from("b"), &Ticker::from("X")), dec!(-5));
    // cash conservation holds regardless of shorting policy
    assert_eq!(ledger.total_capital().value(), dec!(2000));
    assert_eq!(ledger.total_position(&Ticker::from("X")), dec!(0));
}

#[test]
fn conservation_holds_across_a_mixed_stream() {
    let mut ledger = seeded_ledger(&[("a", dec!(30)), ("b", dec!(30)), ("c", dec!(30))]);
    let mut engine = MatchingEngine::new(Ticker::from("X"));

    let stream = [
        order("a", Side::Buy, dec!(10), dec!(5), 0),
        order("b", Side::Sell, dec!(10), dec!(3), 1),
        order("c", Side::Sell, dec!(9), dec!(6), 2),
        order("b", Side::Buy, dec!(11), dec!(4), 3),
        order("a", Side::Sell, dec!(8), dec!(10), 4),
        order("c", Side::Buy, dec!(8), dec!(2), 5),
        order("a", Side::Buy, dec!(500), dec!(100), 6), // rejected
    ];
    for o in stream {
        engine.match_order(o, &mut ledger);

        assert_eq!(ledger.total_capital().value(), dec!(3000));
        assert_eq!(ledger.total_position(&Ticker::from("X")), dec!(90));
        for active in [true, false] {
            for client in ledger.clients(active) {
                assert!(!client.capital.is_negative());
                for quantity in client.positions.values() {
                    assert!(*quantity >= Decimal::ZERO);
                }
            }
        }
    }
}
