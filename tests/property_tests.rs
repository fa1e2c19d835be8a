//! Property-based tests for the matching core.
//!
//! Random order streams against a small set of participants must never
//! break the book or ledger invariants.

use exchange_core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const CLIENTS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Clone)]
struct RawOrder {
    client: usize,
    side: Side,
    price: Decimal,
    quantity: Decimal,
}

fn order_strategy() -> impl Strategy<Value = RawOrder> {
    (
        0..CLIENTS.len(),
        prop::bool::ANY,
        1i64..2_000i64,
        1i64..1_000i64,
    )
        .prop_map(|(client, is_buy, price_cents, quantity_hundredths)| RawOrder {
            client,
            side: if is_buy { Side::Buy } else { Side::Sell },
            price: Decimal::new(price_cents, 2),
            quantity: Decimal::new(quantity_hundredths, 2),
        })
}

fn stream_strategy() -> impl Strategy<Value = Vec<RawOrder>> {
    proptest::collection::vec(order_strategy(), 1..60)
}

fn seeded_ledger() -> InMemoryLedger {
    let mut ledger = InMemoryLedger::new(dec!(10000), false);
    for id in CLIENTS {
        ledger.add_client(ClientId::from(id));
        ledger.mark_active(&ClientId::from(id));
        ledger.set_position(&ClientId::from(id), Ticker::from("X"), dec!(50));
    }
    ledger
}

fn run_stream(
    stream: &[RawOrder],
    ledger: &mut InMemoryLedger,
) -> (MatchingEngine, Vec<Match>, Vec<ObUpdate>) {
    let mut engine = MatchingEngine::new(Ticker::from("X"));
    let mut matches = Vec::new();
    let mut updates = Vec::new();
    for (seq, raw) in stream.iter().enumerate() {
        let order = MarketOrder {
            ticker: Ticker::from("X"),
            client_id: ClientId::from(CLIENTS[raw.client]),
            side: raw.side,
            price: Price::new_unchecked(raw.price),
            quantity: raw.quantity,
            seq: seq as u64,
        };
        let (m, u) = engine.match_order(order, ledger);
        matches.extend(m);
        updates.extend(u);
    }
    (engine, matches, updates)
}

proptest! {
    /// Cash and per-ticker inventory are exactly conserved by any stream.
    #[test]
    fn ledger_totals_are_invariant(stream in stream_strategy()) {
        let mut ledger = seeded_ledger();
        let initial_capital = ledger.total_capital();
        let initial_position = ledger.total_position(&Ticker::from("X"));

        run_stream(&stream, &mut ledger);

        prop_assert_eq!(ledger.total_capital(), initial_capital);
        prop_assert_eq!(ledger.total_position(&Ticker::from("X")), initial_position);
    }

    /// No client ever goes below zero cash or (shorts off) inventory.
    #[test]
    fn no_client_goes_negative(stream in stream_strategy()) {
        let mut ledger = seeded_ledger();
        run_stream(&stream, &mut ledger);

        for id in CLIENTS {
            let client = ledger.get(&ClientId::from(id)).unwrap();
            prop_assert!(!client.capital.is_negative());
            for quantity in client.positions.values() {
                prop_assert!(*quantity >= Decimal::ZERO);
            }
        }
    }

    /// Every order left resting has positive volume, and the two sides
    /// never cross.
    #[test]
    fn book_stays_well_formed(stream in stream_strategy()) {
        let mut ledger = seeded_ledger();
        let (engine, _, _) = run_stream(&stream, &mut ledger);

        for side in [Side::Buy, Side::Sell] {
            for order in engine.book().orders(side) {
                prop_assert!(order.quantity > Decimal::ZERO);
                prop_assert_eq!(order.side, side);
            }
        }
        if let (Some(bid), Some(ask)) =
            (engine.book().best(Side::Buy), engine.book().best(Side::Sell))
        {
            prop_assert!(bid < ask, "book crossed: bid {} >= ask {}", bid, ask);
        }
    }

    /// Emitted trades and updates carry sane values: positive trade
    /// volume, prices inside the generated range, no negative residuals.
    #[test]
    fn emitted_messages_are_sane(stream in stream_strategy()) {
        let mut ledger = seeded_ledger();
        let (_, matches, updates) = run_stream(&stream, &mut ledger);

        for m in &matches {
            prop_assert!(m.quantity > Decimal::ZERO);
            prop_assert!(m.price.value() > Decimal::ZERO);
        }
        for update in &updates {
            prop_assert!(update.quantity >= Decimal::ZERO);
        }
    }

    /// Replaying the same stream from the same seed state reproduces the
    /// exact same matches and updates.
    #[test]
    fn matching_is_deterministic(stream in stream_strategy()) {
        let mut first_ledger = seeded_ledger();
        let (_, first_matches, first_updates) = run_stream(&stream, &mut first_ledger);

        let mut second_ledger = seeded_ledger();
        let (_, second_matches, second_updates) = run_stream(&stream, &mut second_ledger);

        prop_assert_eq!(first_matches, second_matches);
        prop_assert_eq!(first_updates, second_updates);
        prop_assert_eq!(first_ledger.total_capital(), second_ledger.total_capital());
    }

    /// At one price level the earliest arrival always fills first.
    #[test]
    fn fifo_within_a_price_level(seller_count in 2..CLIENTS.len(), quantity in 1i64..50i64) {
        let mut ledger = seeded_ledger();
        let mut engine = MatchingEngine::new(Ticker::from("X"));
        let quantity = Decimal::new(quantity, 1);

        for seq in 0..seller_count {
            let order = MarketOrder {
                ticker: Ticker::from("X"),
                client_id: ClientId::from(CLIENTS[seq]),
                side: Side::Sell,
                price: Price::new_unchecked(dec!(10)),
                quantity,
                seq: seq as u64,
            };
            engine.match_order(order, &mut ledger);
        }

        let buyer = MarketOrder {
            ticker: Ticker::from("X"),
            client_id: ClientId::from(CLIENTS[CLIENTS.len() - 1]),
            side: Side::Buy,
            price: Price::new_unchecked(dec!(10)),
            quantity,
            seq: seller_count as u64,
        };
        let (matches, _) = engine.match_order(buyer, &mut ledger);

        prop_assert_eq!(matches.len(), 1);
        prop_assert_eq!(&matches[0].seller_uid, &ClientId::from(CLIENTS[0]));
    }
}
