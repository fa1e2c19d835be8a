//! Exchange session demo.
//!
//! Runs one full session over the in-process bus: three scripted
//! participants report in, trade a couple of tickers, and the session
//! closes when the last one disconnects. Prints the resulting ledger.

use exchange_core::{
    BusHandle, ClientId, ExchangeConfig, FixedRoster, InMemoryTransport, InboundMessage,
    InitMessage, OrderRequest, Session, Side, Ticker, CHANNEL_BROADCAST,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let config = ExchangeConfig {
        starting_capital: dec!(100000),
        expected_clients: 3,
        ..ExchangeConfig::default()
    };
    let roster = FixedRoster::new(["alice", "bob", "carol"].map(ClientId::from));

    let (transport, handle) = InMemoryTransport::pair();
    let publications = handle.publications();

    let mut session = Session::new(config, transport);
    session.load_clients(&roster);
    // shorts are off, so the scripted sellers need inventory up front
    session
        .ledger_mut()
        .set_position(&ClientId::from("bob"), Ticker::from("NVR"), dec!(25));
    session
        .ledger_mut()
        .set_position(&ClientId::from("carol"), Ticker::from("KTX"), dec!(20));

    let participants = std::thread::spawn(move || script_participants(handle));

    session.wait_for_ready()?;
    session.run()?;
    participants.join().expect("participant thread panicked");

    println!("\nsession complete");
    println!(
        "broadcast messages published: {}",
        publications.channel(CHANNEL_BROADCAST).len()
    );
    for client in session.ledger().clients(true) {
        let positions: Vec<String> = {
            let mut entries: Vec<(&Ticker, &Decimal)> = client.positions.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            entries
                .iter()
                .map(|(ticker, quantity)| format!("{ticker}={quantity}"))
                .collect()
        };
        println!(
            "  {}: capital {} positions [{}]",
            client.id,
            client.capital,
            positions.join(", ")
        );
    }

    Ok(())
}

fn script_participants(handle: BusHandle) {
    let init = |uid: &str, ready: bool| {
        handle.send(&InboundMessage::Init(InitMessage {
            client_uid: ClientId::from(uid),
            ready,
        }));
    };
    let order = |uid: &str, ticker: &str, side: Side, price: Decimal, quantity: Decimal| {
        handle.send(&InboundMessage::Order(OrderRequest {
            client_uid: ClientId::from(uid),
            ticker: Ticker::from(ticker),
            side,
            price,
            quantity,
        }));
    };

    init("alice", true);
    init("bob", true);
    init("carol", true);

    // alice bids, bob lifts her, carol takes what bob leaves behind
    order("alice", "NVR", Side::Buy, dec!(104), dec!(10));
    order("bob", "NVR", Side::Sell, dec!(104), dec!(6));
    order("bob", "NVR", Side::Sell, dec!(105), dec!(14));
    order("carol", "NVR", Side::Buy, dec!(105), dec!(8));

    // a second ticker with its own book
    order("carol", "KTX", Side::Sell, dec!(55), dec!(20));
    order("alice", "KTX", Side::Buy, dec!(54), dec!(5));
    order("bob", "KTX", Side::Buy, dec!(55), dec!(12));

    // handle drops here: the bus disconnects and the session closes
}
