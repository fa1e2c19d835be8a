//! Simulated securities exchange core.
//!
//! Matching engine and client bookkeeping for an algorithmic trading
//! competition: per-ticker price-time priority books, a capital and
//! inventory ledger that authorizes every trade, and a session controller
//! that consumes participant orders from a message bus and broadcasts the
//! resulting matches and book updates. Matching is deterministic and fully
//! synchronous; the bus is the only blocking boundary.

pub mod book;
pub mod config;
pub mod engine;
pub mod event_log;
pub mod ledger;
pub mod messages;
pub mod session;
pub mod transport;
pub mod types;

pub use book::*;
pub use config::*;
pub use engine::*;
pub use event_log::*;
pub use ledger::*;
pub use messages::*;
pub use session::*;
pub use transport::*;
pub use types::*;
