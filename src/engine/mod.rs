//! Order matching.
//!
//! One [`MatchingEngine`] per ticker, routed to by the [`EngineRegistry`].
//! Matching is deterministic: identical inbound sequences produce identical
//! matches and book updates.

mod matching;
mod registry;

pub use matching::MatchingEngine;
pub use registry::EngineRegistry;
