//! Matching engine service
//!
//! Single-threaded continuous limit-order-book engine with price-time
//! priority. One thread owns all engine state; requests arrive serialized,
//! so the book, accounts and positions need no internal locking. Every
//! state-changing operation runs in two phases separated by the durable
//! journal call: nothing is observable in memory until the journal has
//! accepted the batch, which makes recovery a straight replay.
//!
//! **Key invariants:**
//! - Price-time priority strictly enforced; the maker's price wins
//! - `lots == resd_lots + exec_lots` for every live order
//! - Level aggregates equal the sum of their queued residuals
//! - Matched exec pairs cross-reference by id and agree on the fill

pub mod accnt;
pub mod book;
pub mod market;
pub mod matcher;
pub mod response;
pub mod serv;

pub use market::Market;
pub use response::Response;
pub use serv::Serv;
