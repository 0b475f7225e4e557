//! Operation result surface
//!
//! A response aggregates everything the boundary layer reports back to the
//! caller: post-operation order snapshots, the execs produced, the taker's
//! position when the operation traded, and a best-bid/offer view of the
//! market. Execs are shared with the account rings; they are immutable once
//! committed, so the aliasing is safe.

use crate::market::MarketView;
use serde::Serialize;
use std::sync::Arc;
use types::exec::Exec;
use types::order::Order;
use types::posn::Posn;

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Response {
    pub market: Option<MarketView>,
    pub orders: Vec<Order>,
    pub execs: Vec<Arc<Exec>>,
    pub posn: Option<Posn>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }
}
