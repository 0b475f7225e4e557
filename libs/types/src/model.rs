//! Persisted-state reader
//!
//! The engine rebuilds itself from a `Model` on load: reference data first,
//! then markets, live orders, recent execs, trades, and positions for the
//! current business day. The engine depends only on this trait; the
//! persistence backend decides how the views are produced.

use crate::asset::Asset;
use crate::date::{JDay, Time};
use crate::errors::Result;
use crate::exec::Exec;
use crate::instr::Instr;
use crate::market::MarketRec;
use crate::order::Order;
use crate::posn::Posn;

pub trait Model {
    fn read_assets(&self) -> Result<Vec<Asset>>;

    fn read_instrs(&self) -> Result<Vec<Instr>>;

    fn read_markets(&self) -> Result<Vec<MarketRec>>;

    /// Live orders only.
    fn read_orders(&self) -> Result<Vec<Order>>;

    /// Execs created at or after `since`, newest first.
    fn read_execs(&self, since: Time) -> Result<Vec<Exec>>;

    /// Unarchived trade execs.
    fn read_trades(&self) -> Result<Vec<Exec>>;

    /// Positions effective on `bus_day`.
    fn read_posns(&self, bus_day: JDay) -> Result<Vec<Posn>>;
}
