//! Position tracking
//!
//! A position is the running net lots and net cost of an account in one
//! market. Positions are created lazily on first trade and retained across
//! the business day.

use crate::date::{maybe_jd_to_iso, JDay};
use crate::ids::{Id64, Symbol};
use crate::numeric::{cost, Cost, Lots, Ticks};
use crate::order::Side;
use serde::{Serialize, Serializer};
use std::fmt::Write;

/// Net position keyed by (account, market).
#[derive(Debug, Clone, PartialEq)]
pub struct Posn {
    pub accnt: Symbol,
    pub market_id: Id64,
    pub instr: Symbol,
    pub settl_day: JDay,
    pub net_lots: Lots,
    pub net_cost: Cost,
}

impl Posn {
    pub fn new(accnt: Symbol, market_id: Id64, instr: Symbol, settl_day: JDay) -> Self {
        Self {
            accnt,
            market_id,
            instr,
            settl_day,
            net_lots: Lots::ZERO,
            net_cost: Cost::ZERO,
        }
    }

    /// Apply one fill: buys add, sells subtract.
    pub fn add_trade(&mut self, side: Side, last_lots: Lots, last_ticks: Ticks) {
        match side {
            Side::Buy => {
                self.net_lots += last_lots;
                self.net_cost += cost(last_lots, last_ticks);
            }
            Side::Sell => {
                self.net_lots -= last_lots;
                self.net_cost -= cost(last_lots, last_ticks);
            }
        }
    }

    /// Positional dump form.
    pub fn to_dsv(&self, out: &mut String, delim: char) {
        let _ = write!(out, "{}{delim}{}{delim}{}{delim}", self.accnt, self.market_id, self.instr);
        if let Some(iso) = maybe_jd_to_iso(self.settl_day) {
            let _ = write!(out, "{iso}");
        }
        let _ = write!(out, "{delim}{}{delim}{}", self.net_lots, self.net_cost);
    }
}

impl Serialize for Posn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut st = serializer.serialize_struct("Posn", 6)?;
        st.serialize_field("accnt", &self.accnt)?;
        st.serialize_field("market_id", &self.market_id)?;
        st.serialize_field("instr", &self.instr)?;
        st.serialize_field("settl_date", &maybe_jd_to_iso(self.settl_day))?;
        st.serialize_field("net_lots", &self.net_lots)?;
        st.serialize_field("net_cost", &self.net_cost)?;
        st.end()
    }
}
