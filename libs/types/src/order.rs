//! Order entity and lifecycle
//!
//! A live order is owned jointly by its account's live-order index and its
//! market's book side; both owners release atomically when the order reaches
//! a terminal state. The invariant `lots == resd_lots + exec_lots` holds for
//! every live order.

use crate::date::{maybe_jd_to_iso, JDay, Time};
use crate::ids::{Id64, Symbol};
use crate::numeric::{Cost, Lots, Ticks};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::Write;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        })
    }
}

/// Order and execution state tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Pending,
    New,
    Revise,
    Cancel,
    Trade,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            State::Pending => "PENDING",
            State::New => "NEW",
            State::Revise => "REVISE",
            State::Cancel => "CANCEL",
            State::Trade => "TRADE",
        })
    }
}

/// Live order record.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub accnt: Symbol,
    pub market_id: Id64,
    pub instr: Symbol,
    /// Zero means spot.
    pub settl_day: JDay,
    pub id: Id64,
    /// Client order reference. Empty means none; unique within an account
    /// while the order is live.
    pub ref_: String,
    pub state: State,
    pub side: Side,
    /// Original lots.
    pub lots: Lots,
    /// Limit price.
    pub ticks: Ticks,
    /// Residual lots.
    pub resd_lots: Lots,
    /// Executed lots.
    pub exec_lots: Lots,
    pub exec_cost: Cost,
    /// Lots of the most recent fill, or zero if none.
    pub last_lots: Lots,
    pub last_ticks: Ticks,
    /// Floor for revisions, or zero if none.
    pub min_lots: Lots,
    pub created: Time,
    pub modified: Time,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accnt: Symbol,
        market_id: Id64,
        instr: Symbol,
        settl_day: JDay,
        id: Id64,
        ref_: impl Into<String>,
        side: Side,
        lots: Lots,
        ticks: Ticks,
        min_lots: Lots,
        created: Time,
    ) -> Self {
        Self {
            accnt,
            market_id,
            instr,
            settl_day,
            id,
            ref_: ref_.into(),
            state: State::New,
            side,
            lots,
            ticks,
            resd_lots: lots,
            exec_lots: Lots::ZERO,
            exec_cost: Cost::ZERO,
            last_lots: Lots::ZERO,
            last_ticks: Ticks::ZERO,
            min_lots,
            created,
            modified: created,
        }
    }

    /// An order is done once nothing rests: fully filled or cancelled.
    pub fn done(&self) -> bool {
        self.resd_lots.is_zero()
    }

    /// Apply fills: `sum_lots`/`sum_cost` aggregate the fills being applied,
    /// `last_lots`/`last_ticks` describe the most recent of them.
    pub fn trade(
        &mut self,
        sum_lots: Lots,
        sum_cost: Cost,
        last_lots: Lots,
        last_ticks: Ticks,
        now: Time,
    ) {
        self.state = State::Trade;
        self.resd_lots -= sum_lots;
        self.exec_lots += sum_lots;
        self.exec_cost += sum_cost;
        self.last_lots = last_lots;
        self.last_ticks = last_ticks;
        self.modified = now;
    }

    /// Reduce the order to `lots` total. Precondition: `lots` is between
    /// `exec_lots` and the current total.
    pub fn revise(&mut self, lots: Lots, now: Time) {
        let delta = self.lots - lots;
        self.lots = lots;
        self.resd_lots -= delta;
        self.state = State::Revise;
        self.modified = now;
    }

    pub fn cancel(&mut self, now: Time) {
        self.state = State::Cancel;
        self.resd_lots = Lots::ZERO;
        self.modified = now;
    }

    /// Positional dump form: same fields as JSON, empty for absent optionals.
    pub fn to_dsv(&self, out: &mut String, delim: char) {
        let _ = write!(out, "{}{delim}{}{delim}{}{delim}", self.accnt, self.market_id, self.instr);
        if let Some(iso) = maybe_jd_to_iso(self.settl_day) {
            let _ = write!(out, "{iso}");
        }
        let _ = write!(out, "{delim}{}{delim}{}{delim}", self.id, self.ref_);
        let _ = write!(
            out,
            "{}{delim}{}{delim}{}{delim}{}{delim}{}{delim}{}{delim}{}{delim}",
            self.state,
            self.side,
            self.lots,
            self.ticks,
            self.resd_lots,
            self.exec_lots,
            self.exec_cost
        );
        if !self.last_lots.is_zero() {
            let _ = write!(out, "{}{delim}{}{delim}", self.last_lots, self.last_ticks);
        } else {
            let _ = write!(out, "{delim}{delim}");
        }
        if !self.min_lots.is_zero() {
            let _ = write!(out, "{}", self.min_lots);
        }
        let _ = write!(out, "{delim}{}{delim}{}", self.created, self.modified);
    }
}

impl Serialize for Order {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Order", 18)?;
        st.serialize_field("accnt", &self.accnt)?;
        st.serialize_field("market_id", &self.market_id)?;
        st.serialize_field("instr", &self.instr)?;
        st.serialize_field("settl_date", &maybe_jd_to_iso(self.settl_day))?;
        st.serialize_field("id", &self.id)?;
        st.serialize_field("ref", &opt_str(&self.ref_))?;
        st.serialize_field("state", &self.state)?;
        st.serialize_field("side", &self.side)?;
        st.serialize_field("lots", &self.lots)?;
        st.serialize_field("ticks", &self.ticks)?;
        st.serialize_field("resd_lots", &self.resd_lots)?;
        st.serialize_field("exec_lots", &self.exec_lots)?;
        st.serialize_field("exec_cost", &self.exec_cost)?;
        st.serialize_field("last_lots", &opt_lots(self.last_lots))?;
        st.serialize_field("last_ticks", &(!self.last_lots.is_zero()).then_some(self.last_ticks))?;
        st.serialize_field("min_lots", &opt_lots(self.min_lots))?;
        st.serialize_field("created", &self.created)?;
        st.serialize_field("modified", &self.modified)?;
        st.end()
    }
}

pub(crate) fn opt_str(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

pub(crate) fn opt_lots(lots: Lots) -> Option<Lots> {
    (!lots.is_zero()).then_some(lots)
}
