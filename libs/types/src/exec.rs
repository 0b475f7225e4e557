//! Execution records
//!
//! An exec is an append-only record of one state change to an order, or of a
//! manual trade with no originating order. Execs are immutable once
//! committed, so they are shared freely between the account ring, the
//! response returned to the caller, and the batch handed to the journal.

use crate::date::{maybe_iso_to_jd, maybe_jd_to_iso, IsoDate, JDay, Time};
use crate::ids::{Id64, Symbol};
use crate::numeric::{cost, Cost, Lots, Ticks};
use crate::order::{opt_lots, opt_str, Order, Side, State};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt::Write;

/// Liquidity indicator for trade execs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LiqInd {
    None,
    Maker,
    Taker,
}

impl LiqInd {
    /// The counterparty's indicator.
    pub fn inverse(self) -> Self {
        match self {
            LiqInd::None => LiqInd::None,
            LiqInd::Maker => LiqInd::Taker,
            LiqInd::Taker => LiqInd::Maker,
        }
    }
}

impl std::fmt::Display for LiqInd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LiqInd::None => "NONE",
            LiqInd::Maker => "MAKER",
            LiqInd::Taker => "TAKER",
        })
    }
}

/// Immutable execution record.
///
/// The order-snapshot fields (`lots` through `min_lots`) reflect the order
/// after the operation the exec describes.
#[derive(Debug, Clone, PartialEq)]
pub struct Exec {
    pub accnt: Symbol,
    pub market_id: Id64,
    pub instr: Symbol,
    pub settl_day: JDay,
    pub id: Id64,
    /// Originating order, or zero for a manual trade.
    pub order_id: Id64,
    pub ref_: String,
    pub state: State,
    pub side: Side,
    pub lots: Lots,
    pub ticks: Ticks,
    pub resd_lots: Lots,
    pub exec_lots: Lots,
    pub exec_cost: Cost,
    pub last_lots: Lots,
    pub last_ticks: Ticks,
    pub min_lots: Lots,
    /// Peer execution id of a matched trade, or zero.
    pub match_id: Id64,
    /// Position of the party immediately before this trade was applied.
    pub posn_lots: Lots,
    pub posn_cost: Cost,
    pub liq_ind: LiqInd,
    /// Counterparty account, where known.
    pub cpty: Option<Symbol>,
    pub created: Time,
}

impl Exec {
    /// Snapshot an order into a fresh exec with the given id.
    pub fn from_order(order: &Order, id: Id64, created: Time) -> Self {
        Self {
            accnt: order.accnt.clone(),
            market_id: order.market_id,
            instr: order.instr.clone(),
            settl_day: order.settl_day,
            id,
            order_id: order.id,
            ref_: order.ref_.clone(),
            state: order.state,
            side: order.side,
            lots: order.lots,
            ticks: order.ticks,
            resd_lots: order.resd_lots,
            exec_lots: order.exec_lots,
            exec_cost: order.exec_cost,
            last_lots: order.last_lots,
            last_ticks: order.last_ticks,
            min_lots: order.min_lots,
            match_id: Id64::ZERO,
            posn_lots: Lots::ZERO,
            posn_cost: Cost::ZERO,
            liq_ind: LiqInd::None,
            cpty: None,
            created,
        }
    }

    /// Build a manual trade exec with no originating order.
    #[allow(clippy::too_many_arguments)]
    pub fn manual(
        accnt: Symbol,
        market_id: Id64,
        instr: Symbol,
        settl_day: JDay,
        id: Id64,
        ref_: impl Into<String>,
        side: Side,
        lots: Lots,
        ticks: Ticks,
        posn_lots: Lots,
        posn_cost: Cost,
        liq_ind: LiqInd,
        cpty: Option<Symbol>,
        created: Time,
    ) -> Self {
        Self {
            accnt,
            market_id,
            instr,
            settl_day,
            id,
            order_id: Id64::ZERO,
            ref_: ref_.into(),
            state: State::Trade,
            side,
            lots,
            ticks,
            resd_lots: Lots::ZERO,
            exec_lots: lots,
            exec_cost: cost(lots, ticks),
            last_lots: lots,
            last_ticks: ticks,
            min_lots: Lots::new(1),
            match_id: Id64::ZERO,
            posn_lots,
            posn_cost,
            liq_ind,
            cpty,
            created,
        }
    }

    /// Apply fills to the snapshot: cumulative `sum_lots`/`sum_cost` with the
    /// most recent fill in `last_lots`/`last_ticks`.
    pub fn trade(
        &mut self,
        sum_lots: Lots,
        sum_cost: Cost,
        last_lots: Lots,
        last_ticks: Ticks,
        match_id: Id64,
        liq_ind: LiqInd,
        cpty: Symbol,
    ) {
        self.state = State::Trade;
        self.resd_lots -= sum_lots;
        self.exec_lots += sum_lots;
        self.exec_cost += sum_cost;
        self.last_lots = last_lots;
        self.last_ticks = last_ticks;
        self.match_id = match_id;
        self.liq_ind = liq_ind;
        self.cpty = Some(cpty);
    }

    /// Apply a single fill at `ticks`.
    pub fn trade_one(
        &mut self,
        lots: Lots,
        ticks: Ticks,
        match_id: Id64,
        liq_ind: LiqInd,
        cpty: Symbol,
    ) {
        self.trade(lots, cost(lots, ticks), lots, ticks, match_id, liq_ind, cpty);
    }

    /// Record a revision down to `lots` total.
    pub fn revise(&mut self, lots: Lots) {
        let delta = self.lots - lots;
        self.lots = lots;
        self.resd_lots -= delta;
        self.state = State::Revise;
    }

    /// Record a cancellation.
    pub fn cancel(&mut self) {
        self.state = State::Cancel;
        self.resd_lots = Lots::ZERO;
    }

    /// Record the party's position immediately before this trade.
    pub fn set_posn(&mut self, lots: Lots, cost: Cost) {
        self.posn_lots = lots;
        self.posn_cost = cost;
    }

    /// The counterparty leg of a manual back-to-back trade.
    ///
    /// Precondition: this exec carries a counterparty symbol.
    pub fn opposite(&self, id: Id64, posn_lots: Lots, posn_cost: Cost) -> Option<Exec> {
        let cpty = self.cpty.clone()?;
        Some(Self {
            accnt: cpty,
            id,
            side: self.side.opposite(),
            posn_lots,
            posn_cost,
            liq_ind: self.liq_ind.inverse(),
            cpty: Some(self.accnt.clone()),
            ..self.clone()
        })
    }

    /// Positional dump form: same fields as JSON, empty for absent optionals.
    pub fn to_dsv(&self, out: &mut String, delim: char) {
        let _ = write!(out, "{}{delim}{}{delim}{}{delim}", self.accnt, self.market_id, self.instr);
        if let Some(iso) = maybe_jd_to_iso(self.settl_day) {
            let _ = write!(out, "{iso}");
        }
        let _ = write!(out, "{delim}{}{delim}", self.id);
        if !self.order_id.is_zero() {
            let _ = write!(out, "{}", self.order_id);
        }
        let _ = write!(out, "{delim}{}{delim}", self.ref_);
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
        let _ = write!(out, "{delim}");
        if !self.match_id.is_zero() {
            let _ = write!(out, "{}", self.match_id);
        }
        let _ = write!(out, "{delim}");
        if self.state == State::Trade {
            let _ = write!(out, "{}{delim}{}{delim}", self.posn_lots, self.posn_cost);
        } else {
            let _ = write!(out, "{delim}{delim}");
        }
        if self.liq_ind != LiqInd::None {
            let _ = write!(out, "{}", self.liq_ind);
        }
        let _ = write!(out, "{delim}");
        if let Some(cpty) = &self.cpty {
            let _ = write!(out, "{cpty}");
        }
        let _ = write!(out, "{delim}{}", self.created);
    }
}

impl Serialize for Exec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let trade = self.state == State::Trade;
        let mut st = serializer.serialize_struct("Exec", 23)?;
        st.serialize_field("accnt", &self.accnt)?;
        st.serialize_field("market_id", &self.market_id)?;
        st.serialize_field("instr", &self.instr)?;
        st.serialize_field("settl_date", &maybe_jd_to_iso(self.settl_day))?;
        st.serialize_field("id", &self.id)?;
        st.serialize_field("order_id", &(!self.order_id.is_zero()).then_some(self.order_id))?;
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
        st.serialize_field("match_id", &(!self.match_id.is_zero()).then_some(self.match_id))?;
        st.serialize_field("posn_lots", &trade.then_some(self.posn_lots))?;
        st.serialize_field("posn_cost", &trade.then_some(self.posn_cost))?;
        st.serialize_field(
            "liq_ind",
            &(self.liq_ind != LiqInd::None).then_some(self.liq_ind),
        )?;
        st.serialize_field("cpty", &self.cpty)?;
        st.serialize_field("created", &self.created)?;
        st.end()
    }
}

/// Wire shadow of [`Exec`] with explicit optionals.
#[derive(Deserialize)]
struct ExecDe {
    accnt: Symbol,
    market_id: Id64,
    instr: Symbol,
    settl_date: Option<IsoDate>,
    id: Id64,
    order_id: Option<Id64>,
    #[serde(rename = "ref")]
    ref_: Option<String>,
    state: State,
    side: Side,
    lots: Lots,
    ticks: Ticks,
    resd_lots: Lots,
    exec_lots: Lots,
    exec_cost: Cost,
    last_lots: Option<Lots>,
    last_ticks: Option<Ticks>,
    min_lots: Option<Lots>,
    match_id: Option<Id64>,
    posn_lots: Option<Lots>,
    posn_cost: Option<Cost>,
    liq_ind: Option<LiqInd>,
    cpty: Option<Symbol>,
    created: Time,
}

impl<'de> Deserialize<'de> for Exec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let de = ExecDe::deserialize(deserializer)?;
        Ok(Exec {
            accnt: de.accnt,
            market_id: de.market_id,
            instr: de.instr,
            settl_day: maybe_iso_to_jd(de.settl_date),
            id: de.id,
            order_id: de.order_id.unwrap_or(Id64::ZERO),
            ref_: de.ref_.unwrap_or_default(),
            state: de.state,
            side: de.side,
            lots: de.lots,
            ticks: de.ticks,
            resd_lots: de.resd_lots,
            exec_lots: de.exec_lots,
            exec_cost: de.exec_cost,
            last_lots: de.last_lots.unwrap_or(Lots::ZERO),
            last_ticks: de.last_ticks.unwrap_or(Ticks::ZERO),
            min_lots: de.min_lots.unwrap_or(Lots::ZERO),
            match_id: de.match_id.unwrap_or(Id64::ZERO),
            posn_lots: de.posn_lots.unwrap_or(Lots::ZERO),
            posn_cost: de.posn_cost.unwrap_or(Cost::ZERO),
            liq_ind: de.liq_ind.unwrap_or(LiqInd::None),
            cpty: de.cpty,
            created: de.created,
        })
    }
}
