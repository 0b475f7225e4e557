//! Market: a pair of book sides plus metadata and the exec-id allocator
//!
//! The market owns its resting orders. Order values live once in an arena
//! keyed by id; the level queues and account indices refer to them by id
//! only, so no entity points back at its owners.

use crate::book::MarketSide;
use serde::Serialize;
use types::date::{maybe_jd_to_iso, IsoDate, JDay, Time};
use types::ids::{Id64, Symbol};
use types::market::{MarketRec, MarketState};
use types::numeric::{Lots, Ticks};
use types::order::{Order, Side};
use std::collections::BTreeMap;

/// Depth of the book view exposed to the boundary.
pub const VIEW_DEPTH: usize = 3;

#[derive(Debug)]
pub struct Market {
    id: Id64,
    instr: Symbol,
    settl_day: JDay,
    state: MarketState,
    last_exec_id: i64,
    bid_side: MarketSide,
    offer_side: MarketSide,
    orders: BTreeMap<Id64, Order>,
}

impl Market {
    pub fn new(id: Id64, instr: Symbol, settl_day: JDay, state: MarketState) -> Self {
        Self {
            id,
            instr,
            settl_day,
            state,
            last_exec_id: 0,
            bid_side: MarketSide::new(Side::Buy),
            offer_side: MarketSide::new(Side::Sell),
            orders: BTreeMap::new(),
        }
    }

    /// Restore a market from its persistence record, resuming the exec-id
    /// counter past every journalled exec.
    pub fn from_rec(rec: MarketRec) -> Self {
        let mut market = Self::new(rec.id, rec.instr, rec.settl_day, rec.state);
        market.last_exec_id = rec.last_exec_id.count();
        market
    }

    pub fn rec(&self) -> MarketRec {
        MarketRec {
            id: self.id,
            instr: self.instr.clone(),
            settl_day: self.settl_day,
            state: self.state,
            last_exec_id: Id64::new(self.last_exec_id),
        }
    }

    pub fn id(&self) -> Id64 {
        self.id
    }

    pub fn instr(&self) -> &Symbol {
        &self.instr
    }

    pub fn settl_day(&self) -> JDay {
        self.settl_day
    }

    pub fn state(&self) -> MarketState {
        self.state
    }

    pub fn set_state(&mut self, state: MarketState) {
        self.state = state;
    }

    /// Allocate the next execution id. Monotonic; gaps after a crash are
    /// harmless because execs are keyed by id, not dense position.
    pub fn alloc_id(&mut self) -> Id64 {
        self.last_exec_id += 1;
        Id64::new(self.last_exec_id)
    }

    pub fn bid_side(&self) -> &MarketSide {
        &self.bid_side
    }

    pub fn offer_side(&self) -> &MarketSide {
        &self.offer_side
    }

    pub fn side(&self, side: Side) -> &MarketSide {
        match side {
            Side::Buy => &self.bid_side,
            Side::Sell => &self.offer_side,
        }
    }

    pub fn order(&self, id: Id64) -> Option<&Order> {
        self.orders.get(&id)
    }

    /// Resting orders in id order.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Rest an order on its side. The order must have residual lots.
    pub fn insert_order(&mut self, order: Order) {
        debug_assert!(!order.done());
        let side = match order.side {
            Side::Buy => &mut self.bid_side,
            Side::Sell => &mut self.offer_side,
        };
        side.insert_order(&order);
        self.orders.insert(order.id, order);
    }

    /// Remove an order from the book without changing its state. Used to
    /// unwind a reserve-phase insertion when the journal rejects.
    pub fn remove_order(&mut self, id: Id64) -> Option<Order> {
        let order = self.orders.remove(&id)?;
        let side = match order.side {
            Side::Buy => &mut self.bid_side,
            Side::Sell => &mut self.offer_side,
        };
        side.remove_order(&order);
        Some(order)
    }

    /// Fill `lots` of a resting order. Returns the post-fill snapshot; the
    /// order leaves the book once done.
    pub fn take_order(&mut self, id: Id64, lots: Lots, now: Time) -> Option<Order> {
        let order = self.orders.get_mut(&id)?;
        let side = match order.side {
            Side::Buy => &mut self.bid_side,
            Side::Sell => &mut self.offer_side,
        };
        side.take_order(order, lots, now);
        if order.done() {
            self.orders.remove(&id)
        } else {
            Some(order.clone())
        }
    }

    /// Reduce a resting order to `lots` total. Returns the post-revision
    /// snapshot; the order leaves the book if nothing remains.
    pub fn revise_order(&mut self, id: Id64, lots: Lots, now: Time) -> Option<Order> {
        let order = self.orders.get_mut(&id)?;
        let side = match order.side {
            Side::Buy => &mut self.bid_side,
            Side::Sell => &mut self.offer_side,
        };
        side.revise_order(order, lots, now);
        if order.done() {
            self.orders.remove(&id)
        } else {
            Some(order.clone())
        }
    }

    /// Cancel a resting order, removing it from the book.
    pub fn cancel_order(&mut self, id: Id64, now: Time) -> Option<Order> {
        let mut order = self.orders.remove(&id)?;
        let side = match order.side {
            Side::Buy => &mut self.bid_side,
            Side::Sell => &mut self.offer_side,
        };
        side.cancel_order(&mut order, now);
        Some(order)
    }

    /// Best-bid/offer view with per-level depth arrays.
    pub fn view(&self, depth: usize) -> MarketView {
        let mut view = MarketView {
            id: self.id,
            instr: self.instr.clone(),
            settl_date: maybe_jd_to_iso(self.settl_day),
            state: self.state,
            bid_ticks: Vec::new(),
            bid_lots: Vec::new(),
            bid_count: Vec::new(),
            offer_ticks: Vec::new(),
            offer_lots: Vec::new(),
            offer_count: Vec::new(),
        };
        for level in self.bid_side.levels().take(depth) {
            view.bid_ticks.push(level.ticks());
            view.bid_lots.push(level.lots());
            view.bid_count.push(level.count());
        }
        for level in self.offer_side.levels().take(depth) {
            view.offer_ticks.push(level.ticks());
            view.offer_lots.push(level.lots());
            view.offer_count.push(level.count());
        }
        view
    }
}

/// Serializable best-bid/offer snapshot of a market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketView {
    pub id: Id64,
    pub instr: Symbol,
    pub settl_date: Option<IsoDate>,
    pub state: MarketState,
    pub bid_ticks: Vec<Ticks>,
    pub bid_lots: Vec<Lots>,
    pub bid_count: Vec<usize>,
    pub offer_ticks: Vec<Ticks>,
    pub offer_lots: Vec<Lots>,
    pub offer_count: Vec<usize>,
}
