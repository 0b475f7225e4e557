//! Matching service
//!
//! Orchestrates create/revise/cancel/trade/archive across the book, the
//! accounts, the positions and the durable journal. Every state-changing
//! operation runs in two phases:
//!
//! 1. **Reserve**: validate, allocate exec ids, run the matcher into
//!    scratch buffers, rest the residual in the book. May fail; nothing
//!    shared has changed except the monotonic id counter, whose gaps are
//!    harmless.
//! 2. **Commit**: submit the exec batch to the message queue, then apply
//!    the account-side mutations. If the journal rejects, the reserve-phase
//!    book insertion is unwound and the error surfaces; callers never
//!    observe partial state.
//!
//! Within each match the maker is updated before the taker, consistent with
//! last-look semantics.

use crate::accnt::Accnt;
use crate::market::{Market, VIEW_DEPTH};
use crate::matcher;
use crate::response::Response;
use std::collections::BTreeMap;
use std::slice;
use std::sync::Arc;
use tracing::{debug, info, warn};
use types::asset::Asset;
use types::date::{maybe_jd_to_iso, BusinessDay, JDay, Time, MARKET_ZONE};
use types::errors::{Error, Result};
use types::exec::{Exec, LiqInd};
use types::ids::{to_market_id, Id64, Symbol};
use types::instr::Instr;
use types::market::MarketState;
use types::model::Model;
use types::msg::MsgQueue;
use types::numeric::{Lots, Ticks};
use types::order::{Order, Side};

/// Execs newer than this window are replayed into the account rings on
/// load: one week.
pub const EXEC_WINDOW_MS: i64 = 604_800_000;

pub struct Serv<Q> {
    mq: Q,
    bus_day: BusinessDay,
    max_execs: usize,
    assets: BTreeMap<Symbol, Asset>,
    instrs: BTreeMap<Symbol, Instr>,
    markets: BTreeMap<Id64, Market>,
    accnts: BTreeMap<Symbol, Accnt>,
}

fn accnt_entry<'a>(
    accnts: &'a mut BTreeMap<Symbol, Accnt>,
    symbol: &Symbol,
    max_execs: usize,
) -> &'a mut Accnt {
    accnts
        .entry(symbol.clone())
        .or_insert_with(|| Accnt::new(symbol.clone(), max_execs))
}

/// Revised lots must not be greater than the original lots, nor less than
/// the executed or minimum lots.
fn check_revise_lots(order: &Order, lots: Lots) -> Result<()> {
    if lots.is_zero() || lots > order.lots || lots < order.exec_lots || lots < order.min_lots {
        return Err(Error::InvalidLots(lots));
    }
    Ok(())
}

impl<Q: MsgQueue> Serv<Q> {
    pub fn new(mq: Q, max_execs: usize) -> Self {
        Self {
            mq,
            bus_day: MARKET_ZONE,
            max_execs,
            assets: BTreeMap::new(),
            instrs: BTreeMap::new(),
            markets: BTreeMap::new(),
            accnts: BTreeMap::new(),
        }
    }

    /// Rebuild the engine from persisted state: reference data, then
    /// markets, live orders, recent execs, trades and positions for the
    /// current business day.
    pub fn load(&mut self, model: &dyn Model, now: Time) -> Result<()> {
        let bus_day = self.bus_day.bus_day(now);
        let max_execs = self.max_execs;

        for asset in model.read_assets()? {
            self.assets.insert(asset.symbol.clone(), asset);
        }
        for instr in model.read_instrs()? {
            self.instrs.insert(instr.symbol.clone(), instr);
        }
        for rec in model.read_markets()? {
            self.markets.insert(rec.id, Market::from_rec(rec));
        }
        for order in model.read_orders()? {
            let market = self.markets.get_mut(&order.market_id).ok_or_else(|| {
                Error::Database(format!(
                    "order '{}' references unknown market '{}'",
                    order.id, order.market_id
                ))
            })?;
            accnt_entry(&mut self.accnts, &order.accnt, max_execs).insert_order(&order);
            market.insert_order(order);
        }
        for exec in model.read_execs(now - EXEC_WINDOW_MS)? {
            let accnt = accnt_entry(&mut self.accnts, &exec.accnt, max_execs);
            accnt.push_exec_back(Arc::new(exec));
        }
        for trade in model.read_trades()? {
            let accnt = accnt_entry(&mut self.accnts, &trade.accnt, max_execs);
            accnt.insert_trade(Arc::new(trade));
        }
        for posn in model.read_posns(bus_day)? {
            let symbol = posn.accnt.clone();
            accnt_entry(&mut self.accnts, &symbol, max_execs).insert_posn(posn);
        }

        info!(
            assets = self.assets.len(),
            instrs = self.instrs.len(),
            markets = self.markets.len(),
            accnts = self.accnts.len(),
            "model loaded"
        );
        Ok(())
    }

    // ── Lookups ─────────────────────────────────────────────────────

    pub fn assets(&self) -> &BTreeMap<Symbol, Asset> {
        &self.assets
    }

    pub fn instrs(&self) -> &BTreeMap<Symbol, Instr> {
        &self.instrs
    }

    pub fn markets(&self) -> &BTreeMap<Id64, Market> {
        &self.markets
    }

    pub fn instr(&self, symbol: &Symbol) -> Result<&Instr> {
        self.instrs
            .get(symbol)
            .ok_or_else(|| Error::InstrNotFound(symbol.clone()))
    }

    pub fn market(&self, id: Id64) -> Result<&Market> {
        self.markets.get(&id).ok_or(Error::MarketNotFound(id))
    }

    /// Account lookup is lazy: a missing symbol creates an empty account.
    pub fn accnt(&mut self, symbol: &Symbol) -> &Accnt {
        self.accnt_mut(symbol)
    }

    pub fn find_accnt(&self, symbol: &Symbol) -> Option<&Accnt> {
        self.accnts.get(symbol)
    }

    pub fn accnts(&self) -> &BTreeMap<Symbol, Accnt> {
        &self.accnts
    }

    fn accnt_mut(&mut self, symbol: &Symbol) -> &mut Accnt {
        let max_execs = self.max_execs;
        accnt_entry(&mut self.accnts, symbol, max_execs)
    }

    // ── Markets ─────────────────────────────────────────────────────

    pub fn create_market(
        &mut self,
        instr: &Symbol,
        settl_day: JDay,
        state: MarketState,
        now: Time,
    ) -> Result<&Market> {
        let instr = self.instr(instr)?;
        let (instr_id, instr_sym) = (instr.id, instr.symbol.clone());
        if settl_day != 0 {
            let bus_day = self.bus_day.bus_day(now);
            if settl_day < bus_day {
                return Err(Error::Invalid("settl-day before bus-day".into()));
            }
        }
        let id = to_market_id(instr_id, settl_day);
        if self.markets.contains_key(&id) {
            return Err(Error::AlreadyExists {
                instr: instr_sym,
                settl_date: maybe_jd_to_iso(settl_day).unwrap_or(0),
            });
        }
        self.mq.create_market(id, &instr_sym, settl_day, state)?;
        info!(market_id = id.count(), instr = %instr_sym, "market created");
        Ok(self
            .markets
            .entry(id)
            .or_insert_with(|| Market::new(id, instr_sym.clone(), settl_day, state)))
    }

    pub fn update_market(&mut self, market_id: Id64, state: MarketState) -> Result<()> {
        if !self.markets.contains_key(&market_id) {
            return Err(Error::MarketNotFound(market_id));
        }
        self.mq.update_market(market_id, state)?;
        if let Some(market) = self.markets.get_mut(&market_id) {
            market.set_state(state);
        }
        Ok(())
    }

    // ── Orders ──────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub fn create_order(
        &mut self,
        accnt: &Symbol,
        market_id: Id64,
        ref_: &str,
        side: Side,
        lots: Lots,
        ticks: Ticks,
        min_lots: Lots,
        now: Time,
    ) -> Result<Response> {
        // Order-refs may be reused so long as only one order is live under
        // the ref at any given time.
        {
            let accnt = self.accnt_mut(accnt);
            if !ref_.is_empty() && accnt.ref_exists(ref_) {
                return Err(Error::RefAlreadyExists(ref_.to_string()));
            }
        }
        let bus_day = self.bus_day.bus_day(now);

        let mut matches = Vec::with_capacity(8);
        let mut execs = Vec::with_capacity(1 + 16);
        let order = {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(Error::MarketNotFound(market_id))?;
            if market.settl_day() != 0 && market.settl_day() < bus_day {
                return Err(Error::MarketClosed {
                    instr: market.instr().clone(),
                    settl_date: maybe_jd_to_iso(market.settl_day()).unwrap_or(0),
                });
            }
            if lots.is_zero() || lots < min_lots {
                return Err(Error::InvalidLots(lots));
            }
            let id = market.alloc_id();
            let mut order = Order::new(
                accnt.clone(),
                market_id,
                market.instr().clone(),
                market.settl_day(),
                id,
                ref_,
                side,
                lots,
                ticks,
                min_lots,
                now,
            );
            execs.push(Exec::from_order(&order, id, now));
            matcher::match_orders(market, &mut order, now, &mut matches, &mut execs);

            // Rest the residual before the journal call so a rejection can
            // unwind exactly what this operation added.
            if !order.done() {
                market.insert_order(order.clone());
            }
            order
        };

        if let Err(err) = self.mq.create_exec(&execs) {
            warn!(
                market_id = market_id.count(),
                order_id = order.id.count(),
                "journal rejected exec batch; unwinding book insertion"
            );
            if !order.done() {
                if let Some(market) = self.markets.get_mut(&market_id) {
                    market.remove_order(order.id);
                }
            }
            return Err(err);
        }

        // Commit phase.
        let mut resp = Response::new();
        resp.orders.push(order.clone());
        let new_exec = Arc::new(execs[0].clone());
        {
            let taker = self.accnt_mut(accnt);
            if !order.done() {
                taker.insert_order(&order);
            }
            taker.push_exec_front(new_exec.clone());
        }
        resp.execs.push(new_exec);

        self.commit_matches(accnt, market_id, &matches, &mut execs, now, &mut resp);

        if !matches.is_empty() {
            resp.posn = self
                .accnts
                .get(accnt)
                .and_then(|a| a.posn(market_id))
                .cloned();
        }
        resp.market = self.markets.get(&market_id).map(|m| m.view(VIEW_DEPTH));
        Ok(resp)
    }

    /// Apply the staged matches. Must not fail: the batch is journalled and
    /// the maker residuals are exactly as they were when matching ran.
    fn commit_matches(
        &mut self,
        taker: &Symbol,
        market_id: Id64,
        matches: &[matcher::Match],
        execs: &mut [Exec],
        now: Time,
        resp: &mut Response,
    ) {
        let max_execs = self.max_execs;
        for m in matches {
            // Reduce the maker.
            let maker_post = self
                .markets
                .get_mut(&market_id)
                .and_then(|market| market.take_order(m.maker_id, m.lots, now));
            let maker_post = match maker_post {
                Some(order) => order,
                None => {
                    debug_assert!(false, "matched maker missing from book");
                    continue;
                }
            };

            // Maker updated first, consistent with last-look semantics. The
            // exec records the position immediately before its own fill.
            let maker_accnt = accnt_entry(&mut self.accnts, &m.maker_accnt, max_execs);
            let posn = maker_accnt.posn_mut(market_id, &maker_post.instr, maker_post.settl_day);
            execs[m.maker_exec].set_posn(posn.net_lots, posn.net_cost);
            {
                let exec = &execs[m.maker_exec];
                posn.add_trade(exec.side, exec.last_lots, exec.last_ticks);
            }
            let maker_exec = Arc::new(execs[m.maker_exec].clone());
            maker_accnt.push_exec_front(maker_exec.clone());
            maker_accnt.insert_trade(maker_exec.clone());
            if maker_post.done() {
                maker_accnt.remove_order(&maker_post);
            }
            if m.self_cross {
                // The caller observes both sides of a self-cross.
                resp.orders.push(maker_post.clone());
                resp.execs.push(maker_exec);
            }

            // Taker position and account.
            let (instr, settl_day) = {
                let exec = &execs[m.taker_exec];
                (exec.instr.clone(), exec.settl_day)
            };
            let taker_accnt = accnt_entry(&mut self.accnts, taker, max_execs);
            let posn = taker_accnt.posn_mut(market_id, &instr, settl_day);
            execs[m.taker_exec].set_posn(posn.net_lots, posn.net_cost);
            {
                let exec = &execs[m.taker_exec];
                posn.add_trade(exec.side, exec.last_lots, exec.last_ticks);
            }
            let taker_exec = Arc::new(execs[m.taker_exec].clone());
            taker_accnt.push_exec_front(taker_exec.clone());
            taker_accnt.insert_trade(taker_exec.clone());
            resp.execs.push(taker_exec);
        }
        debug!(
            market_id = market_id.count(),
            matches = matches.len(),
            "matches committed"
        );
    }

    pub fn revise_order(
        &mut self,
        accnt: &Symbol,
        market_id: Id64,
        id: Id64,
        lots: Lots,
        now: Time,
    ) -> Result<Response> {
        self.do_revise(accnt, market_id, id, lots, now)
    }

    pub fn revise_order_by_ref(
        &mut self,
        accnt: &Symbol,
        ref_: &str,
        lots: Lots,
        now: Time,
    ) -> Result<Response> {
        let (market_id, id) = self.order_by_ref(accnt, ref_)?;
        self.do_revise(accnt, market_id, id, lots, now)
    }

    /// Revise a batch of orders to the same total, atomically: every id is
    /// validated before anything is journalled or applied.
    pub fn revise_orders(
        &mut self,
        accnt: &Symbol,
        market_id: Id64,
        ids: &[Id64],
        lots: Lots,
        now: Time,
    ) -> Result<Response> {
        self.check_owner(accnt, market_id, ids)?;
        let mut execs = Vec::with_capacity(ids.len());
        {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(Error::MarketNotFound(market_id))?;
            for &id in ids {
                let order = market
                    .order(id)
                    .ok_or_else(|| Error::OrderNotFound(id.to_string()))?
                    .clone();
                if order.done() {
                    return Err(Error::TooLate(id));
                }
                check_revise_lots(&order, lots)?;
                let mut exec = Exec::from_order(&order, market.alloc_id(), now);
                exec.revise(lots);
                execs.push(exec);
            }
        }

        self.mq.create_exec(&execs)?;

        // Commit phase.
        let mut resp = Response::new();
        for exec in execs {
            let post = self
                .markets
                .get_mut(&market_id)
                .and_then(|m| m.revise_order(exec.order_id, lots, now));
            let exec = Arc::new(exec);
            let accnt = self.accnt_mut(&exec.accnt);
            accnt.push_exec_front(exec.clone());
            if let Some(post) = post {
                if post.done() {
                    accnt.remove_order(&post);
                }
                resp.orders.push(post);
            }
            resp.execs.push(exec);
        }
        resp.market = self.markets.get(&market_id).map(|m| m.view(VIEW_DEPTH));
        Ok(resp)
    }

    pub fn cancel_order(
        &mut self,
        accnt: &Symbol,
        market_id: Id64,
        id: Id64,
        now: Time,
    ) -> Result<Response> {
        self.do_cancel(accnt, market_id, id, now)
    }

    pub fn cancel_order_by_ref(
        &mut self,
        accnt: &Symbol,
        ref_: &str,
        now: Time,
    ) -> Result<Response> {
        let (market_id, id) = self.order_by_ref(accnt, ref_)?;
        self.do_cancel(accnt, market_id, id, now)
    }

    /// Cancel a batch of orders atomically.
    pub fn cancel_orders(
        &mut self,
        accnt: &Symbol,
        market_id: Id64,
        ids: &[Id64],
        now: Time,
    ) -> Result<Response> {
        self.check_owner(accnt, market_id, ids)?;
        let mut execs = Vec::with_capacity(ids.len());
        {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(Error::MarketNotFound(market_id))?;
            for &id in ids {
                let order = market
                    .order(id)
                    .ok_or_else(|| Error::OrderNotFound(id.to_string()))?
                    .clone();
                if order.done() {
                    return Err(Error::TooLate(id));
                }
                let mut exec = Exec::from_order(&order, market.alloc_id(), now);
                exec.cancel();
                execs.push(exec);
            }
        }

        self.mq.create_exec(&execs)?;

        let mut resp = Response::new();
        self.commit_cancels(execs, now, &mut resp);
        resp.market = self.markets.get(&market_id).map(|m| m.view(VIEW_DEPTH));
        Ok(resp)
    }

    /// Cancel every live order belonging to an account, across markets, as
    /// one atomic batch.
    pub fn cancel_all_accnt(&mut self, accnt: &Symbol, now: Time) -> Result<Response> {
        let keys: Vec<(Id64, Id64)> = self
            .accnts
            .get(accnt)
            .map(|a| a.orders().collect())
            .unwrap_or_default();

        let mut execs = Vec::with_capacity(keys.len());
        for &(market_id, id) in &keys {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(Error::MarketNotFound(market_id))?;
            let order = market
                .order(id)
                .ok_or_else(|| Error::OrderNotFound(id.to_string()))?
                .clone();
            let mut exec = Exec::from_order(&order, market.alloc_id(), now);
            exec.cancel();
            execs.push(exec);
        }
        if execs.is_empty() {
            return Ok(Response::new());
        }

        self.mq.create_exec(&execs)?;

        let mut resp = Response::new();
        self.commit_cancels(execs, now, &mut resp);
        Ok(resp)
    }

    /// Cancel every order resting in a market, across accounts, as one
    /// atomic batch.
    pub fn cancel_all_market(&mut self, market_id: Id64, now: Time) -> Result<Response> {
        let execs = {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(Error::MarketNotFound(market_id))?;
            let orders: Vec<Order> = market.orders().cloned().collect();
            let mut execs = Vec::with_capacity(orders.len());
            for order in &orders {
                let mut exec = Exec::from_order(order, market.alloc_id(), now);
                exec.cancel();
                execs.push(exec);
            }
            execs
        };

        let mut resp = Response::new();
        if !execs.is_empty() {
            self.mq.create_exec(&execs)?;
            self.commit_cancels(execs, now, &mut resp);
        }
        resp.market = self.markets.get(&market_id).map(|m| m.view(VIEW_DEPTH));
        Ok(resp)
    }

    /// Apply journalled cancel execs to the book and the owning accounts.
    fn commit_cancels(&mut self, execs: Vec<Exec>, now: Time, resp: &mut Response) {
        for exec in execs {
            let post = self
                .markets
                .get_mut(&exec.market_id)
                .and_then(|m| m.cancel_order(exec.order_id, now));
            let exec = Arc::new(exec);
            let accnt = self.accnt_mut(&exec.accnt);
            if let Some(post) = post {
                accnt.remove_order(&post);
                resp.orders.push(post);
            }
            accnt.push_exec_front(exec.clone());
            resp.execs.push(exec);
        }
    }

    fn do_revise(
        &mut self,
        accnt: &Symbol,
        market_id: Id64,
        id: Id64,
        lots: Lots,
        now: Time,
    ) -> Result<Response> {
        self.check_owner(accnt, market_id, slice::from_ref(&id))?;
        let exec = {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(Error::MarketNotFound(market_id))?;
            let order = market
                .order(id)
                .ok_or_else(|| Error::OrderNotFound(id.to_string()))?
                .clone();
            if order.done() {
                return Err(Error::TooLate(id));
            }
            check_revise_lots(&order, lots)?;
            let mut exec = Exec::from_order(&order, market.alloc_id(), now);
            exec.revise(lots);
            exec
        };

        self.mq.create_exec(slice::from_ref(&exec))?;

        // Commit phase.
        let mut resp = Response::new();
        let post = self
            .markets
            .get_mut(&market_id)
            .and_then(|m| m.revise_order(id, lots, now));
        let exec = Arc::new(exec);
        let accnt = self.accnt_mut(accnt);
        accnt.push_exec_front(exec.clone());
        if let Some(post) = post {
            if post.done() {
                accnt.remove_order(&post);
            }
            resp.orders.push(post);
        }
        resp.execs.push(exec);
        resp.market = self.markets.get(&market_id).map(|m| m.view(VIEW_DEPTH));
        Ok(resp)
    }

    fn do_cancel(
        &mut self,
        accnt: &Symbol,
        market_id: Id64,
        id: Id64,
        now: Time,
    ) -> Result<Response> {
        self.check_owner(accnt, market_id, slice::from_ref(&id))?;
        let exec = {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(Error::MarketNotFound(market_id))?;
            let order = market
                .order(id)
                .ok_or_else(|| Error::OrderNotFound(id.to_string()))?
                .clone();
            if order.done() {
                return Err(Error::TooLate(id));
            }
            let mut exec = Exec::from_order(&order, market.alloc_id(), now);
            exec.cancel();
            exec
        };

        self.mq.create_exec(slice::from_ref(&exec))?;

        let mut resp = Response::new();
        self.commit_cancels(vec![exec], now, &mut resp);
        resp.market = self.markets.get(&market_id).map(|m| m.view(VIEW_DEPTH));
        Ok(resp)
    }

    fn order_by_ref(&self, accnt: &Symbol, ref_: &str) -> Result<(Id64, Id64)> {
        self.accnts
            .get(accnt)
            .ok_or_else(|| Error::OrderNotFound(ref_.to_string()))?
            .order_by_ref(ref_)
    }

    /// Every id must be a live order of the account.
    fn check_owner(&self, accnt: &Symbol, market_id: Id64, ids: &[Id64]) -> Result<()> {
        let accnt = self
            .accnts
            .get(accnt)
            .ok_or_else(|| {
                Error::OrderNotFound(ids.first().map(|id| id.to_string()).unwrap_or_default())
            })?;
        for &id in ids {
            if !accnt.has_order(market_id, id) {
                return Err(Error::OrderNotFound(id.to_string()));
            }
        }
        Ok(())
    }

    // ── Manual trades ───────────────────────────────────────────────

    /// Record a trade that happened away from the book. Admin-only at the
    /// boundary. With a counterparty, a mirrored second leg is journalled
    /// and applied in the same batch.
    #[allow(clippy::too_many_arguments)]
    pub fn create_trade(
        &mut self,
        accnt: &Symbol,
        market_id: Id64,
        ref_: &str,
        side: Side,
        lots: Lots,
        ticks: Ticks,
        liq_ind: LiqInd,
        cpty: Option<Symbol>,
        created: Time,
    ) -> Result<(Arc<Exec>, Option<Arc<Exec>>)> {
        if lots.is_zero() {
            return Err(Error::InvalidLots(lots));
        }
        let (instr, settl_day) = {
            let market = self.market(market_id)?;
            (market.instr().clone(), market.settl_day())
        };
        let max_execs = self.max_execs;

        let (posn_lots, posn_cost) = {
            let accnt = accnt_entry(&mut self.accnts, accnt, max_execs);
            let posn = accnt.posn_mut(market_id, &instr, settl_day);
            (posn.net_lots, posn.net_cost)
        };
        let trade = {
            let market = self
                .markets
                .get_mut(&market_id)
                .ok_or(Error::MarketNotFound(market_id))?;
            Exec::manual(
                accnt.clone(),
                market_id,
                instr.clone(),
                settl_day,
                market.alloc_id(),
                ref_,
                side,
                lots,
                ticks,
                posn_lots,
                posn_cost,
                liq_ind,
                cpty.clone(),
                created,
            )
        };

        // Back-to-back leg when a counterparty is specified.
        let cpty_trade = match &cpty {
            Some(cpty_sym) => {
                let (cpty_lots, cpty_cost) = {
                    let cpty_accnt = accnt_entry(&mut self.accnts, cpty_sym, max_execs);
                    let posn = cpty_accnt.posn_mut(market_id, &instr, settl_day);
                    (posn.net_lots, posn.net_cost)
                };
                let id = self
                    .markets
                    .get_mut(&market_id)
                    .ok_or(Error::MarketNotFound(market_id))?
                    .alloc_id();
                trade.opposite(id, cpty_lots, cpty_cost)
            }
            None => None,
        };

        match &cpty_trade {
            Some(leg) => self.mq.create_exec(&[trade.clone(), leg.clone()])?,
            None => self.mq.create_exec(slice::from_ref(&trade))?,
        }

        // Commit phase.
        let trade = Arc::new(trade);
        let cpty_trade = cpty_trade.map(Arc::new);
        if let Some(leg) = &cpty_trade {
            let cpty_accnt = accnt_entry(&mut self.accnts, &leg.accnt, max_execs);
            cpty_accnt.push_exec_front(leg.clone());
            cpty_accnt.insert_trade(leg.clone());
            cpty_accnt
                .posn_mut(market_id, &instr, settl_day)
                .add_trade(leg.side, leg.last_lots, leg.last_ticks);
        }
        let accnt = accnt_entry(&mut self.accnts, accnt, max_execs);
        accnt.push_exec_front(trade.clone());
        accnt.insert_trade(trade.clone());
        accnt
            .posn_mut(market_id, &instr, settl_day)
            .add_trade(trade.side, trade.last_lots, trade.last_ticks);

        Ok((trade, cpty_trade))
    }

    // ── Archival ────────────────────────────────────────────────────

    /// Drop a trade from the account's live trade index. The trade remains
    /// in the durable journal.
    pub fn archive_trade(
        &mut self,
        accnt: &Symbol,
        market_id: Id64,
        id: Id64,
        now: Time,
    ) -> Result<()> {
        self.archive_trades(accnt, market_id, slice::from_ref(&id), now)
    }

    /// Batch archival: every id is validated before anything is journalled
    /// or removed.
    pub fn archive_trades(
        &mut self,
        accnt: &Symbol,
        market_id: Id64,
        ids: &[Id64],
        now: Time,
    ) -> Result<()> {
        {
            let accnt = self
                .accnts
                .get(accnt)
                .ok_or(Error::TradeNotFound(ids.first().copied().unwrap_or(Id64::ZERO)))?;
            for &id in ids {
                accnt.trade(market_id, id)?;
            }
        }

        self.mq.archive_trade(market_id, ids, now)?;

        // Commit phase.
        if let Some(accnt) = self.accnts.get_mut(accnt) {
            for &id in ids {
                accnt.remove_trade(market_id, id);
            }
        }
        Ok(())
    }
}
