//! Per-account indices
//!
//! An account carries four coexisting indices: live orders keyed by
//! (market, id) and by client reference, the bounded execution ring with the
//! newest exec at the front, live trades keyed by (market, id), and
//! positions keyed by market. Accounts are created lazily on first
//! reference.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use types::date::JDay;
use types::errors::{Error, Result};
use types::exec::Exec;
use types::ids::{Id64, Symbol};
use types::order::Order;
use types::posn::Posn;

#[derive(Debug)]
pub struct Accnt {
    symbol: Symbol,
    max_execs: usize,
    orders: BTreeSet<(Id64, Id64)>,
    refs: HashMap<String, (Id64, Id64)>,
    execs: VecDeque<Arc<Exec>>,
    trades: BTreeMap<(Id64, Id64), Arc<Exec>>,
    posns: BTreeMap<Id64, Posn>,
}

impl Accnt {
    pub fn new(symbol: Symbol, max_execs: usize) -> Self {
        Self {
            symbol,
            max_execs,
            orders: BTreeSet::new(),
            refs: HashMap::new(),
            execs: VecDeque::with_capacity(max_execs),
            trades: BTreeMap::new(),
            posns: BTreeMap::new(),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    // ── Live orders ─────────────────────────────────────────────────

    pub fn ref_exists(&self, ref_: &str) -> bool {
        self.refs.contains_key(ref_)
    }

    /// Resolve a live client reference to its (market, id) key.
    pub fn order_by_ref(&self, ref_: &str) -> Result<(Id64, Id64)> {
        self.refs
            .get(ref_)
            .copied()
            .ok_or_else(|| Error::OrderNotFound(ref_.to_string()))
    }

    pub fn has_order(&self, market_id: Id64, id: Id64) -> bool {
        self.orders.contains(&(market_id, id))
    }

    /// Index a live order. Empty references do not register.
    pub fn insert_order(&mut self, order: &Order) {
        debug_assert_eq!(order.accnt, self.symbol);
        self.orders.insert((order.market_id, order.id));
        if !order.ref_.is_empty() {
            self.refs
                .insert(order.ref_.clone(), (order.market_id, order.id));
        }
    }

    /// Release a terminal order from both order indices.
    pub fn remove_order(&mut self, order: &Order) {
        self.orders.remove(&(order.market_id, order.id));
        if !order.ref_.is_empty() {
            self.refs.remove(&order.ref_);
        }
    }

    /// Live (market, id) keys in key order.
    pub fn orders(&self) -> impl Iterator<Item = (Id64, Id64)> + '_ {
        self.orders.iter().copied()
    }

    // ── Exec ring ───────────────────────────────────────────────────

    /// Push the newest exec, evicting the oldest when full.
    pub fn push_exec_front(&mut self, exec: Arc<Exec>) {
        if self.execs.len() == self.max_execs {
            self.execs.pop_back();
        }
        self.execs.push_front(exec);
    }

    /// Append an older exec during load; ignored once the ring is full.
    pub fn push_exec_back(&mut self, exec: Arc<Exec>) {
        if self.execs.len() < self.max_execs {
            self.execs.push_back(exec);
        }
    }

    /// Recent execs, newest first.
    pub fn execs(&self) -> impl Iterator<Item = &Arc<Exec>> {
        self.execs.iter()
    }

    pub fn exec_count(&self) -> usize {
        self.execs.len()
    }

    // ── Trades ──────────────────────────────────────────────────────

    pub fn insert_trade(&mut self, trade: Arc<Exec>) {
        self.trades.insert((trade.market_id, trade.id), trade);
    }

    pub fn trade(&self, market_id: Id64, id: Id64) -> Result<&Arc<Exec>> {
        self.trades
            .get(&(market_id, id))
            .ok_or(Error::TradeNotFound(id))
    }

    pub fn remove_trade(&mut self, market_id: Id64, id: Id64) -> Option<Arc<Exec>> {
        self.trades.remove(&(market_id, id))
    }

    pub fn trades(&self) -> impl Iterator<Item = &Arc<Exec>> {
        self.trades.values()
    }

    // ── Positions ───────────────────────────────────────────────────

    /// Position for a market, created lazily on first use.
    pub fn posn_mut(&mut self, market_id: Id64, instr: &Symbol, settl_day: JDay) -> &mut Posn {
        let symbol = &self.symbol;
        self.posns
            .entry(market_id)
            .or_insert_with(|| Posn::new(symbol.clone(), market_id, instr.clone(), settl_day))
    }

    pub fn posn(&self, market_id: Id64) -> Option<&Posn> {
        self.posns.get(&market_id)
    }

    pub fn insert_posn(&mut self, posn: Posn) {
        self.posns.insert(posn.market_id, posn);
    }

    pub fn posns(&self) -> impl Iterator<Item = &Posn> {
        self.posns.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::numeric::{Lots, Ticks};
    use types::order::Side;

    fn accnt(max_execs: usize) -> Accnt {
        Accnt::new(Symbol::new("MARAYL"), max_execs)
    }

    fn order(id: i64, ref_: &str) -> Order {
        Order::new(
            Symbol::new("MARAYL"),
            Id64::new(0xab0000),
            Symbol::new("EURUSD"),
            0,
            Id64::new(id),
            ref_,
            Side::Buy,
            Lots::new(10),
            Ticks::new(12345),
            Lots::ZERO,
            1521514800000,
        )
    }

    #[test]
    fn test_ref_index_skips_empty() {
        let mut a = accnt(10);
        a.insert_order(&order(1, ""));
        a.insert_order(&order(2, "test2"));

        assert!(!a.ref_exists(""));
        assert!(a.ref_exists("test2"));
        assert_eq!(
            a.order_by_ref("test2").unwrap(),
            (Id64::new(0xab0000), Id64::new(2))
        );
        assert_eq!(
            a.order_by_ref("missing"),
            Err(Error::OrderNotFound("missing".into()))
        );
    }

    #[test]
    fn test_remove_order_releases_ref() {
        let mut a = accnt(10);
        let o = order(1, "test1");
        a.insert_order(&o);
        a.remove_order(&o);
        assert!(!a.has_order(o.market_id, o.id));
        assert!(!a.ref_exists("test1"));
    }

    #[test]
    fn test_exec_ring_bounded_front_newest() {
        let mut a = accnt(3);
        for id in 1..=5i64 {
            let exec = Exec::from_order(&order(id, ""), Id64::new(id), 1521514800000 + id);
            a.push_exec_front(Arc::new(exec));
        }
        assert_eq!(a.exec_count(), 3);
        let ids: Vec<_> = a.execs().map(|e| e.id).collect();
        assert_eq!(ids, vec![Id64::new(5), Id64::new(4), Id64::new(3)]);
    }

    #[test]
    fn test_exec_ring_back_fill_on_load() {
        let mut a = accnt(2);
        for id in [5i64, 4, 3] {
            let exec = Exec::from_order(&order(id, ""), Id64::new(id), 1521514800000);
            a.push_exec_back(Arc::new(exec));
        }
        let ids: Vec<_> = a.execs().map(|e| e.id).collect();
        assert_eq!(ids, vec![Id64::new(5), Id64::new(4)]);
    }

    #[test]
    fn test_lazy_posn() {
        let mut a = accnt(10);
        let market_id = Id64::new(0xab0000);
        assert!(a.posn(market_id).is_none());
        let posn = a.posn_mut(market_id, &Symbol::new("EURUSD"), 0);
        posn.add_trade(Side::Buy, Lots::new(3), Ticks::new(100));
        assert_eq!(a.posn(market_id).unwrap().net_lots, Lots::new(3));
    }
}
