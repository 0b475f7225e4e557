//! One side of a market's order book
//!
//! Levels are kept in a BTreeMap keyed by side-normalized price, so the
//! first entry is always the best level regardless of side: bids negate the
//! price to sort descending, offers sort ascending. Iteration is therefore
//! deterministic and in strict price priority.

use crate::book::level::Level;
use types::date::Time;
use types::numeric::{cost, Lots, Ticks};
use types::order::{Order, Side};
use std::collections::BTreeMap;

/// Price-ordered levels with FIFO queues, for one side of one market.
#[derive(Debug, Clone)]
pub struct MarketSide {
    side: Side,
    levels: BTreeMap<i64, Level>,
}

impl MarketSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    fn key(&self, ticks: Ticks) -> i64 {
        match self.side {
            Side::Buy => -ticks.count(),
            Side::Sell => ticks.count(),
        }
    }

    /// Find or allocate the level for the order's price and append the
    /// order to its queue.
    pub fn insert_order(&mut self, order: &Order) {
        debug_assert_eq!(order.side, self.side);
        self.levels
            .entry(self.key(order.ticks))
            .or_insert_with(|| Level::new(order.ticks))
            .push_back(order.id, order.resd_lots);
    }

    /// Splice the order out of its level, dropping the level when empty.
    pub fn remove_order(&mut self, order: &Order) {
        let key = self.key(order.ticks);
        if let Some(level) = self.levels.get_mut(&key) {
            level.remove(order.id, order.resd_lots);
            if level.is_empty() {
                self.levels.remove(&key);
            }
        }
    }

    /// Fill `lots` of a resting order, removing it once nothing rests.
    pub fn take_order(&mut self, order: &mut Order, lots: Lots, now: Time) {
        let key = self.key(order.ticks);
        order.trade(lots, cost(lots, order.ticks), lots, order.ticks, now);
        if let Some(level) = self.levels.get_mut(&key) {
            level.reduce(lots);
            if order.done() {
                level.remove(order.id, Lots::ZERO);
                if level.is_empty() {
                    self.levels.remove(&key);
                }
            }
        }
    }

    /// Reduce a resting order to `lots` total. Precondition: the new total
    /// is not above the current total nor below the executed lots.
    pub fn revise_order(&mut self, order: &mut Order, lots: Lots, now: Time) {
        let delta = order.lots - lots;
        let key = self.key(order.ticks);
        order.revise(lots, now);
        if let Some(level) = self.levels.get_mut(&key) {
            level.reduce(delta);
            if order.done() {
                level.remove(order.id, Lots::ZERO);
                if level.is_empty() {
                    self.levels.remove(&key);
                }
            }
        }
    }

    /// Remove the order and mark it cancelled.
    pub fn cancel_order(&mut self, order: &mut Order, now: Time) {
        self.remove_order(order);
        order.cancel(now);
    }

    /// Levels in price priority, best first.
    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.levels.values()
    }

    /// Best level, if any.
    pub fn best(&self) -> Option<&Level> {
        self.levels.values().next()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::{Id64, Symbol};

    fn order(id: i64, side: Side, lots: i64, ticks: i64) -> Order {
        Order::new(
            Symbol::new("MARAYL"),
            Id64::new(0xab0000),
            Symbol::new("EURUSD"),
            0,
            Id64::new(id),
            "",
            side,
            Lots::new(lots),
            Ticks::new(ticks),
            Lots::ZERO,
            1521514800000,
        )
    }

    #[test]
    fn test_bid_priority_descending() {
        let mut side = MarketSide::new(Side::Buy);
        side.insert_order(&order(1, Side::Buy, 10, 12343));
        side.insert_order(&order(2, Side::Buy, 10, 12345));
        side.insert_order(&order(3, Side::Buy, 10, 12344));

        let ticks: Vec<_> = side.levels().map(|l| l.ticks()).collect();
        assert_eq!(
            ticks,
            vec![Ticks::new(12345), Ticks::new(12344), Ticks::new(12343)]
        );
    }

    #[test]
    fn test_offer_priority_ascending() {
        let mut side = MarketSide::new(Side::Sell);
        side.insert_order(&order(1, Side::Sell, 10, 12347));
        side.insert_order(&order(2, Side::Sell, 10, 12345));

        let ticks: Vec<_> = side.levels().map(|l| l.ticks()).collect();
        assert_eq!(ticks, vec![Ticks::new(12345), Ticks::new(12347)]);
        assert_eq!(side.best().unwrap().ticks(), Ticks::new(12345));
    }

    #[test]
    fn test_same_price_shares_level() {
        let mut side = MarketSide::new(Side::Buy);
        side.insert_order(&order(1, Side::Buy, 10, 12345));
        side.insert_order(&order(2, Side::Buy, 5, 12345));

        assert_eq!(side.level_count(), 1);
        let best = side.best().unwrap();
        assert_eq!(best.lots(), Lots::new(15));
        assert_eq!(best.count(), 2);
        let ids: Vec<_> = best.orders().collect();
        assert_eq!(ids, vec![Id64::new(1), Id64::new(2)]);
    }

    #[test]
    fn test_take_partial_then_full() {
        let mut side = MarketSide::new(Side::Sell);
        let mut o = order(1, Side::Sell, 10, 12345);
        side.insert_order(&o);

        side.take_order(&mut o, Lots::new(4), 1521514800100);
        assert_eq!(o.resd_lots, Lots::new(6));
        assert_eq!(side.best().unwrap().lots(), Lots::new(6));

        side.take_order(&mut o, Lots::new(6), 1521514800200);
        assert!(o.done());
        assert!(side.is_empty());
    }

    #[test]
    fn test_revise_reduces_level() {
        let mut side = MarketSide::new(Side::Buy);
        let mut o = order(1, Side::Buy, 10, 12345);
        side.insert_order(&o);

        side.revise_order(&mut o, Lots::new(5), 1521514800100);
        assert_eq!(o.resd_lots, Lots::new(5));
        assert_eq!(side.best().unwrap().lots(), Lots::new(5));
        assert_eq!(side.best().unwrap().count(), 1);
    }

    #[test]
    fn test_cancel_removes_and_marks() {
        let mut side = MarketSide::new(Side::Buy);
        let mut o = order(1, Side::Buy, 10, 12345);
        side.insert_order(&o);

        side.cancel_order(&mut o, 1521514800100);
        assert!(side.is_empty());
        assert!(o.done());
        assert_eq!(o.state, types::order::State::Cancel);
    }

    #[test]
    fn test_level_aggregates_track_queue() {
        let mut side = MarketSide::new(Side::Buy);
        let o1 = order(1, Side::Buy, 10, 12345);
        let mut o2 = order(2, Side::Buy, 5, 12345);
        side.insert_order(&o1);
        side.insert_order(&o2);

        side.take_order(&mut o2, Lots::new(5), 1521514800100);
        let best = side.best().unwrap();
        assert_eq!(best.lots(), Lots::new(10));
        assert_eq!(best.count(), 1);

        side.remove_order(&o1);
        assert!(side.is_empty());
    }
}
