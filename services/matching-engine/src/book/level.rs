//! Price level with a FIFO order queue
//!
//! A level aggregates the orders resting at one price. The queue holds
//! order ids in arrival order to enforce time priority; the order values
//! themselves live in the market's arena.

use std::collections::VecDeque;
use types::ids::Id64;
use types::numeric::{Lots, Ticks};

/// One price point on a market side.
///
/// Invariant: `lots` equals the sum of residual lots of the queued orders,
/// and the order count is the queue length.
#[derive(Debug, Clone)]
pub struct Level {
    ticks: Ticks,
    lots: Lots,
    queue: VecDeque<Id64>,
}

impl Level {
    pub fn new(ticks: Ticks) -> Self {
        Self {
            ticks,
            lots: Lots::ZERO,
            queue: VecDeque::new(),
        }
    }

    /// Append an order at the back of the queue (time priority).
    pub fn push_back(&mut self, id: Id64, resd_lots: Lots) {
        self.queue.push_back(id);
        self.lots += resd_lots;
    }

    /// Splice an order out of the queue, wherever it sits.
    ///
    /// Returns false if the id is not queued here.
    pub fn remove(&mut self, id: Id64, resd_lots: Lots) -> bool {
        match self.queue.iter().position(|&q| q == id) {
            Some(pos) => {
                self.queue.remove(pos);
                self.lots -= resd_lots;
                true
            }
            None => false,
        }
    }

    /// Reduce the aggregate after a partial fill or revision.
    pub fn reduce(&mut self, delta: Lots) {
        self.lots -= delta;
    }

    pub fn ticks(&self) -> Ticks {
        self.ticks
    }

    pub fn lots(&self) -> Lots {
        self.lots
    }

    /// Number of orders resting at this price.
    pub fn count(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queued order ids in arrival order.
    pub fn orders(&self) -> impl Iterator<Item = Id64> + '_ {
        self.queue.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut level = Level::new(Ticks::new(12345));
        level.push_back(Id64::new(1), Lots::new(10));
        level.push_back(Id64::new(2), Lots::new(5));
        level.push_back(Id64::new(3), Lots::new(7));

        let ids: Vec<_> = level.orders().collect();
        assert_eq!(ids, vec![Id64::new(1), Id64::new(2), Id64::new(3)]);
        assert_eq!(level.lots(), Lots::new(22));
        assert_eq!(level.count(), 3);
    }

    #[test]
    fn test_remove_mid_queue() {
        let mut level = Level::new(Ticks::new(12345));
        level.push_back(Id64::new(1), Lots::new(10));
        level.push_back(Id64::new(2), Lots::new(5));
        level.push_back(Id64::new(3), Lots::new(7));

        assert!(level.remove(Id64::new(2), Lots::new(5)));
        let ids: Vec<_> = level.orders().collect();
        assert_eq!(ids, vec![Id64::new(1), Id64::new(3)]);
        assert_eq!(level.lots(), Lots::new(17));

        assert!(!level.remove(Id64::new(2), Lots::new(5)));
    }

    #[test]
    fn test_reduce_keeps_queue() {
        let mut level = Level::new(Ticks::new(12345));
        level.push_back(Id64::new(1), Lots::new(10));
        level.reduce(Lots::new(4));
        assert_eq!(level.lots(), Lots::new(6));
        assert_eq!(level.count(), 1);
    }
}
