//! Price-time crossing algorithm
//!
//! The matcher resolves a taker order against the opposite side of the
//! book: offers for a buy, bids for a sell. Makers are visited in strict
//! price-time order and the maker's limit price always wins, so any price
//! improvement accrues to the taker. The scan mutates nothing shared; it
//! fills the caller's scratch buffers, which are committed only after the
//! journal accepts the batch.

use crate::market::Market;
use types::date::Time;
use types::exec::{Exec, LiqInd};
use types::ids::{Id64, Symbol};
use types::numeric::{cost, Cost, Lots, Ticks};
use types::order::{Order, Side};

/// Aggressor direction in market-data terms: a buy taker pays the offer, a
/// sell taker gives on the bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direct {
    Paid,
    Given,
}

/// Ticks between the taker's limit and a maker's price. Positive means the
/// prices no longer cross.
pub fn spread(taker: &Order, maker_ticks: Ticks, direct: Direct) -> Ticks {
    match direct {
        // Paid when the taker lifts the offer.
        Direct::Paid => maker_ticks - taker.ticks,
        // Given when the taker hits the bid.
        Direct::Given => taker.ticks - maker_ticks,
    }
}

/// One maker-taker pairing produced by the scan. Exec fields index into the
/// operation's scratch exec buffer.
#[derive(Debug)]
pub struct Match {
    pub lots: Lots,
    pub maker_id: Id64,
    pub maker_accnt: Symbol,
    pub self_cross: bool,
    pub maker_exec: usize,
    pub taker_exec: usize,
}

/// Resolve `taker` against the opposite side of `market`.
///
/// Appends one [`Match`] and an exec pair per fill, then applies the
/// aggregate fills to the taker order. Maker orders are untouched until the
/// commit phase.
pub fn match_orders(
    market: &mut Market,
    taker: &mut Order,
    now: Time,
    matches: &mut Vec<Match>,
    execs: &mut Vec<Exec>,
) {
    let direct = match taker.side {
        Side::Buy => Direct::Paid,
        Side::Sell => Direct::Given,
    };

    let crossings = scan(market, taker, direct);

    let mut sum_lots = Lots::ZERO;
    let mut sum_cost = Cost::ZERO;
    let mut last_lots = Lots::ZERO;
    let mut last_ticks = Ticks::ZERO;

    for crossing in crossings {
        let maker_exec_id = market.alloc_id();
        let taker_exec_id = market.alloc_id();

        sum_lots += crossing.lots;
        sum_cost += cost(crossing.lots, crossing.ticks);
        last_lots = crossing.lots;
        last_ticks = crossing.ticks;

        // Maker first, consistent with last-look semantics.
        let mut maker_exec = Exec::from_order(&crossing.maker, maker_exec_id, now);
        maker_exec.trade_one(
            crossing.lots,
            crossing.ticks,
            taker_exec_id,
            LiqInd::Maker,
            taker.accnt.clone(),
        );

        // The taker exec snapshots the original order with the cumulative
        // fills applied, so each exec reflects the order as of its match.
        let mut taker_exec = Exec::from_order(taker, taker_exec_id, now);
        taker_exec.trade(
            sum_lots,
            sum_cost,
            crossing.lots,
            crossing.ticks,
            maker_exec_id,
            LiqInd::Taker,
            crossing.maker.accnt.clone(),
        );

        matches.push(Match {
            lots: crossing.lots,
            maker_id: crossing.maker.id,
            maker_accnt: crossing.maker.accnt.clone(),
            self_cross: crossing.maker.accnt == taker.accnt,
            maker_exec: execs.len(),
            taker_exec: execs.len() + 1,
        });
        execs.push(maker_exec);
        execs.push(taker_exec);
    }

    if !matches.is_empty() {
        taker.trade(sum_lots, sum_cost, last_lots, last_ticks, now);
    }
}

struct Crossing {
    maker: Order,
    lots: Lots,
    ticks: Ticks,
}

/// Read-only scan of the opposite side in price-time order. Stops when the
/// taker is filled or the prices no longer cross.
fn scan(market: &Market, taker: &Order, direct: Direct) -> Vec<Crossing> {
    let mut crossings = Vec::new();
    let mut sum_lots = Lots::ZERO;
    let side = market.side(taker.side.opposite());

    'outer: for level in side.levels() {
        if spread(taker, level.ticks(), direct) > Ticks::ZERO {
            break;
        }
        for maker_id in level.orders() {
            if sum_lots == taker.resd_lots {
                break 'outer;
            }
            // Resting ids always resolve in the arena.
            let maker = match market.order(maker_id) {
                Some(maker) => maker,
                None => continue,
            };
            let lots = (taker.resd_lots - sum_lots).min(maker.resd_lots);
            sum_lots += lots;
            crossings.push(Crossing {
                maker: maker.clone(),
                lots,
                ticks: maker.ticks,
            });
        }
        if sum_lots == taker.resd_lots {
            break;
        }
    }
    crossings
}
