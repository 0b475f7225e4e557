//! End-to-end matching scenarios against an in-memory journal.

use matching_engine::Serv;
use std::sync::Arc;
use types::asset::{Asset, AssetType};
use types::date::{JDay, Time};
use types::errors::Result;
use types::exec::{Exec, LiqInd};
use types::ids::{Id32, Id64, Symbol};
use types::instr::Instr;
use types::market::{MarketRec, MarketState};
use types::model::Model;
use types::msg::MemQueue;
use types::numeric::{Cost, Lots, Ticks};
use types::order::{Order, Side, State};
use types::posn::Posn;

// 2018-03-20T03:00:00Z.
const NOW: Time = 1521514800000;

fn sym(s: &str) -> Symbol {
    Symbol::new(s)
}

fn eurusd() -> Instr {
    Instr {
        id: Id32::new(12),
        symbol: sym("EURUSD"),
        display: "EURUSD".into(),
        base_asset: sym("EUR"),
        term_ccy: sym("USD"),
        lot_numer: 1000000,
        lot_denom: 1,
        tick_numer: 1,
        tick_denom: 10000,
        pip_dp: 4,
        min_lots: Lots::new(1),
        max_lots: Lots::new(10),
    }
}

struct RefData;

impl Model for RefData {
    fn read_assets(&self) -> Result<Vec<Asset>> {
        Ok(vec![
            Asset::new(sym("EUR"), "Euro Member Countries, Euro", AssetType::Currency),
            Asset::new(sym("USD"), "United States of America, Dollars", AssetType::Currency),
        ])
    }

    fn read_instrs(&self) -> Result<Vec<Instr>> {
        Ok(vec![eurusd()])
    }

    fn read_markets(&self) -> Result<Vec<MarketRec>> {
        Ok(Vec::new())
    }

    fn read_orders(&self) -> Result<Vec<Order>> {
        Ok(Vec::new())
    }

    fn read_execs(&self, _since: Time) -> Result<Vec<Exec>> {
        Ok(Vec::new())
    }

    fn read_trades(&self) -> Result<Vec<Exec>> {
        Ok(Vec::new())
    }

    fn read_posns(&self, _bus_day: JDay) -> Result<Vec<Posn>> {
        Ok(Vec::new())
    }
}

fn serv() -> (Serv<MemQueue>, Id64) {
    let mut serv = Serv::new(MemQueue::new(), 1000);
    serv.load(&RefData, NOW).unwrap();
    let market_id = serv
        .create_market(&sym("EURUSD"), 0, MarketState::OPEN, NOW)
        .unwrap()
        .id();
    (serv, market_id)
}

/// Level aggregates equal the sums over their queues, for every level of
/// every side of the market.
fn assert_book_invariants(serv: &Serv<MemQueue>, market_id: Id64) {
    let market = serv.market(market_id).unwrap();
    for side in [Side::Buy, Side::Sell] {
        for level in market.side(side).levels() {
            let mut lots = Lots::ZERO;
            let mut count = 0;
            for id in level.orders() {
                let order = market.order(id).expect("queued order in arena");
                assert_eq!(order.side, side);
                assert_eq!(order.ticks, level.ticks());
                assert!(!order.resd_lots.is_zero());
                assert_eq!(order.lots, order.resd_lots + order.exec_lots);
                lots += order.resd_lots;
                count += 1;
            }
            assert_eq!(level.lots(), lots);
            assert_eq!(level.count(), count);
        }
    }
}

fn assert_match_pair(maker: &Arc<Exec>, taker: &Arc<Exec>) {
    assert_eq!(maker.match_id, taker.id);
    assert_eq!(taker.match_id, maker.id);
    assert_eq!(maker.last_lots, taker.last_lots);
    assert_eq!(maker.last_ticks, taker.last_ticks);
    assert_eq!(maker.liq_ind, LiqInd::Maker);
    assert_eq!(taker.liq_ind, LiqInd::Taker);
}

#[test]
fn test_full_fill() {
    let (mut serv, market_id) = serv();

    serv.create_order(&sym("MARAYL"), market_id, "", Side::Sell, Lots::new(10), Ticks::new(12345), Lots::ZERO, NOW)
        .unwrap();
    let resp = serv
        .create_order(&sym("GOSAYL"), market_id, "", Side::Buy, Lots::new(10), Ticks::new(12345), Lots::ZERO, NOW + 1)
        .unwrap();

    // Both orders fully filled.
    assert_eq!(resp.orders.len(), 1);
    let taker = &resp.orders[0];
    assert_eq!(taker.state, State::Trade);
    assert!(taker.resd_lots.is_zero());
    assert_eq!(taker.exec_lots, Lots::new(10));

    // New exec plus the taker's trade exec.
    assert_eq!(resp.execs.len(), 2);
    assert_eq!(resp.execs[0].state, State::New);
    let taker_trade = &resp.execs[1];
    assert_eq!(taker_trade.state, State::Trade);
    assert_eq!(taker_trade.cpty, Some(sym("MARAYL")));

    // Two execs per account.
    let seller = serv.find_accnt(&sym("MARAYL")).unwrap();
    let buyer = serv.find_accnt(&sym("GOSAYL")).unwrap();
    assert_eq!(seller.exec_count(), 2);
    assert_eq!(buyer.exec_count(), 2);
    let maker_trade = seller.execs().next().unwrap();
    assert_match_pair(maker_trade, taker_trade);

    // Positions.
    let sell_posn = seller.posn(market_id).unwrap();
    assert_eq!(sell_posn.net_lots, Lots::new(-10));
    assert_eq!(sell_posn.net_cost, Cost::new(-123450));
    let buy_posn = buyer.posn(market_id).unwrap();
    assert_eq!(buy_posn.net_lots, Lots::new(10));
    assert_eq!(buy_posn.net_cost, Cost::new(123450));
    assert_eq!(resp.posn.as_ref().unwrap().net_lots, Lots::new(10));

    // Book empty on both sides.
    let market = serv.market(market_id).unwrap();
    assert!(market.bid_side().is_empty());
    assert!(market.offer_side().is_empty());
    assert_book_invariants(&serv, market_id);
}

#[test]
fn test_partial_fill_with_price_improvement() {
    let (mut serv, market_id) = serv();

    serv.create_order(&sym("MARAYL"), market_id, "", Side::Sell, Lots::new(5), Ticks::new(100), Lots::ZERO, NOW)
        .unwrap();
    let resp = serv
        .create_order(&sym("GOSAYL"), market_id, "", Side::Buy, Lots::new(10), Ticks::new(110), Lots::ZERO, NOW + 1)
        .unwrap();

    let taker = &resp.orders[0];
    assert_eq!(taker.exec_lots, Lots::new(5));
    assert_eq!(taker.resd_lots, Lots::new(5));

    // The trade printed at the maker's price, not the taker's limit.
    let trade = &resp.execs[1];
    assert_eq!(trade.last_ticks, Ticks::new(100));
    assert_eq!(trade.last_lots, Lots::new(5));
    assert_eq!(taker.exec_cost, Cost::new(500));

    // The residual rests on the bid at the taker's limit.
    let market = serv.market(market_id).unwrap();
    assert!(market.offer_side().is_empty());
    let best = market.bid_side().best().unwrap();
    assert_eq!(best.ticks(), Ticks::new(110));
    assert_eq!(best.lots(), Lots::new(5));
    assert_book_invariants(&serv, market_id);
}

#[test]
fn test_self_cross() {
    let (mut serv, market_id) = serv();

    serv.create_order(&sym("MARAYL"), market_id, "", Side::Sell, Lots::new(3), Ticks::new(100), Lots::ZERO, NOW)
        .unwrap();
    let resp = serv
        .create_order(&sym("MARAYL"), market_id, "", Side::Buy, Lots::new(5), Ticks::new(100), Lots::ZERO, NOW + 1)
        .unwrap();

    // The caller observes both sides of the self-cross.
    assert_eq!(resp.orders.len(), 2);
    assert_eq!(resp.execs.len(), 3); // new, maker trade, taker trade

    let accnt = serv.find_accnt(&sym("MARAYL")).unwrap();
    let trades: Vec<_> = accnt.trades().collect();
    assert_eq!(trades.len(), 2);
    assert!(trades.iter().all(|t| t.accnt == sym("MARAYL")));

    // Net position unchanged.
    let posn = accnt.posn(market_id).unwrap();
    assert!(posn.net_lots.is_zero());
    assert!(posn.net_cost.is_zero());

    // Residual buy of 2 rests on the bid.
    let market = serv.market(market_id).unwrap();
    assert!(market.offer_side().is_empty());
    let best = market.bid_side().best().unwrap();
    assert_eq!(best.ticks(), Ticks::new(100));
    assert_eq!(best.lots(), Lots::new(2));
    assert_book_invariants(&serv, market_id);
}

#[test]
fn test_cancel_after_partial_fill() {
    let (mut serv, market_id) = serv();

    let resp = serv
        .create_order(&sym("GOSAYL"), market_id, "", Side::Buy, Lots::new(10), Ticks::new(100), Lots::ZERO, NOW)
        .unwrap();
    let id = resp.orders[0].id;
    serv.create_order(&sym("MARAYL"), market_id, "", Side::Sell, Lots::new(4), Ticks::new(100), Lots::ZERO, NOW + 1)
        .unwrap();

    let resp = serv.cancel_order(&sym("GOSAYL"), market_id, id, NOW + 2).unwrap();
    let order = &resp.orders[0];
    assert_eq!(order.state, State::Cancel);
    assert!(order.resd_lots.is_zero());
    assert_eq!(order.exec_lots, Lots::new(4));

    // Removed from book and live orders; the cancel exec is newest in the
    // ring.
    let market = serv.market(market_id).unwrap();
    assert!(market.bid_side().is_empty());
    let accnt = serv.find_accnt(&sym("GOSAYL")).unwrap();
    assert_eq!(accnt.orders().count(), 0);
    let newest = accnt.execs().next().unwrap();
    assert_eq!(newest.state, State::Cancel);
    assert_eq!(newest.order_id, id);
}

#[test]
fn test_revise_down() {
    let (mut serv, market_id) = serv();

    let resp = serv
        .create_order(&sym("GOSAYL"), market_id, "", Side::Buy, Lots::new(10), Ticks::new(100), Lots::ZERO, NOW)
        .unwrap();
    let id = resp.orders[0].id;
    serv.create_order(&sym("MARAYL"), market_id, "", Side::Sell, Lots::new(3), Ticks::new(100), Lots::ZERO, NOW + 1)
        .unwrap();

    let resp = serv
        .revise_order(&sym("GOSAYL"), market_id, id, Lots::new(5), NOW + 2)
        .unwrap();
    let order = &resp.orders[0];
    assert_eq!(order.lots, Lots::new(5));
    assert_eq!(order.resd_lots, Lots::new(2));
    assert_eq!(order.exec_lots, Lots::new(3));

    // Below executed lots.
    assert_eq!(
        serv.revise_order(&sym("GOSAYL"), market_id, id, Lots::new(2), NOW + 3),
        Err(types::errors::Error::InvalidLots(Lots::new(2)))
    );
    // Zero.
    assert_eq!(
        serv.revise_order(&sym("GOSAYL"), market_id, id, Lots::ZERO, NOW + 3),
        Err(types::errors::Error::InvalidLots(Lots::ZERO))
    );
    assert_book_invariants(&serv, market_id);
}

#[test]
fn test_create_then_cancel_restores_book() {
    let (mut serv, market_id) = serv();

    serv.create_order(&sym("MARAYL"), market_id, "", Side::Sell, Lots::new(5), Ticks::new(105), Lots::ZERO, NOW)
        .unwrap();
    let before: Vec<(Ticks, Lots, usize)> = serv
        .market(market_id)
        .unwrap()
        .offer_side()
        .levels()
        .map(|l| (l.ticks(), l.lots(), l.count()))
        .collect();

    let resp = serv
        .create_order(&sym("GOSAYL"), market_id, "", Side::Sell, Lots::new(7), Ticks::new(106), Lots::ZERO, NOW + 1)
        .unwrap();
    serv.cancel_order(&sym("GOSAYL"), market_id, resp.orders[0].id, NOW + 2)
        .unwrap();

    let after: Vec<(Ticks, Lots, usize)> = serv
        .market(market_id)
        .unwrap()
        .offer_side()
        .levels()
        .map(|l| (l.ticks(), l.lots(), l.count()))
        .collect();
    assert_eq!(before, after);
    assert_book_invariants(&serv, market_id);
}

#[test]
fn test_exec_ring_bounded_under_load() {
    let mut serv = Serv::new(MemQueue::new(), 4);
    serv.load(&RefData, NOW).unwrap();
    let market_id = serv
        .create_market(&sym("EURUSD"), 0, MarketState::OPEN, NOW)
        .unwrap()
        .id();

    for i in 0..10 {
        let resp = serv
            .create_order(&sym("MARAYL"), market_id, "", Side::Buy, Lots::new(1), Ticks::new(100 + i), Lots::ZERO, NOW + i)
            .unwrap();
        serv.cancel_order(&sym("MARAYL"), market_id, resp.orders[0].id, NOW + i)
            .unwrap();
    }

    let accnt = serv.find_accnt(&sym("MARAYL")).unwrap();
    assert_eq!(accnt.exec_count(), 4);
    // Newest first: the last cancel leads the ring.
    let newest = accnt.execs().next().unwrap();
    assert_eq!(newest.state, State::Cancel);
}

#[test]
fn test_multi_level_sweep_keeps_invariants() {
    let (mut serv, market_id) = serv();

    serv.create_order(&sym("MARAYL"), market_id, "", Side::Sell, Lots::new(3), Ticks::new(100), Lots::ZERO, NOW)
        .unwrap();
    serv.create_order(&sym("PIPAYL"), market_id, "", Side::Sell, Lots::new(4), Ticks::new(101), Lots::ZERO, NOW + 1)
        .unwrap();
    serv.create_order(&sym("MARAYL"), market_id, "", Side::Sell, Lots::new(5), Ticks::new(102), Lots::ZERO, NOW + 2)
        .unwrap();

    let resp = serv
        .create_order(&sym("GOSAYL"), market_id, "", Side::Buy, Lots::new(9), Ticks::new(101), Lots::ZERO, NOW + 3)
        .unwrap();

    let taker = &resp.orders[0];
    assert_eq!(taker.exec_lots, Lots::new(7));
    assert_eq!(taker.resd_lots, Lots::new(2));
    assert_eq!(taker.exec_cost, Cost::new(3 * 100 + 4 * 101));

    // The 102 offer is untouched; the residual bid rests at 101.
    let market = serv.market(market_id).unwrap();
    assert_eq!(market.offer_side().best().unwrap().ticks(), Ticks::new(102));
    assert_eq!(market.bid_side().best().unwrap().lots(), Lots::new(2));
    assert_book_invariants(&serv, market_id);

    // Position sums across the sweep.
    let posn = serv.find_accnt(&sym("GOSAYL")).unwrap().posn(market_id).unwrap();
    assert_eq!(posn.net_lots, Lots::new(7));
    assert_eq!(posn.net_cost, Cost::new(3 * 100 + 4 * 101));
}

#[test]
fn test_maker_posn_snapshot_precedes_fill() {
    let (mut serv, market_id) = serv();

    // Maker sells 5, then his offer is lifted twice.
    serv.create_order(&sym("MARAYL"), market_id, "", Side::Sell, Lots::new(5), Ticks::new(100), Lots::ZERO, NOW)
        .unwrap();
    serv.create_order(&sym("GOSAYL"), market_id, "", Side::Buy, Lots::new(2), Ticks::new(100), Lots::ZERO, NOW + 1)
        .unwrap();
    serv.create_order(&sym("GOSAYL"), market_id, "", Side::Buy, Lots::new(3), Ticks::new(100), Lots::ZERO, NOW + 2)
        .unwrap();

    let maker = serv.find_accnt(&sym("MARAYL")).unwrap();
    let mut maker_trades: Vec<_> = maker.trades().collect();
    maker_trades.sort_by_key(|t| t.id);

    // First fill starts from a flat book position.
    assert_eq!(maker_trades[0].posn_lots, Lots::ZERO);
    assert_eq!(maker_trades[0].posn_cost, Cost::ZERO);
    // Second fill sees the position left by the first.
    assert_eq!(maker_trades[1].posn_lots, Lots::new(-2));
    assert_eq!(maker_trades[1].posn_cost, Cost::new(-200));
    assert_eq!(maker.posn(market_id).unwrap().net_lots, Lots::new(-5));
}
