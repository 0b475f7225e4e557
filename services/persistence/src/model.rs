//! Replay model: folds journal records back into engine-loadable views
//!
//! Reference data is seeded at construction; everything else is derived
//! from the record stream. Each exec carries a full post-operation order
//! snapshot, so the latest exec per (market, order) *is* the order state:
//! live orders are those with residual lots, trades are trade execs minus
//! archived ids, positions are the signed sums over trade execs, and every
//! market's exec counter resumes past the highest id seen.

use crate::reader::{JournalReader, ReaderError};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;
use tracing::info;
use types::asset::Asset;
use types::date::{JDay, Time};
use types::errors::Result;
use types::exec::Exec;
use types::ids::{Id64, Symbol};
use types::instr::Instr;
use types::market::MarketRec;
use types::model::Model;
use types::msg::Msg;
use types::order::{Order, State};
use types::posn::Posn;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("reader error: {0}")]
    Reader(#[from] ReaderError),

    #[error("inconsistent journal: {0}")]
    State(String),
}

/// A model rebuilt from journal records over seeded reference data.
pub struct JournalModel {
    assets: Vec<Asset>,
    instrs: Vec<Instr>,
    markets: BTreeMap<Id64, MarketRec>,
    orders: BTreeMap<(Id64, Id64), Order>,
    execs: Vec<Exec>,
    trades: BTreeMap<(Id64, Id64), Exec>,
    archived: BTreeSet<(Id64, Id64)>,
    posns: BTreeMap<(Symbol, Id64), Posn>,
}

impl JournalModel {
    /// Replay every record under `dir`. Corruption and sequence gaps are
    /// fatal: the engine must not load from a broken journal.
    pub fn open(
        dir: &Path,
        assets: Vec<Asset>,
        instrs: Vec<Instr>,
    ) -> std::result::Result<Self, ModelError> {
        let msgs = JournalReader::open(dir)?.read_msgs()?;
        let mut model = Self {
            assets,
            instrs,
            markets: BTreeMap::new(),
            orders: BTreeMap::new(),
            execs: Vec::new(),
            trades: BTreeMap::new(),
            archived: BTreeSet::new(),
            posns: BTreeMap::new(),
        };
        let count = msgs.len();
        for msg in msgs {
            model.apply(msg)?;
        }
        info!(
            records = count,
            markets = model.markets.len(),
            orders = model.orders.len(),
            "journal replayed"
        );
        Ok(model)
    }

    fn apply(&mut self, msg: Msg) -> std::result::Result<(), ModelError> {
        match msg {
            Msg::CreateMarket {
                id,
                instr,
                settl_day,
                state,
            } => {
                self.markets.insert(
                    id,
                    MarketRec {
                        id,
                        instr,
                        settl_day,
                        state,
                        last_exec_id: Id64::ZERO,
                    },
                );
            }
            Msg::UpdateMarket { id, state } => {
                let rec = self
                    .markets
                    .get_mut(&id)
                    .ok_or_else(|| ModelError::State(format!("update for unknown market '{id}'")))?;
                rec.state = state;
            }
            Msg::CreateExec { exec } => self.apply_exec(exec)?,
            Msg::ArchiveTrade { market_id, id, .. } => {
                self.trades.remove(&(market_id, id));
                self.archived.insert((market_id, id));
            }
        }
        Ok(())
    }

    fn apply_exec(&mut self, exec: Exec) -> std::result::Result<(), ModelError> {
        let rec = self.markets.get_mut(&exec.market_id).ok_or_else(|| {
            ModelError::State(format!("exec for unknown market '{}'", exec.market_id))
        })?;
        rec.last_exec_id = rec.last_exec_id.max(exec.id);

        if !exec.order_id.is_zero() {
            match self.orders.entry((exec.market_id, exec.order_id)) {
                Entry::Vacant(vacant) => {
                    vacant.insert(order_from_exec(&exec));
                }
                Entry::Occupied(mut occupied) => update_order(occupied.get_mut(), &exec),
            }
        }

        if exec.state == State::Trade {
            let key = (exec.market_id, exec.id);
            if !self.archived.contains(&key) {
                self.trades.insert(key, exec.clone());
            }
            self.posns
                .entry((exec.accnt.clone(), exec.market_id))
                .or_insert_with(|| {
                    Posn::new(
                        exec.accnt.clone(),
                        exec.market_id,
                        exec.instr.clone(),
                        exec.settl_day,
                    )
                })
                .add_trade(exec.side, exec.last_lots, exec.last_ticks);
        }

        self.execs.push(exec);
        Ok(())
    }
}

/// The first exec of an order is its creation snapshot.
fn order_from_exec(exec: &Exec) -> Order {
    Order {
        accnt: exec.accnt.clone(),
        market_id: exec.market_id,
        instr: exec.instr.clone(),
        settl_day: exec.settl_day,
        id: exec.order_id,
        ref_: exec.ref_.clone(),
        state: exec.state,
        side: exec.side,
        lots: exec.lots,
        ticks: exec.ticks,
        resd_lots: exec.resd_lots,
        exec_lots: exec.exec_lots,
        exec_cost: exec.exec_cost,
        last_lots: exec.last_lots,
        last_ticks: exec.last_ticks,
        min_lots: exec.min_lots,
        created: exec.created,
        modified: exec.created,
    }
}

/// Later execs carry the post-operation order state.
fn update_order(order: &mut Order, exec: &Exec) {
    order.state = exec.state;
    order.lots = exec.lots;
    order.resd_lots = exec.resd_lots;
    order.exec_lots = exec.exec_lots;
    order.exec_cost = exec.exec_cost;
    order.last_lots = exec.last_lots;
    order.last_ticks = exec.last_ticks;
    order.modified = exec.created;
}

impl Model for JournalModel {
    fn read_assets(&self) -> Result<Vec<Asset>> {
        Ok(self.assets.clone())
    }

    fn read_instrs(&self) -> Result<Vec<Instr>> {
        Ok(self.instrs.clone())
    }

    fn read_markets(&self) -> Result<Vec<MarketRec>> {
        Ok(self.markets.values().cloned().collect())
    }

    fn read_orders(&self) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .values()
            .filter(|order| !order.resd_lots.is_zero())
            .cloned()
            .collect())
    }

    fn read_execs(&self, since: Time) -> Result<Vec<Exec>> {
        Ok(self
            .execs
            .iter()
            .rev() // journal order is oldest first
            .filter(|exec| exec.created >= since)
            .cloned()
            .collect())
    }

    fn read_trades(&self) -> Result<Vec<Exec>> {
        Ok(self.trades.values().cloned().collect())
    }

    fn read_posns(&self, _bus_day: JDay) -> Result<Vec<Posn>> {
        Ok(self.posns.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::exec::LiqInd;
    use types::market::MarketState;
    use types::numeric::{cost, Cost, Lots, Ticks};
    use types::order::Side;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    fn empty_model() -> JournalModel {
        JournalModel {
            assets: Vec::new(),
            instrs: Vec::new(),
            markets: BTreeMap::new(),
            orders: BTreeMap::new(),
            execs: Vec::new(),
            trades: BTreeMap::new(),
            archived: BTreeSet::new(),
            posns: BTreeMap::new(),
        }
    }

    fn create_market(model: &mut JournalModel, id: Id64) {
        model
            .apply(Msg::CreateMarket {
                id,
                instr: sym("EURUSD"),
                settl_day: 0,
                state: MarketState::OPEN,
            })
            .unwrap();
    }

    fn new_order_exec(market_id: Id64, order_id: i64, exec_id: i64, side: Side, lots: i64, ticks: i64) -> Exec {
        let order = Order::new(
            sym("MARAYL"),
            market_id,
            sym("EURUSD"),
            0,
            Id64::new(order_id),
            "",
            side,
            Lots::new(lots),
            Ticks::new(ticks),
            Lots::ZERO,
            1521514800000,
        );
        Exec::from_order(&order, Id64::new(exec_id), 1521514800000)
    }

    #[test]
    fn test_order_state_is_latest_exec() {
        let mut model = empty_model();
        let market_id = Id64::new(0xab0000);
        create_market(&mut model, market_id);

        let new_exec = new_order_exec(market_id, 1, 1, Side::Buy, 10, 100);
        model.apply(Msg::CreateExec { exec: new_exec.clone() }).unwrap();

        let mut trade = new_exec.clone();
        trade.id = Id64::new(2);
        trade.trade(
            Lots::new(4),
            cost(Lots::new(4), Ticks::new(100)),
            Lots::new(4),
            Ticks::new(100),
            Id64::new(3),
            LiqInd::Taker,
            sym("GOSAYL"),
        );
        model.apply(Msg::CreateExec { exec: trade }).unwrap();

        let orders = model.read_orders().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].resd_lots, Lots::new(6));
        assert_eq!(orders[0].exec_lots, Lots::new(4));
        assert_eq!(model.markets.get(&market_id).unwrap().last_exec_id, Id64::new(2));

        let posns = model.read_posns(0).unwrap();
        assert_eq!(posns.len(), 1);
        assert_eq!(posns[0].net_lots, Lots::new(4));
        assert_eq!(posns[0].net_cost, Cost::new(400));
    }

    #[test]
    fn test_cancelled_order_not_live() {
        let mut model = empty_model();
        let market_id = Id64::new(0xab0000);
        create_market(&mut model, market_id);

        let new_exec = new_order_exec(market_id, 1, 1, Side::Buy, 10, 100);
        model.apply(Msg::CreateExec { exec: new_exec.clone() }).unwrap();
        let mut cancel = new_exec;
        cancel.id = Id64::new(2);
        cancel.cancel();
        model.apply(Msg::CreateExec { exec: cancel }).unwrap();

        assert!(model.read_orders().unwrap().is_empty());
    }

    #[test]
    fn test_archive_removes_trade() {
        let mut model = empty_model();
        let market_id = Id64::new(0xab0000);
        create_market(&mut model, market_id);

        let mut trade = new_order_exec(market_id, 1, 1, Side::Sell, 5, 100);
        trade.trade(
            Lots::new(5),
            cost(Lots::new(5), Ticks::new(100)),
            Lots::new(5),
            Ticks::new(100),
            Id64::new(2),
            LiqInd::Maker,
            sym("GOSAYL"),
        );
        model.apply(Msg::CreateExec { exec: trade }).unwrap();
        assert_eq!(model.read_trades().unwrap().len(), 1);

        model
            .apply(Msg::ArchiveTrade {
                market_id,
                id: Id64::new(1),
                modified: 1521514800100,
            })
            .unwrap();
        assert!(model.read_trades().unwrap().is_empty());
        // The archived trade still counts toward the position.
        assert_eq!(model.read_posns(0).unwrap()[0].net_lots, Lots::new(-5));
    }

    #[test]
    fn test_exec_window_newest_first() {
        let mut model = empty_model();
        let market_id = Id64::new(0xab0000);
        create_market(&mut model, market_id);

        for i in 1..=3i64 {
            let mut exec = new_order_exec(market_id, i, i, Side::Buy, 1, 100);
            exec.created = 1521514800000 + i * 1000;
            model.apply(Msg::CreateExec { exec }).unwrap();
        }

        let execs = model.read_execs(1521514802000).unwrap();
        let ids: Vec<_> = execs.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![Id64::new(3), Id64::new(2)]);
    }

    #[test]
    fn test_exec_for_unknown_market_is_fatal() {
        let mut model = empty_model();
        let exec = new_order_exec(Id64::new(0xab0000), 1, 1, Side::Buy, 1, 100);
        assert!(matches!(
            model.apply(Msg::CreateExec { exec }),
            Err(ModelError::State(_))
        ));
    }
}
