//! Durable record union and the message-queue interface
//!
//! Every state change is journalled as one of these records before the
//! change becomes observable in memory. The queue's acceptance is the commit
//! boundary of the two-phase protocol: an `Ok` return means the records will
//! survive a crash.

use crate::date::{JDay, Time};
use crate::errors::Result;
use crate::exec::Exec;
use crate::ids::{Id64, Symbol};
use crate::market::MarketState;
use serde::{Deserialize, Serialize};

/// A journalled state change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Msg {
    CreateMarket {
        id: Id64,
        instr: Symbol,
        settl_day: JDay,
        state: MarketState,
    },
    UpdateMarket {
        id: Id64,
        state: MarketState,
    },
    CreateExec {
        exec: Exec,
    },
    ArchiveTrade {
        market_id: Id64,
        id: Id64,
        modified: Time,
    },
}

impl Msg {
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::CreateMarket { .. } => "create_market",
            Msg::UpdateMarket { .. } => "update_market",
            Msg::CreateExec { .. } => "create_exec",
            Msg::ArchiveTrade { .. } => "archive_trade",
        }
    }
}

/// Durable sink for state-changing records.
///
/// Implementations must not report `Ok` until the records are durably
/// accepted; the engine commits its in-memory state only after that point.
pub trait MsgQueue {
    fn create_market(&mut self, id: Id64, instr: &Symbol, settl_day: JDay, state: MarketState)
        -> Result<()>;

    fn update_market(&mut self, id: Id64, state: MarketState) -> Result<()>;

    /// Journal a batch of execs as one atomic submission.
    fn create_exec(&mut self, execs: &[Exec]) -> Result<()>;

    fn archive_trade(&mut self, market_id: Id64, ids: &[Id64], modified: Time) -> Result<()>;
}

/// In-memory queue. Buffers records without durability; used by tests and by
/// callers that drain the buffer into their own sink.
#[derive(Debug, Default)]
pub struct MemQueue {
    msgs: Vec<Msg>,
}

impl MemQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn msgs(&self) -> &[Msg] {
        &self.msgs
    }

    pub fn take(&mut self) -> Vec<Msg> {
        std::mem::take(&mut self.msgs)
    }
}

impl MsgQueue for MemQueue {
    fn create_market(
        &mut self,
        id: Id64,
        instr: &Symbol,
        settl_day: JDay,
        state: MarketState,
    ) -> Result<()> {
        self.msgs.push(Msg::CreateMarket {
            id,
            instr: instr.clone(),
            settl_day,
            state,
        });
        Ok(())
    }

    fn update_market(&mut self, id: Id64, state: MarketState) -> Result<()> {
        self.msgs.push(Msg::UpdateMarket { id, state });
        Ok(())
    }

    fn create_exec(&mut self, execs: &[Exec]) -> Result<()> {
        self.msgs
            .extend(execs.iter().cloned().map(|exec| Msg::CreateExec { exec }));
        Ok(())
    }

    fn archive_trade(&mut self, market_id: Id64, ids: &[Id64], modified: Time) -> Result<()> {
        self.msgs.extend(ids.iter().map(|&id| Msg::ArchiveTrade {
            market_id,
            id,
            modified,
        }));
        Ok(())
    }
}
