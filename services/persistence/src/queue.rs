//! Durable message queue over the journal writer
//!
//! Implements the engine's `MsgQueue` interface synchronously: a batch is
//! framed, written and fsynced before `Ok` returns, so the engine's commit
//! phase only ever runs against records that will survive a crash.

use crate::journal::{FsyncPolicy, JournalConfig, JournalError, JournalWriter};
use std::path::Path;
use tracing::debug;
use types::date::{JDay, Time};
use types::errors::{Error, Result};
use types::exec::Exec;
use types::ids::{Id64, Symbol};
use types::market::MarketState;
use types::msg::{Msg, MsgQueue};

pub struct JournalQueue {
    writer: JournalWriter,
}

impl JournalQueue {
    /// Open a durable queue over journal files in `dir`.
    pub fn open(dir: &Path) -> std::result::Result<Self, JournalError> {
        // One fsync per batch in submit(), not one per record.
        let config = JournalConfig {
            fsync_policy: FsyncPolicy::OnRotation,
            ..JournalConfig::new(dir)
        };
        Ok(Self {
            writer: JournalWriter::open(config)?,
        })
    }

    /// Write a batch and fsync once. `Ok` means durably accepted.
    fn submit(&mut self, msgs: &[(Msg, Time)]) -> Result<()> {
        for (msg, time) in msgs {
            self.writer
                .append_msg(msg, *time)
                .map_err(|err| Error::Journal(err.to_string()))?;
        }
        self.writer
            .sync()
            .map_err(|err| Error::Journal(err.to_string()))?;
        debug!(records = msgs.len(), "journal batch accepted");
        Ok(())
    }
}

impl MsgQueue for JournalQueue {
    fn create_market(
        &mut self,
        id: Id64,
        instr: &Symbol,
        settl_day: JDay,
        state: MarketState,
    ) -> Result<()> {
        self.submit(&[(
            Msg::CreateMarket {
                id,
                instr: instr.clone(),
                settl_day,
                state,
            },
            0,
        )])
    }

    fn update_market(&mut self, id: Id64, state: MarketState) -> Result<()> {
        self.submit(&[(Msg::UpdateMarket { id, state }, 0)])
    }

    fn create_exec(&mut self, execs: &[Exec]) -> Result<()> {
        let msgs: Vec<(Msg, Time)> = execs
            .iter()
            .map(|exec| (Msg::CreateExec { exec: exec.clone() }, exec.created))
            .collect();
        self.submit(&msgs)
    }

    fn archive_trade(&mut self, market_id: Id64, ids: &[Id64], modified: Time) -> Result<()> {
        let msgs: Vec<(Msg, Time)> = ids
            .iter()
            .map(|&id| {
                (
                    Msg::ArchiveTrade {
                        market_id,
                        id,
                        modified,
                    },
                    modified,
                )
            })
            .collect();
        self.submit(&msgs)
    }
}
