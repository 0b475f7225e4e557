//! Dump the engine model rebuilt from a journal directory.
//!
//! Loads reference data and the journal into a fresh engine, then emits
//! the full model as one JSON object, or as delimited rows with `--delim`.

use anyhow::{Context, Result};
use clap::Parser;
use matching_engine::market::VIEW_DEPTH;
use matching_engine::Serv;
use persistence::JournalModel;
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use types::asset::Asset;
use types::instr::Instr;
use types::msg::MemQueue;

#[derive(Parser)]
#[command(name = "dump", about = "Dump the engine model rebuilt from a journal")]
struct Args {
    /// Journal directory.
    #[arg(long, default_value = "journal")]
    journal: PathBuf,

    /// Reference data file holding assets and contrs.
    #[arg(long, default_value = "refdata.json")]
    refdata: PathBuf,

    /// Exec ring capacity per account.
    #[arg(long, default_value_t = 1000)]
    max_execs: usize,

    /// Emit orders, trades and posns as delimited rows instead of JSON.
    #[arg(long)]
    delim: Option<char>,
}

#[derive(Deserialize)]
struct RefData {
    assets: Vec<Asset>,
    contrs: Vec<Instr>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let raw = fs::read(&args.refdata)
        .with_context(|| format!("reading {}", args.refdata.display()))?;
    let refdata: RefData = serde_json::from_slice(&raw)
        .with_context(|| format!("parsing {}", args.refdata.display()))?;

    let model = JournalModel::open(&args.journal, refdata.assets, refdata.contrs)
        .with_context(|| format!("replaying {}", args.journal.display()))?;

    let now = chrono::Utc::now().timestamp_millis();
    let mut serv = Serv::new(MemQueue::new(), args.max_execs);
    serv.load(&model, now)?;

    match args.delim {
        Some(delim) => print_dsv(&serv, delim),
        None => print_json(&serv)?,
    }
    Ok(())
}

fn print_json(serv: &Serv<MemQueue>) -> Result<()> {
    let doc = json!({
        "assets": serv.assets().values().collect::<Vec<_>>(),
        "contrs": serv.instrs().values().collect::<Vec<_>>(),
        "markets": serv
            .markets()
            .values()
            .map(|market| market.view(VIEW_DEPTH))
            .collect::<Vec<_>>(),
        "traders": serv
            .accnts()
            .keys()
            .map(|symbol| json!({ "symbol": symbol }))
            .collect::<Vec<_>>(),
        "orders": serv
            .markets()
            .values()
            .flat_map(|market| market.orders())
            .collect::<Vec<_>>(),
        "trades": serv
            .accnts()
            .values()
            .flat_map(|accnt| accnt.trades())
            .collect::<Vec<_>>(),
        "posns": serv
            .accnts()
            .values()
            .flat_map(|accnt| accnt.posns())
            .collect::<Vec<_>>(),
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn print_dsv(serv: &Serv<MemQueue>, delim: char) {
    let mut row = String::new();
    for market in serv.markets().values() {
        for order in market.orders() {
            row.clear();
            order.to_dsv(&mut row, delim);
            println!("{row}");
        }
    }
    for accnt in serv.accnts().values() {
        for trade in accnt.trades() {
            row.clear();
            trade.to_dsv(&mut row, delim);
            println!("{row}");
        }
        for posn in accnt.posns() {
            row.clear();
            posn.to_dsv(&mut row, delim);
            println!("{row}");
        }
    }
}
