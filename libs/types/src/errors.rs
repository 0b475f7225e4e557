//! Error taxonomy for the matching engine
//!
//! Each failure class maps to exactly one HTTP status at the boundary.
//! Nothing is retried inside the core: reserve-phase failures leave state
//! untouched, and a journal failure is surfaced after the reserve phase has
//! been unwound.

use crate::date::IsoDate;
use crate::ids::{Id64, Symbol};
use crate::numeric::Lots;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("{0}")]
    Invalid(String),

    #[error("invalid lots '{0}'")]
    InvalidLots(Lots),

    #[error("order '{0}' already exists")]
    RefAlreadyExists(String),

    #[error("market '{0}' does not exist")]
    MarketNotFound(Id64),

    #[error("instrument '{0}' does not exist")]
    InstrNotFound(Symbol),

    #[error("order '{0}' does not exist")]
    OrderNotFound(String),

    #[error("trade '{0}' does not exist")]
    TradeNotFound(Id64),

    #[error("market for '{instr}' on {settl_date} has closed")]
    MarketClosed { instr: Symbol, settl_date: IsoDate },

    #[error("market for '{instr}' on {settl_date} already exists")]
    AlreadyExists { instr: Symbol, settl_date: IsoDate },

    #[error("order '{0}' is done")]
    TooLate(Id64),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("journal rejected batch: {0}")]
    Journal(String),

    #[error("database: {0}")]
    Database(String),
}

impl Error {
    /// HTTP status for the boundary layer.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Invalid(_)
            | Error::InvalidLots(_)
            | Error::RefAlreadyExists(_)
            | Error::MarketClosed { .. }
            | Error::AlreadyExists { .. }
            | Error::TooLate(_) => 400,
            Error::Unauthorized => 401,
            Error::Forbidden => 403,
            Error::MarketNotFound(_)
            | Error::InstrNotFound(_)
            | Error::OrderNotFound(_)
            | Error::TradeNotFound(_) => 404,
            Error::Journal(_) | Error::Database(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
