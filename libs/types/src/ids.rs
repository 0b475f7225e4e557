//! Identifier types for engine entities
//!
//! Ids are positive integers allocated from monotonic per-market counters,
//! so they are stable across restarts and cheap to index on. Market ids are
//! composed deterministically from the instrument id and settlement day.

use crate::date::{jd_to_tjd, JDay};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// 32-bit identifier, used for instrument ids.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id32(i32);

impl Id32 {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    pub const fn count(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Id32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 64-bit identifier, used for markets, orders and executions.
///
/// Zero is the sentinel for "no id": a manual trade has `order_id` zero and
/// a non-trade execution has `match_id` zero.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id64(i64);

impl Id64 {
    pub const ZERO: Id64 = Id64(0);

    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn count(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Id64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compose a market id from an instrument id and settlement day.
///
/// The high bits hold the instrument id and the low 16 bits hold the
/// truncated Julian day of settlement (days since JD 2440000). A settlement
/// day of zero means spot and contributes zero low bits, so the mapping is a
/// bijection over the modern date range and the id is stable across
/// restarts.
pub fn to_market_id(instr_id: Id32, settl_day: JDay) -> Id64 {
    let hi = (instr_id.count() as i64) << 16;
    let lo = if settl_day != 0 {
        (jd_to_tjd(settl_day) as i64) & 0xffff
    } else {
        0
    };
    Id64::new(hi | lo)
}

/// Symbol: mnemonic identifier for assets, instruments and accounts.
///
/// Symbols match `^[0-9A-Za-z\-._]{3,16}$`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol.
    ///
    /// # Panics
    /// Panics if the symbol violates the grammar.
    pub fn new(symbol: impl Into<String>) -> Self {
        let s = symbol.into();
        assert!(is_symbol(&s), "invalid symbol '{s}'");
        Self(s)
    }

    /// Try to create a Symbol, returning None if invalid.
    pub fn try_new(symbol: impl Into<String>) -> Option<Self> {
        let s = symbol.into();
        is_symbol(&s).then_some(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Check a candidate against the symbol grammar.
pub fn is_symbol(s: &str) -> bool {
    (3..=16).contains(&s.len())
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_'))
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Symbol::try_new(s).ok_or_else(|| serde::de::Error::custom("invalid symbol"))
    }
}
