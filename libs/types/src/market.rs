//! Market state word and persistence record

use crate::date::JDay;
use crate::ids::{Id64, Symbol};
use serde::{Deserialize, Serialize};

/// Market state flags. Zero is the default open state; interpretation of
/// further bits belongs to the boundary layer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MarketState(u32);

impl MarketState {
    pub const OPEN: MarketState = MarketState(0);

    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// Persistence-facing market record.
///
/// `last_exec_id` is the highest execution id allocated in the market, so a
/// reloaded market resumes its monotonic counter without reuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRec {
    pub id: Id64,
    pub instr: Symbol,
    pub settl_day: JDay,
    pub state: MarketState,
    pub last_exec_id: Id64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_default_open() {
        assert_eq!(MarketState::default(), MarketState::OPEN);
        assert_eq!(MarketState::new(3).bits(), 3);
    }
}
