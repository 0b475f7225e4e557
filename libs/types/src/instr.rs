//! Instrument reference data
//!
//! Instruments are constructed at load and never mutated afterwards. The
//! fractional lot and tick sizes are display-only; the matching path deals
//! exclusively in integer lots and ticks.

use crate::ids::{Id32, Symbol};
use crate::numeric::Lots;
use serde::{Deserialize, Serialize};

/// Immutable instrument record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instr {
    pub id: Id32,
    pub symbol: Symbol,
    pub display: String,
    /// Underlying asset.
    pub base_asset: Symbol,
    /// Quote currency.
    pub term_ccy: Symbol,
    pub lot_numer: i32,
    pub lot_denom: i32,
    pub tick_numer: i32,
    pub tick_denom: i32,
    /// Decimal places displayed after the pip.
    pub pip_dp: i32,
    pub min_lots: Lots,
    pub max_lots: Lots,
}

impl Instr {
    /// Quantity represented by one lot. Display-only.
    pub fn qty_inc(&self) -> f64 {
        self.lot_numer as f64 / self.lot_denom as f64
    }

    /// Price represented by one tick. Display-only.
    pub fn price_inc(&self) -> f64 {
        self.tick_numer as f64 / self.tick_denom as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eurusd() -> Instr {
        Instr {
            id: Id32::new(12),
            symbol: Symbol::new("EURUSD"),
            display: "EURUSD".into(),
            base_asset: Symbol::new("EUR"),
            term_ccy: Symbol::new("USD"),
            lot_numer: 1000000,
            lot_denom: 1,
            tick_numer: 1,
            tick_denom: 10000,
            pip_dp: 4,
            min_lots: Lots::new(1),
            max_lots: Lots::new(10),
        }
    }

    #[test]
    fn test_increments() {
        let instr = eurusd();
        assert_eq!(instr.qty_inc(), 1000000.0);
        assert_eq!(instr.price_inc(), 0.0001);
    }

    #[test]
    fn test_instr_round_trip() {
        let instr = eurusd();
        let json = serde_json::to_string(&instr).unwrap();
        let back: Instr = serde_json::from_str(&json).unwrap();
        assert_eq!(instr, back);
    }
}
