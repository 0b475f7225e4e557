//! Asset reference data
//!
//! Assets are constructed at load and never mutated afterwards.

use crate::ids::Symbol;
use serde::{Deserialize, Serialize};

/// Asset class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetType {
    Commodity,
    Corporate,
    Currency,
    Equity,
    Government,
    Index,
}

/// Immutable asset record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: Symbol,
    pub display: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
}

impl Asset {
    pub fn new(symbol: Symbol, display: impl Into<String>, asset_type: AssetType) -> Self {
        Self {
            symbol,
            display: display.into(),
            asset_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_serialization() {
        let asset = Asset::new(Symbol::new("EUR"), "Euro Member Countries, Euro", AssetType::Currency);
        let json = serde_json::to_string(&asset).unwrap();
        assert_eq!(
            json,
            "{\"symbol\":\"EUR\",\"display\":\"Euro Member Countries, Euro\",\"type\":\"CURRENCY\"}"
        );
        let back: Asset = serde_json::from_str(&json).unwrap();
        assert_eq!(asset, back);
    }
}
