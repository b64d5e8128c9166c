use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::error::LendingError;

pub const MAX_SYMBOL_LEN: usize = 10;
pub const MAX_NAME_LEN: usize = 32;

/// A synthetic asset registered with the market
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct SyntheticAsset {
    /// Ticker, unique within the market
    pub symbol: String,

    /// Display name
    pub name: String,

    /// SPL mint; mint authority is the market custody
    pub mint: Pubkey,

    /// Rate used until the exchange reports a trade
    /// (synthetic units per collateral unit, 18 decimals)
    pub default_rate: u128,

    /// Synthetic units owed to the treasury from offsets, pending burn
    pub unpaid_to_treasury: u128,
}

impl SyntheticAsset {
    pub const LEN: usize = (4 + MAX_SYMBOL_LEN) + (4 + MAX_NAME_LEN) + 32 + 16 + 16;

    pub fn new(
        symbol: String,
        name: String,
        mint: Pubkey,
        default_rate: u128,
    ) -> Result<Self, LendingError> {
        if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN || name.len() > MAX_NAME_LEN {
            return Err(LendingError::InvalidAssetSymbol);
        }
        if default_rate == 0 {
            return Err(LendingError::InvalidExchangeRate);
        }

        Ok(Self {
            symbol,
            name,
            mint,
            default_rate,
            unpaid_to_treasury: 0,
        })
    }
}

/// Which debts an offset applies to
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSelector {
    /// A single registered asset
    Asset(Pubkey),
    /// Every registered asset, in registration order
    All,
}

impl AssetSelector {
    pub fn includes(&self, mint: &Pubkey) -> bool {
        match self {
            AssetSelector::Asset(selected) => selected == mint,
            AssetSelector::All => true,
        }
    }
}
