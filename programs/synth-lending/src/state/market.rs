use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    state::{FeeSchedule, MarketWiring, RiskParameters, SyntheticAsset},
};

pub const MARKET_SEED: &[u8] = b"lending_market";
pub const CUSTODY_SEED: &[u8] = b"custody";

pub const MAX_ASSETS: usize = 16;
pub const MAX_OPERATORS: usize = 4;

/// Global state of one engine instance
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct LendingMarket {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized flag
    pub is_initialized: bool,

    /// Instance generation, part of the market PDA seeds
    pub generation: u8,

    /// Market PDA bump
    pub bump: u8,

    /// Custody PDA: owns collateral vaults, signs mints and transfers
    pub custody: Pubkey,
    pub custody_bump: u8,

    /// Addresses fixed at construction
    pub wiring: MarketWiring,

    /// Privileged operators
    pub operators: Vec<Pubkey>,

    /// Destination of profit transfers
    pub bank: Option<Pubkey>,

    pub fees: FeeSchedule,
    pub risk: RiskParameters,

    /// Registered synthetic assets, append-only, in registration order
    pub assets: Vec<SyntheticAsset>,

    /// Accumulated protocol revenue in collateral units
    pub profit: u128,

    /// Instance this one was migrated from
    pub predecessor: Option<Pubkey>,

    /// Forwarding pointer, set once by migration
    pub successor: Option<Pubkey>,
}

impl LendingMarket {
    pub const DISCRIMINATOR: [u8; 8] = [76, 69, 78, 68, 95, 77, 75, 84]; // "LEND_MKT"

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        1 + // generation
        1 + // bump
        32 + // custody
        1 + // custody_bump
        MarketWiring::LEN +
        4 + (MAX_OPERATORS * 32) + // operators
        33 + // bank
        FeeSchedule::LEN +
        RiskParameters::LEN +
        4 + (MAX_ASSETS * SyntheticAsset::LEN) + // assets
        16 + // profit
        33 + // predecessor
        33 + // successor
        128; // padding

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        generation: u8,
        bump: u8,
        custody: Pubkey,
        custody_bump: u8,
        wiring: MarketWiring,
        operator: Pubkey,
        predecessor: Option<Pubkey>,
    ) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            generation,
            bump,
            custody,
            custody_bump,
            wiring,
            operators: vec![operator],
            bank: None,
            fees: FeeSchedule::default(),
            risk: RiskParameters::default(),
            assets: Vec::new(),
            profit: 0,
            predecessor,
            successor: None,
        }
    }

    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.discriminator != Self::DISCRIMINATOR {
            return Err(ProgramError::InvalidAccountData);
        }

        if !self.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }

        Ok(())
    }

    pub fn collateral_mint(&self) -> &Pubkey {
        &self.wiring.collateral_mint
    }

    pub fn is_operator(&self, key: &Pubkey) -> bool {
        self.operators.contains(key)
    }

    pub fn is_migrated(&self) -> bool {
        self.successor.is_some()
    }

    /// Reject mutation once a forwarding pointer has been set
    pub fn ensure_active(&self) -> Result<(), LendingError> {
        if self.is_migrated() {
            return Err(LendingError::MarketMigrated);
        }
        Ok(())
    }

    pub fn asset(&self, mint: &Pubkey) -> Result<&SyntheticAsset, LendingError> {
        self.assets
            .iter()
            .find(|asset| asset.mint == *mint)
            .ok_or(LendingError::UnknownAsset)
    }

    pub fn asset_mut(&mut self, mint: &Pubkey) -> Result<&mut SyntheticAsset, LendingError> {
        self.assets
            .iter_mut()
            .find(|asset| asset.mint == *mint)
            .ok_or(LendingError::UnknownAsset)
    }

    pub fn asset_by_symbol(&self, symbol: &str) -> Option<&SyntheticAsset> {
        self.assets.iter().find(|asset| asset.symbol == symbol)
    }

    pub fn unpaid_to_treasury(&self, mint: &Pubkey) -> Result<u128, LendingError> {
        Ok(self.asset(mint)?.unpaid_to_treasury)
    }

    /// Append an asset, keeping symbols and mints unique
    pub fn register_asset(&mut self, asset: SyntheticAsset) -> Result<usize, LendingError> {
        if self.asset_by_symbol(&asset.symbol).is_some() {
            return Err(LendingError::DuplicateAssetSymbol);
        }
        if self.asset(&asset.mint).is_ok() {
            return Err(LendingError::DuplicateAssetSymbol);
        }
        if self.assets.len() >= MAX_ASSETS {
            return Err(LendingError::AssetRegistryFull);
        }

        self.assets.push(asset);
        Ok(self.assets.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> LendingMarket {
        let wiring = MarketWiring {
            collateral_mint: Pubkey::new_unique(),
            treasury: Pubkey::new_unique(),
            exchange_program: Pubkey::new_unique(),
        };
        LendingMarket::new(0, 255, Pubkey::new_unique(), 254, wiring, Pubkey::new_unique(), None)
    }

    #[test]
    fn test_register_asset_keeps_order_and_uniqueness() {
        let mut market = market();
        let usx = SyntheticAsset::new("USX".into(), "USXToken".into(), Pubkey::new_unique(), 1).unwrap();
        let twx = SyntheticAsset::new("TWX".into(), "TWXToken".into(), Pubkey::new_unique(), 1).unwrap();

        assert_eq!(market.register_asset(usx.clone()).unwrap(), 0);
        assert_eq!(market.register_asset(twx).unwrap(), 1);

        let again = SyntheticAsset::new("USX".into(), "testToken".into(), Pubkey::new_unique(), 1).unwrap();
        assert_eq!(market.register_asset(again), Err(LendingError::DuplicateAssetSymbol));
        assert_eq!(market.assets[0].mint, usx.mint);
        assert_eq!(market.assets.len(), 2);
    }

    #[test]
    fn test_serialized_market_fits_account() {
        let mut market = market();
        for i in 0..MAX_ASSETS {
            let asset = SyntheticAsset::new(
                format!("SYM{:07}", i),
                "N".repeat(32),
                Pubkey::new_unique(),
                1,
            )
            .unwrap();
            market.register_asset(asset).unwrap();
        }
        while market.operators.len() < MAX_OPERATORS {
            market.operators.push(Pubkey::new_unique());
        }
        market.bank = Some(Pubkey::new_unique());
        market.predecessor = Some(Pubkey::new_unique());
        market.successor = Some(Pubkey::new_unique());

        let data = market.try_to_vec().unwrap();
        assert!(data.len() <= LendingMarket::LEN);
    }

    #[test]
    fn test_migrated_market_is_frozen() {
        let mut market = market();
        assert!(market.ensure_active().is_ok());
        market.successor = Some(Pubkey::new_unique());
        assert_eq!(market.ensure_active(), Err(LendingError::MarketMigrated));
    }
}
