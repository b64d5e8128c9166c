//! Seams to the external collaborators: token programs and the exchange.
//!
//! All amounts crossing these traits are 18-decimal ledger amounts; the
//! implementation is responsible for scaling to on-chain token units.

use solana_program::pubkey::Pubkey;

use crate::error::LendingError;

/// Fungible token operations the engine relies on. Both the collateral
/// token and every synthetic asset are reached through this trait; the
/// engine's own holdings are those owned by the market custody.
pub trait TokenGateway {
    fn balance_of(&self, mint: &Pubkey, owner: &Pubkey) -> Result<u128, LendingError>;

    /// Amount `owner` has approved `spender` to move
    fn allowance(&self, mint: &Pubkey, owner: &Pubkey, spender: &Pubkey)
        -> Result<u128, LendingError>;

    fn total_supply(&self, mint: &Pubkey) -> Result<u128, LendingError>;

    /// Fails with `AmountNotRepresentable` when `amount` carries precision
    /// the mint cannot hold. Full-precision ledgers accept everything.
    fn ensure_representable(&self, _mint: &Pubkey, _amount: u128) -> Result<(), LendingError> {
        Ok(())
    }

    /// Move `amount` out of `owner` on the strength of its approval to `spender`
    fn transfer_from(
        &mut self,
        mint: &Pubkey,
        owner: &Pubkey,
        spender: &Pubkey,
        to: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError>;

    /// Move `amount` out of an account the program controls (a custody)
    fn transfer(
        &mut self,
        mint: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError>;

    /// Mint as `authority`
    fn mint_to(
        &mut self,
        mint: &Pubkey,
        authority: &Pubkey,
        to: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError>;

    /// Burn out of `owner` on the strength of its approval to `spender`
    fn burn_from(
        &mut self,
        mint: &Pubkey,
        owner: &Pubkey,
        spender: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError>;

    fn set_mint_authority(
        &mut self,
        mint: &Pubkey,
        current: &Pubkey,
        new_authority: &Pubkey,
    ) -> Result<(), LendingError>;
}

/// Most recent executed trade rate between the collateral and an asset,
/// expressed as asset units per collateral unit. `Ok(None)` before any trade;
/// an error when the source cannot tell, such as a feed that was not supplied.
pub trait RateSource {
    fn latest_rate(
        &self,
        collateral_mint: &Pubkey,
        asset_mint: &Pubkey,
    ) -> Result<Option<u128>, LendingError>;
}

/// A rate source that never has trades; every price falls back to defaults
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTrades;

impl RateSource for NoTrades {
    fn latest_rate(
        &self,
        _collateral_mint: &Pubkey,
        _asset_mint: &Pubkey,
    ) -> Result<Option<u128>, LendingError> {
        Ok(None)
    }
}
