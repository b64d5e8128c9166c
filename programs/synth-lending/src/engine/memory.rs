//! In-memory implementations of the engine seams, for driving the engine
//! off-chain. Amounts are kept at full 18-decimal precision unless a mint
//! is given a coarser precision with [`MemoryTokens::set_decimals`].

use std::collections::HashMap;

use solana_program::pubkey::Pubkey;

use crate::{
    engine::{RateSource, TokenGateway},
    error::LendingError,
    math::{rescale, WAD_DECIMALS},
};

/// Balances, allowances, supply and mint authority per mint
#[derive(Debug, Default)]
pub struct MemoryTokens {
    balances: HashMap<(Pubkey, Pubkey), u128>,
    allowances: HashMap<(Pubkey, Pubkey, Pubkey), u128>,
    supply: HashMap<Pubkey, u128>,
    authorities: HashMap<Pubkey, Pubkey>,
    decimals: HashMap<Pubkey, u8>,
}

impl MemoryTokens {
    /// Create `amount` out of thin air; supply grows with it
    pub fn credit(&mut self, mint: &Pubkey, owner: &Pubkey, amount: u128) {
        *self.balances.entry((*mint, *owner)).or_default() += amount;
        *self.supply.entry(*mint).or_default() += amount;
    }

    pub fn approve(&mut self, mint: &Pubkey, owner: &Pubkey, spender: &Pubkey, amount: u128) {
        self.allowances.insert((*mint, *owner, *spender), amount);
    }

    pub fn set_authority(&mut self, mint: &Pubkey, authority: &Pubkey) {
        self.authorities.insert(*mint, *authority);
    }

    pub fn authority(&self, mint: &Pubkey) -> Option<Pubkey> {
        self.authorities.get(mint).copied()
    }

    pub fn set_decimals(&mut self, mint: &Pubkey, decimals: u8) {
        self.decimals.insert(*mint, decimals);
    }

    fn debit(&mut self, mint: &Pubkey, owner: &Pubkey, amount: u128) -> Result<(), LendingError> {
        let balance = self.balances.entry((*mint, *owner)).or_default();
        if *balance < amount {
            return Err(LendingError::InsufficientBalance);
        }
        *balance -= amount;
        Ok(())
    }

    fn spend_allowance(
        &mut self,
        mint: &Pubkey,
        owner: &Pubkey,
        spender: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError> {
        let allowance = self.allowances.entry((*mint, *owner, *spender)).or_default();
        if *allowance < amount {
            return Err(LendingError::InsufficientAllowance);
        }
        *allowance -= amount;
        Ok(())
    }
}

impl TokenGateway for MemoryTokens {
    fn balance_of(&self, mint: &Pubkey, owner: &Pubkey) -> Result<u128, LendingError> {
        Ok(self.balances.get(&(*mint, *owner)).copied().unwrap_or(0))
    }

    fn allowance(
        &self,
        mint: &Pubkey,
        owner: &Pubkey,
        spender: &Pubkey,
    ) -> Result<u128, LendingError> {
        Ok(self
            .allowances
            .get(&(*mint, *owner, *spender))
            .copied()
            .unwrap_or(0))
    }

    fn total_supply(&self, mint: &Pubkey) -> Result<u128, LendingError> {
        Ok(self.supply.get(mint).copied().unwrap_or(0))
    }

    fn ensure_representable(&self, mint: &Pubkey, amount: u128) -> Result<(), LendingError> {
        let decimals = match self.decimals.get(mint) {
            Some(decimals) => *decimals,
            None => return Ok(()),
        };
        let units = rescale(amount, WAD_DECIMALS, decimals)?;
        if rescale(units, decimals, WAD_DECIMALS)? != amount {
            return Err(LendingError::AmountNotRepresentable);
        }
        Ok(())
    }

    fn transfer_from(
        &mut self,
        mint: &Pubkey,
        owner: &Pubkey,
        spender: &Pubkey,
        to: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError> {
        if self.allowance(mint, owner, spender)? < amount {
            return Err(LendingError::InsufficientAllowance);
        }
        self.debit(mint, owner, amount)?;
        self.spend_allowance(mint, owner, spender, amount)?;
        *self.balances.entry((*mint, *to)).or_default() += amount;
        Ok(())
    }

    fn transfer(
        &mut self,
        mint: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError> {
        self.debit(mint, from, amount)?;
        *self.balances.entry((*mint, *to)).or_default() += amount;
        Ok(())
    }

    fn mint_to(
        &mut self,
        mint: &Pubkey,
        authority: &Pubkey,
        to: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError> {
        if self.authorities.get(mint) != Some(authority) {
            return Err(LendingError::InvalidMintAuthority);
        }
        self.credit(mint, to, amount);
        Ok(())
    }

    fn burn_from(
        &mut self,
        mint: &Pubkey,
        owner: &Pubkey,
        spender: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError> {
        if self.allowance(mint, owner, spender)? < amount {
            return Err(LendingError::InsufficientAllowance);
        }
        self.debit(mint, owner, amount)?;
        self.spend_allowance(mint, owner, spender, amount)?;
        *self.supply.entry(*mint).or_default() -= amount;
        Ok(())
    }

    fn set_mint_authority(
        &mut self,
        mint: &Pubkey,
        current: &Pubkey,
        new_authority: &Pubkey,
    ) -> Result<(), LendingError> {
        if self.authorities.get(mint) != Some(current) {
            return Err(LendingError::InvalidMintAuthority);
        }
        self.authorities.insert(*mint, *new_authority);
        Ok(())
    }
}

/// Last trade per asset mint; absent means the pair has not traded
#[derive(Debug, Default)]
pub struct MemoryRates(HashMap<Pubkey, u128>);

impl MemoryRates {
    pub fn trade(&mut self, asset_mint: &Pubkey, rate: u128) {
        self.0.insert(*asset_mint, rate);
    }
}

impl RateSource for MemoryRates {
    fn latest_rate(
        &self,
        _collateral_mint: &Pubkey,
        asset_mint: &Pubkey,
    ) -> Result<Option<u128>, LendingError> {
        Ok(self.0.get(asset_mint).copied())
    }
}
