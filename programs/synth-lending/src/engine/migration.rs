//! One-way handoff from this market to a successor deployed with
//! `predecessor` pointing back here.
//!
//! `migrate` moves the market-level state once and sets the forwarding
//! pointer, after which this market rejects every mutation. Books then move
//! one at a time through `migrate_amount_book`; a book lives in exactly one
//! market at any point, so partial migration never double counts.

use solana_program::{msg, pubkey::Pubkey};

use crate::{
    engine::{Caller, LendingEngine, RateSource, TokenGateway},
    error::LendingError,
    state::{AmountBook, LendingMarket},
};

impl<'a, T: TokenGateway, R: RateSource> LendingEngine<'a, T, R> {
    pub fn migrate(
        &mut self,
        caller: &Caller,
        new_market_key: &Pubkey,
        new_market: &mut LendingMarket,
    ) -> Result<(), LendingError> {
        if self.market.is_migrated() {
            return Err(LendingError::AlreadyMigrated);
        }
        self.require_operator(caller)?;

        if new_market.predecessor != Some(self.market_key)
            || new_market.collateral_mint() != self.market.collateral_mint()
            || !new_market.assets.is_empty()
        {
            return Err(LendingError::MigrationTargetMismatch);
        }
        new_market.ensure_active()?;

        let old_custody = self.market.custody;
        let new_custody = new_market.custody;

        // Retained synthetic balances follow the mint authority
        for asset in self.market.assets.iter() {
            let retained = self.tokens.balance_of(&asset.mint, &old_custody)?;
            if retained > 0 {
                self.tokens
                    .transfer(&asset.mint, &old_custody, &new_custody, retained)?;
            }
            self.tokens
                .set_mint_authority(&asset.mint, &old_custody, &new_custody)?;
        }

        let collateral_mint = *self.market.collateral_mint();
        if self.market.profit > 0 {
            self.tokens.transfer(
                &collateral_mint,
                &old_custody,
                &new_custody,
                self.market.profit,
            )?;
        }

        new_market.assets = self.market.assets.clone();
        new_market.profit = self.market.profit;
        self.market.profit = 0;
        for asset in self.market.assets.iter_mut() {
            asset.unpaid_to_treasury = 0;
        }
        self.market.successor = Some(*new_market_key);

        msg!(
            "Migrated {} assets and profit {} to {}",
            new_market.assets.len(),
            new_market.profit,
            new_market_key
        );
        Ok(())
    }

    /// Move one book into the successor market. Returns the collateral moved;
    /// a book already moved yields 0 and changes nothing.
    pub fn migrate_amount_book(
        &mut self,
        caller: &Caller,
        old_book: &mut AmountBook,
        new_market_key: &Pubkey,
        new_market: &LendingMarket,
        new_book: &mut AmountBook,
    ) -> Result<u128, LendingError> {
        let successor = self.market.successor.ok_or(LendingError::MigrationNotStarted)?;
        if successor != *new_market_key {
            return Err(LendingError::MigrationTargetMismatch);
        }
        if old_book.owner != *caller.key() && !self.market.is_operator(caller.key()) {
            return Err(LendingError::Unauthorized);
        }

        self.require_book(old_book)?;
        if new_book.market != *new_market_key || new_book.owner != old_book.owner {
            return Err(LendingError::InvalidPDA);
        }
        new_market.ensure_active()?;

        let collateral = old_book.collateral;
        let debts: Vec<(Pubkey, u128)> = old_book
            .debts
            .iter()
            .filter(|entry| entry.amount > 0)
            .map(|entry| (entry.asset, entry.amount))
            .collect();

        if collateral == 0 && debts.is_empty() {
            old_book.migrated_to = Some(*new_market_key);
            msg!("Book {} has nothing left to migrate", old_book.owner);
            return Ok(0);
        }

        if collateral > 0 {
            let mint = *self.market.collateral_mint();
            self.tokens
                .transfer(&mint, &self.market.custody, &new_market.custody, collateral)?;
        }

        new_book.increase_collateral(collateral)?;
        old_book.decrease_collateral(collateral)?;
        for (asset, amount) in debts.iter() {
            new_book.increase_debt(asset, *amount)?;
            old_book.decrease_debt(asset, *amount)?;
        }
        old_book.migrated_to = Some(*new_market_key);

        msg!(
            "Migrated book {}: collateral {}, {} debts",
            old_book.owner,
            collateral,
            debts.len()
        );
        Ok(collateral)
    }
}
