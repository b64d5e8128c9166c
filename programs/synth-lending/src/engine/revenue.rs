use solana_program::{msg, pubkey::Pubkey};

use crate::{
    engine::{Caller, LendingEngine, RateSource, TokenGateway},
    error::LendingError,
    math::checked_sub,
};

impl<'a, T: TokenGateway, R: RateSource> LendingEngine<'a, T, R> {
    /// Pay accumulated revenue out to the bank. Collateral comes out of
    /// `profit`; a synthetic asset comes out of the custody's retained balance.
    pub fn transfer_profit(
        &mut self,
        caller: &Caller,
        asset_mint: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError> {
        self.market.ensure_active()?;
        self.require_operator(caller)?;
        let bank = self.market.bank.ok_or(LendingError::BankNotAssigned)?;
        let custody = self.market.custody;
        self.tokens.ensure_representable(asset_mint, amount)?;

        if asset_mint == self.market.collateral_mint() {
            if amount > self.market.profit {
                return Err(LendingError::InsufficientBalance);
            }
            self.tokens.transfer(asset_mint, &custody, &bank, amount)?;
            self.market.profit = checked_sub(self.market.profit, amount)?;
            msg!("Transferred {} collateral profit, {} left", amount, self.market.profit);
            return Ok(());
        }

        self.market.asset(asset_mint)?;
        let retained = self.tokens.balance_of(asset_mint, &custody)?;
        if amount > retained {
            return Err(LendingError::InsufficientBalance);
        }
        self.tokens.transfer(asset_mint, &custody, &bank, amount)?;

        msg!("Transferred {} of retained synthetic balance {}", amount, retained);
        Ok(())
    }

    /// Burn synthetic tokens the treasury has accumulated from offsets.
    /// The treasury must have delegated at least `amount` to custody.
    pub fn burn_fund_account(
        &mut self,
        caller: &Caller,
        asset_mint: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError> {
        self.market.ensure_active()?;
        self.require_operator(caller)?;

        let unpaid = self.market.unpaid_to_treasury(asset_mint)?;
        if amount > unpaid {
            return Err(LendingError::OverBurn);
        }
        if amount < unpaid {
            self.tokens.ensure_representable(asset_mint, amount)?;
        }

        let treasury = self.market.wiring.treasury;
        let custody = self.market.custody;
        self.tokens.burn_from(asset_mint, &treasury, &custody, amount)?;

        let asset = self.market.asset_mut(asset_mint)?;
        asset.unpaid_to_treasury = checked_sub(unpaid, amount)?;

        msg!("Burned {} from treasury, {} still unpaid", amount, asset.unpaid_to_treasury);
        Ok(())
    }
}
