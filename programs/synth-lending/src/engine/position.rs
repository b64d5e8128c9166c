use solana_program::{msg, pubkey::Pubkey};

use crate::{
    engine::{Caller, IgnoreReason, LendingEngine, PositionOutcome, RateSource, TokenGateway},
    error::LendingError,
    math::{checked_sub, wad_mul},
    state::AmountBook,
};

impl<'a, T: TokenGateway, R: RateSource> LendingEngine<'a, T, R> {
    /// Pull collateral from the caller into custody and credit their book
    pub fn deposit(
        &mut self,
        caller: &Caller,
        book: &mut AmountBook,
        amount: u128,
    ) -> Result<PositionOutcome, LendingError> {
        self.market.ensure_active()?;
        self.require_book(book)?;
        self.require_owner(caller, book)?;

        if amount < self.market.risk.min_deposit {
            msg!("Deposit of {} ignored: below minimum {}", amount, self.market.risk.min_deposit);
            return Ok(PositionOutcome::Ignored(IgnoreReason::BelowMinimum));
        }

        let mint = *self.market.collateral_mint();
        let custody = self.market.custody;
        self.tokens.ensure_representable(&mint, amount)?;
        if self.tokens.allowance(&mint, caller.key(), &custody)? < amount {
            return Err(LendingError::InsufficientAllowance);
        }

        self.tokens
            .transfer_from(&mint, caller.key(), &custody, &custody, amount)?;
        book.increase_collateral(amount)?;

        msg!("Deposited {} collateral, book now holds {}", amount, book.collateral);
        Ok(PositionOutcome::Applied)
    }

    /// Mint a synthetic asset against the book's collateral. The withdraw fee
    /// share of the minted amount stays in custody; debt grows by the full amount.
    pub fn borrow(
        &mut self,
        caller: &Caller,
        book: &mut AmountBook,
        asset_mint: &Pubkey,
        amount: u128,
    ) -> Result<PositionOutcome, LendingError> {
        self.market.ensure_active()?;
        self.require_book(book)?;
        self.require_owner(caller, book)?;
        self.market.asset(asset_mint)?;

        if amount < self.market.risk.min_borrow {
            msg!("Borrow of {} ignored: below minimum {}", amount, self.market.risk.min_borrow);
            return Ok(PositionOutcome::Ignored(IgnoreReason::BelowMinimum));
        }
        self.tokens.ensure_representable(asset_mint, amount)?;

        let highest = self.market.risk.highest_mortgage_rate;
        match self.mortgage_rate_after_borrow(book, asset_mint, amount)? {
            Some(rate) if rate <= highest => {}
            rate => {
                msg!("Borrow of {} ignored: mortgage rate {:?} above {}", amount, rate, highest);
                return Ok(PositionOutcome::Ignored(IgnoreReason::ExceedsMortgageCeiling));
            }
        }

        let fee = wad_mul(amount, self.market.fees.withdraw_fee_rate)?;
        let net = checked_sub(amount, fee)?;
        let custody = self.market.custody;

        if fee > 0 {
            self.tokens.mint_to(asset_mint, &custody, &custody, fee)?;
        }
        self.tokens.mint_to(asset_mint, &custody, caller.key(), net)?;
        book.increase_debt(asset_mint, amount)?;

        msg!("Borrowed {} (fee {}), debt now {}", amount, fee, book.debt(asset_mint));
        Ok(PositionOutcome::Applied)
    }

    /// Burn synthetic tokens from the caller against their own debt. Partial
    /// repayments must be whole token units; settling the full debt is always
    /// accepted and the burn rounds up to the next unit.
    pub fn repay(
        &mut self,
        caller: &Caller,
        book: &mut AmountBook,
        asset_mint: &Pubkey,
        amount: u128,
    ) -> Result<PositionOutcome, LendingError> {
        self.market.ensure_active()?;
        self.require_book(book)?;
        self.require_owner(caller, book)?;
        self.market.asset(asset_mint)?;

        if amount == 0 {
            return Ok(PositionOutcome::Ignored(IgnoreReason::BelowMinimum));
        }
        let debt = book.debt(asset_mint);
        if amount > debt {
            return Err(LendingError::OverRepayment);
        }
        if amount < debt {
            self.tokens.ensure_representable(asset_mint, amount)?;
        }

        let custody = self.market.custody;
        self.tokens
            .burn_from(asset_mint, caller.key(), &custody, amount)?;
        let status = book.decrease_debt(asset_mint, amount)?;

        msg!("Repaid {}, debt now {} ({:?})", amount, book.debt(asset_mint), status);
        Ok(PositionOutcome::Applied)
    }

    /// Release collateral not needed to back outstanding debt
    pub fn withdraw_collateral(
        &mut self,
        caller: &Caller,
        book: &mut AmountBook,
        amount: u128,
    ) -> Result<PositionOutcome, LendingError> {
        self.market.ensure_active()?;
        self.require_book(book)?;
        self.require_owner(caller, book)?;

        if amount < self.market.risk.min_withdraw {
            msg!("Withdraw of {} ignored: below minimum {}", amount, self.market.risk.min_withdraw);
            return Ok(PositionOutcome::Ignored(IgnoreReason::BelowMinimum));
        }

        let mint = *self.market.collateral_mint();
        self.tokens.ensure_representable(&mint, amount)?;

        let usable = self.usable_collateral(book)?;
        if amount > usable {
            msg!("Withdraw of {} ignored: only {} usable", amount, usable);
            return Ok(PositionOutcome::Ignored(IgnoreReason::ExceedsUsableCollateral));
        }

        let custody = self.market.custody;
        self.tokens.transfer(&mint, &custody, caller.key(), amount)?;
        book.decrease_collateral(amount)?;

        msg!("Withdrew {} collateral, book now holds {}", amount, book.collateral);
        Ok(PositionOutcome::Applied)
    }
}
