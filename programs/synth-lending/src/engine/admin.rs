use solana_program::{msg, pubkey::Pubkey};

use crate::{
    engine::{Caller, LendingEngine, RateSource, TokenGateway},
    error::LendingError,
    state::{FeeSchedule, RiskParameterUpdate, SyntheticAsset, MAX_OPERATORS},
};

impl<'a, T: TokenGateway, R: RateSource> LendingEngine<'a, T, R> {
    /// Append a synthetic asset. Its mint must already be controlled by custody.
    pub fn register_asset(
        &mut self,
        caller: &Caller,
        symbol: String,
        name: String,
        mint: Pubkey,
        default_rate: u128,
    ) -> Result<usize, LendingError> {
        self.market.ensure_active()?;
        self.require_operator(caller)?;

        let asset = SyntheticAsset::new(symbol, name, mint, default_rate)?;
        let index = self.market.register_asset(asset)?;

        msg!("Registered asset {} at index {}", self.market.assets[index].symbol, index);
        Ok(index)
    }

    /// Replace the fee schedule. Applies to subsequent operations only.
    pub fn set_fee_schedule(&mut self, caller: &Caller, fees: FeeSchedule) -> Result<(), LendingError> {
        self.market.ensure_active()?;
        self.require_operator(caller)?;
        fees.validate()?;

        self.market.fees = fees;
        msg!("Fee schedule updated");
        Ok(())
    }

    pub fn update_risk_parameters(
        &mut self,
        caller: &Caller,
        update: RiskParameterUpdate,
    ) -> Result<(), LendingError> {
        self.market.ensure_active()?;
        self.require_operator(caller)?;

        let risk = update.apply_to(&self.market.risk);
        risk.validate()?;

        self.market.risk = risk;
        msg!(
            "Risk parameters updated: highest {}, closing line {}",
            risk.highest_mortgage_rate,
            risk.closing_line
        );
        Ok(())
    }

    pub fn assign_bank(&mut self, caller: &Caller, bank: Pubkey) -> Result<(), LendingError> {
        self.market.ensure_active()?;
        self.require_operator(caller)?;

        self.market.bank = Some(bank);
        msg!("Bank assigned: {}", bank);
        Ok(())
    }

    pub fn add_operator(&mut self, caller: &Caller, operator: Pubkey) -> Result<(), LendingError> {
        self.market.ensure_active()?;
        self.require_operator(caller)?;

        if self.market.is_operator(&operator) {
            return Ok(());
        }
        if self.market.operators.len() >= MAX_OPERATORS {
            return Err(LendingError::OperatorSetFull);
        }

        self.market.operators.push(operator);
        msg!("Operator added: {}", operator);
        Ok(())
    }

    pub fn remove_operator(&mut self, caller: &Caller, operator: &Pubkey) -> Result<(), LendingError> {
        self.market.ensure_active()?;
        self.require_operator(caller)?;

        if !self.market.is_operator(operator) {
            return Ok(());
        }
        if self.market.operators.len() == 1 {
            return Err(LendingError::LastOperator);
        }

        self.market.operators.retain(|key| key != operator);
        msg!("Operator removed: {}", operator);
        Ok(())
    }
}
