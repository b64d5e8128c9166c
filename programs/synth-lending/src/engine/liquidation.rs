//! Offsets: closing debt by seizing collateral.
//!
//! The debtor may offset at any time (voluntary). Anyone else may offset an
//! account whose mortgage rate is above the closing line (forced) and is paid
//! an executor fee for it.
//!
//! Both paths size the close the same way:
//!
//! ```text
//! budget = min(selected debt value, highest_mortgage_rate * collateral, max_offset_collateral)
//! ```
//!
//! and then settle a collateral-denominated principal against the selected
//! debts in registration order.

use solana_program::{msg, pubkey::Pubkey};

use crate::{
    engine::{Caller, LendingEngine, RateSource, TokenGateway},
    error::LendingError,
    math::{checked_add, checked_sub, wad_mul},
    state::{AmountBook, AssetSelector},
};

/// Where the seized collateral went
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetReport {
    pub forced: bool,

    /// Collateral removed from the book
    pub seized: u128,

    /// Collateral value applied against debt
    pub principal: u128,

    pub to_treasury: u128,
    pub to_profit: u128,
    pub to_executor: u128,

    /// Synthetic amount repaid per asset, registration order
    pub repaid: Vec<(Pubkey, u128)>,
}

/// Collateral split of one offset, before settlement against debts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FeeSplit {
    seized: u128,
    principal: u128,
    to_treasury: u128,
    to_profit: u128,
    to_executor: u128,
}

impl<'a, T: TokenGateway, R: RateSource> LendingEngine<'a, T, R> {
    pub fn offset(
        &mut self,
        caller: &Caller,
        book: &mut AmountBook,
        selector: AssetSelector,
    ) -> Result<OffsetReport, LendingError> {
        self.market.ensure_active()?;
        self.require_book(book)?;
        if let AssetSelector::Asset(mint) = selector {
            self.market.asset(&mint)?;
        }

        let forced = book.owner != *caller.key();
        if forced {
            let rate = self.mortgage_rate(book)?;
            if rate <= self.market.risk.closing_line {
                msg!("Mortgage rate {} not above closing line {}", rate, self.market.risk.closing_line);
                return Err(LendingError::NotLiquidatable);
            }
        }

        let selected_value = self
            .market
            .assets
            .iter()
            .filter(|asset| selector.includes(&asset.mint))
            .try_fold(0u128, |total, asset| {
                checked_add(total, self.debt_value(book, &asset.mint)?)
            })?;
        let rate_bound = wad_mul(self.market.risk.highest_mortgage_rate, book.collateral)?;
        let ceiling = self.market.risk.max_offset_collateral;
        let budget = selected_value.min(rate_bound).min(ceiling);

        if budget == 0 {
            msg!("Nothing to offset");
            return Ok(OffsetReport {
                forced,
                ..OffsetReport::default()
            });
        }

        let split = if forced {
            self.forced_split(budget)?
        } else {
            let ceiling_binds = ceiling <= selected_value && ceiling <= rate_bound;
            self.voluntary_split(budget, ceiling_binds)?
        };

        if split.seized > book.collateral {
            return Err(LendingError::InsufficientCollateral);
        }

        let repaid = self.plan_settlement(book, selector, split.principal)?;

        // Proceeds leave custody; fees credited to profit stay behind
        let mint = *self.market.collateral_mint();
        let custody = self.market.custody;
        let treasury = self.market.wiring.treasury;
        if split.to_treasury > 0 {
            self.tokens.transfer(&mint, &custody, &treasury, split.to_treasury)?;
        }
        if split.to_executor > 0 {
            self.tokens.transfer(&mint, &custody, caller.key(), split.to_executor)?;
        }

        book.decrease_collateral(split.seized)?;
        for (asset_mint, amount) in repaid.iter() {
            book.decrease_debt(asset_mint, *amount)?;
            let asset = self.market.asset_mut(asset_mint)?;
            asset.unpaid_to_treasury = checked_add(asset.unpaid_to_treasury, *amount)?;
        }
        self.market.profit = checked_add(self.market.profit, split.to_profit)?;

        msg!(
            "Offset {}: seized {}, treasury {}, profit {}, executor {}",
            if forced { "forced" } else { "voluntary" },
            split.seized,
            split.to_treasury,
            split.to_profit,
            split.to_executor
        );

        Ok(OffsetReport {
            forced,
            seized: split.seized,
            principal: split.principal,
            to_treasury: split.to_treasury,
            to_profit: split.to_profit,
            to_executor: split.to_executor,
            repaid,
        })
    }

    /// Ceiling binding: the fee comes out of the ceiling.
    /// Otherwise the fee is charged on top of the budget.
    fn voluntary_split(&self, budget: u128, ceiling_binds: bool) -> Result<FeeSplit, LendingError> {
        let fee = wad_mul(budget, self.market.fees.offset_fee_rate)?;

        if ceiling_binds {
            let principal = checked_sub(budget, fee)?;
            return Ok(FeeSplit {
                seized: budget,
                principal,
                to_treasury: principal,
                to_profit: fee,
                to_executor: 0,
            });
        }

        Ok(FeeSplit {
            seized: checked_add(budget, fee)?,
            principal: budget,
            to_treasury: budget,
            to_profit: fee,
            to_executor: 0,
        })
    }

    fn forced_split(&self, budget: u128) -> Result<FeeSplit, LendingError> {
        let fees = &self.market.fees;
        let executor = wad_mul(budget, fees.force_offset_execute_fee_rate)?
            .min(fees.force_offset_execute_max_fee);
        let extra = wad_mul(budget, fees.force_offset_extra_fee_rate)?;
        let basic = wad_mul(budget, fees.force_offset_basic_fee_rate)?;

        let principal = checked_sub(
            budget,
            checked_add(checked_add(executor, extra)?, basic)?,
        )?;

        Ok(FeeSplit {
            seized: budget,
            principal,
            to_treasury: checked_add(principal, basic)?,
            to_profit: extra,
            to_executor: executor,
        })
    }

    /// Walk the selected debts in registration order, giving each
    /// min(its debt value, what is left of the principal)
    fn plan_settlement(
        &self,
        book: &AmountBook,
        selector: AssetSelector,
        principal: u128,
    ) -> Result<Vec<(Pubkey, u128)>, LendingError> {
        let mut remaining = principal;
        let mut repaid = Vec::new();

        for asset in self.market.assets.iter() {
            if remaining == 0 {
                break;
            }
            if !selector.includes(&asset.mint) {
                continue;
            }
            let debt = book.debt(&asset.mint);
            if debt == 0 {
                continue;
            }

            let value = self.debt_value(book, &asset.mint)?;
            let slice = value.min(remaining);
            if slice == 0 {
                continue;
            }

            let amount = if slice == value {
                debt
            } else {
                wad_mul(slice, self.price(&asset.mint)?)?.min(debt)
            };

            remaining -= slice;
            repaid.push((asset.mint, amount));
        }

        Ok(repaid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::{test_utils::*, NoTrades},
        math::wad,
        state::DebtSlotStatus,
    };

    fn indebted(f: &mut Fixture, collateral: u128, debt: u128) -> AmountBook {
        let mut book = AmountBook::new(f.market_key, Pubkey::new_unique(), 255);
        book.increase_collateral(collateral).unwrap();
        book.increase_debt(&f.usx, debt).unwrap();
        let mint = *f.market.collateral_mint();
        let custody = f.market.custody;
        f.tokens.credit(&mint, &custody, collateral);
        book
    }

    #[test]
    fn test_voluntary_offset_grosses_up() {
        let mut f = fixture();
        let mut book = indebted(&mut f, wad(20_000), wad(10));
        let owner = Caller::new(book.owner);
        let usx = f.usx;
        let mut engine = LendingEngine::new(f.market_key, &mut f.market, &mut f.tokens, &NoTrades);

        let report = engine.offset(&owner, &mut book, AssetSelector::Asset(usx)).unwrap();
        assert!(!report.forced);
        assert_eq!(report.seized, wad(1_010));
        assert_eq!(report.to_treasury, wad(1_000));
        assert_eq!(report.to_profit, wad(10));
        assert_eq!(report.repaid, vec![(usx, wad(10))]);
        assert_eq!(book.collateral, wad(18_990));
        assert_eq!(book.debt_status(&usx), Some(DebtSlotStatus::Closed));
    }

    #[test]
    fn test_forced_offset_requires_closing_line() {
        let mut f = fixture();
        let mut book = indebted(&mut f, wad(20_000), wad(20));
        let usx = f.usx;
        let stranger = Caller::new(Pubkey::new_unique());
        let mut engine = LendingEngine::new(f.market_key, &mut f.market, &mut f.tokens, &NoTrades);

        assert_eq!(
            engine.offset(&stranger, &mut book, AssetSelector::Asset(usx)),
            Err(LendingError::NotLiquidatable)
        );
        assert_eq!(book.collateral, wad(20_000));
    }

    #[test]
    fn test_forced_fee_split() {
        let mut f = fixture();
        // 100 USX at 0.01 is worth 10_000 against 20_000 collateral: 50%
        let mut book = indebted(&mut f, wad(20_000), wad(100));
        let usx = f.usx;
        let stranger = Caller::new(Pubkey::new_unique());
        let mut engine = LendingEngine::new(f.market_key, &mut f.market, &mut f.tokens, &NoTrades);

        let report = engine.offset(&stranger, &mut book, AssetSelector::All).unwrap();
        // budget = 10% of 20_000
        assert_eq!(report.seized, wad(2_000));
        assert_eq!(report.to_executor, wad(10));
        assert_eq!(report.to_profit, wad(40));
        assert_eq!(report.principal, wad(1_930));
        assert_eq!(report.to_treasury, wad(1_950));
        assert_eq!(report.repaid, vec![(usx, wad(1_930) / 100)]);
        assert_eq!(book.debt_status(&usx), Some(DebtSlotStatus::PartiallyClosed));
    }

    #[test]
    fn test_nothing_to_offset() {
        let mut f = fixture();
        let mut book = indebted(&mut f, wad(20_000), 0);
        let owner = Caller::new(book.owner);
        let mut engine = LendingEngine::new(f.market_key, &mut f.market, &mut f.tokens, &NoTrades);

        let report = engine.offset(&owner, &mut book, AssetSelector::All).unwrap();
        assert_eq!(report.seized, 0);
        assert_eq!(book.collateral, wad(20_000));
    }
}
