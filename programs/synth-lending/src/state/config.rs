use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

use crate::{
    error::LendingError,
    math::{wad, WAD},
};

/// Addresses the market is wired to at construction time.
/// Assembled once before any traffic flows and never re-pointed.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketWiring {
    /// Mint of the base collateral token
    pub collateral_mint: Pubkey,

    /// Treasury ("fund account") receiving liquidation proceeds
    pub treasury: Pubkey,

    /// Exchange program owning the rate feed accounts
    pub exchange_program: Pubkey,
}

impl MarketWiring {
    pub const LEN: usize = 32 + 32 + 32;
}

/// Fee rates, all fixed point with 18 decimals (10^16 = 1%)
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Share of every borrow retained by the market
    pub withdraw_fee_rate: u128,

    /// Fee on voluntary offsets, credited to profit
    pub offset_fee_rate: u128,

    /// Forced offset fee forwarded to the treasury on top of the principal
    pub force_offset_basic_fee_rate: u128,

    /// Forced offset fee paid to the executor
    pub force_offset_execute_fee_rate: u128,

    /// Forced offset fee credited to profit
    pub force_offset_extra_fee_rate: u128,

    /// Absolute cap on the executor fee, in collateral units
    pub force_offset_execute_max_fee: u128,
}

impl FeeSchedule {
    pub const LEN: usize = 16 * 6;

    pub fn validate(&self) -> Result<(), LendingError> {
        if self.withdraw_fee_rate >= WAD || self.offset_fee_rate >= WAD {
            return Err(LendingError::InvalidFeeRate);
        }

        // The three forced components are all carved out of the seized amount
        let forced = self
            .force_offset_basic_fee_rate
            .checked_add(self.force_offset_execute_fee_rate)
            .and_then(|sum| sum.checked_add(self.force_offset_extra_fee_rate))
            .ok_or(LendingError::InvalidFeeRate)?;
        if forced >= WAD {
            return Err(LendingError::InvalidFeeRate);
        }

        Ok(())
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            withdraw_fee_rate: WAD / 100,                 // 1%
            offset_fee_rate: WAD / 100,                   // 1%
            force_offset_basic_fee_rate: WAD / 100,       // 1%
            force_offset_execute_fee_rate: WAD / 200,     // 0.5%
            force_offset_extra_fee_rate: WAD / 50,        // 2%
            force_offset_execute_max_fee: wad(500),
        }
    }
}

/// Collateralization limits and request thresholds
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskParameters {
    /// Ceiling on the mortgage rate after any borrow (default: 10%)
    pub highest_mortgage_rate: u128,

    /// Mortgage rate above which third parties may force an offset (default: 20%)
    pub closing_line: u128,

    /// Deposits below this are ignored
    pub min_deposit: u128,

    /// Collateral withdrawals below this are ignored
    pub min_withdraw: u128,

    /// Borrows below this are ignored
    pub min_borrow: u128,

    /// Most collateral a single offset may seize
    pub max_offset_collateral: u128,
}

impl RiskParameters {
    pub const LEN: usize = 16 * 6;

    pub fn validate(&self) -> Result<(), LendingError> {
        if self.highest_mortgage_rate == 0 || self.highest_mortgage_rate >= WAD {
            return Err(LendingError::InvalidRiskParameters);
        }

        if self.closing_line <= self.highest_mortgage_rate {
            return Err(LendingError::InvalidRiskParameters);
        }

        if self.max_offset_collateral == 0 {
            return Err(LendingError::InvalidRiskParameters);
        }

        Ok(())
    }
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            highest_mortgage_rate: WAD / 10,
            closing_line: WAD / 5,
            min_deposit: wad(100),
            min_withdraw: wad(100),
            min_borrow: wad(1),
            max_offset_collateral: wad(1_000_000),
        }
    }
}

/// Partial update of the risk parameters; `None` keeps the current value
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskParameterUpdate {
    pub highest_mortgage_rate: Option<u128>,
    pub closing_line: Option<u128>,
    pub min_deposit: Option<u128>,
    pub min_withdraw: Option<u128>,
    pub min_borrow: Option<u128>,
    pub max_offset_collateral: Option<u128>,
}

impl RiskParameterUpdate {
    pub fn apply_to(&self, current: &RiskParameters) -> RiskParameters {
        RiskParameters {
            highest_mortgage_rate: self.highest_mortgage_rate.unwrap_or(current.highest_mortgage_rate),
            closing_line: self.closing_line.unwrap_or(current.closing_line),
            min_deposit: self.min_deposit.unwrap_or(current.min_deposit),
            min_withdraw: self.min_withdraw.unwrap_or(current.min_withdraw),
            min_borrow: self.min_borrow.unwrap_or(current.min_borrow),
            max_offset_collateral: self.max_offset_collateral.unwrap_or(current.max_offset_collateral),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(FeeSchedule::default().validate().is_ok());
        assert!(RiskParameters::default().validate().is_ok());
    }

    #[test]
    fn test_forced_fees_must_leave_principal() {
        let fees = FeeSchedule {
            force_offset_basic_fee_rate: WAD / 2,
            force_offset_execute_fee_rate: WAD / 4,
            force_offset_extra_fee_rate: WAD / 4,
            ..FeeSchedule::default()
        };
        assert_eq!(fees.validate(), Err(LendingError::InvalidFeeRate));
    }

    #[test]
    fn test_closing_line_must_exceed_ceiling() {
        let risk = RiskParameters {
            closing_line: WAD / 10,
            ..RiskParameters::default()
        };
        assert_eq!(risk.validate(), Err(LendingError::InvalidRiskParameters));
    }

    #[test]
    fn test_partial_risk_update() {
        let update = RiskParameterUpdate {
            closing_line: Some(WAD / 4),
            ..RiskParameterUpdate::default()
        };
        let risk = update.apply_to(&RiskParameters::default());
        assert_eq!(risk.closing_line, WAD / 4);
        assert_eq!(risk.highest_mortgage_rate, WAD / 10);
    }
}
