//! Lending and liquidation engine.
//!
//! The engine works on already-deserialized account state and reaches the
//! token programs and the exchange only through [`TokenGateway`] and
//! [`RateSource`], so the same code runs on-chain and under test.

pub mod admin;
pub mod capacity;
pub mod gateway;
pub mod liquidation;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod migration;
pub mod position;
pub mod price;
pub mod revenue;

#[cfg(test)]
pub(crate) mod test_utils;

pub use gateway::*;
pub use liquidation::OffsetReport;

use solana_program::pubkey::Pubkey;

use crate::{
    error::LendingError,
    state::{AmountBook, LendingMarket},
};

/// Identity of a verified signer. The processor only builds one from an
/// account that passed `is_signer`; role checks happen against the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(Pubkey);

impl Caller {
    pub fn new(key: Pubkey) -> Self {
        Self(key)
    }

    pub fn key(&self) -> &Pubkey {
        &self.0
    }
}

/// Why a position request was dropped without effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BelowMinimum,
    ExceedsMortgageCeiling,
    ExceedsUsableCollateral,
}

/// Position requests below thresholds or past limits are not errors;
/// they leave every balance untouched and report why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionOutcome {
    Applied,
    Ignored(IgnoreReason),
}

impl PositionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, PositionOutcome::Applied)
    }
}

pub struct LendingEngine<'a, T: TokenGateway, R: RateSource> {
    market_key: Pubkey,
    market: &'a mut LendingMarket,
    tokens: &'a mut T,
    rates: &'a R,
}

impl<'a, T: TokenGateway, R: RateSource> LendingEngine<'a, T, R> {
    pub fn new(
        market_key: Pubkey,
        market: &'a mut LendingMarket,
        tokens: &'a mut T,
        rates: &'a R,
    ) -> Self {
        Self {
            market_key,
            market,
            tokens,
            rates,
        }
    }

    pub fn market_key(&self) -> &Pubkey {
        &self.market_key
    }

    pub fn market(&self) -> &LendingMarket {
        self.market
    }

    pub fn tokens(&self) -> &T {
        self.tokens
    }

    pub fn profit(&self) -> u128 {
        self.market.profit
    }

    pub fn highest_mortgage_rate(&self) -> u128 {
        self.market.risk.highest_mortgage_rate
    }

    pub fn closing_line(&self) -> u128 {
        self.market.risk.closing_line
    }

    pub fn unpaid_to_treasury(&self, asset_mint: &Pubkey) -> Result<u128, LendingError> {
        self.market.unpaid_to_treasury(asset_mint)
    }

    fn require_operator(&self, caller: &Caller) -> Result<(), LendingError> {
        if !self.market.is_operator(caller.key()) {
            return Err(LendingError::Unauthorized);
        }
        Ok(())
    }

    fn require_owner(&self, caller: &Caller, book: &AmountBook) -> Result<(), LendingError> {
        if book.owner != *caller.key() {
            return Err(LendingError::Unauthorized);
        }
        Ok(())
    }

    /// The book must belong to this market
    fn require_book(&self, book: &AmountBook) -> Result<(), LendingError> {
        if book.market != self.market_key {
            return Err(LendingError::InvalidPDA);
        }
        Ok(())
    }
}
