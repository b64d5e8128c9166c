use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{
    error::LendingError,
    math::{checked_add, checked_sub},
    state::MAX_ASSETS,
};

pub const AMOUNT_BOOK_SEED: &[u8] = b"amount_book";

/// Lifecycle of one (account, asset) debt slot
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebtSlotStatus {
    Open,
    PartiallyClosed,
    Closed,
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct DebtEntry {
    pub asset: Pubkey,
    pub amount: u128,
    pub status: DebtSlotStatus,
}

impl DebtEntry {
    pub const LEN: usize = 32 + 16 + 1;
}

/// Per-account ledger: collateral held on the owner's behalf and
/// outstanding minted supply per synthetic asset.
///
/// Mutators only enforce non-negativity; all policy lives in the engine.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct AmountBook {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized flag
    pub is_initialized: bool,

    /// PDA bump
    pub bump: u8,

    /// Market this book belongs to
    pub market: Pubkey,

    /// Debtor
    pub owner: Pubkey,

    /// Collateral credited to the owner (18 decimals)
    pub collateral: u128,

    /// One slot per asset ever borrowed; slots persist at zero
    pub debts: Vec<DebtEntry>,

    /// Set once the book has been moved to a successor market
    pub migrated_to: Option<Pubkey>,
}

impl AmountBook {
    pub const DISCRIMINATOR: [u8; 8] = [65, 77, 84, 95, 66, 79, 79, 75]; // "AMT_BOOK"

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        1 + // bump
        32 + // market
        32 + // owner
        16 + // collateral
        4 + (MAX_ASSETS * DebtEntry::LEN) + // debts
        33 + // migrated_to
        64; // padding

    pub fn new(market: Pubkey, owner: Pubkey, bump: u8) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            bump,
            market,
            owner,
            collateral: 0,
            debts: Vec::new(),
            migrated_to: None,
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

    pub fn debt(&self, asset: &Pubkey) -> u128 {
        self.debts
            .iter()
            .find(|entry| entry.asset == *asset)
            .map(|entry| entry.amount)
            .unwrap_or(0)
    }

    pub fn debt_status(&self, asset: &Pubkey) -> Option<DebtSlotStatus> {
        self.debts
            .iter()
            .find(|entry| entry.asset == *asset)
            .map(|entry| entry.status)
    }

    pub fn has_debt(&self) -> bool {
        self.debts.iter().any(|entry| entry.amount > 0)
    }

    pub fn increase_collateral(&mut self, amount: u128) -> Result<(), LendingError> {
        self.collateral = checked_add(self.collateral, amount)?;
        Ok(())
    }

    pub fn decrease_collateral(&mut self, amount: u128) -> Result<(), LendingError> {
        if amount > self.collateral {
            return Err(LendingError::InsufficientCollateral);
        }
        self.collateral -= amount;
        Ok(())
    }

    pub fn increase_debt(&mut self, asset: &Pubkey, amount: u128) -> Result<(), LendingError> {
        if let Some(entry) = self.debts.iter_mut().find(|entry| entry.asset == *asset) {
            entry.amount = checked_add(entry.amount, amount)?;
            if entry.amount > 0 {
                entry.status = DebtSlotStatus::Open;
            }
            return Ok(());
        }

        if self.debts.len() >= MAX_ASSETS {
            return Err(LendingError::AssetRegistryFull);
        }
        self.debts.push(DebtEntry {
            asset: *asset,
            amount,
            status: if amount > 0 { DebtSlotStatus::Open } else { DebtSlotStatus::Closed },
        });
        Ok(())
    }

    /// Returns the slot status after the reduction
    pub fn decrease_debt(
        &mut self,
        asset: &Pubkey,
        amount: u128,
    ) -> Result<DebtSlotStatus, LendingError> {
        let entry = match self.debts.iter_mut().find(|entry| entry.asset == *asset) {
            Some(entry) => entry,
            None if amount == 0 => return Ok(DebtSlotStatus::Closed),
            None => return Err(LendingError::InsufficientDebt),
        };

        if amount > entry.amount {
            return Err(LendingError::InsufficientDebt);
        }
        entry.amount = checked_sub(entry.amount, amount)?;

        if entry.amount == 0 {
            entry.status = DebtSlotStatus::Closed;
        } else if amount > 0 {
            entry.status = DebtSlotStatus::PartiallyClosed;
        }
        Ok(entry.status)
    }
}
