//! SPL Token and exchange feed implementations of the engine seams.
//!
//! Both scan the accounts passed to the instruction: token accounts are
//! found by (mint, owner), mints by key and rate feeds by their canonical
//! address. Ledger amounts carry 18 decimals. Payouts are floored to each
//! mint's precision and pulls from users round up, so a rounding step never
//! favours the caller.

use solana_program::{
    account_info::AccountInfo,
    instruction::Instruction,
    msg,
    program::{invoke, invoke_signed},
    program_option::COption,
    program_pack::Pack,
    pubkey::Pubkey,
};
use spl_token::{
    instruction as token_instruction,
    state::{Account as TokenAccount, Mint},
};

use crate::{
    engine::{RateSource, TokenGateway},
    error::LendingError,
    math::{rescale, rescale_ceil, WAD_DECIMALS},
    state::{unpack_account, ExchangeRateFeed, CUSTODY_SEED},
};

/// A custody PDA the program can sign for
#[derive(Debug, Clone, Copy)]
pub struct CustodySigner {
    pub custody: Pubkey,
    pub market: Pubkey,
    pub bump: u8,
}

pub struct SplTokenGateway<'a, 'info> {
    token_program: &'a AccountInfo<'info>,
    accounts: &'a [AccountInfo<'info>],
    signer: CustodySigner,
}

impl<'a, 'info> SplTokenGateway<'a, 'info> {
    pub fn new(
        token_program: &'a AccountInfo<'info>,
        accounts: &'a [AccountInfo<'info>],
        signer: CustodySigner,
    ) -> Self {
        Self {
            token_program,
            accounts,
            signer,
        }
    }

    fn account(&self, key: &Pubkey) -> Result<&'a AccountInfo<'info>, LendingError> {
        self.accounts
            .iter()
            .find(|info| info.key == key)
            .ok_or(LendingError::TokenAccountNotFound)
    }

    fn mint(&self, mint: &Pubkey) -> Result<Mint, LendingError> {
        let info = self
            .accounts
            .iter()
            .find(|info| info.key == mint && info.owner == &spl_token::id())
            .ok_or(LendingError::MintNotFound)?;
        let data = info.try_borrow_data().map_err(|_| LendingError::MintNotFound)?;
        Mint::unpack(&data).map_err(|_| LendingError::MintNotFound)
    }

    /// First token account of `mint` owned by `owner`
    fn token_account(
        &self,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Option<(&'a AccountInfo<'info>, TokenAccount)>, LendingError> {
        for info in self.accounts.iter() {
            if info.owner != &spl_token::id() || info.data_len() != TokenAccount::LEN {
                continue;
            }
            let data = info
                .try_borrow_data()
                .map_err(|_| LendingError::TokenAccountNotFound)?;
            let account = match TokenAccount::unpack(&data) {
                Ok(account) => account,
                Err(_) => continue,
            };
            if account.mint == *mint && account.owner == *owner {
                return Ok(Some((info, account)));
            }
        }
        Ok(None)
    }

    fn require_token_account(
        &self,
        mint: &Pubkey,
        owner: &Pubkey,
    ) -> Result<(&'a AccountInfo<'info>, TokenAccount), LendingError> {
        self.token_account(mint, owner)?
            .ok_or(LendingError::TokenAccountNotFound)
    }

    fn to_units(&self, mint: &Pubkey, amount: u128) -> Result<u64, LendingError> {
        let decimals = self.mint(mint)?.decimals;
        let units = rescale(amount, WAD_DECIMALS, decimals)?;
        u64::try_from(units).map_err(|_| LendingError::AmountNotRepresentable)
    }

    fn to_units_ceil(&self, mint: &Pubkey, amount: u128) -> Result<u64, LendingError> {
        let decimals = self.mint(mint)?.decimals;
        let units = rescale_ceil(amount, WAD_DECIMALS, decimals)?;
        u64::try_from(units).map_err(|_| LendingError::AmountNotRepresentable)
    }

    fn to_ledger(&self, mint: &Pubkey, units: u64) -> Result<u128, LendingError> {
        let decimals = self.mint(mint)?.decimals;
        rescale(units as u128, decimals, WAD_DECIMALS)
    }

    /// Invoke, signing as custody when it is the authority
    fn run(
        &self,
        instruction: Instruction,
        infos: &[AccountInfo<'info>],
        authority: &Pubkey,
    ) -> Result<(), LendingError> {
        let result = if *authority == self.signer.custody {
            invoke_signed(
                &instruction,
                infos,
                &[&[
                    CUSTODY_SEED,
                    self.signer.market.as_ref(),
                    &[self.signer.bump],
                ]],
            )
        } else {
            invoke(&instruction, infos)
        };

        result.map_err(|err| {
            msg!("Token CPI failed: {:?}", err);
            LendingError::TokenOperationFailed
        })
    }
}

impl<'a, 'info> TokenGateway for SplTokenGateway<'a, 'info> {
    fn balance_of(&self, mint: &Pubkey, owner: &Pubkey) -> Result<u128, LendingError> {
        match self.token_account(mint, owner)? {
            Some((_, account)) => self.to_ledger(mint, account.amount),
            None => Ok(0),
        }
    }

    fn allowance(
        &self,
        mint: &Pubkey,
        owner: &Pubkey,
        spender: &Pubkey,
    ) -> Result<u128, LendingError> {
        match self.token_account(mint, owner)? {
            Some((_, account)) if account.delegate == COption::Some(*spender) => {
                self.to_ledger(mint, account.delegated_amount)
            }
            _ => Ok(0),
        }
    }

    fn total_supply(&self, mint: &Pubkey) -> Result<u128, LendingError> {
        let supply = self.mint(mint)?.supply;
        self.to_ledger(mint, supply)
    }

    fn ensure_representable(&self, mint: &Pubkey, amount: u128) -> Result<(), LendingError> {
        let units = self.to_units(mint, amount)?;
        if self.to_ledger(mint, units)? != amount {
            msg!("{} has more precision than mint {} holds", amount, mint);
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
        let units = self.to_units_ceil(mint, amount)?;
        let (source, account) = self.require_token_account(mint, owner)?;
        if account.delegate != COption::Some(*spender) || account.delegated_amount < units {
            return Err(LendingError::InsufficientAllowance);
        }
        if account.amount < units {
            return Err(LendingError::InsufficientBalance);
        }
        let (destination, _) = self.require_token_account(mint, to)?;
        let authority = self.account(spender)?;

        let instruction = token_instruction::transfer(
            self.token_program.key,
            source.key,
            destination.key,
            spender,
            &[],
            units,
        )
        .map_err(|_| LendingError::TokenOperationFailed)?;

        self.run(
            instruction,
            &[
                source.clone(),
                destination.clone(),
                authority.clone(),
                self.token_program.clone(),
            ],
            spender,
        )
    }

    fn transfer(
        &mut self,
        mint: &Pubkey,
        from: &Pubkey,
        to: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError> {
        let units = self.to_units(mint, amount)?;
        if units == 0 {
            return Ok(());
        }
        let (source, account) = self.require_token_account(mint, from)?;
        if account.amount < units {
            return Err(LendingError::InsufficientBalance);
        }
        let (destination, _) = self.require_token_account(mint, to)?;
        let authority = self.account(from)?;

        let instruction = token_instruction::transfer(
            self.token_program.key,
            source.key,
            destination.key,
            from,
            &[],
            units,
        )
        .map_err(|_| LendingError::TokenOperationFailed)?;

        self.run(
            instruction,
            &[
                source.clone(),
                destination.clone(),
                authority.clone(),
                self.token_program.clone(),
            ],
            from,
        )
    }

    fn mint_to(
        &mut self,
        mint: &Pubkey,
        authority: &Pubkey,
        to: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError> {
        let state = self.mint(mint)?;
        if state.mint_authority != COption::Some(*authority) {
            return Err(LendingError::InvalidMintAuthority);
        }
        let units = self.to_units(mint, amount)?;
        if units == 0 {
            return Ok(());
        }
        let (destination, _) = self.require_token_account(mint, to)?;
        let mint_info = self.account(mint)?;
        let authority_info = self.account(authority)?;

        let instruction = token_instruction::mint_to(
            self.token_program.key,
            mint,
            destination.key,
            authority,
            &[],
            units,
        )
        .map_err(|_| LendingError::TokenOperationFailed)?;

        self.run(
            instruction,
            &[
                mint_info.clone(),
                destination.clone(),
                authority_info.clone(),
                self.token_program.clone(),
            ],
            authority,
        )
    }

    fn burn_from(
        &mut self,
        mint: &Pubkey,
        owner: &Pubkey,
        spender: &Pubkey,
        amount: u128,
    ) -> Result<(), LendingError> {
        let units = self.to_units_ceil(mint, amount)?;
        let (source, account) = self.require_token_account(mint, owner)?;
        if account.delegate != COption::Some(*spender) || account.delegated_amount < units {
            return Err(LendingError::InsufficientAllowance);
        }
        if account.amount < units {
            return Err(LendingError::InsufficientBalance);
        }
        let mint_info = self.account(mint)?;
        let authority = self.account(spender)?;

        let instruction = token_instruction::burn(
            self.token_program.key,
            source.key,
            mint,
            spender,
            &[],
            units,
        )
        .map_err(|_| LendingError::TokenOperationFailed)?;

        self.run(
            instruction,
            &[
                source.clone(),
                mint_info.clone(),
                authority.clone(),
                self.token_program.clone(),
            ],
            spender,
        )
    }

    fn set_mint_authority(
        &mut self,
        mint: &Pubkey,
        current: &Pubkey,
        new_authority: &Pubkey,
    ) -> Result<(), LendingError> {
        let state = self.mint(mint)?;
        if state.mint_authority != COption::Some(*current) {
            return Err(LendingError::InvalidMintAuthority);
        }
        let mint_info = self.account(mint)?;
        let authority = self.account(current)?;

        let instruction = token_instruction::set_authority(
            self.token_program.key,
            mint,
            Some(new_authority),
            token_instruction::AuthorityType::MintTokens,
            current,
            &[],
        )
        .map_err(|_| LendingError::TokenOperationFailed)?;

        self.run(
            instruction,
            &[mint_info.clone(), authority.clone(), self.token_program.clone()],
            current,
        )
    }
}

/// Reads the exchange's per-pair feed accounts out of the instruction accounts.
/// Only the canonical feed of a pair is consulted, and it must be supplied
/// whenever the pair is priced.
pub struct FeedRates<'a, 'info> {
    exchange_program: Pubkey,
    accounts: &'a [AccountInfo<'info>],
}

impl<'a, 'info> FeedRates<'a, 'info> {
    pub fn new(exchange_program: Pubkey, accounts: &'a [AccountInfo<'info>]) -> Self {
        Self {
            exchange_program,
            accounts,
        }
    }
}

impl<'a, 'info> RateSource for FeedRates<'a, 'info> {
    fn latest_rate(
        &self,
        collateral_mint: &Pubkey,
        asset_mint: &Pubkey,
    ) -> Result<Option<u128>, LendingError> {
        let (address, _) =
            ExchangeRateFeed::find_address(&self.exchange_program, collateral_mint, asset_mint);
        let info = self
            .accounts
            .iter()
            .find(|info| *info.key == address)
            .ok_or_else(|| {
                msg!("Rate feed {} for {} not supplied", address, asset_mint);
                LendingError::RateFeedMissing
            })?;

        // The exchange creates the feed with the pair's first trade
        if info.owner != &self.exchange_program || info.data_is_empty() {
            return Ok(None);
        }

        let data = info
            .try_borrow_data()
            .map_err(|_| LendingError::InvalidRateFeed)?;
        let feed: ExchangeRateFeed =
            unpack_account(&data).map_err(|_| LendingError::InvalidRateFeed)?;
        if !feed.matches(collateral_mint, asset_mint) {
            return Err(LendingError::InvalidRateFeed);
        }

        Ok(if feed.has_traded() {
            Some(feed.last_rate)
        } else {
            None
        })
    }
}
