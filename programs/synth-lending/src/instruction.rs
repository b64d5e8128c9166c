use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::{
    error::LendingError,
    state::{AssetSelector, ExchangeRateFeed, FeeSchedule, RiskParameterUpdate},
};

/// Amounts and rates are 18-decimal fixed point.
///
/// Instructions that move tokens take the token program followed by a
/// variable tail of accounts: the market custody, every mint and token
/// account the operation touches, and for price-dependent operations the
/// canonical rate feed (see [`rate_feeds`]) of every asset being priced:
/// the borrowed asset and each asset the book owes. A missing feed fails
/// the instruction with `RateFeedMissing`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub enum LendingInstruction {
    /// Create a market for a collateral mint
    /// Accounts:
    /// 0. `[signer, writable]` Operator, pays for the market account
    /// 1. `[writable]` Market PDA
    /// 2. `[]` Custody PDA
    /// 3. `[]` Collateral mint
    /// 4. `[]` System program
    /// 5. `[]` Rent sysvar
    InitializeMarket {
        generation: u8,
        treasury: Pubkey,
        exchange_program: Pubkey,
        predecessor: Option<Pubkey>,
    },

    /// Create the caller's amount book in a market
    /// Accounts:
    /// 0. `[signer, writable]` Owner, pays for the book account
    /// 1. `[]` Market
    /// 2. `[writable]` Amount book PDA
    /// 3. `[]` System program
    /// 4. `[]` Rent sysvar
    OpenAmountBook,

    /// Register a synthetic asset whose mint authority is the custody
    /// Accounts:
    /// 0. `[signer]` Operator
    /// 1. `[writable]` Market
    /// 2. `[]` Asset mint
    RegisterAsset {
        symbol: String,
        name: String,
        default_rate: u128,
    },

    /// Accounts:
    /// 0. `[signer]` Operator
    /// 1. `[writable]` Market
    SetFeeSchedule { fees: FeeSchedule },

    /// Accounts:
    /// 0. `[signer]` Operator
    /// 1. `[writable]` Market
    UpdateRiskParameters { update: RiskParameterUpdate },

    /// Accounts:
    /// 0. `[signer]` Operator
    /// 1. `[writable]` Market
    AssignBank { bank: Pubkey },

    /// Accounts:
    /// 0. `[signer]` Operator
    /// 1. `[writable]` Market
    AddOperator { operator: Pubkey },

    /// Accounts:
    /// 0. `[signer]` Operator
    /// 1. `[writable]` Market
    RemoveOperator { operator: Pubkey },

    /// Accounts:
    /// 0. `[signer]` Owner
    /// 1. `[writable]` Market
    /// 2. `[writable]` Amount book
    /// 3. `[]` Token program
    /// 4+. Custody, collateral mint, owner and custody collateral accounts
    Deposit { amount: u128 },

    /// Accounts:
    /// 0. `[signer]` Owner
    /// 1. `[writable]` Market
    /// 2. `[writable]` Amount book
    /// 3. `[]` Token program
    /// 4+. Custody, asset mint, owner and custody asset accounts, rate feeds
    Borrow { asset_mint: Pubkey, amount: u128 },

    /// Accounts:
    /// 0. `[signer]` Owner
    /// 1. `[writable]` Market
    /// 2. `[writable]` Amount book
    /// 3. `[]` Token program
    /// 4+. Custody, asset mint, owner asset account
    Repay { asset_mint: Pubkey, amount: u128 },

    /// Accounts:
    /// 0. `[signer]` Owner
    /// 1. `[writable]` Market
    /// 2. `[writable]` Amount book
    /// 3. `[]` Token program
    /// 4+. Custody, collateral mint, owner and custody collateral accounts, rate feeds
    WithdrawCollateral { amount: u128 },

    /// Voluntary when signed by the book owner, forced otherwise
    /// Accounts:
    /// 0. `[signer]` Caller
    /// 1. `[writable]` Market
    /// 2. `[writable]` Amount book
    /// 3. `[]` Token program
    /// 4+. Custody, collateral mint, custody, treasury and caller collateral accounts, rate feeds
    Offset { selector: AssetSelector },

    /// Accounts:
    /// 0. `[signer]` Operator
    /// 1. `[writable]` Market
    /// 2. `[]` Token program
    /// 3+. Custody, mint, custody and bank token accounts
    TransferProfit { asset_mint: Pubkey, amount: u128 },

    /// Accounts:
    /// 0. `[signer]` Operator
    /// 1. `[writable]` Market
    /// 2. `[]` Token program
    /// 3+. Custody, asset mint, treasury asset account
    BurnFundAccount { asset_mint: Pubkey, amount: u128 },

    /// Hand market-level state to a successor naming this market as predecessor
    /// Accounts:
    /// 0. `[signer]` Operator of the old market
    /// 1. `[writable]` Old market
    /// 2. `[writable]` New market
    /// 3. `[]` Token program
    /// 4+. Old custody, new custody, mints, both custodies' token accounts
    Migrate,

    /// Move one book to the successor market
    /// Accounts:
    /// 0. `[signer]` Book owner or operator
    /// 1. `[]` Old market
    /// 2. `[]` New market
    /// 3. `[writable]` Old amount book
    /// 4. `[writable]` New amount book
    /// 5. `[]` Token program
    /// 6+. Old custody, collateral mint, both custodies' collateral accounts
    MigrateAmountBook,

    /// Log derived position figures
    /// Accounts:
    /// 0. `[]` Market
    /// 1. `[]` Amount book
    /// 2+. Rate feeds
    ReportPosition,
}

impl LendingInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| LendingError::InvalidInstruction.into())
    }

    pub fn pack(&self) -> Result<Vec<u8>, ProgramError> {
        self.try_to_vec().map_err(|_| LendingError::InvalidInstruction.into())
    }
}

#[allow(clippy::too_many_arguments)]
pub fn initialize_market(
    program_id: &Pubkey,
    operator: &Pubkey,
    market: &Pubkey,
    custody: &Pubkey,
    collateral_mint: &Pubkey,
    generation: u8,
    treasury: Pubkey,
    exchange_program: Pubkey,
    predecessor: Option<Pubkey>,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*operator, true),
        AccountMeta::new(*market, false),
        AccountMeta::new_readonly(*custody, false),
        AccountMeta::new_readonly(*collateral_mint, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
    ];

    Instruction::new_with_borsh(
        *program_id,
        &LendingInstruction::InitializeMarket {
            generation,
            treasury,
            exchange_program,
            predecessor,
        },
        accounts,
    )
}

pub fn open_amount_book(
    program_id: &Pubkey,
    owner: &Pubkey,
    market: &Pubkey,
    book: &Pubkey,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*owner, true),
        AccountMeta::new_readonly(*market, false),
        AccountMeta::new(*book, false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
    ];

    Instruction::new_with_borsh(*program_id, &LendingInstruction::OpenAmountBook, accounts)
}

pub fn register_asset(
    program_id: &Pubkey,
    operator: &Pubkey,
    market: &Pubkey,
    asset_mint: &Pubkey,
    symbol: String,
    name: String,
    default_rate: u128,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*operator, true),
        AccountMeta::new(*market, false),
        AccountMeta::new_readonly(*asset_mint, false),
    ];

    Instruction::new_with_borsh(
        *program_id,
        &LendingInstruction::RegisterAsset {
            symbol,
            name,
            default_rate,
        },
        accounts,
    )
}

/// Operator-only market configuration (fees, risk, bank, operator set)
pub fn configure_market(
    program_id: &Pubkey,
    operator: &Pubkey,
    market: &Pubkey,
    instruction: LendingInstruction,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*operator, true),
        AccountMeta::new(*market, false),
    ];

    Instruction::new_with_borsh(*program_id, &instruction, accounts)
}

/// Deposit, Borrow, Repay, WithdrawCollateral and Offset share one layout
pub fn position(
    program_id: &Pubkey,
    caller: &Pubkey,
    market: &Pubkey,
    book: &Pubkey,
    instruction: LendingInstruction,
    remaining: &[AccountMeta],
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new(*market, false),
        AccountMeta::new(*book, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];
    accounts.extend_from_slice(remaining);

    Instruction::new_with_borsh(*program_id, &instruction, accounts)
}

/// TransferProfit and BurnFundAccount
pub fn revenue(
    program_id: &Pubkey,
    operator: &Pubkey,
    market: &Pubkey,
    instruction: LendingInstruction,
    remaining: &[AccountMeta],
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new_readonly(*operator, true),
        AccountMeta::new(*market, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];
    accounts.extend_from_slice(remaining);

    Instruction::new_with_borsh(*program_id, &instruction, accounts)
}

pub fn migrate(
    program_id: &Pubkey,
    operator: &Pubkey,
    old_market: &Pubkey,
    new_market: &Pubkey,
    remaining: &[AccountMeta],
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new_readonly(*operator, true),
        AccountMeta::new(*old_market, false),
        AccountMeta::new(*new_market, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];
    accounts.extend_from_slice(remaining);

    Instruction::new_with_borsh(*program_id, &LendingInstruction::Migrate, accounts)
}

pub fn migrate_amount_book(
    program_id: &Pubkey,
    caller: &Pubkey,
    old_market: &Pubkey,
    new_market: &Pubkey,
    old_book: &Pubkey,
    new_book: &Pubkey,
    remaining: &[AccountMeta],
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new_readonly(*caller, true),
        AccountMeta::new_readonly(*old_market, false),
        AccountMeta::new_readonly(*new_market, false),
        AccountMeta::new(*old_book, false),
        AccountMeta::new(*new_book, false),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];
    accounts.extend_from_slice(remaining);

    Instruction::new_with_borsh(*program_id, &LendingInstruction::MigrateAmountBook, accounts)
}

pub fn report_position(
    program_id: &Pubkey,
    market: &Pubkey,
    book: &Pubkey,
    feeds: &[Pubkey],
) -> Instruction {
    let mut accounts = vec![
        AccountMeta::new_readonly(*market, false),
        AccountMeta::new_readonly(*book, false),
    ];
    accounts.extend(feeds.iter().map(|feed| AccountMeta::new_readonly(*feed, false)));

    Instruction::new_with_borsh(*program_id, &LendingInstruction::ReportPosition, accounts)
}

/// Read-only metas for the canonical feeds of `asset_mints`
pub fn rate_feeds(
    exchange_program: &Pubkey,
    collateral_mint: &Pubkey,
    asset_mints: &[Pubkey],
) -> Vec<AccountMeta> {
    asset_mints
        .iter()
        .map(|asset_mint| {
            let (feed, _) =
                ExchangeRateFeed::find_address(exchange_program, collateral_mint, asset_mint);
            AccountMeta::new_readonly(feed, false)
        })
        .collect()
}
