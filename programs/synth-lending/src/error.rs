use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, FromPrimitive, PartialEq, Eq)]
pub enum LendingError {
    #[error("Invalid instruction")]
    InvalidInstruction = 0,

    #[error("Account not initialized")]
    AccountNotInitialized = 1,

    #[error("Account already initialized")]
    AccountAlreadyInitialized = 2,

    #[error("Invalid PDA")]
    InvalidPDA = 3,

    #[error("Invalid account owner")]
    InvalidAccountOwner = 4,

    #[error("Unauthorized")]
    Unauthorized = 5,

    #[error("Insufficient collateral")]
    InsufficientCollateral = 6,

    #[error("Insufficient debt")]
    InsufficientDebt = 7,

    #[error("Insufficient allowance")]
    InsufficientAllowance = 8,

    #[error("Insufficient balance")]
    InsufficientBalance = 9,

    #[error("Repayment exceeds outstanding debt")]
    OverRepayment = 10,

    #[error("Burn exceeds unpaid treasury balance")]
    OverBurn = 11,

    #[error("Account is not liquidatable")]
    NotLiquidatable = 12,

    #[error("Market has been migrated")]
    MarketMigrated = 13,

    #[error("Market already migrated")]
    AlreadyMigrated = 14,

    #[error("Migration target does not name this market as predecessor")]
    MigrationTargetMismatch = 15,

    #[error("Market has not been migrated")]
    MigrationNotStarted = 16,

    #[error("Asset symbol already registered")]
    DuplicateAssetSymbol = 17,

    #[error("Unknown asset")]
    UnknownAsset = 18,

    #[error("Asset registry is full")]
    AssetRegistryFull = 19,

    #[error("Operator set is full")]
    OperatorSetFull = 20,

    #[error("Bank not assigned")]
    BankNotAssigned = 21,

    #[error("Invalid fee rate")]
    InvalidFeeRate = 22,

    #[error("Invalid risk parameters")]
    InvalidRiskParameters = 23,

    #[error("Invalid exchange rate")]
    InvalidExchangeRate = 24,

    #[error("Invalid asset symbol")]
    InvalidAssetSymbol = 25,

    #[error("Token account not found")]
    TokenAccountNotFound = 26,

    #[error("Mint not found")]
    MintNotFound = 27,

    #[error("Invalid mint authority")]
    InvalidMintAuthority = 28,

    #[error("Amount not representable in token units")]
    AmountNotRepresentable = 29,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 30,

    #[error("Division by zero")]
    DivisionByZero = 31,

    #[error("Cannot remove the last operator")]
    LastOperator = 32,

    #[error("Token program invocation failed")]
    TokenOperationFailed = 33,

    #[error("Rate feed account for the pair was not supplied")]
    RateFeedMissing = 34,

    #[error("Rate feed account does not describe the pair")]
    InvalidRateFeed = 35,
}

impl PrintProgramError for LendingError {
    fn print<E>(&self) {
        use solana_program::msg;
        msg!("LendingError: {}", self);
    }
}

impl From<LendingError> for ProgramError {
    fn from(e: LendingError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for LendingError {
    fn type_of() -> &'static str {
        "LendingError"
    }
}
