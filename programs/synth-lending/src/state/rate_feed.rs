use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::pubkey::Pubkey;

pub const RATE_FEED_SEED: &[u8] = b"rate_feed";

/// Last executed trade for a (collateral, synthetic) pair, as published by
/// the exchange program. Read-only from this program's point of view.
///
/// Each pair has exactly one feed, the exchange PDA at
/// `[RATE_FEED_SEED, base_mint, quote_mint]`.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRateFeed {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Collateral mint of the pair
    pub base_mint: Pubkey,

    /// Synthetic asset mint of the pair
    pub quote_mint: Pubkey,

    /// Synthetic units per collateral unit (18 decimals)
    pub last_rate: u128,

    /// Slot of the last trade, 0 if none has executed
    pub last_trade_slot: u64,
}

impl ExchangeRateFeed {
    pub const DISCRIMINATOR: [u8; 8] = [69, 88, 67, 95, 82, 65, 84, 69]; // "EXC_RATE"

    pub const LEN: usize = 8 + 32 + 32 + 16 + 8;

    pub fn new(base_mint: Pubkey, quote_mint: Pubkey, last_rate: u128, last_trade_slot: u64) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            base_mint,
            quote_mint,
            last_rate,
            last_trade_slot,
        }
    }

    /// Canonical feed address for a pair
    pub fn find_address(
        exchange_program: &Pubkey,
        base_mint: &Pubkey,
        quote_mint: &Pubkey,
    ) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[RATE_FEED_SEED, base_mint.as_ref(), quote_mint.as_ref()],
            exchange_program,
        )
    }

    pub fn has_traded(&self) -> bool {
        self.last_trade_slot > 0 && self.last_rate > 0
    }

    pub fn matches(&self, base_mint: &Pubkey, quote_mint: &Pubkey) -> bool {
        self.discriminator == Self::DISCRIMINATOR
            && self.base_mint == *base_mint
            && self.quote_mint == *quote_mint
    }
}
