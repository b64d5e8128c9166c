use solana_program::pubkey::Pubkey;

pub use crate::engine::memory::{MemoryRates, MemoryTokens};
use crate::state::{LendingMarket, MarketWiring, SyntheticAsset};

pub struct Fixture {
    pub market_key: Pubkey,
    pub market: LendingMarket,
    pub operator: Pubkey,
    pub usx: Pubkey,
    pub tokens: MemoryTokens,
}

/// Market with one asset "USX" (default rate 0.01) whose mint authority is custody
pub fn fixture() -> Fixture {
    let wiring = MarketWiring {
        collateral_mint: Pubkey::new_unique(),
        treasury: Pubkey::new_unique(),
        exchange_program: Pubkey::new_unique(),
    };
    let operator = Pubkey::new_unique();
    let custody = Pubkey::new_unique();
    let mut market = LendingMarket::new(0, 255, custody, 254, wiring, operator, None);

    let usx = Pubkey::new_unique();
    market
        .register_asset(
            SyntheticAsset::new("USX".into(), "USXToken".into(), usx, crate::math::WAD / 100).unwrap(),
        )
        .unwrap();

    let mut tokens = MemoryTokens::default();
    tokens.set_authority(&usx, &custody);

    Fixture {
        market_key: Pubkey::new_unique(),
        market,
        operator,
        usx,
        tokens,
    }
}
