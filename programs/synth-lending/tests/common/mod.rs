#![allow(dead_code)]

use solana_program::pubkey::Pubkey;
pub use synth_lending::engine::memory::{MemoryRates, MemoryTokens};
use synth_lending::{
    engine::{Caller, LendingEngine, TokenGateway},
    math::{wad, WAD},
    state::{AmountBook, FeeSchedule, LendingMarket, MarketWiring},
};

/// A market with USX and TWX registered at a default rate of 0.01
pub struct Harness {
    pub market_key: Pubkey,
    pub market: LendingMarket,
    pub tokens: MemoryTokens,
    pub rates: MemoryRates,
    pub operator: Caller,
    pub usx: Pubkey,
    pub twx: Pubkey,
}

impl Harness {
    pub fn new() -> Self {
        let wiring = MarketWiring {
            collateral_mint: Pubkey::new_unique(),
            treasury: Pubkey::new_unique(),
            exchange_program: Pubkey::new_unique(),
        };
        Self::with_wiring(wiring, None)
    }

    pub fn with_wiring(wiring: MarketWiring, predecessor: Option<Pubkey>) -> Self {
        let operator = Pubkey::new_unique();
        let custody = Pubkey::new_unique();
        let market_key = Pubkey::new_unique();
        let market = LendingMarket::new(0, 255, custody, 254, wiring, operator, predecessor);

        let mut harness = Self {
            market_key,
            market,
            tokens: MemoryTokens::default(),
            rates: MemoryRates::default(),
            operator: Caller::new(operator),
            usx: Pubkey::new_unique(),
            twx: Pubkey::new_unique(),
        };

        let (usx, twx) = (harness.usx, harness.twx);
        harness.tokens.set_authority(&usx, &custody);
        harness.tokens.set_authority(&twx, &custody);
        let operator = harness.operator;
        let mut engine = harness.engine();
        engine
            .register_asset(&operator, "USX".into(), "USXToken".into(), usx, WAD / 100)
            .unwrap();
        engine
            .register_asset(&operator, "TWX".into(), "TWXToken".into(), twx, WAD / 100)
            .unwrap();
        harness
    }

    /// Fee set used by the forced offset scenarios
    pub fn with_forced_fees() -> Self {
        let mut harness = Self::new();
        let operator = harness.operator;
        harness
            .engine()
            .set_fee_schedule(
                &operator,
                FeeSchedule {
                    withdraw_fee_rate: WAD / 100,
                    offset_fee_rate: WAD / 100,
                    force_offset_basic_fee_rate: WAD / 50,
                    force_offset_execute_fee_rate: WAD / 100,
                    force_offset_extra_fee_rate: WAD / 50,
                    force_offset_execute_max_fee: wad(2_000),
                },
            )
            .unwrap();
        harness
    }

    pub fn engine(&mut self) -> LendingEngine<'_, MemoryTokens, MemoryRates> {
        LendingEngine::new(self.market_key, &mut self.market, &mut self.tokens, &self.rates)
    }

    pub fn collateral_mint(&self) -> Pubkey {
        self.market.wiring.collateral_mint
    }

    pub fn custody(&self) -> Pubkey {
        self.market.custody
    }

    pub fn treasury(&self) -> Pubkey {
        self.market.wiring.treasury
    }

    pub fn balance(&self, mint: &Pubkey, owner: &Pubkey) -> u128 {
        self.tokens.balance_of(mint, owner).unwrap()
    }

    /// Give a fresh account collateral and approve custody to pull it
    pub fn fund(&mut self, amount: u128) -> (Caller, AmountBook) {
        let owner = Pubkey::new_unique();
        let (mint, custody) = (self.collateral_mint(), self.custody());
        self.tokens.credit(&mint, &owner, amount);
        self.tokens.approve(&mint, &owner, &custody, amount);
        (Caller::new(owner), AmountBook::new(self.market_key, owner, 255))
    }

    /// Funded account with `collateral` deposited
    pub fn depositor(&mut self, collateral: u128) -> (Caller, AmountBook) {
        let (caller, mut book) = self.fund(collateral);
        let outcome = self.engine().deposit(&caller, &mut book, collateral).unwrap();
        assert!(outcome.is_applied());
        (caller, book)
    }

    /// Let custody burn `amount` of the owner's synthetic tokens
    pub fn approve_burn(&mut self, mint: &Pubkey, owner: &Pubkey, amount: u128) {
        let custody = self.custody();
        self.tokens.approve(mint, owner, &custody, amount);
    }
}

/// Signer with no book and no role in the market
pub fn stranger() -> Caller {
    Caller::new(Pubkey::new_unique())
}
