use solana_program::pubkey::Pubkey;

use crate::{
    engine::{LendingEngine, RateSource, TokenGateway},
    error::LendingError,
};

impl<'a, T: TokenGateway, R: RateSource> LendingEngine<'a, T, R> {
    /// Synthetic units per collateral unit for a registered asset.
    /// Follows the exchange's last executed trade; the registered default
    /// applies only while the pair has never traded.
    pub fn price(&self, asset_mint: &Pubkey) -> Result<u128, LendingError> {
        let asset = self.market.asset(asset_mint)?;

        let rate = self
            .rates
            .latest_rate(self.market.collateral_mint(), asset_mint)?
            .filter(|rate| *rate > 0)
            .unwrap_or(asset.default_rate);

        Ok(rate)
    }
}
