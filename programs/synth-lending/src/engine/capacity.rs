//! Derived quantities. Nothing here is stored; every value is recomputed
//! from the book and current prices on each call.

use solana_program::pubkey::Pubkey;

use crate::{
    engine::{LendingEngine, RateSource, TokenGateway},
    error::LendingError,
    math::{checked_add, wad_div, wad_mul},
    state::AmountBook,
};

/// Snapshot of one debt slot for reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPosition {
    pub mint: Pubkey,
    pub symbol: String,
    pub price: u128,
    pub debt: u128,
    pub debt_value: u128,
    pub remaining_borrow_capacity: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionReport {
    pub collateral: u128,
    pub total_debt_value: u128,
    pub mortgage_rate: u128,
    pub usable_collateral: u128,
    pub assets: Vec<AssetPosition>,
}

impl<'a, T: TokenGateway, R: RateSource> LendingEngine<'a, T, R> {
    /// Collateral-equivalent of one debt: debt / price
    pub fn debt_value(&self, book: &AmountBook, asset_mint: &Pubkey) -> Result<u128, LendingError> {
        let debt = book.debt(asset_mint);
        if debt == 0 {
            return Ok(0);
        }
        wad_div(debt, self.price(asset_mint)?)
    }

    /// Sum of debt values over every registered asset
    pub fn total_debt_value(&self, book: &AmountBook) -> Result<u128, LendingError> {
        self.market.assets.iter().try_fold(0u128, |total, asset| {
            checked_add(total, self.debt_value(book, &asset.mint)?)
        })
    }

    pub fn mortgage_rate(&self, book: &AmountBook) -> Result<u128, LendingError> {
        if book.collateral == 0 {
            return Ok(0);
        }
        wad_div(self.total_debt_value(book)?, book.collateral)
    }

    /// Mortgage rate the book would have after borrowing `amount` more of an asset.
    /// `None` when there is debt and no collateral.
    pub fn mortgage_rate_after_borrow(
        &self,
        book: &AmountBook,
        asset_mint: &Pubkey,
        amount: u128,
    ) -> Result<Option<u128>, LendingError> {
        let added = wad_div(amount, self.price(asset_mint)?)?;
        let total = checked_add(self.total_debt_value(book)?, added)?;

        if book.collateral == 0 {
            return Ok(if total == 0 { Some(0) } else { None });
        }
        Ok(Some(wad_div(total, book.collateral)?))
    }

    /// collateral * price * highest - debt, floored at zero
    pub fn remaining_borrow_capacity(
        &self,
        book: &AmountBook,
        asset_mint: &Pubkey,
    ) -> Result<u128, LendingError> {
        let price = self.price(asset_mint)?;
        let ceiling = wad_mul(
            wad_mul(book.collateral, price)?,
            self.market.risk.highest_mortgage_rate,
        )?;
        Ok(ceiling.saturating_sub(book.debt(asset_mint)))
    }

    /// Collateral not needed to back the current debt at the highest mortgage rate
    pub fn usable_collateral(&self, book: &AmountBook) -> Result<u128, LendingError> {
        let locked = wad_div(
            self.total_debt_value(book)?,
            self.market.risk.highest_mortgage_rate,
        )?;
        Ok(book.collateral.saturating_sub(locked))
    }

    pub fn position_report(&self, book: &AmountBook) -> Result<PositionReport, LendingError> {
        let mut assets = Vec::with_capacity(self.market.assets.len());
        for asset in self.market.assets.iter() {
            assets.push(AssetPosition {
                mint: asset.mint,
                symbol: asset.symbol.clone(),
                price: self.price(&asset.mint)?,
                debt: book.debt(&asset.mint),
                debt_value: self.debt_value(book, &asset.mint)?,
                remaining_borrow_capacity: self.remaining_borrow_capacity(book, &asset.mint)?,
            });
        }

        Ok(PositionReport {
            collateral: book.collateral,
            total_debt_value: self.total_debt_value(book)?,
            mortgage_rate: self.mortgage_rate(book)?,
            usable_collateral: self.usable_collateral(book)?,
            assets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::{test_utils::*, NoTrades},
        math::{wad, WAD},
    };

    fn book_with(f: &Fixture, collateral: u128, debt: u128) -> AmountBook {
        let mut book = AmountBook::new(f.market_key, Pubkey::new_unique(), 255);
        book.increase_collateral(collateral).unwrap();
        book.increase_debt(&f.usx, debt).unwrap();
        book
    }

    #[test]
    fn test_empty_book() {
        let mut f = fixture();
        let book = AmountBook::new(f.market_key, Pubkey::new_unique(), 255);
        let engine = LendingEngine::new(f.market_key, &mut f.market, &mut f.tokens, &NoTrades);

        assert_eq!(engine.mortgage_rate(&book).unwrap(), 0);
        assert_eq!(engine.usable_collateral(&book).unwrap(), 0);
        assert_eq!(engine.total_debt_value(&book).unwrap(), 0);
    }

    #[test]
    fn test_capacity_at_the_ceiling() {
        let mut f = fixture();
        let book = book_with(&f, wad(20_000), wad(20));
        let usx = f.usx;
        let engine = LendingEngine::new(f.market_key, &mut f.market, &mut f.tokens, &NoTrades);

        assert_eq!(engine.debt_value(&book, &usx).unwrap(), wad(2_000));
        assert_eq!(engine.mortgage_rate(&book).unwrap(), WAD / 10);
        assert_eq!(engine.remaining_borrow_capacity(&book, &usx).unwrap(), 0);
        assert_eq!(engine.usable_collateral(&book).unwrap(), 0);
    }

    #[test]
    fn test_partial_repay_frees_collateral() {
        let mut f = fixture();
        // 19.99 outstanding at 0.01
        let book = book_with(&f, wad(20_000), wad(1999) / 100);
        let usx = f.usx;
        let engine = LendingEngine::new(f.market_key, &mut f.market, &mut f.tokens, &NoTrades);

        assert_eq!(engine.usable_collateral(&book).unwrap(), wad(10));
        assert_eq!(engine.remaining_borrow_capacity(&book, &usx).unwrap(), WAD / 100);
    }

    #[test]
    fn test_post_borrow_rate() {
        let mut f = fixture();
        let book = book_with(&f, 0, 0);
        let usx = f.usx;
        let engine = LendingEngine::new(f.market_key, &mut f.market, &mut f.tokens, &NoTrades);

        assert_eq!(engine.mortgage_rate_after_borrow(&book, &usx, 0).unwrap(), Some(0));
        assert_eq!(engine.mortgage_rate_after_borrow(&book, &usx, wad(1)).unwrap(), None);
    }

    #[test]
    fn test_report_lists_registered_assets() {
        let mut f = fixture();
        let book = book_with(&f, wad(20_000), wad(10));
        let engine = LendingEngine::new(f.market_key, &mut f.market, &mut f.tokens, &NoTrades);

        let report = engine.position_report(&book).unwrap();
        assert_eq!(report.assets.len(), 1);
        assert_eq!(report.assets[0].symbol, "USX");
        assert_eq!(report.assets[0].remaining_borrow_capacity, wad(10));
        assert_eq!(report.mortgage_rate, WAD / 20);
        assert_eq!(report.usable_collateral, wad(10_000));
    }
}
