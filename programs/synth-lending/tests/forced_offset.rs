mod common;

use common::{stranger as executor, Harness};
use synth_lending::{
    error::LendingError,
    math::{wad, WAD},
    state::{AmountBook, AssetSelector},
};

const TRADED_RATE: u128 = WAD / 1_000;

/// Book with the given debts taken at the default rate, then repriced by a trade
fn crashed_book(h: &mut Harness, collateral: u128, usx_debt: u128, twx_debt: u128) -> AmountBook {
    let (caller, mut book) = h.depositor(collateral);
    let (usx, twx) = (h.usx, h.twx);

    for (mint, amount) in [(usx, usx_debt), (twx, twx_debt)] {
        if amount > 0 {
            let outcome = h.engine().borrow(&caller, &mut book, &mint, amount).unwrap();
            assert!(outcome.is_applied());
        }
    }

    h.rates.trade(&usx, TRADED_RATE);
    h.rates.trade(&twx, TRADED_RATE);
    book
}

#[test]
fn test_forced_offset_bounded_by_mortgage_rate() {
    let mut h = Harness::with_forced_fees();
    let mut book = crashed_book(&mut h, wad(1_200_000), wad(1_000), 0);
    let (usx, mint, treasury) = (h.usx, h.collateral_mint(), h.treasury());
    let executor = executor();

    let report = h.engine().offset(&executor, &mut book, AssetSelector::Asset(usx)).unwrap();
    assert!(report.forced);
    assert_eq!(report.seized, wad(120_000));
    assert_eq!(report.principal, wad(114_000));
    assert_eq!(report.repaid, vec![(usx, wad(114))]);

    assert_eq!(book.collateral, wad(1_080_000));
    assert_eq!(book.debt(&usx), wad(886));
    assert_eq!(h.balance(&mint, executor.key()), wad(1_200));
    assert_eq!(h.balance(&mint, &treasury), wad(116_400));

    let engine = h.engine();
    assert_eq!(engine.profit(), wad(2_400));
    assert_eq!(engine.unpaid_to_treasury(&usx).unwrap(), wad(114));
    assert_eq!(engine.remaining_borrow_capacity(&book, &usx).unwrap(), 0);
}

#[test]
fn test_forced_offset_on_smaller_book() {
    let mut h = Harness::with_forced_fees();
    let mut book = crashed_book(&mut h, wad(500_000), wad(500), 0);
    let (usx, mint, treasury) = (h.usx, h.collateral_mint(), h.treasury());
    let executor = executor();

    let report = h.engine().offset(&executor, &mut book, AssetSelector::Asset(usx)).unwrap();
    assert_eq!(report.seized, wad(50_000));
    assert_eq!(report.repaid, vec![(usx, wad(47) + WAD / 2)]);

    assert_eq!(book.collateral, wad(450_000));
    assert_eq!(book.debt(&usx), wad(452) + WAD / 2);
    assert_eq!(h.balance(&mint, executor.key()), wad(500));
    assert_eq!(h.balance(&mint, &treasury), wad(48_500));
    assert_eq!(h.engine().profit(), wad(1_000));
}

#[test]
fn test_executor_fee_is_capped() {
    let mut h = Harness::with_forced_fees();
    let mut book = crashed_book(&mut h, wad(5_000_000), wad(4_000), 0);
    let (usx, mint) = (h.usx, h.collateral_mint());
    let executor = executor();

    // Budget 500000: one percent would be 5000, the cap is 2000
    let report = h.engine().offset(&executor, &mut book, AssetSelector::Asset(usx)).unwrap();
    assert_eq!(report.seized, wad(500_000));
    assert_eq!(report.to_executor, wad(2_000));
    assert_eq!(report.to_profit, wad(10_000));
    assert_eq!(report.principal, wad(478_000));
    assert_eq!(report.to_treasury, wad(488_000));
    assert_eq!(h.balance(&mint, executor.key()), wad(2_000));
}

#[test]
fn test_forced_offset_only_touches_selected_asset() {
    let mut h = Harness::with_forced_fees();
    let mut book = crashed_book(&mut h, wad(1_200_000), wad(500), wad(500));
    let (usx, twx) = (h.usx, h.twx);

    let report = h
        .engine()
        .offset(&executor(), &mut book, AssetSelector::Asset(usx))
        .unwrap();
    assert_eq!(report.repaid, vec![(usx, wad(114))]);
    assert_eq!(book.debt(&usx), wad(386));
    assert_eq!(book.debt(&twx), wad(500));
}

#[test]
fn test_forced_offset_walks_assets_in_order() {
    let mut h = Harness::with_forced_fees();
    let mut book = crashed_book(&mut h, wad(1_200_000), wad(100), wad(900));
    let (usx, twx, mint, treasury) = (h.usx, h.twx, h.collateral_mint(), h.treasury());

    let report = h.engine().offset(&executor(), &mut book, AssetSelector::All).unwrap();
    assert_eq!(report.repaid, vec![(usx, wad(100)), (twx, wad(14))]);
    assert_eq!(book.debt(&usx), 0);
    assert_eq!(book.debt(&twx), wad(886));

    // Same collateral outcome as the single asset close of equal value
    assert_eq!(h.balance(&mint, &treasury), wad(116_400));
    assert_eq!(h.engine().profit(), wad(2_400));
    assert_eq!(h.engine().unpaid_to_treasury(&usx).unwrap(), wad(100));
    assert_eq!(h.engine().unpaid_to_treasury(&twx).unwrap(), wad(14));
}

#[test]
fn test_forced_offset_selected_asset_on_smaller_book() {
    let mut h = Harness::with_forced_fees();
    let mut book = crashed_book(&mut h, wad(500_000), wad(200), wad(200));
    let (usx, twx) = (h.usx, h.twx);

    h.engine()
        .offset(&executor(), &mut book, AssetSelector::Asset(usx))
        .unwrap();
    assert_eq!(book.debt(&usx), wad(152) + WAD / 2);
    assert_eq!(book.debt(&twx), wad(200));
}

#[test]
fn test_forced_offset_closes_first_asset_then_splits() {
    let mut h = Harness::with_forced_fees();
    let mut book = crashed_book(&mut h, wad(500_000), wad(20), wad(300));
    let (usx, twx) = (h.usx, h.twx);

    let report = h.engine().offset(&executor(), &mut book, AssetSelector::All).unwrap();
    assert_eq!(report.repaid, vec![(usx, wad(20)), (twx, wad(27) + WAD / 2)]);
    assert_eq!(book.debt(&usx), 0);
    assert_eq!(book.debt(&twx), wad(272) + WAD / 2);
}

#[test]
fn test_healthy_book_is_not_liquidatable() {
    let mut h = Harness::with_forced_fees();
    let (caller, mut book) = h.depositor(wad(1_200_000));
    let (usx, mint, treasury) = (h.usx, h.collateral_mint(), h.treasury());
    let executor = executor();
    h.engine().borrow(&caller, &mut book, &usx, wad(1_000)).unwrap();
    let before = book.clone();

    for _ in 0..2 {
        assert_eq!(
            h.engine().offset(&executor, &mut book, AssetSelector::All),
            Err(LendingError::NotLiquidatable)
        );
        assert_eq!(book, before);
        assert_eq!(book.collateral, wad(1_200_000));
        assert_eq!(book.debt(&usx), wad(1_000));
        assert_eq!(h.engine().profit(), 0);
        assert_eq!(h.engine().unpaid_to_treasury(&usx).unwrap(), 0);
        assert_eq!(h.balance(&mint, &treasury), 0);
        assert_eq!(h.balance(&mint, executor.key()), 0);
        assert_eq!(h.balance(&mint, &h.custody()), wad(1_200_000));
    }
}
