mod common;

use common::Harness;
use proptest::prelude::*;
use synth_lending::{
    engine::{PositionOutcome, TokenGateway},
    math::{wad, WAD},
    state::AssetSelector,
};

proptest! {
    #[test]
    fn borrow_never_exceeds_ceiling(
        collateral in 100u128..10_000_000,
        borrowed in 1u128..200_000,
        rate_millis in 1u128..100,
    ) {
        let mut h = Harness::new();
        let (caller, mut book) = h.depositor(wad(collateral));
        let usx = h.usx;
        h.rates.trade(&usx, WAD * rate_millis / 1_000);

        let outcome = h.engine().borrow(&caller, &mut book, &usx, wad(borrowed)).unwrap();
        let engine = h.engine();
        match outcome {
            PositionOutcome::Applied => {
                prop_assert!(engine.mortgage_rate(&book).unwrap() <= engine.highest_mortgage_rate());
                prop_assert_eq!(book.debt(&usx), wad(borrowed));
            }
            PositionOutcome::Ignored(_) => {
                prop_assert_eq!(book.debt(&usx), 0);
                prop_assert_eq!(engine.tokens().total_supply(&usx).unwrap(), 0);
            }
        }
    }

    #[test]
    fn full_repay_restores_supply_and_collateral(
        collateral in 1_000u128..1_000_000,
        percent in 1u128..100,
    ) {
        let mut h = Harness::new();
        let (caller, mut book) = h.depositor(wad(collateral));
        let usx = h.usx;
        let custody = h.custody();

        // At the default rate of 0.01 the ceiling is collateral / 1000
        let amount = wad(collateral) / 1_000 * percent / 100;
        prop_assume!(amount >= WAD);
        let outcome = h.engine().borrow(&caller, &mut book, &usx, amount).unwrap();
        prop_assert!(outcome.is_applied());

        // Cover the retained fee out of circulating supply so the whole debt can be burned
        let fee = h.balance(&usx, &custody);
        h.tokens.transfer(&usx, &custody, caller.key(), fee).unwrap();
        h.approve_burn(&usx, caller.key(), amount);
        h.engine().repay(&caller, &mut book, &usx, amount).unwrap();

        prop_assert!(!book.has_debt());
        prop_assert_eq!(h.engine().usable_collateral(&book).unwrap(), wad(collateral));
        prop_assert_eq!(h.balance(&usx, caller.key()), 0);
        prop_assert_eq!(h.tokens.total_supply(&usx).unwrap(), 0);
    }

    #[test]
    fn offset_conserves_seized_collateral(
        collateral in 1_000u128..10_000_000,
        percent in 1u128..=100,
        rate_micros in 100u128..10_000,
        forced in any::<bool>(),
    ) {
        let mut h = Harness::with_forced_fees();
        let (caller, mut book) = h.depositor(wad(collateral));
        let (usx, mint, treasury) = (h.usx, h.collateral_mint(), h.treasury());

        let amount = wad(collateral) / 1_000 * percent / 100;
        prop_assume!(amount >= WAD);
        h.engine().borrow(&caller, &mut book, &usx, amount).unwrap();
        h.rates.trade(&usx, WAD * rate_micros / 1_000_000);

        let offsetter = if forced { common::stranger() } else { caller };
        let before = book.collateral;
        let profit_before = h.engine().profit();
        let report = match h.engine().offset(&offsetter, &mut book, AssetSelector::All) {
            Ok(report) => report,
            Err(_) => {
                prop_assert!(forced);
                prop_assert_eq!(book.collateral, before);
                return Ok(());
            }
        };

        prop_assert!(report.seized <= before);
        prop_assert_eq!(
            report.seized,
            report.to_treasury + report.to_profit + report.to_executor
        );
        prop_assert_eq!(book.collateral, before - report.seized);
        prop_assert_eq!(h.balance(&mint, &treasury), report.to_treasury);
        prop_assert_eq!(h.engine().profit(), profit_before + report.to_profit);
        prop_assert!(book.debt(&usx) <= amount);
    }
}
