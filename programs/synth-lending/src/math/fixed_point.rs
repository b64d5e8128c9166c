use crate::error::LendingError;

// U256 with 4 x u64 limbs
#[allow(clippy::assign_op_pattern)]
#[allow(clippy::ptr_offset_with_cast)]
#[allow(clippy::manual_range_contains)]
mod wide {
    uint::construct_uint! {
        pub struct U256(4);
    }
}

pub use wide::U256;

/// Fixed point representation using u128
/// Represents values as integer * 10^18 (18 decimal places)
pub const WAD_DECIMALS: u8 = 18;
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Whole units to WAD (saturates)
pub const fn wad(units: u128) -> u128 {
    units.saturating_mul(WAD)
}

/// a * b / c, floored, computed in 256 bits
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Result<u128, LendingError> {
    if c == 0 {
        return Err(LendingError::DivisionByZero);
    }
    let result = U256::from(a) * U256::from(b) / U256::from(c);
    if result > U256::from(u128::MAX) {
        return Err(LendingError::ArithmeticOverflow);
    }
    Ok(result.as_u128())
}

/// a * b where both carry 18 decimals
pub fn wad_mul(a: u128, b: u128) -> Result<u128, LendingError> {
    mul_div_floor(a, b, WAD)
}

/// a / b where both carry 18 decimals
pub fn wad_div(a: u128, b: u128) -> Result<u128, LendingError> {
    mul_div_floor(a, WAD, b)
}

pub fn checked_add(a: u128, b: u128) -> Result<u128, LendingError> {
    a.checked_add(b).ok_or(LendingError::ArithmeticOverflow)
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128, LendingError> {
    a.checked_sub(b).ok_or(LendingError::ArithmeticOverflow)
}

/// Rescale an amount between decimal precisions, flooring when precision drops
pub fn rescale(amount: u128, from_decimals: u8, to_decimals: u8) -> Result<u128, LendingError> {
    if from_decimals == to_decimals {
        return Ok(amount);
    }
    if from_decimals > to_decimals {
        let factor = pow10(from_decimals - to_decimals)?;
        Ok(amount / factor)
    } else {
        let factor = pow10(to_decimals - from_decimals)?;
        amount.checked_mul(factor).ok_or(LendingError::ArithmeticOverflow)
    }
}

/// Rescale an amount between decimal precisions, rounding up when precision drops
pub fn rescale_ceil(amount: u128, from_decimals: u8, to_decimals: u8) -> Result<u128, LendingError> {
    if from_decimals <= to_decimals {
        return rescale(amount, from_decimals, to_decimals);
    }
    let factor = pow10(from_decimals - to_decimals)?;
    let floored = amount / factor;
    if amount % factor == 0 {
        Ok(floored)
    } else {
        checked_add(floored, 1)
    }
}

fn pow10(exp: u8) -> Result<u128, LendingError> {
    10u128
        .checked_pow(exp as u32)
        .ok_or(LendingError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wad_operations() {
        assert_eq!(wad(1), WAD);
        assert_eq!(wad_mul(wad(20_000), WAD / 100).unwrap(), wad(200));
        assert_eq!(wad_div(wad(20), WAD / 100).unwrap(), wad(2_000));
        assert_eq!(wad_div(wad(2_000), wad(20_000)).unwrap(), WAD / 10);
    }

    #[test]
    fn test_division_floors() {
        // 1_010_000 / 19_000_000 = 0.053157894736842105263...
        let rate = wad_div(wad(1_010_000), wad(19_000_000)).unwrap();
        assert_eq!(rate, 53_157_894_736_842_105);

        assert_eq!(mul_div_floor(10, 1, 3).unwrap(), 3);
    }

    #[test]
    fn test_large_intermediates_do_not_overflow() {
        // 20M units * 20M units would overflow u128 before the division
        let product = wad_mul(wad(20_000_000), wad(20_000_000)).unwrap();
        assert_eq!(product, wad(400_000_000_000_000));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(wad_div(WAD, 0), Err(LendingError::DivisionByZero));
    }

    #[test]
    fn test_rescale() {
        assert_eq!(rescale(wad(5), 18, 9).unwrap(), 5_000_000_000);
        assert_eq!(rescale(5_000_000_000, 9, 18).unwrap(), wad(5));
        // sub-unit dust is floored away
        assert_eq!(rescale(WAD + 1, 18, 9).unwrap(), 1_000_000_000);
        assert_eq!(rescale_ceil(WAD + 1, 18, 9).unwrap(), 1_000_000_001);
        assert_eq!(rescale_ceil(wad(5), 18, 9).unwrap(), 5_000_000_000);
        assert_eq!(rescale_ceil(5, 9, 18).unwrap(), 5_000_000_000);
    }
}
