//! Amount scaling.
//!
//! Bets are denominated as decimals and transferred as integer base units
//! with 18 fractional digits.

use rust_decimal::Decimal;

use crate::error::{BetError, Result};

/// Fractional digits of one base unit.
pub const BASE_UNIT_DECIMALS: u32 = 18;

/// Check that an amount is strictly positive.
pub fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(BetError::InvalidAmount(format!("{} must be greater than zero", amount)));
    }
    Ok(())
}

/// Convert a positive decimal amount to base units.
///
/// Rejects amounts finer than one base unit and amounts that overflow `u128`.
pub fn to_base_units(amount: Decimal) -> Result<u128> {
    ensure_positive(amount)?;

    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > BASE_UNIT_DECIMALS {
        return Err(BetError::InvalidAmount(format!(
            "{} has more than {} fractional digits",
            amount, BASE_UNIT_DECIMALS
        )));
    }

    let mantissa = normalized.mantissa() as u128;
    10u128
        .checked_pow(BASE_UNIT_DECIMALS - scale)
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(|| BetError::InvalidAmount(format!("{} overflows base units", amount)))
}
