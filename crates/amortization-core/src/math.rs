//! Decimal math helpers and the fixed output rounding rules.
//!
//! Powers and roots are computed by iterative multiplication and Newton's
//! method so every result stays in `Decimal` (no f64 round trips).

use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;

/// Decimal places for currency fields.
pub const MONEY_DP: u32 = 2;

/// Decimal places for duration, modified duration and convexity.
pub const RATIO_DP: u32 = 4;

/// Decimal places for annualised percentages (TCEA, IRR).
pub const PERCENT_DP: u32 = 2;

const ROOT_TOLERANCE: Decimal = dec!(0.0000000000000000001);
const ROOT_MAX_ITERATIONS: u32 = 60;

/// Round half away from zero to `dp` places.
pub fn round_dp(x: Decimal, dp: u32) -> Decimal {
    x.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_money(x: Decimal) -> Decimal {
    round_dp(x, MONEY_DP)
}

pub fn round_ratio(x: Decimal) -> Decimal {
    round_dp(x, RATIO_DP)
}

pub fn round_percent(x: Decimal) -> Decimal {
    round_dp(x, PERCENT_DP)
}

/// Compute base^n for a non-negative integer exponent via iterative multiplication.
pub fn iterative_pow(base: Decimal, n: u32) -> Decimal {
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result *= base;
    }
    result
}

/// Checked variant of [`iterative_pow`]; `None` on overflow.
pub fn checked_pow(base: Decimal, n: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result = result.checked_mul(base)?;
    }
    Some(result)
}

/// Compute (1 / base)^n by repeated multiplication of the reciprocal.
///
/// For `base > 1` every factor is below one, so the product can only
/// underflow towards zero. `None` when `base` is zero or the product
/// overflows (`0 < base < 1` with a large `n`).
pub fn checked_pow_recip(base: Decimal, n: u32) -> Option<Decimal> {
    let recip = Decimal::ONE.checked_div(base)?;
    checked_pow(recip, n)
}

/// Compute the nth root of a positive x using Newton's method, seeded
/// from `exp(ln(x) / n)` so the first iterate is already close.
pub fn nth_root(x: Decimal, n: u32) -> Decimal {
    if x == Decimal::ONE || x <= Decimal::ZERO || n == 1 {
        return x.max(Decimal::ZERO);
    }
    if n == 0 {
        return Decimal::ONE;
    }

    let n_dec = Decimal::from(n);
    let mut guess = (x.ln() / n_dec).exp();

    for _ in 0..ROOT_MAX_ITERATIONS {
        let g_n_minus_1 = iterative_pow(guess, n - 1);
        if g_n_minus_1.is_zero() {
            break;
        }
        let delta = (g_n_minus_1 * guess - x) / (n_dec * g_n_minus_1);
        guess -= delta;
        if delta.abs() < ROOT_TOLERANCE {
            break;
        }
    }

    guess
}
