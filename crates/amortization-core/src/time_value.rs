use log::{debug, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::AmortizationError;
use crate::math::checked_pow;
use crate::types::{Money, Rate};
use crate::AmortizationResult;

/// Stop once successive Newton iterates differ by less than this.
pub const IRR_TOLERANCE: Decimal = dec!(0.0000000001);

/// Newton iteration budget for IRR.
pub const MAX_IRR_ITERATIONS: u32 = 100;

/// Substituted for a derivative that is exactly zero.
pub const DERIVATIVE_EPSILON: Decimal = dec!(0.000000000001);

/// Default periodic guess (2% per month).
pub const DEFAULT_IRR_GUESS: Rate = dec!(0.02);

/// Outcome of the IRR root finder.
///
/// `converged == false` means the solver stopped early (a non-finite step or
/// an exhausted iteration budget) and `rate` is the last finite estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrSolution {
    /// Periodic rate (per cash-flow period) as a decimal.
    pub rate: Rate,
    pub iterations: u32,
    pub converged: bool,
}

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> AmortizationResult<Money> {
    if rate <= dec!(-1) {
        return Err(AmortizationError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let v = discount_base(rate)?;
    let mut result = Decimal::ZERO;
    let mut factor = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            factor = factor.checked_mul(v).ok_or_else(|| unrepresentable_discount(t))?;
        }
        let pv = cf.checked_mul(factor).ok_or_else(|| unrepresentable_discount(t))?;
        result = result.checked_add(pv).ok_or_else(|| unrepresentable_discount(t))?;
    }

    Ok(result)
}

/// Per-period discount multiplier `1 / (1 + r)`.
///
/// Present values are built by multiplying with this factor rather than
/// dividing by a growing `(1 + r)^t`, so positive rates can only underflow.
pub(crate) fn discount_base(rate: Rate) -> AmortizationResult<Decimal> {
    Decimal::ONE
        .checked_add(rate)
        .and_then(|growth| Decimal::ONE.checked_div(growth))
        .ok_or_else(|| AmortizationError::DivisionByZero {
            context: format!("discount factor at rate {rate}"),
        })
}

fn unrepresentable_discount(period: usize) -> AmortizationError {
    AmortizationError::InvalidInput {
        field: "rate".into(),
        reason: format!("Discounted cash flow is not representable at period {period}"),
    }
}

/// Internal Rate of Return using Newton-Raphson.
///
/// `cash_flows[0]` sits at t = 0. A non-finite iterate stops the search and
/// the last finite estimate is returned unconverged; only when the very
/// first step is already non-finite is `NumericNonConvergence` raised.
pub fn irr(cash_flows: &[Money], guess: Rate) -> AmortizationResult<IrrSolution> {
    if cash_flows.len() < 2 {
        return Err(AmortizationError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let mut rate = guess;

    for i in 0..MAX_IRR_ITERATIONS {
        let next = match newton_step(cash_flows, rate) {
            Some(next) => next,
            None if i == 0 => {
                return Err(AmortizationError::NumericNonConvergence {
                    function: "IRR".into(),
                    iterations: 0,
                    last_estimate: rate,
                });
            }
            None => {
                warn!("IRR: non-finite iterate after {i} iterations, keeping estimate {rate}");
                return Ok(IrrSolution {
                    rate,
                    iterations: i,
                    converged: false,
                });
            }
        };

        if (next - rate).abs() < IRR_TOLERANCE {
            debug!("IRR converged to {next} in {} iterations", i + 1);
            return Ok(IrrSolution {
                rate: next,
                iterations: i + 1,
                converged: true,
            });
        }
        rate = next;
    }

    warn!("IRR: no convergence within {MAX_IRR_ITERATIONS} iterations, last estimate {rate}");
    Ok(IrrSolution {
        rate,
        iterations: MAX_IRR_ITERATIONS,
        converged: false,
    })
}

/// One Newton update `r - f(r)/f'(r)`; `None` when any term overflows or
/// divides by zero.
fn newton_step(cash_flows: &[Money], rate: Rate) -> Option<Rate> {
    let v = Decimal::ONE.checked_div(Decimal::ONE.checked_add(rate)?)?;
    let mut f = Decimal::ZERO;
    let mut df = Decimal::ZERO;
    let mut factor = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            factor = factor.checked_mul(v)?;
        }
        f = f.checked_add(cf.checked_mul(factor)?)?;
        if t > 0 {
            let weighted = Decimal::from(t as u64).checked_mul(*cf)?;
            df = df.checked_sub(weighted.checked_mul(factor.checked_mul(v)?)?)?;
        }
    }

    if df.is_zero() {
        df = DERIVATIVE_EPSILON;
    }
    rate.checked_sub(f.checked_div(df)?)
}

/// Compound a periodic rate to an annual one: `(1 + r)^periods - 1`.
pub fn annualize(periodic: Rate, periods_per_year: u32) -> AmortizationResult<Rate> {
    checked_pow(Decimal::ONE + periodic, periods_per_year)
        .map(|factor| factor - Decimal::ONE)
        .ok_or_else(|| AmortizationError::InvalidInput {
            field: "periodic_rate".into(),
            reason: format!("Rate {periodic} overflows when compounded {periods_per_year} times"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_npv_rejects_rate_at_minus_100() {
        assert!(npv(dec!(-1), &[dec!(1), dec!(2)]).is_err());
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, dec!(0.10)).unwrap();
        // IRR should be ~9.7%
        assert!(result.converged);
        assert!((result.rate - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_irr_zeroes_npv() {
        let cfs = vec![dec!(-100000), dec!(15000), dec!(15000), dec!(15000), dec!(15000),
            dec!(15000), dec!(15000), dec!(15000), dec!(15000)];
        let result = irr(&cfs, DEFAULT_IRR_GUESS).unwrap();
        assert!(result.converged);
        // 8 x 15,000 against 100,000 -> ~4.24% per period
        assert!((result.rate - dec!(0.0424)).abs() < dec!(0.001));
        assert!(npv(result.rate, &cfs).unwrap().abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_borrower_sign_convention() {
        // Principal received, installments paid: 1% per month by construction.
        let mut cfs = vec![dec!(1000)];
        cfs.extend(std::iter::repeat(dec!(-88.848788)).take(12));
        let result = irr(&cfs, DEFAULT_IRR_GUESS).unwrap();
        assert!(result.converged);
        assert!((result.rate - dec!(0.01)).abs() < dec!(0.00001));
    }

    #[test]
    fn test_irr_insufficient_data() {
        let err = irr(&[dec!(100)], DEFAULT_IRR_GUESS).unwrap_err();
        assert!(matches!(err, AmortizationError::InsufficientData(_)));
    }

    #[test]
    fn test_irr_first_step_non_finite_is_error() {
        // 1 + r = 0 makes the first discount factor zero.
        let err = irr(&[dec!(100), dec!(-110)], dec!(-1)).unwrap_err();
        assert!(matches!(
            err,
            AmortizationError::NumericNonConvergence { iterations: 0, .. }
        ));
    }

    #[test]
    fn test_irr_flat_derivative_uses_epsilon() {
        // f'(0) = -(1 * 2) - (2 * -1) = 0 and f(0) = 0: the epsilon keeps the
        // step finite and the guess is accepted as the root.
        let cfs = vec![dec!(-1), dec!(2), dec!(-1)];
        let result = irr(&cfs, Decimal::ZERO).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.rate, Decimal::ZERO);
    }

    #[test]
    fn test_irr_non_finite_after_finite_step_keeps_last_estimate() {
        // From r = 0 Newton overshoots to exactly r = -1, where 1 / (1 + r)
        // is undefined. The true root is -0.5.
        let cfs = vec![dec!(-200), dec!(100)];
        let result = irr(&cfs, Decimal::ZERO).unwrap();
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.rate, dec!(-1));
    }

    #[test]
    fn test_npv_near_minus_100_is_error_not_panic() {
        let cfs = vec![dec!(10); 20];
        let err = npv(dec!(-0.99), &cfs).unwrap_err();
        assert!(matches!(err, AmortizationError::InvalidInput { .. }));
    }

    #[test]
    fn test_npv_high_rate_underflows_quietly() {
        let mut cfs = vec![dec!(-100)];
        cfs.extend(std::iter::repeat(dec!(50)).take(600));
        let result = npv(dec!(2), &cfs).unwrap();
        // Flows beyond a few hundred periods vanish; the sum tends to -100 + 50/2.
        assert!((result - dec!(-75)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_irr_same_sign_flows_soft_fail() {
        // No root exists; the solver must still terminate with a finite estimate.
        let cfs = vec![dec!(100), dec!(100), dec!(100)];
        let result = irr(&cfs, DEFAULT_IRR_GUESS).unwrap();
        assert!(!result.converged);
        assert!(result.iterations <= MAX_IRR_ITERATIONS);
    }

    #[test]
    fn test_annualize_monthly() {
        let annual = annualize(dec!(0.01), 12).unwrap();
        assert!((annual - dec!(0.126825)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_annualize_overflow() {
        assert!(annualize(dec!(1000000), 12).is_err());
    }
}
