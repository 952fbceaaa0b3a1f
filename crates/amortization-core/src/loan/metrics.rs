//! Cost-of-credit and sensitivity metrics: TCEA, annualised IRR, Macaulay
//! and modified duration, convexity.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AmortizationError;
use crate::loan::rates::MONTHS_PER_YEAR;
use crate::math::{round_percent, round_ratio};
use crate::time_value::{annualize, discount_base, irr, npv, DEFAULT_IRR_GUESS};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate, Years};
use crate::AmortizationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which duration/convexity formulation a loan result reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationMethod {
    /// Duration = term in years; modified duration and convexity derived
    /// from it with the annualised IRR.
    #[default]
    TermApproximation,
    /// Present-value-weighted time of the installment stream discounted at
    /// the monthly IRR.
    CashFlowWeighted,
}

/// Sensitivity block of a loan result, rounded to 4 dp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityMetrics {
    pub macaulay_duration: Years,
    pub modified_duration: Years,
    pub convexity: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TceaInput {
    /// Amount financed.
    pub principal: Money,
    /// Level monthly payment.
    pub monthly_payment: Money,
    pub term_months: u32,
    /// Up-front fees and charges deducted from the amount received.
    #[serde(default)]
    pub additional_costs: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TceaOutput {
    /// Total effective annual cost in percent, 2 dp.
    pub tcea: Percent,
    /// Unrounded monthly IRR.
    pub irr_monthly: Rate,
    pub converged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowAnalysisInput {
    /// Cash flows per period; index 0 is t = 0.
    pub cash_flows: Vec<Money>,
    /// Periodic yield used for NPV, duration and convexity.
    pub yield_rate: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irr_guess: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowAnalysisOutput {
    pub npv: Money,
    /// Periodic IRR, absent when the root finder could not produce one.
    pub irr: Option<Rate>,
    pub irr_converged: bool,
    /// In periods.
    pub macaulay_duration: Decimal,
    /// In periods.
    pub modified_duration: Decimal,
    /// In periods squared.
    pub convexity: Decimal,
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// Macaulay duration in periods: `Σ t·PV_t / Σ PV_t`.
pub fn macaulay_duration(cash_flows: &[Money], yield_rate: Rate) -> AmortizationResult<Decimal> {
    let (weighted, total) = discounted_moments(cash_flows, yield_rate, |t| t)?;
    if total.is_zero() {
        return Err(AmortizationError::DivisionByZero {
            context: "Macaulay duration: present value of cash flows is zero".into(),
        });
    }
    weighted
        .checked_div(total)
        .ok_or_else(|| AmortizationError::InvalidInput {
            field: "cash_flows".into(),
            reason: "Macaulay duration is not representable".into(),
        })
}

/// Modified duration: `D / (1 + y)`.
pub fn modified_duration(duration: Decimal, yield_rate: Rate) -> AmortizationResult<Decimal> {
    let one_plus_y = Decimal::ONE + yield_rate;
    if one_plus_y <= Decimal::ZERO {
        return Err(AmortizationError::InvalidInput {
            field: "yield_rate".into(),
            reason: "Yield must be greater than -100%".into(),
        });
    }
    Ok(duration / one_plus_y)
}

/// Convexity in periods squared: `Σ t(t+1)·PV_t / (Σ PV_t · (1+y)^2)`.
pub fn convexity(cash_flows: &[Money], yield_rate: Rate) -> AmortizationResult<Decimal> {
    let (weighted, total) = discounted_moments(cash_flows, yield_rate, |t| t * (t + Decimal::ONE))?;
    let one_plus_y = Decimal::ONE + yield_rate;
    let denom = total
        .checked_mul(one_plus_y)
        .and_then(|d| d.checked_mul(one_plus_y))
        .ok_or_else(|| AmortizationError::InvalidInput {
            field: "cash_flows".into(),
            reason: "Convexity denominator is not representable".into(),
        })?;
    if denom.is_zero() {
        return Err(AmortizationError::DivisionByZero {
            context: "convexity: present value of cash flows is zero".into(),
        });
    }
    weighted
        .checked_div(denom)
        .ok_or_else(|| AmortizationError::InvalidInput {
            field: "cash_flows".into(),
            reason: "Convexity is not representable".into(),
        })
}

/// Returns `(Σ w(t)·PV_t, Σ PV_t)` discounting at `yield_rate` per period.
fn discounted_moments(
    cash_flows: &[Money],
    yield_rate: Rate,
    weight: impl Fn(Decimal) -> Decimal,
) -> AmortizationResult<(Decimal, Decimal)> {
    if cash_flows.is_empty() {
        return Err(AmortizationError::InsufficientData(
            "Duration requires at least 1 cash flow".into(),
        ));
    }
    if yield_rate <= dec!(-1) {
        return Err(AmortizationError::InvalidInput {
            field: "yield_rate".into(),
            reason: "Yield must be greater than -100%".into(),
        });
    }

    let v = discount_base(yield_rate)?;
    let not_representable = |t: usize| AmortizationError::InvalidInput {
        field: "yield_rate".into(),
        reason: format!("Discounted cash flow is not representable at period {t}"),
    };

    let mut weighted = Decimal::ZERO;
    let mut total = Decimal::ZERO;
    let mut factor = Decimal::ONE;
    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            factor = factor.checked_mul(v).ok_or_else(|| not_representable(t))?;
        }
        let pv = cf.checked_mul(factor).ok_or_else(|| not_representable(t))?;
        weighted = weight(Decimal::from(t as u64))
            .checked_mul(pv)
            .and_then(|w| weighted.checked_add(w))
            .ok_or_else(|| not_representable(t))?;
        total = total.checked_add(pv).ok_or_else(|| not_representable(t))?;
    }
    Ok((weighted, total))
}

/// Annual decimal rate as rounded percentage points.
pub(crate) fn annual_percent(annual: Rate) -> AmortizationResult<Percent> {
    annual
        .checked_mul(dec!(100))
        .map(round_percent)
        .ok_or_else(|| AmortizationError::InvalidInput {
            field: "rate".into(),
            reason: format!("Annual rate {annual} is not representable as a percentage"),
        })
}

/// Term-based approximation: duration is the term in years.
pub fn term_sensitivity(term_months: u32, annual_irr: Rate) -> AmortizationResult<SensitivityMetrics> {
    let duration = Decimal::from(term_months) / Decimal::from(MONTHS_PER_YEAR);
    let modified = modified_duration(duration, annual_irr)?;
    let convexity = modified * (duration + Decimal::ONE) / (Decimal::ONE + annual_irr);
    Ok(SensitivityMetrics {
        macaulay_duration: round_ratio(duration),
        modified_duration: round_ratio(modified),
        convexity: round_ratio(convexity),
    })
}

/// Discounted sensitivity of the installment stream.
///
/// `borrower_flows` follows the loan convention (principal in, installments
/// out); the stream is flipped to the lender's view and discounted at the
/// monthly IRR, then expressed in years.
pub fn cash_flow_sensitivity(
    borrower_flows: &[Money],
    monthly_irr: Rate,
    annual_irr: Rate,
) -> AmortizationResult<SensitivityMetrics> {
    let payments: Vec<Money> = std::iter::once(Decimal::ZERO)
        .chain(borrower_flows.iter().skip(1).map(|cf| -cf))
        .collect();
    let months = Decimal::from(MONTHS_PER_YEAR);

    let duration = macaulay_duration(&payments, monthly_irr)? / months;
    let convexity_years = convexity(&payments, monthly_irr)? / (months * months);

    Ok(SensitivityMetrics {
        macaulay_duration: round_ratio(duration),
        modified_duration: round_ratio(modified_duration(duration, annual_irr)?),
        convexity: round_ratio(convexity_years),
    })
}

// ---------------------------------------------------------------------------
// Envelope operations
// ---------------------------------------------------------------------------

/// TCEA for a level-payment loan with up-front costs.
pub fn calculate_tcea(input: &TceaInput) -> AmortizationResult<ComputationOutput<TceaOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate_tcea(input)?;

    let net_received = input.principal - input.additional_costs;
    let mut flows = Vec::with_capacity(input.term_months as usize + 1);
    flows.push(net_received);
    flows.extend(std::iter::repeat(-input.monthly_payment).take(input.term_months as usize));

    let solution = irr(&flows, DEFAULT_IRR_GUESS)?;
    if !solution.converged {
        warnings.push(format!(
            "IRR did not converge after {} iterations; TCEA is a best estimate",
            solution.iterations
        ));
    }
    let annual = annualize(solution.rate, MONTHS_PER_YEAR)?;

    let output = TceaOutput {
        tcea: annual_percent(annual)?,
        irr_monthly: solution.rate,
        converged: solution.converged,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "TCEA: annualised IRR of net amount received vs level payments",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn validate_tcea(input: &TceaInput) -> AmortizationResult<()> {
    if input.principal <= Decimal::ZERO {
        return Err(AmortizationError::InvalidInput {
            field: "principal".into(),
            reason: "Principal must be positive".into(),
        });
    }
    if input.monthly_payment <= Decimal::ZERO {
        return Err(AmortizationError::InvalidInput {
            field: "monthly_payment".into(),
            reason: "Monthly payment must be positive".into(),
        });
    }
    if input.term_months == 0 {
        return Err(AmortizationError::InvalidInput {
            field: "term_months".into(),
            reason: "Term must be at least 1 month".into(),
        });
    }
    if input.additional_costs < Decimal::ZERO || input.additional_costs >= input.principal {
        return Err(AmortizationError::InvalidInput {
            field: "additional_costs".into(),
            reason: "Additional costs must be non-negative and below the principal".into(),
        });
    }
    Ok(())
}

/// NPV, IRR, duration and convexity of an arbitrary cash-flow vector.
pub fn analyze_cash_flows(
    input: &CashFlowAnalysisInput,
) -> AmortizationResult<ComputationOutput<CashFlowAnalysisOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let npv_value = npv(input.yield_rate, &input.cash_flows)?;
    let duration = macaulay_duration(&input.cash_flows, input.yield_rate)?;
    let modified = modified_duration(duration, input.yield_rate)?;
    let convex = convexity(&input.cash_flows, input.yield_rate)?;

    let (irr_rate, irr_converged) =
        match irr(&input.cash_flows, input.irr_guess.unwrap_or(DEFAULT_IRR_GUESS)) {
            Ok(solution) => {
                if !solution.converged {
                    warnings.push(format!(
                        "IRR did not converge after {} iterations; reporting last estimate",
                        solution.iterations
                    ));
                }
                (Some(solution.rate), solution.converged)
            }
            Err(e) => {
                warnings.push(format!("IRR unavailable: {e}"));
                (None, false)
            }
        };

    let output = CashFlowAnalysisOutput {
        npv: npv_value,
        irr: irr_rate,
        irr_converged,
        macaulay_duration: duration,
        modified_duration: modified,
        convexity: convex,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Discounted cash-flow analytics (NPV, IRR, Macaulay/modified duration, convexity)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
