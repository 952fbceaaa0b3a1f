//! Annual nominal/effective rate conversion to an effective monthly rate.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AmortizationError;
use crate::math::{checked_pow, nth_root};
use crate::types::{with_metadata, ComputationOutput, Percent, Rate};
use crate::AmortizationResult;

pub const MONTHS_PER_YEAR: u32 = 12;

/// How the quoted annual rate compounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateKind {
    /// Effective annual rate (TEA): compounding already included.
    #[default]
    Effective,
    /// Nominal annual rate capitalised `capitalization_frequency` times a year.
    Nominal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConversionInput {
    /// Annual rate in percentage points (12.5 = 12.5%).
    pub annual_rate: Percent,
    #[serde(default)]
    pub rate_kind: RateKind,
    /// Capitalisation periods per year; required for nominal rates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capitalization_frequency: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConversionOutput {
    /// Effective annual rate as a decimal.
    pub effective_annual_rate: Rate,
    /// Effective monthly rate as a decimal.
    pub monthly_effective_rate: Rate,
}

/// Convert a nominal annual rate (percentage points) capitalised `m` times a
/// year into an effective annual rate (decimal): `(1 + j/(100 m))^m - 1`.
pub fn nominal_to_effective(
    nominal_rate: Percent,
    capitalization_frequency: u32,
) -> AmortizationResult<Rate> {
    validate_annual_rate(nominal_rate)?;
    if capitalization_frequency == 0 {
        return Err(AmortizationError::InvalidInput {
            field: "capitalization_frequency".into(),
            reason: "Capitalization frequency must be at least 1 period per year".into(),
        });
    }
    let m = Decimal::from(capitalization_frequency);
    let periodic = nominal_rate / (dec!(100) * m);
    compound(Decimal::ONE + periodic, capitalization_frequency)
}

fn compound(growth: Decimal, periods: u32) -> AmortizationResult<Rate> {
    checked_pow(growth, periods)
        .map(|factor| factor - Decimal::ONE)
        .ok_or_else(|| AmortizationError::InvalidInput {
            field: "annual_rate".into(),
            reason: format!("Rate overflows when compounded {periods} times"),
        })
}

/// Convert an effective annual rate (percentage points) into the equivalent
/// effective monthly rate (decimal): `(1 + i/100)^(1/12) - 1`.
pub fn effective_annual_to_monthly(effective_rate: Percent) -> AmortizationResult<Rate> {
    validate_annual_rate(effective_rate)?;
    Ok(nth_root(Decimal::ONE + effective_rate / dec!(100), MONTHS_PER_YEAR) - Decimal::ONE)
}

/// Normalise an annual rate of either kind to an effective monthly rate.
pub fn monthly_effective_rate(
    annual_rate: Percent,
    rate_kind: RateKind,
    capitalization_frequency: Option<u32>,
) -> AmortizationResult<Rate> {
    match rate_kind {
        RateKind::Effective => effective_annual_to_monthly(annual_rate),
        RateKind::Nominal => {
            let m = capitalization_frequency.ok_or_else(|| AmortizationError::InvalidInput {
                field: "capitalization_frequency".into(),
                reason: "Nominal rates require a capitalization frequency".into(),
            })?;
            let effective = nominal_to_effective(annual_rate, m)?;
            let effective_pct = effective.checked_mul(dec!(100)).ok_or_else(|| {
                AmortizationError::InvalidInput {
                    field: "annual_rate".into(),
                    reason: "Effective rate is not representable as a percentage".into(),
                }
            })?;
            effective_annual_to_monthly(effective_pct)
        }
    }
}

/// Rate conversion with the standard output envelope.
pub fn convert_rate(
    input: &RateConversionInput,
) -> AmortizationResult<ComputationOutput<RateConversionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.rate_kind == RateKind::Effective && input.capitalization_frequency.is_some() {
        warnings.push("Capitalization frequency is ignored for effective rates".into());
    }

    let monthly = monthly_effective_rate(
        input.annual_rate,
        input.rate_kind,
        input.capitalization_frequency,
    )?;
    let effective_annual = match input.rate_kind {
        RateKind::Effective => input.annual_rate / dec!(100),
        RateKind::Nominal => compound(Decimal::ONE + monthly, MONTHS_PER_YEAR)?,
    };

    let output = RateConversionOutput {
        effective_annual_rate: effective_annual,
        monthly_effective_rate: monthly,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Annual-to-monthly effective rate conversion",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn validate_annual_rate(rate: Percent) -> AmortizationResult<()> {
    if rate < Decimal::ZERO {
        return Err(AmortizationError::InvalidInput {
            field: "annual_rate".into(),
            reason: "Annual rate cannot be negative".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE_TOL: Decimal = dec!(0.0001);

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal, msg: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "{}: expected ~{}, got {} (diff = {})",
            msg,
            expected,
            actual,
            diff
        );
    }

    #[test]
    fn test_nominal_monthly_to_effective() {
        let eff = nominal_to_effective(dec!(12), 12).unwrap();
        assert_close(eff, dec!(0.126825), dec!(0.000001), "12% nominal monthly");
    }

    #[test]
    fn test_nominal_quarterly_to_effective() {
        let eff = nominal_to_effective(dec!(12), 4).unwrap();
        assert_close(eff, dec!(0.125509), dec!(0.000001), "12% nominal quarterly");
    }

    #[test]
    fn test_nominal_compounding_overflow_is_error() {
        let err = nominal_to_effective(dec!(1_000_000_000_000_000_000_000_000), 12).unwrap_err();
        assert!(matches!(err, AmortizationError::InvalidInput { .. }));
    }

    #[test]
    fn test_effective_annual_to_monthly() {
        let monthly = effective_annual_to_monthly(dec!(12.5)).unwrap();
        assert_close(monthly, dec!(0.009849), RATE_TOL, "12.5% TEA");
        assert_close(monthly, dec!(0.0098636), dec!(0.0000001), "12.5% TEA exact");
    }

    #[test]
    fn test_monthly_rate_from_nominal() {
        let monthly = monthly_effective_rate(dec!(12), RateKind::Nominal, Some(12)).unwrap();
        assert_close(monthly, dec!(0.0100), RATE_TOL, "12% TNA monthly cap");
        assert_close(monthly, dec!(0.01), dec!(0.0000000001), "j/m when m = 12");
    }

    #[test]
    fn test_monthly_rate_zero() {
        let monthly = monthly_effective_rate(Decimal::ZERO, RateKind::Effective, None).unwrap();
        assert_eq!(monthly, Decimal::ZERO);
    }

    #[test]
    fn test_nominal_without_frequency_rejected() {
        let err = monthly_effective_rate(dec!(12), RateKind::Nominal, None).unwrap_err();
        match err {
            AmortizationError::InvalidInput { field, .. } => {
                assert_eq!(field, "capitalization_frequency")
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_nominal_zero_frequency_rejected() {
        assert!(monthly_effective_rate(dec!(12), RateKind::Nominal, Some(0)).is_err());
    }

    #[test]
    fn test_negative_rate_rejected() {
        assert!(monthly_effective_rate(dec!(-1), RateKind::Effective, None).is_err());
        assert!(nominal_to_effective(dec!(-1), 12).is_err());
    }

    #[test]
    fn test_convert_rate_envelope() {
        let input = RateConversionInput {
            annual_rate: dec!(12),
            rate_kind: RateKind::Nominal,
            capitalization_frequency: Some(12),
        };
        let out = convert_rate(&input).unwrap();
        assert_close(
            out.result.effective_annual_rate,
            dec!(0.126825),
            dec!(0.000001),
            "effective annual",
        );
        assert!(out.warnings.is_empty());
        assert!(!out.methodology.is_empty());
    }

    #[test]
    fn test_convert_rate_warns_on_ignored_frequency() {
        let input = RateConversionInput {
            annual_rate: dec!(10),
            rate_kind: RateKind::Effective,
            capitalization_frequency: Some(4),
        };
        let out = convert_rate(&input).unwrap();
        assert_eq!(out.result.effective_annual_rate, dec!(0.10));
        assert_eq!(out.warnings.len(), 1);
    }
}
