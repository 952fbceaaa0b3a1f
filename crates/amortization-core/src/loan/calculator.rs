//! Single entry point: rate conversion, schedule, IRR and metrics for one loan.

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::AmortizationError;
use crate::loan::metrics::{annual_percent, cash_flow_sensitivity, term_sensitivity, DurationMethod};
use crate::loan::rates::{monthly_effective_rate, RateKind, MONTHS_PER_YEAR};
use crate::loan::schedule::{
    build_schedule, effective_grace_months, GraceKind, ScheduleEntry, ScheduleInput,
    SchedulePhase,
};
use crate::math::{round_dp, round_money};
use crate::time_value::{annualize, irr, DEFAULT_IRR_GUESS};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Rate, Years};
use crate::AmortizationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRequest {
    /// Amount financed.
    pub principal: Money,
    /// Annual rate in percentage points (12.5 = 12.5%).
    pub annual_rate: Percent,
    /// Amortising months, not counting grace months.
    pub term_months: u32,
    #[serde(default)]
    pub rate_kind: RateKind,
    /// Capitalisation periods per year; required for nominal rates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capitalization_frequency: Option<u32>,
    #[serde(default)]
    pub grace_kind: GraceKind,
    #[serde(default)]
    pub grace_months: u32,
    #[serde(default)]
    pub capitalize_during_grace: bool,
    /// Schedule period `p` falls `p` months after this date.
    pub origin_date: NaiveDate,
    /// Discount grace-period installments in the IRR/TCEA cash flows.
    #[serde(default)]
    pub include_grace_in_irr: bool,
    #[serde(default)]
    pub duration_method: DurationMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanResult {
    /// Level installment of the amortising phase.
    pub installment: Money,
    /// Total effective annual cost, percent.
    pub tcea: Percent,
    /// Annualised IRR, percent. Equal to `tcea` in this model.
    pub irr: Percent,
    /// Periodic (monthly) IRR behind `tcea`, unrounded.
    pub irr_monthly: Rate,
    pub irr_converged: bool,
    /// Effective monthly rate applied to the schedule, 8 dp.
    pub monthly_rate: Rate,
    pub macaulay_duration: Years,
    pub modified_duration: Years,
    pub convexity: Decimal,
    pub total_interest: Money,
    pub total_paid: Money,
    pub schedule: Vec<ScheduleEntry>,
}

impl LoanRequest {
    /// Request with the default options: effective rate, no grace.
    pub fn new(
        principal: Money,
        annual_rate: Percent,
        term_months: u32,
        origin_date: NaiveDate,
    ) -> Self {
        LoanRequest {
            principal,
            annual_rate,
            term_months,
            rate_kind: RateKind::Effective,
            capitalization_frequency: None,
            grace_kind: GraceKind::None,
            grace_months: 0,
            capitalize_during_grace: false,
            origin_date,
            include_grace_in_irr: false,
            duration_method: DurationMethod::TermApproximation,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the schedule and cost-of-credit metrics for a French-method loan.
pub fn calculate_loan(request: &LoanRequest) -> AmortizationResult<ComputationOutput<LoanResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate_request(request)?;
    collect_option_warnings(request, &mut warnings);

    let monthly_rate = monthly_effective_rate(
        request.annual_rate,
        request.rate_kind,
        request.capitalization_frequency,
    )?;

    let built = build_schedule(&ScheduleInput {
        principal: request.principal,
        monthly_rate,
        term_months: request.term_months,
        grace_kind: request.grace_kind,
        grace_months: request.grace_months,
        capitalize_during_grace: request.capitalize_during_grace,
        origin_date: request.origin_date,
    })?;
    let schedule = built.entries;

    let flows = irr_cash_flows(request.principal, &schedule, request.include_grace_in_irr);
    let solution = irr(&flows, DEFAULT_IRR_GUESS)?;
    if !solution.converged {
        warnings.push(format!(
            "IRR did not converge after {} iterations; TCEA and IRR are best estimates",
            solution.iterations
        ));
    }
    let annual_irr = annualize(solution.rate, MONTHS_PER_YEAR)?;
    let annual_pct = annual_percent(annual_irr)?;
    debug!(
        "loan: monthly rate {monthly_rate}, installment {}, monthly IRR {} ({} iterations)",
        built.installment, solution.rate, solution.iterations
    );

    let sensitivity = match request.duration_method {
        DurationMethod::TermApproximation => term_sensitivity(request.term_months, annual_irr)?,
        DurationMethod::CashFlowWeighted => {
            cash_flow_sensitivity(&flows, solution.rate, annual_irr)?
        }
    };

    let total_interest: Money = schedule
        .iter()
        .filter(|e| e.installment > Decimal::ZERO)
        .map(|e| e.installment - e.amortization)
        .sum();
    let total_paid: Money = schedule.iter().map(|e| e.installment).sum();

    let result = LoanResult {
        installment: round_money(built.installment),
        tcea: annual_pct,
        irr: annual_pct,
        irr_monthly: solution.rate,
        irr_converged: solution.converged,
        monthly_rate: round_dp(monthly_rate, 8),
        macaulay_duration: sensitivity.macaulay_duration,
        modified_duration: sensitivity.modified_duration,
        convexity: sensitivity.convexity,
        total_interest: round_money(total_interest),
        total_paid: round_money(total_paid),
        schedule,
    };

    let methodology = match request.duration_method {
        DurationMethod::TermApproximation => {
            "French amortization; TCEA from monthly IRR; term-based duration"
        }
        DurationMethod::CashFlowWeighted => {
            "French amortization; TCEA from monthly IRR; discounted cash-flow duration"
        }
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(methodology, request, warnings, elapsed, result))
}

/// Borrower-view cash flows: principal received, then each installment paid.
/// Grace rows are skipped unless `include_grace` is set.
pub fn irr_cash_flows(
    principal: Money,
    schedule: &[ScheduleEntry],
    include_grace: bool,
) -> Vec<Money> {
    std::iter::once(principal)
        .chain(
            schedule
                .iter()
                .filter(|e| include_grace || e.phase == SchedulePhase::Amortizing)
                .map(|e| -e.installment),
        )
        .collect()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_request(request: &LoanRequest) -> AmortizationResult<()> {
    if request.principal <= Decimal::ZERO {
        return Err(AmortizationError::InvalidInput {
            field: "principal".into(),
            reason: "Principal must be positive".into(),
        });
    }
    if request.annual_rate < Decimal::ZERO {
        return Err(AmortizationError::InvalidInput {
            field: "annual_rate".into(),
            reason: "Annual rate cannot be negative".into(),
        });
    }
    if request.term_months == 0 {
        return Err(AmortizationError::InvalidInput {
            field: "term_months".into(),
            reason: "Term must be at least 1 month".into(),
        });
    }
    Ok(())
}

fn collect_option_warnings(request: &LoanRequest, warnings: &mut Vec<String>) {
    if request.grace_kind == GraceKind::None && request.grace_months > 0 {
        warnings.push(format!(
            "{} grace months ignored because grace kind is None",
            request.grace_months
        ));
    }
    if request.capitalize_during_grace && request.grace_kind != GraceKind::Total {
        warnings.push("capitalize_during_grace only applies to Total grace".into());
    }
    if request.include_grace_in_irr
        && effective_grace_months(request.grace_kind, request.grace_months) == 0
    {
        warnings.push("include_grace_in_irr has no effect without grace periods".into());
    }
    if request.rate_kind == RateKind::Effective && request.capitalization_frequency.is_some() {
        warnings.push("Capitalization frequency is ignored for effective rates".into());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
