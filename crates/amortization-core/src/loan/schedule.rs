//! French-method (constant installment) amortisation schedule with optional
//! total or partial grace periods ahead of the amortising phase.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calendar::add_months;
use crate::error::AmortizationError;
use crate::math::{checked_pow_recip, round_money};
use crate::types::{Money, Rate};
use crate::AmortizationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Grace treatment before the amortising phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraceKind {
    /// No grace; any grace months are ignored.
    #[default]
    None,
    /// Nothing is paid. Interest is either capitalised or waived.
    Total,
    /// Interest-only payments, principal untouched.
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulePhase {
    Grace,
    Amortizing,
}

/// One row of the payment schedule. Money fields are rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// 1-based, grace periods first.
    pub period: u32,
    pub date: NaiveDate,
    pub phase: SchedulePhase,
    pub installment: Money,
    pub interest: Money,
    pub amortization: Money,
    /// Outstanding balance after this period.
    pub balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub principal: Money,
    /// Effective monthly rate as a decimal (0.01 = 1%).
    pub monthly_rate: Rate,
    /// Amortising months, counted after any grace months.
    pub term_months: u32,
    #[serde(default)]
    pub grace_kind: GraceKind,
    #[serde(default)]
    pub grace_months: u32,
    /// Total grace only: add each month's interest to the balance.
    #[serde(default)]
    pub capitalize_during_grace: bool,
    /// Period `p` is dated `origin_date + p months`.
    pub origin_date: NaiveDate,
}

/// Schedule rows plus the unrounded level installment they were built from.
#[derive(Debug, Clone)]
pub(crate) struct BuiltSchedule {
    pub installment: Money,
    pub entries: Vec<ScheduleEntry>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate the full payment schedule: grace periods followed by
/// `term_months` level-installment periods.
pub fn generate_schedule(input: &ScheduleInput) -> AmortizationResult<Vec<ScheduleEntry>> {
    build_schedule(input).map(|built| built.entries)
}

/// Level installment that amortises `balance` over `term_months` at
/// `monthly_rate`: `B i / (1 - (1 + i)^-n)`, or `B / n` at a zero rate.
pub fn level_installment(
    balance: Money,
    monthly_rate: Rate,
    term_months: u32,
) -> AmortizationResult<Money> {
    if balance.is_zero() {
        return Ok(Decimal::ZERO);
    }
    if term_months == 0 {
        return Err(AmortizationError::InvalidInput {
            field: "term_months".into(),
            reason: "Term must be at least 1 month when a balance remains to amortise".into(),
        });
    }
    if monthly_rate.is_zero() {
        return Ok(balance / Decimal::from(term_months));
    }

    let discount = Decimal::ONE
        .checked_add(monthly_rate)
        .and_then(|growth| checked_pow_recip(growth, term_months))
        .ok_or_else(|| AmortizationError::InvalidInput {
            field: "monthly_rate".into(),
            reason: format!("Discount factor over {term_months} months is not representable"),
        })?;
    let denom = Decimal::ONE - discount;
    if denom.is_zero() {
        return Err(AmortizationError::DivisionByZero {
            context: "level installment annuity factor".into(),
        });
    }
    balance
        .checked_mul(monthly_rate)
        .and_then(|interest| interest.checked_div(denom))
        .ok_or_else(|| AmortizationError::InvalidInput {
            field: "principal".into(),
            reason: "Level installment is not representable".into(),
        })
}

pub(crate) fn build_schedule(input: &ScheduleInput) -> AmortizationResult<BuiltSchedule> {
    validate_input(input)?;

    let rate = input.monthly_rate;
    let grace_months = effective_grace_months(input.grace_kind, input.grace_months);
    let mut entries = Vec::with_capacity((grace_months + input.term_months) as usize);
    let mut balance = input.principal;

    for period in 1..=grace_months {
        let interest = accrue(balance, rate, period)?;
        let installment = match input.grace_kind {
            GraceKind::Partial => interest,
            GraceKind::Total | GraceKind::None => Decimal::ZERO,
        };
        if input.grace_kind == GraceKind::Total && input.capitalize_during_grace {
            balance = balance
                .checked_add(interest)
                .ok_or_else(|| balance_overflow(period))?;
        }
        entries.push(ScheduleEntry {
            period,
            date: add_months(input.origin_date, period)?,
            phase: SchedulePhase::Grace,
            installment: round_money(installment),
            interest: round_money(interest),
            amortization: Decimal::ZERO,
            balance: round_money(balance),
        });
    }

    let installment = level_installment(balance, rate, input.term_months)?;

    for k in 1..=input.term_months {
        let period = grace_months + k;
        let interest = accrue(balance, rate, period)?;
        let amortization = installment - interest;
        balance = (balance - amortization).max(Decimal::ZERO);
        entries.push(ScheduleEntry {
            period,
            date: add_months(input.origin_date, period)?,
            phase: SchedulePhase::Amortizing,
            installment: round_money(installment),
            interest: round_money(interest),
            amortization: round_money(amortization),
            balance: round_money(balance),
        });
    }

    Ok(BuiltSchedule {
        installment,
        entries,
    })
}

fn accrue(balance: Money, rate: Rate, period: u32) -> AmortizationResult<Money> {
    balance
        .checked_mul(rate)
        .ok_or_else(|| balance_overflow(period))
}

fn balance_overflow(period: u32) -> AmortizationError {
    AmortizationError::InvalidInput {
        field: "principal".into(),
        reason: format!("Outstanding balance is not representable at period {period}"),
    }
}

/// Grace months that actually produce schedule rows.
pub fn effective_grace_months(grace_kind: GraceKind, grace_months: u32) -> u32 {
    match grace_kind {
        GraceKind::None => 0,
        GraceKind::Total | GraceKind::Partial => grace_months,
    }
}

fn validate_input(input: &ScheduleInput) -> AmortizationResult<()> {
    if input.principal < Decimal::ZERO {
        return Err(AmortizationError::InvalidInput {
            field: "principal".into(),
            reason: "Principal cannot be negative".into(),
        });
    }
    if input.monthly_rate < Decimal::ZERO {
        return Err(AmortizationError::InvalidInput {
            field: "monthly_rate".into(),
            reason: "Monthly rate cannot be negative".into(),
        });
    }
    if input.grace_months.checked_add(input.term_months).is_none() {
        return Err(AmortizationError::InvalidInput {
            field: "grace_months".into(),
            reason: "Grace and amortization periods exceed the schedule range".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
