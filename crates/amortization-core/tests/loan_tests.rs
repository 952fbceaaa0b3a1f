use amortization_core::loan::calculator::{calculate_loan, irr_cash_flows, LoanRequest};
use amortization_core::loan::rates::{monthly_effective_rate, RateKind};
use amortization_core::loan::schedule::{generate_schedule, GraceKind, ScheduleInput, SchedulePhase};
use amortization_core::loan::DurationMethod;
use amortization_core::AmortizationError;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn origin() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
}

fn schedule_input(monthly_rate: Decimal, term_months: u32) -> ScheduleInput {
    ScheduleInput {
        principal: dec!(50_000),
        monthly_rate,
        term_months,
        grace_kind: GraceKind::None,
        grace_months: 0,
        capitalize_during_grace: false,
        origin_date: origin(),
    }
}

// ===========================================================================
// Schedule shape
// ===========================================================================

#[test]
fn test_schedule_length_and_contiguous_periods() {
    for (kind, grace, term) in [
        (GraceKind::None, 0, 1),
        (GraceKind::Partial, 3, 24),
        (GraceKind::Total, 12, 36),
        (GraceKind::Total, 5, 5),
    ] {
        let mut input = schedule_input(dec!(0.008), term);
        input.grace_kind = kind;
        input.grace_months = grace;
        let schedule = generate_schedule(&input).unwrap();

        assert_eq!(schedule.len() as u32, grace + term);
        for (idx, row) in schedule.iter().enumerate() {
            assert_eq!(row.period, idx as u32 + 1);
        }
    }
}

#[test]
fn test_final_balance_rounds_to_zero() {
    for rate in [dec!(0), dec!(0.001), dec!(0.0125), dec!(0.03)] {
        let schedule = generate_schedule(&schedule_input(rate, 180)).unwrap();
        let last = schedule.last().unwrap();
        assert!(
            last.balance.abs() <= dec!(0.01),
            "rate {} left balance {}",
            rate,
            last.balance
        );
    }
}

#[test]
fn test_dates_clamp_to_month_end() {
    let schedule = generate_schedule(&schedule_input(dec!(0.01), 3)).unwrap();
    let dates: Vec<NaiveDate> = schedule.iter().map(|e| e.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
            NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        ]
    );
}

// ===========================================================================
// Grace periods
// ===========================================================================

#[test]
fn test_partial_grace_interest_only() {
    let mut input = schedule_input(dec!(0.0117), 60);
    input.grace_kind = GraceKind::Partial;
    input.grace_months = 6;
    let schedule = generate_schedule(&input).unwrap();

    for row in schedule.iter().take(6) {
        assert_eq!(row.phase, SchedulePhase::Grace);
        assert_eq!(row.amortization, Decimal::ZERO);
        assert_eq!(row.installment, row.interest);
    }
    assert_eq!(schedule[6].phase, SchedulePhase::Amortizing);
    assert!(schedule[6].amortization > Decimal::ZERO);
}

#[test]
fn test_total_grace_capitalisation_strictly_increases_balance() {
    let mut input = schedule_input(dec!(0.01), 24);
    input.grace_kind = GraceKind::Total;
    input.grace_months = 6;
    input.capitalize_during_grace = true;
    let schedule = generate_schedule(&input).unwrap();

    let mut previous = input.principal;
    for row in schedule.iter().take(6) {
        assert_eq!(row.installment, Decimal::ZERO);
        assert!(row.balance > previous);
        previous = row.balance;
    }
}

// ===========================================================================
// Rate conversion
// ===========================================================================

#[test]
fn test_rate_converter_reference_points() {
    let nominal = monthly_effective_rate(dec!(12), RateKind::Nominal, Some(12)).unwrap();
    assert!((nominal - dec!(0.0100)).abs() < dec!(0.0001));

    let effective = monthly_effective_rate(dec!(12.5), RateKind::Effective, None).unwrap();
    assert!((effective - dec!(0.009849)).abs() < dec!(0.0001));
}

#[test]
fn test_zero_rate_installment_is_principal_over_term() {
    let request = LoanRequest::new(dec!(100_000), Decimal::ZERO, 120, origin());
    let out = calculate_loan(&request).unwrap().result;
    assert_eq!(out.installment, dec!(833.33));
}

// ===========================================================================
// Full loan scenarios
// ===========================================================================

#[test]
fn test_reference_mortgage_scenario() {
    let request = LoanRequest::new(dec!(280_000), dec!(12.5), 240, origin());
    let out = calculate_loan(&request).unwrap().result;

    assert!(out.installment > dec!(3000) && out.installment < dec!(3500));
    assert!(out.tcea > dec!(10) && out.tcea < dec!(15));
    assert_eq!(out.schedule.len(), 240);
    assert!(out.schedule[239].balance.abs() <= dec!(0.01));
}

#[test]
fn test_partial_grace_scenario_counts_grace_separately() {
    let mut request = LoanRequest::new(dec!(100_000), dec!(15), 60, origin());
    request.grace_kind = GraceKind::Partial;
    request.grace_months = 6;
    let out = calculate_loan(&request).unwrap().result;

    assert_eq!(out.schedule.len(), 66);
    assert_eq!(out.schedule[0].amortization, Decimal::ZERO);
    assert!(out.schedule[6].amortization > Decimal::ZERO);
    assert!(out.schedule[65].balance.abs() <= dec!(0.01));
}

#[test]
fn test_irr_round_trip_recovers_contract_rate() {
    for (rate, term) in [(dec!(8), 36), (dec!(12.5), 240), (dec!(24), 12), (dec!(45), 60)] {
        let out = calculate_loan(&LoanRequest::new(dec!(75_000), rate, term, origin()))
            .unwrap()
            .result;
        assert!(
            (out.tcea - rate).abs() < dec!(0.5),
            "rate {} recovered as {}",
            rate,
            out.tcea
        );
    }
}

#[test]
fn test_nominal_rate_loan_costs_more_than_nominal_quote() {
    let mut request = LoanRequest::new(dec!(60_000), dec!(12), 48, origin());
    request.rate_kind = RateKind::Nominal;
    request.capitalization_frequency = Some(12);
    let out = calculate_loan(&request).unwrap().result;
    // 12% TNA monthly = 12.68% TEA
    assert!((out.tcea - dec!(12.68)).abs() < dec!(0.05));
}

#[test]
fn test_irr_cash_flows_exclude_grace_by_default() {
    let mut request = LoanRequest::new(dec!(10_000), dec!(10), 12, origin());
    request.grace_kind = GraceKind::Partial;
    request.grace_months = 2;
    let out = calculate_loan(&request).unwrap().result;

    let flows = irr_cash_flows(request.principal, &out.schedule, false);
    assert_eq!(flows.len(), 13);
    assert_eq!(flows[0], dec!(10_000));
    assert_eq!(flows[1], -out.installment);

    let with_grace = irr_cash_flows(request.principal, &out.schedule, true);
    assert_eq!(with_grace.len(), 15);
}

#[test]
fn test_idempotent_results() {
    let mut request = LoanRequest::new(dec!(123_456.78), dec!(17.3), 97, origin());
    request.grace_kind = GraceKind::Total;
    request.grace_months = 4;
    request.capitalize_during_grace = true;
    request.duration_method = DurationMethod::CashFlowWeighted;

    let first = calculate_loan(&request).unwrap().result;
    let second = calculate_loan(&request).unwrap().result;
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_request_deserialises_with_defaults() {
    let request: LoanRequest = serde_json::from_str(
        r#"{"principal": "100000", "annual_rate": "15", "term_months": 60, "origin_date": "2025-01-01"}"#,
    )
    .unwrap();
    assert_eq!(request.rate_kind, RateKind::Effective);
    assert_eq!(request.grace_kind, GraceKind::None);
    assert_eq!(request.grace_months, 0);
    assert_eq!(request.duration_method, DurationMethod::TermApproximation);
    assert!(calculate_loan(&request).is_ok());
}

#[test]
fn test_negative_rate_is_invalid_input() {
    let request = LoanRequest::new(dec!(1000), dec!(-1), 12, origin());
    let err = calculate_loan(&request).unwrap_err();
    assert!(matches!(err, AmortizationError::InvalidInput { .. }));
}
