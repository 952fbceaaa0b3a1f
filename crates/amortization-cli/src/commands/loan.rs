use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use amortization_core::loan::calculator::{self, LoanRequest};
use amortization_core::loan::metrics::{self, CashFlowAnalysisInput, TceaInput};
use amortization_core::loan::rates::{self, RateConversionInput};
use amortization_core::loan::{DurationMethod, GraceKind, RateKind};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RateKindArg {
    Effective,
    Nominal,
}

impl From<RateKindArg> for RateKind {
    fn from(arg: RateKindArg) -> Self {
        match arg {
            RateKindArg::Effective => RateKind::Effective,
            RateKindArg::Nominal => RateKind::Nominal,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GraceKindArg {
    None,
    Total,
    Partial,
}

impl From<GraceKindArg> for GraceKind {
    fn from(arg: GraceKindArg) -> Self {
        match arg {
            GraceKindArg::None => GraceKind::None,
            GraceKindArg::Total => GraceKind::Total,
            GraceKindArg::Partial => GraceKind::Partial,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DurationMethodArg {
    Term,
    CashFlow,
}

impl From<DurationMethodArg> for DurationMethod {
    fn from(arg: DurationMethodArg) -> Self {
        match arg {
            DurationMethodArg::Term => DurationMethod::TermApproximation,
            DurationMethodArg::CashFlow => DurationMethod::CashFlowWeighted,
        }
    }
}

/// Arguments for a loan calculation
#[derive(Args)]
pub struct LoanArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount financed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual rate in percentage points (e.g. 12.5 for 12.5%)
    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    /// Amortising months, excluding grace months
    #[arg(long)]
    pub term_months: Option<u32>,

    /// Whether the annual rate is effective or nominal
    #[arg(long, value_enum, default_value = "effective")]
    pub rate_kind: RateKindArg,

    /// Capitalisation periods per year for nominal rates (e.g. 12, 4, 360)
    #[arg(long)]
    pub capitalization: Option<u32>,

    /// Grace treatment before amortisation starts
    #[arg(long, value_enum, default_value = "none")]
    pub grace_kind: GraceKindArg,

    /// Number of grace months
    #[arg(long, default_value = "0")]
    pub grace_months: u32,

    /// Capitalise interest during total grace
    #[arg(long)]
    pub capitalize_grace: bool,

    /// Schedule origin date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub origin_date: Option<NaiveDate>,

    /// Include grace-period installments in the IRR cash flows
    #[arg(long)]
    pub include_grace_in_irr: bool,

    /// Duration formulation reported in the result
    #[arg(long, value_enum, default_value = "term")]
    pub duration_method: DurationMethodArg,
}

/// Arguments for rate conversion
#[derive(Args)]
pub struct RateArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Annual rate in percentage points
    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    #[arg(long, value_enum, default_value = "effective")]
    pub rate_kind: RateKindArg,

    /// Capitalisation periods per year for nominal rates
    #[arg(long)]
    pub capitalization: Option<u32>,
}

/// Arguments for cash-flow analytics
#[derive(Args)]
pub struct CashFlowArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Periodic cash flows (comma-separated, e.g. "-1000,400,400,400")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Periodic yield for NPV and duration (e.g. 0.05)
    #[arg(long, allow_hyphen_values = true)]
    pub yield_rate: Option<Decimal>,

    /// Starting guess for the IRR search
    #[arg(long, allow_hyphen_values = true)]
    pub guess: Option<Decimal>,
}

/// Arguments for TCEA with up-front costs
#[derive(Args)]
pub struct TceaArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub principal: Option<Decimal>,

    #[arg(long)]
    pub monthly_payment: Option<Decimal>,

    #[arg(long)]
    pub term_months: Option<u32>,

    /// Fees and charges deducted up front
    #[arg(long)]
    pub additional_costs: Option<Decimal>,
}

fn loan_request(args: LoanArgs) -> Result<LoanRequest, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        return Ok(input::file::read_json(path)?);
    }
    if let Some(data) = input::stdin::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }

    Ok(LoanRequest {
        principal: args
            .principal
            .ok_or("--principal is required (or provide --input)")?,
        annual_rate: args
            .annual_rate
            .ok_or("--annual-rate is required (or provide --input)")?,
        term_months: args
            .term_months
            .ok_or("--term-months is required (or provide --input)")?,
        rate_kind: args.rate_kind.into(),
        capitalization_frequency: args.capitalization,
        grace_kind: args.grace_kind.into(),
        grace_months: args.grace_months,
        capitalize_during_grace: args.capitalize_grace,
        origin_date: args
            .origin_date
            .unwrap_or_else(|| chrono::Local::now().date_naive()),
        include_grace_in_irr: args.include_grace_in_irr,
        duration_method: args.duration_method.into(),
    })
}

pub fn run_loan(args: LoanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = loan_request(args)?;
    let result = calculator::calculate_loan(&request)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: LoanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = loan_request(args)?;
    let result = calculator::calculate_loan(&request)?;
    Ok(serde_json::to_value(result.result.schedule)?)
}

pub fn run_rate(args: RateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rate_input: RateConversionInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        RateConversionInput {
            annual_rate: args
                .annual_rate
                .ok_or("--annual-rate is required (or provide --input)")?,
            rate_kind: args.rate_kind.into(),
            capitalization_frequency: args.capitalization,
        }
    };

    let result = rates::convert_rate(&rate_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_cash_flows(args: CashFlowArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cf_input: CashFlowAnalysisInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        CashFlowAnalysisInput {
            cash_flows: args
                .cash_flows
                .ok_or("--cash-flows is required (or provide --input)")?,
            yield_rate: args
                .yield_rate
                .ok_or("--yield-rate is required (or provide --input)")?,
            irr_guess: args.guess,
        }
    };

    let result = metrics::analyze_cash_flows(&cf_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_tcea(args: TceaArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let tcea_input: TceaInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        TceaInput {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            monthly_payment: args
                .monthly_payment
                .ok_or("--monthly-payment is required (or provide --input)")?,
            term_months: args
                .term_months
                .ok_or("--term-months is required (or provide --input)")?,
            additional_costs: args.additional_costs.unwrap_or(Decimal::ZERO),
        }
    };

    let result = metrics::calculate_tcea(&tcea_input)?;
    Ok(serde_json::to_value(result)?)
}
