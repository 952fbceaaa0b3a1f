//! Loan amortization and cost-of-credit analytics.
//!
//! Builds French-method (level installment) payment schedules with optional
//! total or partial grace periods, and derives the effective annual cost
//! (TCEA), internal rate of return, duration and convexity of the resulting
//! cash flows. Every computation is a pure function over `rust_decimal`
//! values: identical inputs always give identical outputs.

pub mod calendar;
pub mod error;
pub mod loan;
pub mod math;
pub mod time_value;
pub mod types;

pub use error::AmortizationError;
pub use types::*;

/// Standard result type for all amortization operations
pub type AmortizationResult<T> = Result<T, AmortizationError>;
