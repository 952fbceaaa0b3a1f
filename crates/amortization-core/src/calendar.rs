use chrono::{Months, NaiveDate};

use crate::error::AmortizationError;
use crate::AmortizationResult;

/// Advance `date` by whole calendar months.
///
/// The day of month is clamped to the end of the target month, so
/// 2024-01-31 + 1 month is 2024-02-29.
pub fn add_months(date: NaiveDate, months: u32) -> AmortizationResult<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| {
            AmortizationError::DateError(format!(
                "{date} + {months} months is outside the supported calendar range"
            ))
        })
}

/// Payment dates for periods `1..=periods`, each `period` months after `origin`.
pub fn payment_dates(origin: NaiveDate, periods: u32) -> AmortizationResult<Vec<NaiveDate>> {
    (1..=periods).map(|p| add_months(origin, p)).collect()
}
