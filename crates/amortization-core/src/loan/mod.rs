pub mod calculator;
pub mod metrics;
pub mod rates;
pub mod schedule;

pub use calculator::{calculate_loan, LoanRequest, LoanResult};
pub use metrics::DurationMethod;
pub use rates::RateKind;
pub use schedule::{GraceKind, ScheduleEntry, SchedulePhase};
