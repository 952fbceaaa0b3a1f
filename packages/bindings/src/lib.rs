//! Node.js bindings: every function takes the operation's input as a JSON
//! string and returns the full computation envelope as a JSON string.

use napi::Result as NapiResult;
use napi_derive::napi;

use amortization_core::loan::{calculator, metrics, rates};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[napi]
pub fn calculate_loan(input_json: String) -> NapiResult<String> {
    let input: calculator::LoanRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = calculator::calculate_loan(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn convert_rate(input_json: String) -> NapiResult<String> {
    let input: rates::RateConversionInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = rates::convert_rate(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_cash_flows(input_json: String) -> NapiResult<String> {
    let input: metrics::CashFlowAnalysisInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = metrics::analyze_cash_flows(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_tcea(input_json: String) -> NapiResult<String> {
    let input: metrics::TceaInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = metrics::calculate_tcea(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
