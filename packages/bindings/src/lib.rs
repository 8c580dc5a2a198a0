use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use underwrite_core::deal::{self, DealInputs};
use underwrite_core::monte_carlo::{self, MonteCarloConfig};
use underwrite_core::pro_forma;
use underwrite_core::recommendation::{self, ExternalSignals, LeaseTerms, ReturnMetrics};
use underwrite_core::scenarios::{self, SensitivityDriver};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse a deal and reject inputs the engine cannot meaningfully underwrite.
fn parse_deal(input_json: &str) -> NapiResult<DealInputs> {
    let deal: DealInputs = serde_json::from_str(input_json).map_err(to_napi_error)?;
    deal::validate_deal(&deal).map_err(to_napi_error)?;
    Ok(deal)
}

// ---------------------------------------------------------------------------
// Request envelopes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SensitivityRequest {
    deal: DealInputs,
    driver: SensitivityDriver,
    #[serde(default)]
    deltas: Option<Vec<Decimal>>,
}

#[derive(Deserialize)]
struct MonteCarloRequest {
    deal: DealInputs,
    #[serde(default)]
    config: MonteCarloConfig,
}

#[derive(Deserialize)]
struct RecommendationRequest {
    deal: DealInputs,
    #[serde(default)]
    signals: ExternalSignals,
}

#[derive(Deserialize)]
struct LeaseComparisonRequest {
    deal: DealInputs,
    lease: LeaseTerms,
}

// ---------------------------------------------------------------------------
// Underwriting
// ---------------------------------------------------------------------------

#[napi]
pub fn derive_assumptions(input_json: String) -> NapiResult<String> {
    let deal = parse_deal(&input_json)?;
    let output = deal::derive_assumptions(&deal).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn build_pro_forma(input_json: String) -> NapiResult<String> {
    let deal = parse_deal(&input_json)?;
    let output = pro_forma::build_pro_forma(&deal).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn run_sensitivity(input_json: String) -> NapiResult<String> {
    let request: SensitivityRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    deal::validate_deal(&request.deal).map_err(to_napi_error)?;
    let output =
        scenarios::run_sensitivity(&request.deal, request.driver, request.deltas.as_deref())
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn run_all_sensitivities(input_json: String) -> NapiResult<String> {
    let deal = parse_deal(&input_json)?;
    let output = scenarios::run_all_sensitivities(&deal).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn run_monte_carlo(input_json: String) -> NapiResult<String> {
    let request: MonteCarloRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    deal::validate_deal(&request.deal).map_err(to_napi_error)?;
    let output =
        monte_carlo::run_monte_carlo(&request.deal, &request.config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

#[napi]
pub fn score_recommendation(input_json: String) -> NapiResult<String> {
    let request: RecommendationRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    deal::validate_deal(&request.deal).map_err(to_napi_error)?;
    let built = pro_forma::build_pro_forma(&request.deal).map_err(to_napi_error)?;
    let output = recommendation::score_recommendation(
        &ReturnMetrics::from(&built.result.metrics),
        &request.signals,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_lease(input_json: String) -> NapiResult<String> {
    let request: LeaseComparisonRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = recommendation::compare_lease_to_deal(&request.deal, &request.lease);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn summarize_forecast(input_json: String) -> NapiResult<String> {
    let rates: Vec<Decimal> = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = recommendation::summarize_forecast(&rates);
    serde_json::to_string(&output).map_err(to_napi_error)
}
