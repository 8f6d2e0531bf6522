//! HTTP request handlers for the R&D claim engine API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{calculate, estimate_credit};
use crate::config::RuleSet;
use crate::error::EngineResult;
use crate::models::ClaimResult;

use super::request::CalculationRequest;
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/calculate", post(calculate_handler))
        .with_state(state)
}

fn json_error(status: StatusCode, error: ApiError) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(error),
    )
        .into_response()
}

/// Handler for POST /calculate endpoint.
///
/// Accepts a table, mapping and overrides and returns the claim result.
async fn calculate_handler(
    State(state): State<AppState>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing calculation request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let error = match rejection {
                JsonRejection::JsonDataError(err) => {
                    let body_text = err.body_text();
                    warn!(
                        correlation_id = %correlation_id,
                        error = %body_text,
                        "JSON data error"
                    );
                    if body_text.contains("missing field") {
                        ApiError::validation_error(body_text)
                    } else {
                        ApiError::malformed_json(body_text)
                    }
                }
                JsonRejection::JsonSyntaxError(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "JSON syntax error"
                    );
                    ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
                }
                _ => ApiError::malformed_json("Failed to parse request body"),
            };
            return json_error(StatusCode::BAD_REQUEST, error);
        }
    };

    let start_time = Instant::now();
    match perform_calculation(&request, state.rules()) {
        Ok(result) => {
            info!(
                correlation_id = %correlation_id,
                calculation_id = %result.calculation_id,
                line_items = result.totals.line_item_count,
                total_qualifying_expenditure = %result.totals.total_qualifying_expenditure,
                duration_us = start_time.elapsed().as_micros(),
                "Calculation completed successfully"
            );
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                Json(result),
            )
                .into_response()
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "Calculation failed"
            );
            let api_error: ApiErrorResponse = err.into();
            json_error(api_error.status, api_error.error)
        }
    }
}

/// Runs the engine for one request, adding a credit estimate when a period start is given.
fn perform_calculation(request: &CalculationRequest, rules: &RuleSet) -> EngineResult<ClaimResult> {
    let table = request.table()?;
    let mapping = request.column_mapping()?;
    let overrides = request.overrides()?;

    let mut result = calculate(rules, &table, &mapping, &overrides)?;
    if let Some(period_start) = request.accounting_period_start {
        result.credit = Some(estimate_credit(rules, &result.totals, period_start)?);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleLoader;
    use axum::body::Body;
    use axum::http::Request;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use std::str::FromStr;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let rules = RuleLoader::load("./config/uk_rd").expect("Failed to load rules");
        AppState::new(rules)
    }

    fn create_valid_request() -> Value {
        json!({
            "table": {
                "columns": ["Name", "Gross", "NI", "Pension", "R&D"],
                "rows": [["Jane Doe", "1000", "100", "50", "0.8"]]
            },
            "mapping": {
                "employee_name": "Name",
                "gross_pay": "Gross",
                "employer_ni": "NI",
                "employer_pension": "Pension",
                "rd_percentage": "R&D"
            }
        })
    }

    async fn post(body: String) -> (StatusCode, Vec<u8>) {
        let response = create_router(create_test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/calculate")
                    .header("Content-Type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_api_001_valid_request_returns_200() {
        let (status, body) = post(create_valid_request().to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let result: ClaimResult = serde_json::from_slice(&body).unwrap();
        assert_eq!(result.line_items.len(), 1);
        assert_eq!(
            result.totals.total_qualifying_expenditure,
            Decimal::from_str("1046.96").unwrap()
        );
        assert!(result.credit.is_none());
    }

    #[tokio::test]
    async fn test_api_002_malformed_json_returns_400() {
        let (status, body) = post("{invalid json".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_api_003_missing_table_returns_400() {
        let (status, body) = post(json!({"mapping": {}}).to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert!(error.message.contains("missing field"));
    }

    #[tokio::test]
    async fn test_api_004_missing_grouping_column_returns_data_error() {
        let mut request = create_valid_request();
        request["mapping"] = json!({"gross_pay": "Gross"});

        let (status, body) = post(request.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "DATA_ERROR");
        assert!(error.message.contains("employee_name"));
    }

    #[tokio::test]
    async fn test_api_005_credit_estimate_added() {
        let mut request = create_valid_request();
        request["accounting_period_start"] = json!("2024-04-01");

        let (status, body) = post(request.to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let result: ClaimResult = serde_json::from_slice(&body).unwrap();
        let credit = result.credit.unwrap();
        assert_eq!(credit.rate, Decimal::from_str("0.10").unwrap());
        assert_eq!(credit.credit_amount, Decimal::from_str("104.696").unwrap());
    }
}
