//! HTTP API module for the R&D claim engine.
//!
//! This module provides the REST endpoint that runs a claim calculation over
//! a JSON table.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::CalculationRequest;
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;
