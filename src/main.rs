//! HTTP server for the R&D claim engine.
//!
//! Environment:
//! - `RD_RULES_DIR`: rules directory (default `./config/uk_rd`)
//! - `RD_ENGINE_ADDR`: listen address (default `0.0.0.0:3000`)
//! - `RUST_LOG`: tracing filter (default `rd_claim_engine=debug,info`)

use std::env;
use std::process;

use rd_claim_engine::api::{AppState, create_router};
use rd_claim_engine::config::RuleLoader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_RULES_DIR: &str = "./config/uk_rd";
const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rd_claim_engine=debug,info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rules_dir = env::var("RD_RULES_DIR").unwrap_or_else(|_| DEFAULT_RULES_DIR.to_string());
    let addr = env::var("RD_ENGINE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());

    let rules = match RuleLoader::load(&rules_dir) {
        Ok(rules) => rules,
        Err(e) => {
            error!(rules_dir = %rules_dir, "Failed to load rules: {}", e);
            process::exit(1);
        }
    };
    info!(
        rules_dir = %rules_dir,
        period_rates = rules.period_rates().len(),
        keywords = rules.excluded_keywords().len(),
        "Rules loaded"
    );

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, "Failed to bind: {}", e);
            process::exit(1);
        }
    };
    info!(addr = %addr, "Listening");

    if let Err(e) = axum::serve(listener, create_router(AppState::new(rules))).await {
        error!("Server error: {}", e);
        process::exit(1);
    }
}
