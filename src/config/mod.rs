//! Rule configuration for R&D claim calculations.
//!
//! This module provides the [`RuleSet`] consumed by every calculation, and
//! [`RuleLoader`] for reading one from a directory of YAML files.
//!
//! # Example
//!
//! ```no_run
//! use rd_claim_engine::config::RuleLoader;
//!
//! let rules = RuleLoader::load("./config/uk_rd").unwrap();
//! println!("NIC uplift: {}", rules.nic_uplift_rate());
//! ```

mod loader;
mod types;

pub use loader::RuleLoader;
pub use types::{
    DEFAULT_EPW_CAP_FRACTION, DEFAULT_NIC_UPLIFT_RATE, DEFAULT_RD_FRACTION, PeriodRate, RuleSet,
    RulesFile,
};
