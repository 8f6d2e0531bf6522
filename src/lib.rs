//! Qualifying expenditure engine for UK R&D tax credit claims
//!
//! This crate takes a column-mapped table of payroll and cost data, applies the
//! UK R&D eligibility rules (exclusions, the externally provided worker cap,
//! NIC uplift and period rates) and produces the qualifying expenditure figure
//! with a line-by-line audit trail.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
