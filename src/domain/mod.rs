//! Core domain types and logic.

pub mod transaction;
pub mod store;
pub mod valuation;
pub mod config_validation;
pub mod error;
