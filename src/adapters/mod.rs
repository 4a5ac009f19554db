//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod file_config_adapter;
pub mod static_price_adapter;
#[cfg(feature = "yahoo")]
pub mod yahoo_adapter;
#[cfg(feature = "web")]
pub mod web;
