//! Price oracle port trait.

use crate::domain::error::FolioError;

/// Source of the latest closing price for an instrument.
///
/// Implementations return [`FolioError::PriceUnavailable`] when the symbol is
/// unknown or the provider has no usable quote.
pub trait PricePort {
    fn current_price(&self, symbol: &str) -> Result<f64, FolioError>;

    fn name(&self) -> &str;
}
