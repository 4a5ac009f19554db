//! Fixed price table, read from the `[static_prices]` config section.

use std::collections::HashMap;

use crate::domain::error::FolioError;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;

#[derive(Debug, Clone, Default)]
pub struct StaticPriceAdapter {
    prices: HashMap<String, f64>,
}

impl StaticPriceAdapter {
    pub fn new<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        Self {
            prices: prices
                .into_iter()
                .map(|(s, p)| (s.as_ref().trim().to_uppercase(), p))
                .collect(),
        }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FolioError> {
        let mut prices = HashMap::new();
        for (symbol, value) in config.section_entries("static_prices") {
            let price: f64 = value.trim().parse().map_err(|_| FolioError::ConfigInvalid {
                section: "static_prices".into(),
                key: symbol.clone(),
                reason: format!("'{value}' is not a number"),
            })?;
            prices.insert(symbol.trim().to_uppercase(), price);
        }
        Ok(Self { prices })
    }
}

impl PricePort for StaticPriceAdapter {
    fn current_price(&self, symbol: &str) -> Result<f64, FolioError> {
        self.prices
            .get(&symbol.to_uppercase())
            .copied()
            .ok_or_else(|| FolioError::price_unavailable(symbol, "no static price configured"))
    }

    fn name(&self) -> &str {
        "static"
    }
}
