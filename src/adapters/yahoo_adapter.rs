//! Yahoo Finance chart API price oracle.
//!
//! Queries `/v8/finance/chart/{SYMBOL}?range=1d&interval=1d` and takes the
//! last non-null daily close, falling back to `meta.regularMarketPrice` when
//! the session has no close yet. Every request carries an explicit timeout.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::domain::error::FolioError;
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_TIMEOUT_SECS: f64 = 10.0;
const DEFAULT_USER_AGENT: &str = concat!("folio/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

pub struct YahooPriceAdapter {
    client: Client,
    base_url: String,
}

impl YahooPriceAdapter {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FolioError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FolioError::ConfigInvalid {
                section: "prices".into(),
                key: "provider".into(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: YAHOO_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, FolioError> {
        let timeout = match config.get_double("prices", "timeout_secs", DEFAULT_TIMEOUT_SECS) {
            t if t.is_finite() && t > 0.0 => t,
            _ => DEFAULT_TIMEOUT_SECS,
        };
        let user_agent = config
            .get_string("prices", "user_agent")
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let adapter = Self::new(Duration::from_secs_f64(timeout), &user_agent)?;
        Ok(match config.get_string("prices", "base_url") {
            Some(url) => adapter.with_base_url(url),
            None => adapter,
        })
    }

    /// `{base}/v8/finance/chart/{symbol}` with the symbol percent-encoded as
    /// a single path segment.
    fn chart_url(&self, symbol: &str) -> Result<Url, FolioError> {
        let invalid = || {
            FolioError::price_unavailable(symbol, format!("invalid base URL '{}'", self.base_url))
        };
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }

    fn parse_close(envelope: &ChartEnvelope, symbol: &str) -> Result<f64, FolioError> {
        if let Some(err) = &envelope.chart.error {
            let reason = match &err.description {
                Some(desc) => format!("{}: {}", err.code, desc),
                None => err.code.clone(),
            };
            return Err(FolioError::price_unavailable(symbol, reason));
        }

        let result = envelope
            .chart
            .result
            .as_ref()
            .and_then(|r| r.first())
            .ok_or_else(|| FolioError::price_unavailable(symbol, "no chart data"))?;

        let last_close = result
            .indicators
            .as_ref()
            .and_then(|i| i.quote.first())
            .and_then(|q| q.close.iter().rev().find_map(|c| *c));

        let price = last_close
            .or(result.meta.regular_market_price)
            .ok_or_else(|| FolioError::price_unavailable(symbol, "no close for the session"))?;

        if !price.is_finite() || price < 0.0 {
            return Err(FolioError::price_unavailable(
                symbol,
                format!("invalid price {price}"),
            ));
        }
        Ok(price)
    }
}

impl PricePort for YahooPriceAdapter {
    fn current_price(&self, symbol: &str) -> Result<f64, FolioError> {
        let url = self.chart_url(symbol)?;
        debug!(symbol, url = %url, "requesting chart");

        let response = self
            .client
            .get(url)
            .query(&[("range", "1d"), ("interval", "1d")])
            .send()
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("request failed: {e}")
                };
                FolioError::price_unavailable(symbol, reason)
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FolioError::price_unavailable(symbol, "unknown symbol"));
        }
        if !status.is_success() {
            return Err(FolioError::price_unavailable(
                symbol,
                format!("provider returned status {status}"),
            ));
        }

        let envelope: ChartEnvelope = response
            .json()
            .map_err(|e| FolioError::price_unavailable(symbol, format!("bad response: {e}")))?;
        Self::parse_close(&envelope, symbol)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}
