//! Portfolio aggregation over the transaction log.
//!
//! All operations are pure functions of the log and a [`PriceBook`]. The
//! price book is resolved once per computation pass, so each distinct symbol
//! hits the price oracle at most once, and a failed lookup only marks that
//! symbol unavailable.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::transaction::Transaction;
use crate::ports::price_port::PricePort;

/// Rounds to 3 decimal places, the precision of every reported figure.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, PartialEq)]
pub enum Quote {
    Available(f64),
    Unavailable(String),
}

/// Current prices for the symbols of one computation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceBook {
    quotes: BTreeMap<String, Quote>,
}

impl PriceBook {
    /// Looks up every distinct buy symbol in `log` exactly once.
    pub fn resolve(log: &[Transaction], oracle: &dyn PricePort) -> Self {
        let mut quotes = BTreeMap::new();
        for symbol in log.iter().filter_map(Transaction::symbol) {
            if quotes.contains_key(symbol) {
                continue;
            }
            let quote = match oracle.current_price(symbol) {
                Ok(price) if price.is_finite() && price >= 0.0 => {
                    debug!(symbol, price, source = oracle.name(), "resolved price");
                    Quote::Available(price)
                }
                Ok(price) => {
                    warn!(symbol, price, source = oracle.name(), "discarding invalid price");
                    Quote::Unavailable(format!("invalid price {price}"))
                }
                Err(err) => {
                    warn!(symbol, error = %err, source = oracle.name(), "price lookup failed");
                    Quote::Unavailable(err.to_string())
                }
            };
            quotes.insert(symbol.to_string(), quote);
        }
        Self { quotes }
    }

    pub fn from_prices<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            quotes: prices
                .into_iter()
                .map(|(s, p)| (s.into(), Quote::Available(p)))
                .collect(),
        }
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, quote: Quote) {
        self.quotes.insert(symbol.into(), quote);
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        match self.quotes.get(symbol) {
            Some(Quote::Available(p)) => Some(*p),
            _ => None,
        }
    }

    /// Reason a symbol has no price; symbols never looked up are reported as such.
    pub fn unavailable_reason(&self, symbol: &str) -> Option<String> {
        match self.quotes.get(symbol) {
            Some(Quote::Available(_)) => None,
            Some(Quote::Unavailable(reason)) => Some(reason.clone()),
            None => Some("price not requested".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnavailableSymbol {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueSummary {
    /// Mark-to-market value of priced buys plus all deposit cash.
    pub value: f64,
    pub cash: f64,
    /// Symbols excluded from `value` because no price was available.
    pub unavailable: Vec<UnavailableSymbol>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionMark {
    Priced {
        current_price: f64,
        market_value: f64,
        profit_loss: f64,
        profit_loss_percent: f64,
    },
    Unavailable {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSummary {
    pub symbol: String,
    pub total_quantity: f64,
    /// Σ quantity × price over the symbol's buys.
    pub total_cost: f64,
    /// Cost-weighted entry price, total_cost / total_quantity.
    pub average_cost: f64,
    pub mark: PositionMark,
}

impl PositionSummary {
    pub fn current_price(&self) -> Option<f64> {
        match self.mark {
            PositionMark::Priced { current_price, .. } => Some(current_price),
            PositionMark::Unavailable { .. } => None,
        }
    }

    pub fn profit_loss(&self) -> Option<f64> {
        match self.mark {
            PositionMark::Priced { profit_loss, .. } => Some(profit_loss),
            PositionMark::Unavailable { .. } => None,
        }
    }

    pub fn profit_loss_percent(&self) -> Option<f64> {
        match self.mark {
            PositionMark::Priced {
                profit_loss_percent,
                ..
            } => Some(profit_loss_percent),
            PositionMark::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositionRow {
    pub symbol: String,
    pub total_quantity: f64,
    /// Arithmetic mean of the unit prices paid, not weighted by quantity.
    pub mean_price: f64,
    /// total_quantity × mean_price: book value, not market value.
    pub total_value: f64,
}

pub fn total_value(log: &[Transaction], prices: &PriceBook) -> ValueSummary {
    let mut value = 0.0;
    let mut cash = 0.0;
    let mut unavailable: Vec<UnavailableSymbol> = Vec::new();

    for tx in log {
        match tx {
            Transaction::Deposit(d) => {
                cash += d.cash;
                value += d.cash;
            }
            Transaction::Buy(b) => match prices.price(&b.symbol) {
                Some(price) => value += price * b.quantity,
                None => {
                    if !unavailable.iter().any(|u| u.symbol == b.symbol) {
                        unavailable.push(UnavailableSymbol {
                            symbol: b.symbol.clone(),
                            reason: prices.unavailable_reason(&b.symbol).unwrap_or_default(),
                        });
                    }
                }
            },
        }
    }

    ValueSummary {
        value: round3(value),
        cash: round3(cash),
        unavailable,
    }
}

struct Accumulator {
    quantity: f64,
    cost: f64,
    price_sum: f64,
    lots: usize,
}

fn group_buys(log: &[Transaction]) -> BTreeMap<&str, Accumulator> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for buy in log.iter().filter_map(Transaction::as_buy) {
        let acc = groups.entry(buy.symbol.as_str()).or_insert(Accumulator {
            quantity: 0.0,
            cost: 0.0,
            price_sum: 0.0,
            lots: 0,
        });
        acc.quantity += buy.quantity;
        acc.cost += buy.cost();
        acc.price_sum += buy.price;
        acc.lots += 1;
    }
    groups
}

pub fn positions(log: &[Transaction], prices: &PriceBook) -> BTreeMap<String, PositionSummary> {
    group_buys(log)
        .into_iter()
        .map(|(symbol, acc)| {
            // Percent is zero whenever the reported cost rounds to zero.
            let total_cost = round3(acc.cost);
            let mark = match prices.price(symbol) {
                Some(current_price) => {
                    let market_value = current_price * acc.quantity;
                    let profit_loss = market_value - acc.cost;
                    let profit_loss_percent = if total_cost == 0.0 {
                        0.0
                    } else {
                        profit_loss / acc.cost * 100.0
                    };
                    PositionMark::Priced {
                        current_price: round3(current_price),
                        market_value: round3(market_value),
                        profit_loss: round3(profit_loss),
                        profit_loss_percent: round3(profit_loss_percent),
                    }
                }
                None => PositionMark::Unavailable {
                    reason: prices.unavailable_reason(symbol).unwrap_or_default(),
                },
            };
            let summary = PositionSummary {
                symbol: symbol.to_string(),
                total_quantity: round3(acc.quantity),
                total_cost,
                average_cost: round3(acc.cost / acc.quantity),
                mark,
            };
            (symbol.to_string(), summary)
        })
        .collect()
}

pub fn composition(log: &[Transaction]) -> Vec<CompositionRow> {
    group_buys(log)
        .into_iter()
        .map(|(symbol, acc)| {
            let mean_price = acc.price_sum / acc.lots as f64;
            CompositionRow {
                symbol: symbol.to_string(),
                total_quantity: round3(acc.quantity),
                mean_price: round3(mean_price),
                total_value: round3(acc.quantity * mean_price),
            }
        })
        .collect()
}

/// Everything the summary pages show, from one price resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioView {
    pub summary: ValueSummary,
    pub positions: BTreeMap<String, PositionSummary>,
    pub composition: Vec<CompositionRow>,
    pub transaction_count: usize,
}

impl PortfolioView {
    pub fn compute(log: &[Transaction], oracle: &dyn PricePort) -> Self {
        let prices = PriceBook::resolve(log, oracle);
        Self::with_prices(log, &prices)
    }

    pub fn with_prices(log: &[Transaction], prices: &PriceBook) -> Self {
        Self {
            summary: total_value(log, prices),
            positions: positions(log, prices),
            composition: composition(log),
            transaction_count: log.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::FolioError;
    use approx::assert_relative_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct CountingOracle {
        prices: HashMap<String, f64>,
        calls: Mutex<Vec<String>>,
    }

    impl CountingOracle {
        fn new(prices: &[(&str, f64)]) -> Self {
            Self {
                prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl PricePort for CountingOracle {
        fn current_price(&self, symbol: &str) -> Result<f64, FolioError> {
            self.calls.lock().unwrap().push(symbol.to_string());
            self.prices
                .get(symbol)
                .copied()
                .ok_or_else(|| FolioError::price_unavailable(symbol, "unknown symbol"))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn buy(symbol: &str, quantity: f64, price: f64) -> Transaction {
        Transaction::buy("2024-01-02", symbol, quantity, price).unwrap()
    }

    fn deposit(cash: f64) -> Transaction {
        Transaction::deposit("2024-01-01", cash).unwrap()
    }

    #[test]
    fn single_buy_position() {
        let log = vec![buy("AAPL", 10.0, 100.0)];
        let prices = PriceBook::from_prices([("AAPL", 120.0)]);

        let pos = &positions(&log, &prices)["AAPL"];
        assert_eq!(pos.total_quantity, 10.0);
        assert_eq!(pos.total_cost, 1000.0);
        assert_eq!(
            pos.mark,
            PositionMark::Priced {
                current_price: 120.0,
                market_value: 1200.0,
                profit_loss: 200.0,
                profit_loss_percent: 20.0,
            }
        );
    }

    #[test]
    fn deposit_only_log() {
        let log = vec![deposit(500.0)];
        let prices = PriceBook::default();

        let summary = total_value(&log, &prices);
        assert_eq!(summary.value, 500.0);
        assert_eq!(summary.cash, 500.0);
        assert!(summary.unavailable.is_empty());
        assert!(positions(&log, &prices).is_empty());
        assert!(composition(&log).is_empty());
    }

    #[test]
    fn lots_sum_cost_not_average() {
        let log = vec![buy("AAPL", 5.0, 100.0), buy("AAPL", 5.0, 200.0)];
        let prices = PriceBook::from_prices([("AAPL", 150.0)]);

        let pos = &positions(&log, &prices)["AAPL"];
        assert_eq!(pos.total_cost, 1500.0);
        assert_eq!(pos.total_quantity, 10.0);
        assert_eq!(pos.average_cost, 150.0);
        assert_eq!(pos.profit_loss(), Some(0.0));
        assert_eq!(pos.profit_loss_percent(), Some(0.0));
    }

    #[test]
    fn zero_cost_has_zero_percent() {
        let log = vec![buy("GIFT", 4.0, 0.0)];
        let prices = PriceBook::from_prices([("GIFT", 25.0)]);

        let pos = &positions(&log, &prices)["GIFT"];
        assert_eq!(pos.profit_loss(), Some(100.0));
        assert_eq!(pos.profit_loss_percent(), Some(0.0));
    }

    #[test]
    fn cost_rounding_to_zero_has_zero_percent() {
        let log = vec![buy("PENNY", 0.1, 0.001)];
        let prices = PriceBook::from_prices([("PENNY", 1.0)]);

        let pos = &positions(&log, &prices)["PENNY"];
        assert_eq!(pos.total_cost, 0.0);
        assert_eq!(pos.profit_loss(), Some(0.1));
        assert_eq!(pos.profit_loss_percent(), Some(0.0));
    }

    #[test]
    fn total_value_marks_each_lot_and_adds_cash() {
        let log = vec![
            deposit(1000.0),
            buy("AAPL", 2.0, 100.0),
            buy("MSFT", 1.0, 300.0),
            buy("AAPL", 1.0, 110.0),
        ];
        let prices = PriceBook::from_prices([("AAPL", 120.0), ("MSFT", 310.5)]);

        let summary = total_value(&log, &prices);
        assert_relative_eq!(summary.value, 1000.0 + 3.0 * 120.0 + 310.5);
    }

    #[test]
    fn values_round_to_three_places() {
        let log = vec![buy("X", 3.0, 0.3333)];
        let prices = PriceBook::from_prices([("X", 1.23456)]);

        let pos = &positions(&log, &prices)["X"];
        assert_eq!(pos.total_cost, 1.0);
        assert_eq!(pos.current_price(), Some(1.235));
        assert_eq!(total_value(&log, &prices).value, 3.704);
    }

    #[test]
    fn unavailable_symbol_is_isolated() {
        let log = vec![deposit(100.0), buy("AAPL", 1.0, 100.0), buy("NOPE", 2.0, 10.0)];
        let oracle = CountingOracle::new(&[("AAPL", 150.0)]);
        let view = PortfolioView::compute(&log, &oracle);

        assert_eq!(view.summary.value, 250.0);
        assert_eq!(view.summary.unavailable.len(), 1);
        assert_eq!(view.summary.unavailable[0].symbol, "NOPE");
        assert!(view.summary.unavailable[0].reason.contains("unknown symbol"));

        assert_eq!(view.positions["AAPL"].profit_loss(), Some(50.0));
        let nope = &view.positions["NOPE"];
        assert_eq!(nope.total_cost, 20.0);
        assert!(matches!(nope.mark, PositionMark::Unavailable { .. }));
    }

    #[test]
    fn each_symbol_fetched_once_per_pass() {
        let log = vec![
            buy("AAPL", 1.0, 100.0),
            buy("MSFT", 1.0, 100.0),
            buy("AAPL", 1.0, 100.0),
            buy("AAPL", 1.0, 100.0),
        ];
        let oracle = CountingOracle::new(&[("AAPL", 1.0), ("MSFT", 2.0)]);
        let _ = PortfolioView::compute(&log, &oracle);

        let calls = oracle.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &["AAPL".to_string(), "MSFT".to_string()]);
    }

    #[test]
    fn deposits_never_hit_the_oracle() {
        let log = vec![deposit(10.0), deposit(20.0)];
        let oracle = CountingOracle::new(&[]);
        let prices = PriceBook::resolve(&log, &oracle);
        assert!(prices.is_empty());
        assert!(oracle.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn negative_quote_is_unavailable() {
        let log = vec![buy("BAD", 1.0, 1.0)];
        let oracle = CountingOracle::new(&[("BAD", -3.0)]);
        let prices = PriceBook::resolve(&log, &oracle);
        assert_eq!(prices.price("BAD"), None);
        assert!(prices.unavailable_reason("BAD").unwrap().contains("invalid price"));
    }

    #[test]
    fn composition_uses_arithmetic_mean_price() {
        let log = vec![
            buy("MSFT", 1.0, 300.0),
            buy("AAPL", 1.0, 100.0),
            buy("AAPL", 3.0, 200.0),
        ];
        let rows = composition(&log);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "AAPL");
        assert_eq!(rows[0].total_quantity, 4.0);
        assert_eq!(rows[0].mean_price, 150.0);
        assert_eq!(rows[0].total_value, 600.0);
        assert_eq!(rows[1].symbol, "MSFT");
        assert_eq!(rows[1].total_value, 300.0);
    }

    #[test]
    fn placeholder_when_price_never_requested() {
        let log = vec![buy("AAPL", 1.0, 1.0)];
        let pos = &positions(&log, &PriceBook::default())["AAPL"];
        assert_eq!(
            pos.mark,
            PositionMark::Unavailable {
                reason: "price not requested".into()
            }
        );
    }
}
