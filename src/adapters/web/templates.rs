//! HTML templates using Askama.
//!
//! Each page is a fragment template; full-page responses wrap the rendered
//! fragment in [`BasePage`].

use askama::Template;

use crate::domain::transaction::Transaction;
use crate::domain::valuation::{CompositionRow, PortfolioView, PositionMark, UnavailableSymbol};

#[derive(Template)]
#[template(path = "base.html")]
pub struct BasePage<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

pub struct PositionRow {
    pub symbol: String,
    pub quantity: String,
    pub total_cost: String,
    pub average_cost: String,
    pub current_price: String,
    pub market_value: String,
    pub profit_loss: String,
    pub profit_loss_percent: String,
    pub css: &'static str,
}

const UNAVAILABLE: &str = "unavailable";

#[derive(Template)]
#[template(path = "summary.html")]
pub struct SummaryTemplate<'a> {
    pub total_value: String,
    pub cash: String,
    pub transaction_count: usize,
    pub unavailable: &'a [UnavailableSymbol],
    pub positions: Vec<PositionRow>,
    pub today: String,
}

impl<'a> SummaryTemplate<'a> {
    pub fn new(view: &'a PortfolioView, today: String) -> Self {
        let positions = view
            .positions
            .values()
            .map(|p| {
                let (current_price, market_value, profit_loss, percent, css) = match &p.mark {
                    PositionMark::Priced {
                        current_price,
                        market_value,
                        profit_loss,
                        profit_loss_percent,
                    } => (
                        current_price.to_string(),
                        market_value.to_string(),
                        profit_loss.to_string(),
                        format!("{profit_loss_percent}%"),
                        if *profit_loss < 0.0 { "loss" } else { "gain" },
                    ),
                    PositionMark::Unavailable { .. } => (
                        UNAVAILABLE.to_string(),
                        UNAVAILABLE.to_string(),
                        UNAVAILABLE.to_string(),
                        UNAVAILABLE.to_string(),
                        "",
                    ),
                };
                PositionRow {
                    symbol: p.symbol.clone(),
                    quantity: p.total_quantity.to_string(),
                    total_cost: p.total_cost.to_string(),
                    average_cost: p.average_cost.to_string(),
                    current_price,
                    market_value,
                    profit_loss,
                    profit_loss_percent: percent,
                    css,
                }
            })
            .collect();

        Self {
            total_value: view.summary.value.to_string(),
            cash: view.summary.cash.to_string(),
            transaction_count: view.transaction_count,
            unavailable: &view.summary.unavailable,
            positions,
            today,
        }
    }
}

pub struct TransactionRow {
    pub date: String,
    pub kind: &'static str,
    pub symbol: String,
    pub quantity: String,
    pub price: String,
    pub cash: String,
}

impl From<&Transaction> for TransactionRow {
    fn from(tx: &Transaction) -> Self {
        match tx {
            Transaction::Buy(b) => TransactionRow {
                date: b.date.clone(),
                kind: tx.kind().as_str(),
                symbol: b.symbol.clone(),
                quantity: b.quantity.to_string(),
                price: b.price.to_string(),
                cash: String::new(),
            },
            Transaction::Deposit(d) => TransactionRow {
                date: d.date.clone(),
                kind: tx.kind().as_str(),
                symbol: String::new(),
                quantity: String::new(),
                price: String::new(),
                cash: d.cash.to_string(),
            },
        }
    }
}

#[derive(Template)]
#[template(path = "transactions.html")]
pub struct TransactionsTemplate {
    pub rows: Vec<TransactionRow>,
}

impl TransactionsTemplate {
    pub fn new(log: &[Transaction]) -> Self {
        Self {
            rows: log.iter().map(TransactionRow::from).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "composition.html")]
pub struct CompositionTemplate<'a> {
    pub rows: &'a [CompositionRow],
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub message: &'a str,
    pub status: u16,
}
