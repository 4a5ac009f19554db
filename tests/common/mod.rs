#![allow(dead_code)]

use folio::adapters::csv_adapter::{CsvLedger, WriteMode};
use folio::domain::error::FolioError;
use folio::domain::store::{CorruptPolicy, TransactionStore};
use folio::domain::transaction::{Transaction, TransactionDraft};
use folio::ports::price_port::PricePort;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

pub struct MockPricePort {
    pub prices: HashMap<String, f64>,
    pub errors: HashMap<String, String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            errors: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl PricePort for MockPricePort {
    fn current_price(&self, symbol: &str) -> Result<f64, FolioError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        if let Some(reason) = self.errors.get(symbol) {
            return Err(FolioError::price_unavailable(symbol, reason.clone()));
        }
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| FolioError::price_unavailable(symbol, "unknown symbol"))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A ledger file inside a temp dir that lives as long as the returned guard.
pub fn temp_ledger_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("transactions.csv");
    (dir, path)
}

pub fn open_store(path: &PathBuf, mode: WriteMode) -> TransactionStore {
    TransactionStore::open(
        Box::new(CsvLedger::new(path.clone(), mode)),
        CorruptPolicy::Fail,
    )
    .unwrap()
}

pub fn buy(symbol: &str, quantity: f64, price: f64) -> Transaction {
    Transaction::buy("2024-01-02", symbol, quantity, price).unwrap()
}

pub fn deposit(cash: f64) -> Transaction {
    Transaction::deposit("2024-01-01", cash).unwrap()
}

pub fn buy_draft(symbol: &str, quantity: &str, price: &str) -> TransactionDraft {
    TransactionDraft {
        date: "2024-01-02".into(),
        kind: "buy".into(),
        symbol: Some(symbol.into()),
        quantity: Some(quantity.into()),
        price: Some(price.into()),
        cash: None,
    }
}

pub fn deposit_draft(cash: &str) -> TransactionDraft {
    TransactionDraft {
        date: "2024-01-01".into(),
        kind: "deposit".into(),
        cash: Some(cash.into()),
        ..Default::default()
    }
}
