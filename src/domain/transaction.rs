//! Transaction records and input validation.
//!
//! A [`Transaction`] is either a buy or a deposit, each variant carrying only
//! the fields it needs. Untrusted input (form submissions, CLI flags, CSV rows)
//! arrives as a [`TransactionDraft`] and becomes a `Transaction` only through
//! [`TransactionDraft::validate`].

use std::fmt;
use std::str::FromStr;

use super::error::FolioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Buy,
    Deposit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Buy => "buy",
            TransactionKind::Deposit => "deposit",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(TransactionKind::Buy),
            "deposit" => Ok(TransactionKind::Deposit),
            "" => Err(FolioError::validation("type", "transaction type is required")),
            other => Err(FolioError::validation(
                "type",
                format!("unsupported transaction type '{other}' (expected buy or deposit)"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuyRecord {
    pub date: String,
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
}

impl BuyRecord {
    /// Cost paid for this lot: quantity × unit price.
    pub fn cost(&self) -> f64 {
        self.quantity * self.price
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepositRecord {
    pub date: String,
    pub cash: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transaction {
    Buy(BuyRecord),
    Deposit(DepositRecord),
}

impl Transaction {
    pub fn buy(
        date: impl Into<String>,
        symbol: &str,
        quantity: f64,
        price: f64,
    ) -> Result<Self, FolioError> {
        let symbol = normalize_symbol(symbol)?;
        check_quantity(quantity)?;
        check_price(price)?;
        Ok(Transaction::Buy(BuyRecord {
            date: date.into().trim().to_string(),
            symbol,
            quantity,
            price,
        }))
    }

    pub fn deposit(date: impl Into<String>, cash: f64) -> Result<Self, FolioError> {
        check_cash(cash)?;
        Ok(Transaction::Deposit(DepositRecord {
            date: date.into().trim().to_string(),
            cash,
        }))
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            Transaction::Buy(_) => TransactionKind::Buy,
            Transaction::Deposit(_) => TransactionKind::Deposit,
        }
    }

    pub fn date(&self) -> &str {
        match self {
            Transaction::Buy(b) => &b.date,
            Transaction::Deposit(d) => &d.date,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            Transaction::Buy(b) => Some(&b.symbol),
            Transaction::Deposit(_) => None,
        }
    }

    pub fn as_buy(&self) -> Option<&BuyRecord> {
        match self {
            Transaction::Buy(b) => Some(b),
            Transaction::Deposit(_) => None,
        }
    }
}

/// Unvalidated transaction input. Empty strings count as absent fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionDraft {
    pub date: String,
    pub kind: String,
    pub symbol: Option<String>,
    pub quantity: Option<String>,
    pub price: Option<String>,
    pub cash: Option<String>,
}

impl TransactionDraft {
    pub fn validate(&self) -> Result<Transaction, FolioError> {
        let kind: TransactionKind = self.kind.parse()?;
        let symbol = present(&self.symbol);
        let quantity = parse_amount("quantity", &self.quantity)?;
        let price = parse_amount("price", &self.price)?;
        let cash = parse_amount("cash", &self.cash)?;

        match kind {
            TransactionKind::Buy => {
                let symbol = symbol
                    .ok_or_else(|| FolioError::validation("symbol", "required for buy"))?;
                let quantity = quantity
                    .ok_or_else(|| FolioError::validation("quantity", "required for buy"))?;
                let price =
                    price.ok_or_else(|| FolioError::validation("price", "required for buy"))?;
                if cash.is_some_and(|c| c != 0.0) {
                    return Err(FolioError::validation("cash", "must be empty for buy"));
                }
                Transaction::buy(self.date.as_str(), symbol, quantity, price)
            }
            TransactionKind::Deposit => {
                if symbol.is_some() {
                    return Err(FolioError::validation("symbol", "must be empty for deposit"));
                }
                // Older ledgers store `0.0` in the unused buy columns.
                if quantity.is_some_and(|q| q != 0.0) {
                    return Err(FolioError::validation(
                        "quantity",
                        "must be empty for deposit",
                    ));
                }
                if price.is_some_and(|p| p != 0.0) {
                    return Err(FolioError::validation("price", "must be empty for deposit"));
                }
                let cash =
                    cash.ok_or_else(|| FolioError::validation("cash", "required for deposit"))?;
                Transaction::deposit(self.date.as_str(), cash)
            }
        }
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Parses an optional numeric field. Blank cells and `NaN` are treated as absent.
fn parse_amount(field: &str, value: &Option<String>) -> Result<Option<f64>, FolioError> {
    let Some(raw) = present(value) else {
        return Ok(None);
    };
    let parsed: f64 = raw
        .parse()
        .map_err(|_| FolioError::validation(field, format!("'{raw}' is not a number")))?;
    if parsed.is_nan() {
        return Ok(None);
    }
    if !parsed.is_finite() {
        return Err(FolioError::validation(field, "must be finite"));
    }
    Ok(Some(parsed))
}

fn normalize_symbol(symbol: &str) -> Result<String, FolioError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(FolioError::validation("symbol", "required for buy"));
    }
    // Exchange tickers: letters, digits and `. - ^ = &` (e.g. BRK-B, ^GSPC, EURUSD=X).
    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '&'))
    {
        return Err(FolioError::validation(
            "symbol",
            format!("'{symbol}' contains invalid characters"),
        ));
    }
    Ok(symbol.to_uppercase())
}

fn check_quantity(quantity: f64) -> Result<(), FolioError> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(FolioError::validation("quantity", "must be positive"));
    }
    Ok(())
}

fn check_price(price: f64) -> Result<(), FolioError> {
    if !price.is_finite() || price < 0.0 {
        return Err(FolioError::validation("price", "must be non-negative"));
    }
    Ok(())
}

fn check_cash(cash: f64) -> Result<(), FolioError> {
    if !cash.is_finite() || cash <= 0.0 {
        return Err(FolioError::validation("cash", "deposit amount must be positive"));
    }
    Ok(())
}
