//! Transaction store: the in-memory log plus its write discipline.
//!
//! The store owns the ordered log behind one mutex. Every append runs
//! validate, persist, then push while holding the lock, so concurrent writers
//! are serialized and a failed persist never leaves the in-memory log ahead of
//! durable storage.

use std::sync::{Mutex, MutexGuard};

use tracing::{error, info};

use super::error::FolioError;
use super::transaction::{Transaction, TransactionDraft};
use crate::ports::ledger_port::LedgerPort;

/// What to do when the persisted log cannot be read at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptPolicy {
    #[default]
    Fail,
    /// Start with an empty log and refuse writes, leaving the file untouched.
    Empty,
}

impl std::str::FromStr for CorruptPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(CorruptPolicy::Fail),
            "empty" => Ok(CorruptPolicy::Empty),
            other => Err(format!("unknown policy '{other}' (expected fail or empty)")),
        }
    }
}

pub struct TransactionStore {
    ledger: Box<dyn LedgerPort + Send + Sync>,
    log: Mutex<Vec<Transaction>>,
    read_only: Option<String>,
}

impl TransactionStore {
    /// Loads the persisted log.
    pub fn open(
        ledger: Box<dyn LedgerPort + Send + Sync>,
        policy: CorruptPolicy,
    ) -> Result<Self, FolioError> {
        match ledger.load() {
            Ok(log) => {
                info!(ledger = %ledger.describe(), records = log.len(), "loaded transaction log");
                Ok(Self {
                    ledger,
                    log: Mutex::new(log),
                    read_only: None,
                })
            }
            Err(err) => match policy {
                CorruptPolicy::Fail => Err(err),
                CorruptPolicy::Empty => {
                    error!(
                        ledger = %ledger.describe(),
                        error = %err,
                        "transaction log unreadable; starting empty and refusing writes"
                    );
                    Ok(Self {
                        ledger,
                        log: Mutex::new(Vec::new()),
                        read_only: Some(err.to_string()),
                    })
                }
            },
        }
    }

    /// Validates `draft` and appends the resulting record.
    pub fn append(&self, draft: &TransactionDraft) -> Result<Transaction, FolioError> {
        let record = draft.validate()?;
        self.append_record(record.clone())?;
        Ok(record)
    }

    pub fn append_record(&self, record: Transaction) -> Result<(), FolioError> {
        if let Some(reason) = &self.read_only {
            return Err(FolioError::storage(format!(
                "{} could not be loaded ({reason}); refusing to write",
                self.ledger.describe()
            )));
        }

        let mut log = self.lock()?;
        self.ledger.append(&log, &record)?;
        info!(
            kind = %record.kind(),
            symbol = record.symbol().unwrap_or("-"),
            position = log.len(),
            "appended transaction"
        );
        log.push(record);
        Ok(())
    }

    /// Copy of the current ordered log.
    pub fn snapshot(&self) -> Result<Vec<Transaction>, FolioError> {
        Ok(self.lock()?.clone())
    }

    pub fn len(&self) -> Result<usize, FolioError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, FolioError> {
        Ok(self.lock()?.is_empty())
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.is_some()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Transaction>>, FolioError> {
        self.log
            .lock()
            .map_err(|_| FolioError::storage("transaction log lock poisoned"))
    }
}
