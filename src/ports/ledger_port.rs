//! Durable transaction storage port trait.

use crate::domain::error::FolioError;
use crate::domain::transaction::Transaction;

pub trait LedgerPort {
    /// Reads the full ordered log. Missing storage yields an empty log.
    fn load(&self) -> Result<Vec<Transaction>, FolioError>;

    /// Persists `record` as the last element after `prior`.
    ///
    /// On success a following [`load`](LedgerPort::load) returns `prior`
    /// followed by `record`. On failure previously persisted records are
    /// left intact.
    fn append(&self, prior: &[Transaction], record: &Transaction) -> Result<(), FolioError>;

    /// Human-readable location, for log messages.
    fn describe(&self) -> String;
}
