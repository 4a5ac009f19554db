//! CSV file transaction ledger.
//!
//! The file carries the header `Date,Type,Symbol,Quantity,Price,Cash` and one
//! row per transaction. Buy rows leave `Cash` empty and deposit rows leave
//! `Symbol`, `Quantity` and `Price` empty.

use crate::domain::error::FolioError;
use crate::domain::transaction::{Transaction, TransactionDraft};
use crate::ports::ledger_port::LedgerPort;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use tracing::warn;

pub const COLUMNS: [&str; 6] = ["Date", "Type", "Symbol", "Quantity", "Price", "Cash"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Append only the new row; existing bytes are never rewritten.
    #[default]
    Append,
    /// Copy the file plus the new row into a temp file, then rename it over
    /// the original. Existing bytes are carried over unchanged.
    Rewrite,
}

impl std::str::FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append" => Ok(WriteMode::Append),
            "rewrite" => Ok(WriteMode::Rewrite),
            other => Err(format!("unknown write mode '{other}' (expected append or rewrite)")),
        }
    }
}

pub struct CsvLedger {
    path: PathBuf,
    mode: WriteMode,
}

impl CsvLedger {
    pub fn new(path: PathBuf, mode: WriteMode) -> Self {
        Self { path, mode }
    }

    fn storage_err(&self, action: &str, e: impl std::fmt::Display) -> FolioError {
        FolioError::storage(format!("failed to {action} {}: {e}", self.path.display()))
    }

    fn write_header<W: Write>(writer: &mut csv::Writer<W>) -> csv::Result<()> {
        writer.write_record(COLUMNS)
    }

    fn write_row<W: Write>(writer: &mut csv::Writer<W>, tx: &Transaction) -> csv::Result<()> {
        match tx {
            Transaction::Buy(b) => {
                let quantity = b.quantity.to_string();
                let price = b.price.to_string();
                writer.write_record([
                    b.date.as_str(),
                    tx.kind().as_str(),
                    b.symbol.as_str(),
                    quantity.as_str(),
                    price.as_str(),
                    "",
                ])
            }
            Transaction::Deposit(d) => {
                let cash = d.cash.to_string();
                writer.write_record([
                    d.date.as_str(),
                    tx.kind().as_str(),
                    "",
                    "",
                    "",
                    cash.as_str(),
                ])
            }
        }
    }

    fn encode(rows: &[&Transaction], with_header: bool) -> Result<Vec<u8>, FolioError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let encode_err = |e: csv::Error| FolioError::storage(format!("CSV encode error: {e}"));
        if with_header {
            Self::write_header(&mut writer).map_err(encode_err)?;
        }
        for tx in rows {
            Self::write_row(&mut writer, tx).map_err(encode_err)?;
        }
        writer
            .into_inner()
            .map_err(|e| FolioError::storage(format!("CSV encode error: {e}")))
    }

    fn append_row(&self, prior: &[Transaction], record: &Transaction) -> Result<(), FolioError> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| self.storage_err("open", e))?;

        let mut len = file
            .metadata()
            .map_err(|e| self.storage_err("stat", e))?
            .len();
        if len > 0 && prior.is_empty() {
            // A blank file has no header yet.
            let mut existing = String::new();
            file.read_to_string(&mut existing)
                .map_err(|e| self.storage_err("read", e))?;
            if existing.trim().is_empty() {
                file.set_len(0).map_err(|e| self.storage_err("truncate", e))?;
                len = 0;
            }
        }

        let mut buf = Vec::new();
        if len > 0 {
            file.seek(SeekFrom::End(-1))
                .map_err(|e| self.storage_err("seek", e))?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last)
                .map_err(|e| self.storage_err("read", e))?;
            if last[0] != b'\n' {
                buf.push(b'\n');
            }
        }
        buf.extend(Self::encode(&[record], len == 0)?);

        write_or_roll_back(&mut file, len, |f| {
            f.write_all(&buf)?;
            f.sync_data()
        })
        .map_err(|e| self.storage_err("write", e))
    }

    fn rewrite(&self, prior: &[Transaction], record: &Transaction) -> Result<(), FolioError> {
        let existing = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(self.storage_err("read", e)),
        };
        let bytes = if existing.iter().all(u8::is_ascii_whitespace) {
            let rows: Vec<&Transaction> = prior.iter().chain(std::iter::once(record)).collect();
            Self::encode(&rows, true)?
        } else {
            let mut bytes = existing;
            if bytes.last() != Some(&b'\n') {
                bytes.push(b'\n');
            }
            bytes.extend(Self::encode(&[record], false)?);
            bytes
        };

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let result = fs::File::create(&tmp_path)
            .and_then(|mut f| f.write_all(&bytes).and_then(|_| f.sync_all()))
            .and_then(|_| fs::rename(&tmp_path, &self.path));
        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.storage_err("rewrite", e));
        }
        Ok(())
    }
}

/// Runs `write` against `file`, cutting the file back to `len` bytes if it
/// fails so no partial row is left behind.
fn write_or_roll_back<F>(file: &mut File, len: u64, write: F) -> std::io::Result<()>
where
    F: FnOnce(&mut File) -> std::io::Result<()>,
{
    let Err(err) = write(file) else {
        return Ok(());
    };
    if let Err(truncate_err) = file.set_len(len) {
        warn!(error = %truncate_err, len, "failed to roll back partial write");
    }
    Err(err)
}

impl LedgerPort for CsvLedger {
    fn load(&self) -> Result<Vec<Transaction>, FolioError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.storage_err("read", e)),
        };
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| FolioError::storage(format!("CSV parse error: {e}")))?;
        if headers.len() != COLUMNS.len()
            || headers.iter().zip(COLUMNS).any(|(h, c)| !h.eq_ignore_ascii_case(c))
        {
            return Err(FolioError::storage(format!(
                "{} has incompatible columns: expected {}, found {}",
                self.path.display(),
                COLUMNS.join(","),
                headers.iter().collect::<Vec<_>>().join(",")
            )));
        }

        let mut log = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            // Line 1 is the header.
            let line = idx + 2;
            let record = result
                .map_err(|e| FolioError::storage(format!("CSV parse error on line {line}: {e}")))?;

            let cell = |i: usize| record.get(i).map(str::to_string);
            let draft = TransactionDraft {
                date: cell(0).unwrap_or_default(),
                kind: cell(1).unwrap_or_default(),
                symbol: cell(2),
                quantity: cell(3),
                price: cell(4),
                cash: cell(5),
            };
            let tx = draft.validate().map_err(|e| {
                FolioError::storage(format!(
                    "invalid row on line {line} of {}: {e}",
                    self.path.display()
                ))
            })?;
            log.push(tx);
        }
        Ok(log)
    }

    fn append(&self, prior: &[Transaction], record: &Transaction) -> Result<(), FolioError> {
        match self.mode {
            WriteMode::Append => self.append_row(prior, record),
            WriteMode::Rewrite => self.rewrite(prior, record),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
