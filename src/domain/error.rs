//! Domain error types.

/// Top-level error type for folio.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("invalid transaction: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("price unavailable for {symbol}: {reason}")]
    PriceUnavailable { symbol: String, reason: String },

    #[error("storage error: {reason}")]
    Storage { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FolioError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FolioError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn price_unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        FolioError::PriceUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        FolioError::Storage {
            reason: reason.into(),
        }
    }
}

impl From<&FolioError> for std::process::ExitCode {
    fn from(err: &FolioError) -> Self {
        let code: u8 = match err {
            FolioError::Io(_) => 1,
            FolioError::ConfigParse { .. }
            | FolioError::ConfigMissing { .. }
            | FolioError::ConfigInvalid { .. } => 2,
            FolioError::Storage { .. } => 3,
            FolioError::Validation { .. } => 4,
            FolioError::PriceUnavailable { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
