//! Configuration validation.
//!
//! Checks every enumerated or numeric setting before the store or the price
//! oracle is built.

use std::net::SocketAddr;

use crate::domain::error::FolioError;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), FolioError> {
    validate_storage(config)?;
    validate_prices(config)?;
    validate_web(config)?;
    validate_log(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> FolioError {
    FolioError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_choice(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    choices: &[&str],
) -> Result<(), FolioError> {
    if let Some(value) = config.get_string(section, key) {
        let value = value.trim().to_ascii_lowercase();
        if !choices.contains(&value.as_str()) {
            return Err(invalid(
                section,
                key,
                format!("'{value}' is not one of {}", choices.join(", ")),
            ));
        }
    }
    Ok(())
}

fn validate_storage(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if let Some(path) = config.get_string("storage", "path") {
        if path.trim().is_empty() {
            return Err(invalid("storage", "path", "path must not be empty"));
        }
    }
    validate_choice(config, "storage", "write_mode", &["append", "rewrite"])?;
    validate_choice(config, "storage", "on_corrupt", &["fail", "empty"])?;
    Ok(())
}

fn validate_prices(config: &dyn ConfigPort) -> Result<(), FolioError> {
    validate_choice(config, "prices", "provider", &["yahoo", "static"])?;

    let timeout = config.get_double("prices", "timeout_secs", 10.0);
    if timeout <= 0.0 || !timeout.is_finite() {
        return Err(invalid("prices", "timeout_secs", "timeout_secs must be positive"));
    }

    let provider = config
        .get_string("prices", "provider")
        .unwrap_or_else(|| "yahoo".to_string())
        .trim()
        .to_ascii_lowercase();

    let entries = config.section_entries("static_prices");
    for (symbol, value) in &entries {
        match value.trim().parse::<f64>() {
            Ok(p) if p.is_finite() && p >= 0.0 => {}
            _ => {
                return Err(invalid(
                    "static_prices",
                    symbol,
                    format!("'{value}' is not a non-negative price"),
                ));
            }
        }
    }
    if provider == "static" && entries.is_empty() {
        return Err(FolioError::ConfigMissing {
            section: "static_prices".into(),
            key: "<symbol>".into(),
        });
    }
    Ok(())
}

fn validate_web(config: &dyn ConfigPort) -> Result<(), FolioError> {
    if let Some(listen) = config.get_string("web", "listen") {
        if listen.trim().parse::<SocketAddr>().is_err() {
            return Err(invalid(
                "web",
                "listen",
                format!("'{listen}' is not a socket address (expected host:port)"),
            ));
        }
    }
    Ok(())
}

fn validate_log(config: &dyn ConfigPort) -> Result<(), FolioError> {
    validate_choice(config, "log", "format", &["text", "json"])
}
