//! Trade journal
//!
//! - **validation** (this module): normalizes and checks submitted trades
//! - **csv_import**: CSV exports from exchanges and spreadsheets
//! - **analytics**: statistics over a user's trades

pub mod analytics;
pub mod csv_import;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::storage::NewTrade;

pub use analytics::{compute_analytics, SymbolStats, TradeAnalytics};
pub use csv_import::{CsvImportResult, TradeCsvImporter};

/// Longest accepted note
pub const MAX_NOTES_LEN: usize = 2000;

static SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{2,12}(/[A-Z0-9]{2,12})?$").expect("valid symbol regex"));

/// Why a trade was rejected
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid symbol '{0}'")]
    Symbol(String),

    #[error("{0} must be a finite number")]
    NotFinite(&'static str),

    #[error("{0} must be positive")]
    NotPositive(&'static str),

    #[error("Notes exceed 2000 characters ({0})")]
    NotesTooLong(usize),

    #[error("Invalid screenshot URL")]
    ScreenshotUrl,
}

fn check_finite(name: &'static str, value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.is_finite() => Err(ValidationError::NotFinite(name)),
        _ => Ok(()),
    }
}

fn check_positive(name: &'static str, value: Option<f64>) -> Result<(), ValidationError> {
    check_finite(name, value)?;
    match value {
        Some(v) if v <= 0.0 => Err(ValidationError::NotPositive(name)),
        _ => Ok(()),
    }
}

/// Validate a submitted trade and return its normalized form: upper-cased
/// symbol, trimmed notes (blank notes dropped).
pub fn validate_trade(trade: &NewTrade) -> Result<NewTrade, ValidationError> {
    let mut normalized = trade.clone();

    normalized.symbol = trade.symbol.trim().to_uppercase();
    if !SYMBOL_RE.is_match(&normalized.symbol) {
        return Err(ValidationError::Symbol(trade.symbol.clone()));
    }

    check_finite("pnl", Some(trade.pnl))?;
    check_finite("roi", trade.roi)?;
    check_positive("entry_price", trade.entry_price)?;
    check_positive("exit_price", trade.exit_price)?;
    check_positive("quantity", trade.quantity)?;

    normalized.notes = trade
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    if let Some(notes) = &normalized.notes {
        let len = notes.chars().count();
        if len > MAX_NOTES_LEN {
            return Err(ValidationError::NotesTooLong(len));
        }
    }

    if let Some(url) = &trade.screenshot_url {
        let url = url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ValidationError::ScreenshotUrl);
        }
        normalized.screenshot_url = Some(url.to_string());
    }

    Ok(normalized)
}

/// Validate replacement notes for an existing trade
pub fn validate_notes(notes: Option<&str>) -> Result<Option<String>, ValidationError> {
    let notes = notes.map(str::trim).filter(|n| !n.is_empty());
    if let Some(n) = notes {
        let len = n.chars().count();
        if len > MAX_NOTES_LEN {
            return Err(ValidationError::NotesTooLong(len));
        }
    }
    Ok(notes.map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalization() {
        let t = validate_trade(&NewTrade::new(" btc/usdt ", 1.0)).unwrap();
        assert_eq!(t.symbol, "BTC/USDT");
        assert_eq!(validate_trade(&NewTrade::new("eth", 0.0)).unwrap().symbol, "ETH");
    }

    #[test]
    fn test_invalid_symbols() {
        for bad in ["", "B", "BTC-USDT", "BTC/", "/USDT", "ABCDEFGHIJKLM", "BTC/USDT/X"] {
            assert!(
                matches!(validate_trade(&NewTrade::new(bad, 1.0)), Err(ValidationError::Symbol(_))),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            validate_trade(&NewTrade::new("BTC", f64::NAN)),
            Err(ValidationError::NotFinite("pnl"))
        );

        let mut t = NewTrade::new("BTC", 1.0);
        t.quantity = Some(0.0);
        assert_eq!(validate_trade(&t), Err(ValidationError::NotPositive("quantity")));

        t.quantity = Some(0.5);
        t.entry_price = Some(f64::INFINITY);
        assert_eq!(validate_trade(&t), Err(ValidationError::NotFinite("entry_price")));
    }

    #[test]
    fn test_notes() {
        let t = validate_trade(&NewTrade::new("BTC", 1.0).notes("   ")).unwrap();
        assert!(t.notes.is_none());

        let long = "x".repeat(MAX_NOTES_LEN + 1);
        assert_eq!(
            validate_trade(&NewTrade::new("BTC", 1.0).notes(long)),
            Err(ValidationError::NotesTooLong(MAX_NOTES_LEN + 1))
        );
        assert_eq!(validate_notes(Some(" ok ")).unwrap().as_deref(), Some("ok"));
    }

    #[test]
    fn test_screenshot_url() {
        assert_eq!(
            validate_trade(&NewTrade::new("BTC", 1.0).screenshot("ftp://x")),
            Err(ValidationError::ScreenshotUrl)
        );
        assert!(validate_trade(&NewTrade::new("BTC", 1.0).screenshot("https://cdn/x.png")).is_ok());
    }
}
