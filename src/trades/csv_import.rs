//! CSV Import
//!
//! Trade history import from exchange exports and spreadsheets.
//! Columns are detected from the header row; timestamps accept several
//! common formats.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::storage::{NewTrade, TradeSide};

/// Import errors that abort the whole file
#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("Too many rows: {0} (max {1})")]
    TooManyRows(usize, usize),
}

/// Column index of each known field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    pub symbol: Option<usize>,
    pub side: Option<usize>,
    pub pnl: Option<usize>,
    pub roi: Option<usize>,
    pub entry_price: Option<usize>,
    pub exit_price: Option<usize>,
    pub quantity: Option<usize>,
    pub traded_at: Option<usize>,
    pub notes: Option<usize>,
}

/// Outcome of parsing a file
#[derive(Debug, Clone, Default, Serialize)]
pub struct CsvImportResult {
    #[serde(skip)]
    pub trades: Vec<NewTrade>,
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub errors: Vec<String>,
}

/// Trade CSV importer
pub struct TradeCsvImporter {
    columns: ColumnMap,
    max_rows: usize,
}

impl Default for TradeCsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

impl TradeCsvImporter {
    pub fn new() -> Self {
        Self {
            columns: ColumnMap::default(),
            max_rows: 5000,
        }
    }

    /// Set the largest accepted file, in data rows
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Use an explicit column mapping
    pub fn with_columns(mut self, columns: ColumnMap) -> Self {
        self.columns = columns;
        self
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Auto-detect column mapping from header row
    pub fn auto_detect_columns(&mut self, headers: &csv::StringRecord) {
        let mut columns = ColumnMap::default();

        for (idx, header) in headers.iter().enumerate() {
            let h = normalize_header(header);
            let slot = match h.as_str() {
                "symbol" | "pair" | "market" | "ticker" | "asset" | "coin" | "instrument" => {
                    &mut columns.symbol
                }
                "side" | "direction" | "type" | "position" => &mut columns.side,
                "pnl" | "p&l" | "p/l" | "profit" | "realized pnl" | "profit/loss" | "net pnl" => {
                    &mut columns.pnl
                }
                "roi" | "roi %" | "return" | "return %" | "pnl %" => &mut columns.roi,
                "quantity" | "qty" | "size" | "amount" | "volume" => &mut columns.quantity,
                "notes" | "note" | "comment" | "comments" => &mut columns.notes,
                _ if h.contains("date") || h.contains("time") => &mut columns.traded_at,
                _ if h.contains("entry") || h.contains("open price") || h.contains("buy price") => {
                    &mut columns.entry_price
                }
                _ if h.contains("exit") || h.contains("close price") || h.contains("sell price") => {
                    &mut columns.exit_price
                }
                _ => continue,
            };
            // First matching column wins
            if slot.is_none() {
                *slot = Some(idx);
            }
        }

        self.columns = columns;
    }

    /// Parse a timestamp in any supported format
    fn parse_timestamp(&self, ts_str: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(ts_str) {
            return Ok(dt.with_timezone(&Utc));
        }

        let datetime_formats = [
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M",
            "%m/%d/%Y %H:%M",
            "%m/%d/%Y %H:%M:%S",
        ];
        for fmt in datetime_formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(ts_str, fmt) {
                return Ok(dt.and_utc());
            }
        }

        let date_formats = ["%Y-%m-%d", "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d"];
        for fmt in date_formats {
            if let Ok(date) = NaiveDate::parse_from_str(ts_str, fmt) {
                if let Some(dt) = date.and_hms_opt(12, 0, 0) {
                    return Ok(dt.and_utc());
                }
            }
        }

        // Unix seconds or milliseconds
        if let Ok(n) = ts_str.parse::<i64>() {
            let dt = if n > 100_000_000_000 {
                DateTime::from_timestamp_millis(n)
            } else {
                DateTime::from_timestamp(n, 0)
            };
            if let Some(dt) = dt {
                return Ok(dt);
            }
        }

        Err(format!("Could not parse timestamp: {}", ts_str))
    }

    /// Import from CSV text; the header row is used for column detection
    /// unless a mapping was set explicitly.
    pub fn import_str(&self, csv_data: &str) -> Result<CsvImportResult, CsvImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(csv_data.as_bytes());

        let columns = if self.columns == ColumnMap::default() {
            let mut detected = TradeCsvImporter::new();
            detected.auto_detect_columns(reader.headers()?);
            detected.columns
        } else {
            self.columns.clone()
        };
        let symbol_col = columns.symbol.ok_or(CsvImportError::MissingColumn("symbol"))?;
        let has_prices = columns.entry_price.is_some() && columns.exit_price.is_some();
        if columns.pnl.is_none() && !has_prices {
            return Err(CsvImportError::MissingColumn("pnl"));
        }

        let mut result = CsvImportResult::default();

        for (line_num, record) in reader.records().enumerate() {
            let actual_line = line_num + 2;
            if line_num >= self.max_rows {
                return Err(CsvImportError::TooManyRows(line_num + 1, self.max_rows));
            }

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result.errors.push(format!("Line {}: {}", actual_line, e));
                    result.rows_failed += 1;
                    continue;
                }
            };
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }

            match self.parse_row(&columns, symbol_col, &record) {
                Ok(trade) => {
                    result.trades.push(trade);
                    result.rows_processed += 1;
                }
                Err(e) => {
                    result.errors.push(format!("Line {}: {}", actual_line, e));
                    result.rows_failed += 1;
                }
            }
        }

        // Truncate errors if too many
        if result.errors.len() > 100 {
            let total = result.errors.len();
            result.errors.truncate(100);
            result.errors.push(format!("... and {} more errors", total - 100));
        }

        tracing::debug!(
            rows = result.rows_processed,
            failed = result.rows_failed,
            "Parsed trade CSV"
        );
        Ok(result)
    }

    fn parse_row(
        &self,
        columns: &ColumnMap,
        symbol_col: usize,
        record: &csv::StringRecord,
    ) -> Result<NewTrade, String> {
        let field = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        let number = |name: &str, col: Option<usize>| -> Result<Option<f64>, String> {
            match field(col) {
                None => Ok(None),
                Some(raw) => parse_number(raw)
                    .map(Some)
                    .ok_or_else(|| format!("invalid {} '{}'", name, raw)),
            }
        };

        let symbol = field(Some(symbol_col)).ok_or_else(|| "missing symbol".to_string())?;
        let side = match field(columns.side) {
            Some(raw) => raw.parse::<TradeSide>()?,
            None => TradeSide::Long,
        };

        let entry_price = number("entry price", columns.entry_price)?;
        let exit_price = number("exit price", columns.exit_price)?;
        let quantity = number("quantity", columns.quantity)?;

        let direction = match side {
            TradeSide::Long => 1.0,
            TradeSide::Short => -1.0,
        };
        let pnl = match number("pnl", columns.pnl)? {
            Some(pnl) => pnl,
            None => match (entry_price, exit_price) {
                (Some(entry), Some(exit)) => (exit - entry) * quantity.unwrap_or(1.0) * direction,
                _ => return Err("missing pnl".to_string()),
            },
        };
        let roi = match number("roi", columns.roi)? {
            Some(roi) => Some(roi),
            None => match (entry_price, exit_price) {
                (Some(entry), Some(exit)) if entry > 0.0 => {
                    Some((exit - entry) / entry * 100.0 * direction)
                }
                _ => None,
            },
        };

        let traded_at = match field(columns.traded_at) {
            Some(raw) => Some(self.parse_timestamp(raw)?),
            None => None,
        };

        Ok(NewTrade {
            symbol: symbol.to_string(),
            side,
            entry_price,
            exit_price,
            quantity,
            pnl,
            roi,
            notes: field(columns.notes).map(str::to_string),
            screenshot_url: None,
            traded_at,
        })
    }
}

/// Parse a number, tolerating currency symbols, thousands separators and a
/// trailing percent sign
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%' | ' '))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_simple_csv_import() {
        let csv_data = "Date,Symbol,Side,PnL,ROI %,Notes
2024-01-15,BTC/USDT,long,120.5,4.2,breakout
2024-01-16,ETH/USDT,sell,-40,-1.5,
2024-01-17 09:30:00,SOL/USDT,buy,\"$1,000.00\",12%,scaled in";

        let result = TradeCsvImporter::new().import_str(csv_data).unwrap();

        assert_eq!(result.rows_processed, 3);
        assert_eq!(result.rows_failed, 0);
        let trades = &result.trades;
        assert_eq!(trades[0].symbol, "BTC/USDT");
        assert_eq!(trades[0].notes.as_deref(), Some("breakout"));
        assert_eq!(trades[1].side, TradeSide::Short);
        assert!(trades[1].notes.is_none());
        assert_eq!(trades[2].pnl, 1000.0);
        assert_eq!(trades[2].roi, Some(12.0));
        assert_eq!(trades[2].traded_at.unwrap().hour(), 9);
    }

    #[test]
    fn test_pnl_derived_from_prices() {
        let csv_data = "pair,direction,entry_price,exit_price,qty,time
BTC,short,100,90,2,01/05/2024";

        let result = TradeCsvImporter::new().import_str(csv_data).unwrap();
        let trade = &result.trades[0];
        assert_eq!(trade.pnl, 20.0);
        assert_eq!(trade.roi, Some(10.0));
        let at = trade.traded_at.unwrap();
        assert_eq!((at.month(), at.day()), (1, 5));
    }

    #[test]
    fn test_bad_rows_are_reported() {
        let csv_data = "symbol,pnl,date
BTC,abc,2024-01-01
,5,2024-01-01
ETH,5,not-a-date
ETH,7,2024-01-02";

        let result = TradeCsvImporter::new().import_str(csv_data).unwrap();
        assert_eq!(result.rows_processed, 1);
        assert_eq!(result.rows_failed, 3);
        assert!(result.errors[0].starts_with("Line 2:"));
        assert!(result.errors[2].contains("timestamp"));
    }

    #[test]
    fn test_missing_columns() {
        assert!(matches!(
            TradeCsvImporter::new().import_str("pnl,date\n1,2024-01-01"),
            Err(CsvImportError::MissingColumn("symbol"))
        ));
        assert!(matches!(
            TradeCsvImporter::new().import_str("symbol,date\nBTC,2024-01-01"),
            Err(CsvImportError::MissingColumn("pnl"))
        ));
    }

    #[test]
    fn test_explicit_columns_skip_detection() {
        let csv_data = "col a,col b,col c,col d
note one,ETH,short,-12.5
,BTC,long,30";

        let importer = TradeCsvImporter::new().with_columns(ColumnMap {
            symbol: Some(1),
            side: Some(2),
            pnl: Some(3),
            notes: Some(0),
            ..ColumnMap::default()
        });
        assert_eq!(importer.columns().symbol, Some(1));

        let result = importer.import_str(csv_data).unwrap();
        assert_eq!(result.rows_processed, 2);
        assert_eq!(result.trades[0].symbol, "ETH");
        assert_eq!(result.trades[0].side, TradeSide::Short);
        assert_eq!(result.trades[0].pnl, -12.5);
        assert_eq!(result.trades[0].notes.as_deref(), Some("note one"));
        assert!(result.trades[1].notes.is_none());

        // The same headers carry no recognisable names
        assert!(matches!(
            TradeCsvImporter::new().import_str(csv_data),
            Err(CsvImportError::MissingColumn("symbol"))
        ));
    }

    #[test]
    fn test_row_limit() {
        let csv_data = "symbol,pnl\nBTC,1\nETH,2\nSOL,3";
        assert!(matches!(
            TradeCsvImporter::new().with_max_rows(2).import_str(csv_data),
            Err(CsvImportError::TooManyRows(3, 2))
        ));
    }
}
