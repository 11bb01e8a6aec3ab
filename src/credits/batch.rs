//! Credit-gated batch upload
//!
//! Trades are processed in order. Each valid trade costs one credit, spent
//! before the insert. The first trade that cannot be paid for stops the
//! batch; earlier inserts are kept.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::{Database, NewTrade, StorageError, StorageResult, Trade};
use crate::trades::validate_trade;

/// A trade that was not inserted
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FailedTrade {
    /// Position in the submitted batch
    pub index: usize,
    pub symbol: String,
    pub error: String,
}

/// Outcome of a batch upload
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchUploadReport {
    pub inserted: Vec<Trade>,
    pub failed: Vec<FailedTrade>,
    /// Trades never attempted because credits ran out
    pub skipped: usize,
    /// Some trades were inserted and some failed
    pub partial: bool,
    /// Balance after the batch
    pub remaining_credits: i64,
}

impl BatchUploadReport {
    /// True when the batch stopped on an empty balance
    pub fn ran_out_of_credits(&self) -> bool {
        self.failed.iter().any(|f| f.error == INSUFFICIENT_CREDITS)
    }
}

pub const INSUFFICIENT_CREDITS: &str = "insufficient credits";

/// Upload `trades` for `user_id`, spending one credit per inserted trade
pub fn upload_batch(
    db: &Database,
    user_id: &str,
    trades: &[NewTrade],
    now: DateTime<Utc>,
) -> StorageResult<BatchUploadReport> {
    // Unknown users fail the whole request
    db.credit_account(user_id)?;

    let mut inserted = Vec::new();
    let mut failed = Vec::new();
    let mut skipped = 0;

    for (index, trade) in trades.iter().enumerate() {
        let trade = match validate_trade(trade) {
            Ok(t) => t,
            Err(e) => {
                failed.push(FailedTrade {
                    index,
                    symbol: trade.symbol.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        match db.deduct_upload_credit(user_id) {
            Ok(_) => {}
            Err(StorageError::InsufficientCredits) => {
                failed.push(FailedTrade {
                    index,
                    symbol: trade.symbol.clone(),
                    error: INSUFFICIENT_CREDITS.to_string(),
                });
                skipped = trades.len() - index - 1;
                break;
            }
            Err(e) => return Err(e),
        }

        match db.insert_trade(user_id, &trade, now) {
            Ok(row) => inserted.push(row),
            Err(e) => {
                tracing::warn!(user_id = %user_id, index, error = %e, "Trade insert failed after credit deduction");
                failed.push(FailedTrade {
                    index,
                    symbol: trade.symbol.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let remaining_credits = db.credit_account(user_id)?.balance;
    let partial = !inserted.is_empty() && !failed.is_empty();

    tracing::info!(
        user_id = %user_id,
        inserted = inserted.len(),
        failed = failed.len(),
        skipped,
        remaining_credits,
        "Batch upload finished"
    );

    Ok(BatchUploadReport {
        inserted,
        failed,
        skipped,
        partial,
        remaining_credits,
    })
}

/// Upload a large set of trades `chunk_size` at a time.
///
/// Each chunk goes through [`upload_batch`]; failure indices refer to the
/// whole input. Running out of credits stops at that chunk and counts every
/// later trade as skipped.
pub fn upload_in_chunks(
    db: &Database,
    user_id: &str,
    trades: &[NewTrade],
    chunk_size: usize,
    now: DateTime<Utc>,
) -> StorageResult<BatchUploadReport> {
    let chunk_size = chunk_size.max(1);
    let mut merged = BatchUploadReport {
        inserted: Vec::new(),
        failed: Vec::new(),
        skipped: 0,
        partial: false,
        remaining_credits: db.credit_account(user_id)?.balance,
    };

    for (n, chunk) in trades.chunks(chunk_size).enumerate() {
        let offset = n * chunk_size;
        let report = upload_batch(db, user_id, chunk, now)?;
        let halted = report.ran_out_of_credits();

        merged.inserted.extend(report.inserted);
        merged.failed.extend(report.failed.into_iter().map(|mut f| {
            f.index += offset;
            f
        }));
        merged.skipped += report.skipped;
        merged.remaining_credits = report.remaining_credits;

        if halted {
            merged.skipped += trades.len() - (offset + chunk.len());
            break;
        }
    }

    merged.partial = !merged.inserted.is_empty() && !merged.failed.is_empty();
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TradeFilter;

    fn setup(credits: i64) -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("uploader", None, credits, Utc::now()).unwrap();
        (db, user.id)
    }

    fn batch(n: usize) -> Vec<NewTrade> {
        (0..n).map(|i| NewTrade::new("BTC/USDT", i as f64)).collect()
    }

    #[test]
    fn test_halts_when_credits_run_out() {
        let (db, user) = setup(3);
        let report = upload_batch(&db, &user, &batch(6), Utc::now()).unwrap();

        assert_eq!(report.inserted.len(), 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 3);
        assert_eq!(report.failed[0].error, "insufficient credits");
        assert_eq!(report.skipped, 2);
        assert!(report.partial);
        assert!(report.ran_out_of_credits());
        assert_eq!(report.remaining_credits, 0);

        assert_eq!(db.list_trades(&user, &TradeFilter::default()).unwrap().len(), 3);
        assert_eq!(db.credit_account(&user).unwrap().balance, 0);
    }

    #[test]
    fn test_invalid_trades_are_not_charged() {
        let (db, user) = setup(2);
        let trades = vec![
            NewTrade::new("BTC", 1.0),
            NewTrade::new("not a symbol!", 1.0),
            NewTrade::new("eth", 2.0),
        ];
        let report = upload_batch(&db, &user, &trades, Utc::now()).unwrap();

        assert_eq!(report.inserted.len(), 2);
        assert_eq!(report.inserted[1].symbol, "ETH");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 1);
        assert!(!report.ran_out_of_credits());
        assert_eq!(report.skipped, 0);
        assert!(report.partial);
        assert_eq!(report.remaining_credits, 0);
    }

    #[test]
    fn test_zero_balance_inserts_nothing() {
        let (db, user) = setup(0);
        let report = upload_batch(&db, &user, &batch(2), Utc::now()).unwrap();
        assert!(report.inserted.is_empty());
        assert_eq!(report.skipped, 1);
        assert!(!report.partial);
    }

    #[test]
    fn test_full_success_is_not_partial() {
        let (db, user) = setup(5);
        let report = upload_batch(&db, &user, &batch(2), Utc::now()).unwrap();
        assert_eq!(report.inserted.len(), 2);
        assert!(report.failed.is_empty());
        assert!(!report.partial);
        assert_eq!(report.remaining_credits, 3);
    }

    #[test]
    fn test_chunks_share_one_credit_gate() {
        let (db, user) = setup(7);
        let mut trades = batch(12);
        trades[1].symbol = "??".to_string();

        let report = upload_in_chunks(&db, &user, &trades, 5, Utc::now()).unwrap();

        assert_eq!(report.inserted.len(), 7);
        let indices: Vec<usize> = report.failed.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![1, 8]);
        assert_eq!(report.failed[1].error, INSUFFICIENT_CREDITS);
        // one trade left in the halted chunk plus the whole last chunk
        assert_eq!(report.skipped, 3);
        assert!(report.partial);
        assert_eq!(report.remaining_credits, 0);
    }

    #[test]
    fn test_chunks_without_failures() {
        let (db, user) = setup(20);
        let report = upload_in_chunks(&db, &user, &batch(11), 4, Utc::now()).unwrap();
        assert_eq!(report.inserted.len(), 11);
        assert!(report.failed.is_empty());
        assert_eq!(report.skipped, 0);
        assert!(!report.partial);
        assert_eq!(report.remaining_credits, 9);
    }

    #[test]
    fn test_unknown_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            upload_batch(&db, "ghost", &batch(1), Utc::now()),
            Err(StorageError::NotFound(_))
        ));
    }
}
