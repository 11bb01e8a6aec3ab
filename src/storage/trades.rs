//! Trade journal rows

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row, ToSql};

use super::database::{parse_column, Database};
use super::error::{StorageError, StorageResult};
use super::types::{NewTrade, Trade, TradeFilter};

const TRADE_COLUMNS: &str = "id, user_id, symbol, side, entry_price, exit_price, quantity, pnl, roi, notes, screenshot_url, traded_at, created_at";

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    Ok(Trade {
        id: row.get(0)?,
        user_id: row.get(1)?,
        symbol: row.get(2)?,
        side: parse_column(3, row.get(3)?)?,
        entry_price: row.get(4)?,
        exit_price: row.get(5)?,
        quantity: row.get(6)?,
        pnl: row.get(7)?,
        roi: row.get(8)?,
        notes: row.get(9)?,
        screenshot_url: row.get(10)?,
        traded_at: row.get(11)?,
        created_at: row.get(12)?,
    })
}

impl Database {
    /// Insert an already validated trade
    pub fn insert_trade(
        &self,
        user_id: &str,
        trade: &NewTrade,
        now: DateTime<Utc>,
    ) -> StorageResult<Trade> {
        let trade = Trade {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            symbol: trade.symbol.clone(),
            side: trade.side,
            entry_price: trade.entry_price,
            exit_price: trade.exit_price,
            quantity: trade.quantity,
            pnl: trade.pnl,
            roi: trade.roi,
            notes: trade.notes.clone(),
            screenshot_url: trade.screenshot_url.clone(),
            traded_at: trade.traded_at.unwrap_or(now),
            created_at: now,
        };

        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO trades ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                TRADE_COLUMNS
            ),
            params![
                trade.id,
                trade.user_id,
                trade.symbol,
                trade.side.as_str(),
                trade.entry_price,
                trade.exit_price,
                trade.quantity,
                trade.pnl,
                trade.roi,
                trade.notes,
                trade.screenshot_url,
                trade.traded_at,
                trade.created_at,
            ],
        )?;

        Ok(trade)
    }

    /// One trade owned by the user
    pub fn get_trade(&self, user_id: &str, trade_id: &str) -> StorageResult<Trade> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM trades WHERE id = ?1 AND user_id = ?2", TRADE_COLUMNS),
            params![trade_id, user_id],
            trade_from_row,
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("trade {}", trade_id)))
    }

    /// Trades of a user, newest first
    pub fn list_trades(&self, user_id: &str, filter: &TradeFilter) -> StorageResult<Vec<Trade>> {
        let mut sql = format!("SELECT {} FROM trades WHERE user_id = ?", TRADE_COLUMNS);
        let mut args: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

        if let Some(symbol) = &filter.symbol {
            sql.push_str(" AND symbol = ?");
            args.push(Box::new(symbol.to_uppercase()));
        }
        if let Some(since) = filter.since {
            sql.push_str(" AND traded_at >= ?");
            args.push(Box::new(since));
        }
        sql.push_str(" ORDER BY traded_at DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            args.push(Box::new(limit as i64));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let trades = stmt
            .query_map(params_from_iter(args), trade_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trades)
    }

    /// Replace the notes of a trade
    pub fn update_trade_notes(
        &self,
        user_id: &str,
        trade_id: &str,
        notes: Option<&str>,
    ) -> StorageResult<Trade> {
        {
            let conn = self.conn()?;
            let updated = conn.execute(
                "UPDATE trades SET notes = ?1 WHERE id = ?2 AND user_id = ?3",
                params![notes, trade_id, user_id],
            )?;
            if updated == 0 {
                return Err(StorageError::NotFound(format!("trade {}", trade_id)));
            }
        }
        self.get_trade(user_id, trade_id)
    }

    /// Delete a trade
    pub fn delete_trade(&self, user_id: &str, trade_id: &str) -> StorageResult<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM trades WHERE id = ?1 AND user_id = ?2",
            params![trade_id, user_id],
        )?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("trade {}", trade_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::TradeSide;
    use chrono::Duration;

    fn setup() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("journal", None, 0, Utc::now()).unwrap();
        (db, user.id)
    }

    #[test]
    fn test_insert_and_get() {
        let (db, user) = setup();
        let now = Utc::now();
        let trade = db
            .insert_trade(
                &user,
                &NewTrade::new("BTC/USDT", 120.0)
                    .side(TradeSide::Short)
                    .roi(4.5)
                    .notes("faded the pump"),
                now,
            )
            .unwrap();

        assert_eq!(trade.traded_at, now);
        let fetched = db.get_trade(&user, &trade.id).unwrap();
        assert_eq!(fetched.side, TradeSide::Short);
        assert_eq!(fetched.roi, Some(4.5));
        assert_eq!(fetched.notes.as_deref(), Some("faded the pump"));
    }

    #[test]
    fn test_list_filters() {
        let (db, user) = setup();
        let now = Utc::now();
        for (i, symbol) in ["BTC/USDT", "ETH/USDT", "BTC/USDT"].iter().enumerate() {
            db.insert_trade(
                &user,
                &NewTrade::new(*symbol, 10.0).traded_at(now - Duration::days(i as i64)),
                now,
            )
            .unwrap();
        }

        let all = db.list_trades(&user, &TradeFilter::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].traded_at >= all[1].traded_at);

        let btc = db
            .list_trades(
                &user,
                &TradeFilter {
                    symbol: Some("btc/usdt".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(btc.len(), 2);

        let recent = db
            .list_trades(
                &user,
                &TradeFilter {
                    since: Some(now - Duration::hours(36)),
                    limit: Some(10),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(recent.len(), 2);

        let limited = db
            .list_trades(
                &user,
                &TradeFilter {
                    limit: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_update_and_delete_are_owner_scoped() {
        let (db, user) = setup();
        let intruder = db.create_user("intruder", None, 0, Utc::now()).unwrap();
        let trade = db
            .insert_trade(&user, &NewTrade::new("SOL/USDT", -5.0), Utc::now())
            .unwrap();

        assert!(matches!(
            db.update_trade_notes(&intruder.id, &trade.id, Some("mine now")),
            Err(StorageError::NotFound(_))
        ));
        let updated = db.update_trade_notes(&user, &trade.id, Some("stopped out")).unwrap();
        assert_eq!(updated.notes.as_deref(), Some("stopped out"));

        assert!(db.delete_trade(&intruder.id, &trade.id).is_err());
        db.delete_trade(&user, &trade.id).unwrap();
        assert!(db.get_trade(&user, &trade.id).is_err());
    }
}
