//! Dashboard widget layout rows

use rusqlite::params;

use super::database::Database;
use super::error::StorageResult;
use super::types::WidgetPosition;

impl Database {
    /// Saved widget positions of a user, top-left first
    pub fn load_layout(&self, user_id: &str) -> StorageResult<Vec<WidgetPosition>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT widget_id, col, row, width, height FROM widget_layouts
             WHERE user_id = ?1 ORDER BY row ASC, col ASC",
        )?;
        let positions = stmt
            .query_map(params![user_id], |row| {
                Ok(WidgetPosition {
                    widget_id: row.get(0)?,
                    column: row.get(1)?,
                    row: row.get(2)?,
                    width: row.get(3)?,
                    height: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(positions)
    }

    /// Replace the whole layout of a user in one transaction
    pub fn replace_layout(&self, user_id: &str, positions: &[WidgetPosition]) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM widget_layouts WHERE user_id = ?1", params![user_id])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO widget_layouts (user_id, widget_id, col, row, width, height)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for p in positions {
                stmt.execute(params![user_id, p.widget_id, p.column, p.row, p.width, p.height])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_replace_and_load() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("grid", None, 0, Utc::now()).unwrap();

        assert!(db.load_layout(&user.id).unwrap().is_empty());

        db.replace_layout(
            &user.id,
            &[
                WidgetPosition::new("pnl-chart", 0, 1, 8, 2),
                WidgetPosition::new("xp-bar", 0, 0, 12, 1),
            ],
        )
        .unwrap();
        let layout = db.load_layout(&user.id).unwrap();
        assert_eq!(layout.len(), 2);
        assert_eq!(layout[0].widget_id, "xp-bar");

        db.replace_layout(&user.id, &[WidgetPosition::new("streak", 0, 0, 4, 1)])
            .unwrap();
        let layout = db.load_layout(&user.id).unwrap();
        assert_eq!(layout, vec![WidgetPosition::new("streak", 0, 0, 4, 1)]);
    }
}
