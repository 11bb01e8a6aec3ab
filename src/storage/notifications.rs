//! In-app notification rows

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::database::Database;
use super::error::{StorageError, StorageResult};
use super::types::Notification;

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        message: row.get(3)?,
        created_at: row.get(4)?,
        read_at: row.get(5)?,
    })
}

impl Database {
    /// Store a notification for a user
    pub fn insert_notification(
        &self,
        user_id: &str,
        kind: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<Notification> {
        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            kind: kind.to_string(),
            message: message.to_string(),
            created_at: now,
            read_at: None,
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO notifications (id, user_id, kind, message, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                notification.id,
                notification.user_id,
                notification.kind,
                notification.message,
                notification.created_at
            ],
        )?;
        Ok(notification)
    }

    /// Notifications of a user: unread first, then newest first
    pub fn list_notifications(&self, user_id: &str, limit: usize) -> StorageResult<Vec<Notification>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, kind, message, created_at, read_at FROM notifications
             WHERE user_id = ?1
             ORDER BY (read_at IS NOT NULL) ASC, created_at DESC
             LIMIT ?2",
        )?;
        let notifications = stmt
            .query_map(params![user_id, limit as i64], notification_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    /// Mark a notification read; reading twice keeps the first timestamp
    pub fn mark_notification_read(
        &self,
        user_id: &str,
        notification_id: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE notifications SET read_at = COALESCE(read_at, ?1) WHERE id = ?2 AND user_id = ?3",
            params![now, notification_id, user_id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("notification {}", notification_id)));
        }
        Ok(())
    }

    /// Creation time of the newest notification of a kind
    pub fn last_notification_at(
        &self,
        user_id: &str,
        kind: &str,
    ) -> StorageResult<Option<DateTime<Utc>>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT created_at FROM notifications WHERE user_id = ?1 AND kind = ?2
             ORDER BY created_at DESC LIMIT 1",
        )?;
        let mut rows = stmt.query(params![user_id, kind])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_unread_first_and_mark_read() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("notified", None, 0, Utc::now()).unwrap();
        let now = Utc::now();

        let older = db
            .insert_notification(&user.id, "inactivity", "come back", now - Duration::days(2))
            .unwrap();
        let newer = db
            .insert_notification(&user.id, "system", "maintenance", now)
            .unwrap();

        db.mark_notification_read(&user.id, &newer.id, now).unwrap();

        let list = db.list_notifications(&user.id, 10).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, older.id);
        assert!(list[1].read_at.is_some());

        assert!(db.mark_notification_read("someone-else", &older.id, now).is_err());
    }

    #[test]
    fn test_last_notification_at() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("idle", None, 0, Utc::now()).unwrap();
        let now = Utc::now();

        assert!(db.last_notification_at(&user.id, "inactivity").unwrap().is_none());
        db.insert_notification(&user.id, "inactivity", "a", now - Duration::days(9))
            .unwrap();
        db.insert_notification(&user.id, "inactivity", "b", now - Duration::days(1))
            .unwrap();

        assert_eq!(
            db.last_notification_at(&user.id, "inactivity").unwrap(),
            Some(now - Duration::days(1))
        );
    }
}
