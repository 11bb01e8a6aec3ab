//! Profile and API token queries

use chrono::{DateTime, Utc};
use rand::RngCore;
use rusqlite::{params, OptionalExtension, Row};
use sha2::{Digest, Sha256};

use super::database::{map_conflict, Database};
use super::error::{StorageError, StorageResult};
use super::types::UserProfile;

const PROFILE_COLUMNS: &str = "id, username, display_name, created_at, last_active_at";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        username: row.get(1)?,
        display_name: row.get(2)?,
        created_at: row.get(3)?,
        last_active_at: row.get(4)?,
    })
}

/// Hex-encoded SHA-256 of a bearer token; only the hash is stored
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl Database {
    /// Create a profile together with its empty XP record and credit account
    pub fn create_user(
        &self,
        username: &str,
        display_name: Option<&str>,
        starting_credits: i64,
        now: DateTime<Utc>,
    ) -> StorageResult<UserProfile> {
        let username = username.trim();
        if username.is_empty() || username.len() > 32 {
            return Err(StorageError::InvalidInput(
                "username must be 1-32 characters".to_string(),
            ));
        }
        if starting_credits < 0 {
            return Err(StorageError::InvalidInput(
                "starting credits cannot be negative".to_string(),
            ));
        }

        let profile = UserProfile {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            display_name: display_name.map(str::to_string),
            created_at: now,
            last_active_at: None,
        };

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO profiles (id, username, display_name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![profile.id, profile.username, profile.display_name, profile.created_at],
        )
        .map_err(|e| map_conflict(e, &format!("username '{}'", profile.username)))?;

        tx.execute(
            "INSERT INTO xp_records (user_id, updated_at) VALUES (?1, ?2)",
            params![profile.id, now],
        )?;

        tx.execute(
            "INSERT INTO credit_accounts (user_id, balance) VALUES (?1, ?2)",
            params![profile.id, starting_credits],
        )?;

        tx.commit()?;

        tracing::info!(user_id = %profile.id, username = %profile.username, "Created user");
        Ok(profile)
    }

    /// Fetch a profile by id
    pub fn get_user(&self, user_id: &str) -> StorageResult<UserProfile> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS),
            params![user_id],
            profile_from_row,
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("user {}", user_id)))
    }

    /// Fetch a profile by username
    pub fn get_user_by_username(&self, username: &str) -> StorageResult<UserProfile> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM profiles WHERE username = ?1", PROFILE_COLUMNS),
            params![username],
            profile_from_row,
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("user '{}'", username)))
    }

    /// All profiles, oldest first
    pub fn list_users(&self) -> StorageResult<Vec<UserProfile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM profiles ORDER BY created_at ASC",
            PROFILE_COLUMNS
        ))?;
        let users = stmt
            .query_map([], profile_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Stamp the user's last activity time
    pub fn touch_last_active(&self, user_id: &str, at: DateTime<Utc>) -> StorageResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE profiles SET last_active_at = ?1 WHERE id = ?2",
            params![at, user_id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }

    /// Issue a new bearer token for a user; the plaintext is returned once
    pub fn issue_token(&self, user_id: &str, now: DateTime<Utc>) -> StorageResult<String> {
        // Verify the user exists to give a clean NotFound instead of an FK failure
        self.get_user(user_id)?;

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = format!("tq_{}", hex::encode(bytes));

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO api_tokens (token_hash, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![hash_token(&token), user_id, now],
        )?;

        tracing::info!(user_id = %user_id, "Issued API token");
        Ok(token)
    }

    /// Resolve a bearer token to its user id
    pub fn user_for_token(&self, token: &str) -> StorageResult<Option<String>> {
        let conn = self.conn()?;
        let user_id = conn
            .query_row(
                "SELECT user_id FROM api_tokens WHERE token_hash = ?1",
                params![hash_token(token)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_fetch_user() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();

        let user = db.create_user("satoshi", Some("Satoshi"), 5, now).unwrap();
        let fetched = db.get_user(&user.id).unwrap();
        assert_eq!(fetched.username, "satoshi");
        assert_eq!(fetched.display_name.as_deref(), Some("Satoshi"));
        assert!(fetched.last_active_at.is_none());

        assert_eq!(db.credit_account(&user.id).unwrap().balance, 5);
        assert_eq!(db.get_xp_record(&user.id).unwrap().level, 1);
    }

    #[test]
    fn test_duplicate_username_conflicts() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("hodler", None, 0, Utc::now()).unwrap();

        let err = db.create_user("hodler", None, 0, Utc::now()).unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[test]
    fn test_missing_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_user("nope"), Err(StorageError::NotFound(_))));
        assert!(matches!(
            db.touch_last_active("nope", Utc::now()),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_token_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("whale", None, 0, Utc::now()).unwrap();

        let token = db.issue_token(&user.id, Utc::now()).unwrap();
        assert!(token.starts_with("tq_"));
        assert_eq!(db.user_for_token(&token).unwrap(), Some(user.id));
        assert_eq!(db.user_for_token("tq_bogus").unwrap(), None);
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let a = hash_token("secret");
        assert_eq!(a.len(), 64);
        assert_eq!(a, hash_token("secret"));
        assert_ne!(a, hash_token("secret2"));
    }
}
