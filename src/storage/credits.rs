//! Upload credit accounts and the `deduct_upload_credit` procedure

use rusqlite::{params, OptionalExtension};

use super::database::Database;
use super::error::{StorageError, StorageResult};
use super::types::CreditAccount;

impl Database {
    /// Current credit account of a user
    pub fn credit_account(&self, user_id: &str) -> StorageResult<CreditAccount> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT user_id, balance, lifetime_used FROM credit_accounts WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(CreditAccount {
                    user_id: row.get(0)?,
                    balance: row.get(1)?,
                    lifetime_used: row.get(2)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("credit account for user {}", user_id)))
    }

    /// Spend one upload credit.
    ///
    /// The decrement is conditional on `balance > 0`, so the balance can
    /// never go negative. Returns the balance after the deduction.
    pub fn deduct_upload_credit(&self, user_id: &str) -> StorageResult<i64> {
        let conn = self.conn()?;
        let balance: Option<i64> = conn
            .query_row(
                "UPDATE credit_accounts
                 SET balance = balance - 1, lifetime_used = lifetime_used + 1
                 WHERE user_id = ?1 AND balance > 0
                 RETURNING balance",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        match balance {
            Some(balance) => Ok(balance),
            None => {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM credit_accounts WHERE user_id = ?1)",
                    params![user_id],
                    |row| row.get(0),
                )?;
                if exists {
                    Err(StorageError::InsufficientCredits)
                } else {
                    Err(StorageError::NotFound(format!(
                        "credit account for user {}",
                        user_id
                    )))
                }
            }
        }
    }

    /// Add credits to a user's balance
    pub fn grant_credits(&self, user_id: &str, amount: i64) -> StorageResult<CreditAccount> {
        if amount <= 0 {
            return Err(StorageError::InvalidInput(format!(
                "credit grant must be positive, got {}",
                amount
            )));
        }

        {
            let conn = self.conn()?;
            let updated = conn.execute(
                "UPDATE credit_accounts SET balance = balance + ?1 WHERE user_id = ?2",
                params![amount, user_id],
            )?;
            if updated == 0 {
                return Err(StorageError::NotFound(format!(
                    "credit account for user {}",
                    user_id
                )));
            }
        }

        tracing::info!(user_id = %user_id, amount, "Granted upload credits");
        self.credit_account(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_deduct_until_empty() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("scalper", None, 2, Utc::now()).unwrap();

        assert_eq!(db.deduct_upload_credit(&user.id).unwrap(), 1);
        assert_eq!(db.deduct_upload_credit(&user.id).unwrap(), 0);
        assert!(matches!(
            db.deduct_upload_credit(&user.id),
            Err(StorageError::InsufficientCredits)
        ));

        let account = db.credit_account(&user.id).unwrap();
        assert_eq!(account.balance, 0);
        assert_eq!(account.lifetime_used, 2);
    }

    #[test]
    fn test_deduct_unknown_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.deduct_upload_credit("ghost"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_grant_credits() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("swing", None, 0, Utc::now()).unwrap();

        let account = db.grant_credits(&user.id, 10).unwrap();
        assert_eq!(account.balance, 10);
        assert!(db.grant_credits(&user.id, 0).is_err());
        assert!(matches!(
            db.grant_credits("ghost", 3),
            Err(StorageError::NotFound(_))
        ));
    }
}
