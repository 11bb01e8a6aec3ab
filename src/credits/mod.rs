//! Upload credits
//!
//! One credit is spent per uploaded trade. The balance check is advisory;
//! the authoritative check is the conditional decrement in
//! [`Database::deduct_upload_credit`].

pub mod batch;

use serde::Serialize;

use crate::storage::{Database, StorageResult};

pub use batch::{upload_batch, upload_in_chunks, BatchUploadReport, FailedTrade};

/// Response of the credit check endpoint
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreditCheck {
    pub can_upload: bool,
    pub remaining: i64,
    pub balance: i64,
}

impl CreditCheck {
    /// Evaluate a balance against `requested` uploads
    pub fn evaluate(balance: i64, requested: i64) -> Self {
        let requested = requested.max(1);
        Self {
            can_upload: balance >= requested,
            remaining: (balance - requested).max(0),
            balance,
        }
    }
}

/// Whether `requested` uploads would currently succeed
pub fn check_credits(db: &Database, user_id: &str, requested: i64) -> StorageResult<CreditCheck> {
    let account = db.credit_account(user_id)?;
    Ok(CreditCheck::evaluate(account.balance, requested))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_evaluate() {
        assert_eq!(
            CreditCheck::evaluate(5, 1),
            CreditCheck { can_upload: true, remaining: 4, balance: 5 }
        );
        assert_eq!(
            CreditCheck::evaluate(2, 3),
            CreditCheck { can_upload: false, remaining: 0, balance: 2 }
        );
        assert!(!CreditCheck::evaluate(0, 0).can_upload);
    }

    #[test]
    fn test_camel_case_contract() {
        let json = serde_json::to_value(CreditCheck::evaluate(3, 1)).unwrap();
        assert_eq!(json["canUpload"], true);
        assert_eq!(json["remaining"], 2);
        assert_eq!(json["balance"], 3);
    }

    #[test]
    fn test_check_credits_reads_balance() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("checker", None, 1, Utc::now()).unwrap();
        assert!(check_credits(&db, &user.id, 1).unwrap().can_upload);
        db.deduct_upload_credit(&user.id).unwrap();
        assert!(!check_credits(&db, &user.id, 1).unwrap().can_upload);
        assert!(check_credits(&db, "missing", 1).is_err());
    }
}
