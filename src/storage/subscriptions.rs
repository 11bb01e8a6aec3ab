//! Subscription rows

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::database::{parse_column, Database};
use super::error::StorageResult;
use super::types::Subscription;

impl Database {
    /// Stored subscription of a user, if any
    pub fn get_subscription(&self, user_id: &str) -> StorageResult<Option<Subscription>> {
        let conn = self.conn()?;
        let subscription = conn
            .query_row(
                "SELECT user_id, plan, billing_cycle, status, current_period_end
                 FROM subscriptions WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(Subscription {
                        user_id: row.get(0)?,
                        plan: parse_column(1, row.get(1)?)?,
                        billing_cycle: parse_column(2, row.get(2)?)?,
                        status: parse_column(3, row.get(3)?)?,
                        current_period_end: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(subscription)
    }

    /// Insert or replace a user's subscription
    pub fn upsert_subscription(
        &self,
        subscription: &Subscription,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.get_user(&subscription.user_id)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO subscriptions (user_id, plan, billing_cycle, status, current_period_end, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id) DO UPDATE SET
                plan = excluded.plan,
                billing_cycle = excluded.billing_cycle,
                status = excluded.status,
                current_period_end = excluded.current_period_end,
                updated_at = excluded.updated_at",
            params![
                subscription.user_id,
                subscription.plan.as_str(),
                subscription.billing_cycle.as_str(),
                subscription.status.as_str(),
                subscription.current_period_end,
                now,
            ],
        )?;

        tracing::info!(
            user_id = %subscription.user_id,
            plan = %subscription.plan.as_str(),
            status = %subscription.status.as_str(),
            "Saved subscription"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{BillingCycle, PlanTier};
    use crate::storage::types::SubscriptionStatus;
    use crate::storage::StorageError;

    #[test]
    fn test_upsert_and_get() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("subscriber", None, 0, Utc::now()).unwrap();
        assert!(db.get_subscription(&user.id).unwrap().is_none());

        let mut sub = Subscription {
            user_id: user.id.clone(),
            plan: PlanTier::Pro,
            billing_cycle: BillingCycle::Monthly,
            status: SubscriptionStatus::Active,
            current_period_end: None,
        };
        db.upsert_subscription(&sub, Utc::now()).unwrap();
        assert_eq!(db.get_subscription(&user.id).unwrap(), Some(sub.clone()));

        sub.plan = PlanTier::Elite;
        sub.billing_cycle = BillingCycle::Annual;
        db.upsert_subscription(&sub, Utc::now()).unwrap();
        assert_eq!(db.get_subscription(&user.id).unwrap().unwrap().plan, PlanTier::Elite);
    }

    #[test]
    fn test_upsert_unknown_user() {
        let db = Database::open_in_memory().unwrap();
        let sub = Subscription {
            user_id: "ghost".to_string(),
            plan: PlanTier::Pro,
            billing_cycle: BillingCycle::Monthly,
            status: SubscriptionStatus::Active,
            current_period_end: None,
        };
        assert!(matches!(
            db.upsert_subscription(&sub, Utc::now()),
            Err(StorageError::NotFound(_))
        ));
    }
}
