//! Entitlement resolution
//!
//! Which tier a user is entitled to is always answered by an
//! [`EntitlementResolver`]. The default resolver reads the stored
//! subscription; a payment-provider-backed resolver can be swapped in at the
//! same seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::pricing::PlanTier;
use crate::storage::{Database, StorageResult, Subscription};

/// Gated capability
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    CsvImport,
    AdvancedAnalytics,
    ExchangeCredentials,
}

impl Feature {
    /// Lowest tier that unlocks the feature
    pub fn required_tier(&self) -> PlanTier {
        match self {
            Feature::CsvImport | Feature::AdvancedAnalytics => PlanTier::Pro,
            Feature::ExchangeCredentials => PlanTier::Elite,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::CsvImport => "csv_import",
            Feature::AdvancedAnalytics => "advanced_analytics",
            Feature::ExchangeCredentials => "exchange_credentials",
        }
    }

    pub fn all() -> &'static [Feature] {
        &[
            Feature::CsvImport,
            Feature::AdvancedAnalytics,
            Feature::ExchangeCredentials,
        ]
    }
}

/// What a user may do right now
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Entitlements {
    pub tier: PlanTier,
    pub features: Vec<Feature>,
}

impl Entitlements {
    pub fn for_tier(tier: PlanTier) -> Self {
        let features = Feature::all()
            .iter()
            .copied()
            .filter(|f| tier >= f.required_tier())
            .collect();
        Self { tier, features }
    }

    pub fn allows(&self, feature: Feature) -> bool {
        self.tier >= feature.required_tier()
    }
}

/// Effective tier of a stored subscription at `now`.
///
/// Missing, non-granting (past due / canceled) or expired subscriptions fall
/// back to Basic.
pub fn effective_tier(subscription: Option<&Subscription>, now: DateTime<Utc>) -> PlanTier {
    match subscription {
        Some(sub)
            if sub.status.grants_access()
                && sub.current_period_end.map(|end| now < end).unwrap_or(true) =>
        {
            sub.plan
        }
        _ => PlanTier::Basic,
    }
}

/// Resolves the entitlements of a user
#[async_trait]
pub trait EntitlementResolver: Send + Sync {
    async fn resolve(&self, user_id: &str) -> StorageResult<Entitlements>;
}

/// Resolver backed by the subscriptions table
pub struct StoredEntitlements {
    db: Arc<Database>,
}

impl StoredEntitlements {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntitlementResolver for StoredEntitlements {
    async fn resolve(&self, user_id: &str) -> StorageResult<Entitlements> {
        let subscription = self.db.get_subscription(user_id)?;
        let tier = effective_tier(subscription.as_ref(), Utc::now());
        Ok(Entitlements::for_tier(tier))
    }
}
