//! Application State
//!
//! Shared state accessible by all API handlers, wrapped in `Arc`.

use chrono::Duration;
use std::sync::Arc;
use std::time::Instant;

use crate::api::error::ApiError;
use crate::config::Config;
use crate::crypto::CredentialCipher;
use crate::entitlements::{EntitlementResolver, StoredEntitlements};
use crate::events::EventBus;
use crate::fx::{HttpRateProvider, RateCache, RateProvider};
use crate::gamification::GamificationService;
use crate::jobs::{DailyChallengesJob, InactivityScanJob, JobScheduler, ScheduleConfig};
use crate::payments::{PaymentGateway, StripeGateway};
use crate::storage::Database;
use crate::websocket::{ConnectionHub, HubConfig};

/// Config seconds as a chrono duration, saturating at the largest one
fn seconds(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub events: EventBus,
    pub gamification: Arc<GamificationService>,
    /// Answers "which plan is this user on"
    pub entitlements: Arc<dyn EntitlementResolver>,
    pub rates: Arc<RateCache>,
    /// Absent without a payment secret key
    pub payments: Option<Arc<dyn PaymentGateway>>,
    /// Absent without an encryption key
    pub cipher: Option<CredentialCipher>,
    pub scheduler: Arc<JobScheduler>,
    pub ws_hub: Arc<ConnectionHub>,
    pub config: Arc<Config>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// State backed by `db`, with both jobs registered and no optional
    /// services
    pub async fn new(db: Arc<Database>, config: Config, rate_provider: Arc<dyn RateProvider>) -> Self {
        let events = EventBus::default();
        let gamification = Arc::new(GamificationService::new(
            Arc::clone(&db),
            events.clone(),
            config.gamification.clone(),
        ));
        let rates = Arc::new(RateCache::new(
            rate_provider,
            seconds(config.fx.fresh_secs),
            seconds(config.fx.stale_secs),
        ));

        let scheduler = Arc::new(JobScheduler::new(std::time::Duration::from_secs(
            config.jobs.tick_secs.max(1),
        )));
        scheduler
            .register(
                Arc::new(DailyChallengesJob::new(Arc::clone(&db), config.gamification.clone())),
                ScheduleConfig::every(config.jobs.daily_challenges_interval_hours),
            )
            .await;
        scheduler
            .register(
                Arc::new(InactivityScanJob::new(
                    Arc::clone(&db),
                    config.gamification.comeback,
                    config.jobs.inactivity_days,
                    config.jobs.notification_cooldown_days,
                )),
                ScheduleConfig::every(config.jobs.inactivity_scan_interval_hours),
            )
            .await;

        Self {
            entitlements: Arc::new(StoredEntitlements::new(Arc::clone(&db))),
            db,
            events,
            gamification,
            rates,
            payments: None,
            cipher: None,
            scheduler,
            ws_hub: Arc::new(ConnectionHub::new(HubConfig::default())),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Open the database and build every configured service
    pub async fn from_config(config: Config) -> Result<Self, ApiError> {
        let db = Arc::new(Database::open(&config.storage.database_path)?);
        let provider = HttpRateProvider::new(
            config.fx.provider_url.clone(),
            std::time::Duration::from_secs(config.fx.request_timeout_secs),
        )?;

        let secrets = config.secrets.clone();
        let payments = config.payments.clone();
        let mut state = Self::new(db, config, Arc::new(provider)).await;

        match secrets.encryption_key.as_deref() {
            Some(key) => state.cipher = Some(CredentialCipher::from_hex_key(key)?),
            None => tracing::warn!("No encryption key configured, exchange credentials disabled"),
        }

        match secrets.payment_secret_key {
            Some(key) => {
                let gateway = StripeGateway::new(
                    payments.api_base,
                    key,
                    std::time::Duration::from_secs(payments.request_timeout_secs),
                )?;
                state.payments = Some(Arc::new(gateway));
            }
            None => tracing::warn!("No payment secret key configured, checkout lookup disabled"),
        }

        if secrets.service_role_key.is_none() {
            tracing::warn!("No service role key configured, admin endpoints disabled");
        }

        Ok(state)
    }

    pub fn with_cipher(mut self, cipher: CredentialCipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn with_payment_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.payments = Some(gateway);
        self
    }

    pub fn with_entitlements(mut self, resolver: Arc<dyn EntitlementResolver>) -> Self {
        self.entitlements = resolver;
        self
    }

    /// Start the WebSocket event forwarder and, when enabled, the job
    /// scheduler
    pub fn start_background(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = vec![Arc::clone(&self.ws_hub).forward_events(&self.events)];
        if self.config.jobs.enabled {
            handles.push(Arc::clone(&self.scheduler).start());
        } else {
            tracing::info!("Scheduled jobs disabled");
        }
        handles
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}
