//! Exchange-rate cache
//!
//! A cached rate younger than the fresh window is served as is. Older
//! entries trigger a refetch; if the provider fails, entries still inside
//! the stale window are served and anything older surfaces the error.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{normalize_currency, FxError, RateProvider};

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    rate: f64,
    fetched_at: DateTime<Utc>,
}

/// A rate as served to callers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RateQuote {
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub fetched_at: DateTime<Utc>,
    /// Served from cache after a failed refresh
    pub stale: bool,
}

impl RateQuote {
    pub fn convert(&self, amount: f64) -> f64 {
        amount * self.rate
    }
}

pub struct RateCache {
    provider: Arc<dyn RateProvider>,
    entries: RwLock<HashMap<(String, String), CachedRate>>,
    fresh_for: Duration,
    stale_for: Duration,
}

impl RateCache {
    pub fn new(provider: Arc<dyn RateProvider>, fresh_for: Duration, stale_for: Duration) -> Self {
        Self {
            provider,
            entries: RwLock::new(HashMap::new()),
            fresh_for,
            stale_for,
        }
    }

    /// Cache with the default 15 minute fresh and 1 hour stale windows
    pub fn with_defaults(provider: Arc<dyn RateProvider>) -> Self {
        Self::new(provider, Duration::minutes(15), Duration::hours(1))
    }

    pub async fn get_rate(&self, from: &str, to: &str) -> Result<RateQuote, FxError> {
        self.get_rate_at(from, to, Utc::now()).await
    }

    /// Rate lookup as of `now`
    pub async fn get_rate_at(
        &self,
        from: &str,
        to: &str,
        now: DateTime<Utc>,
    ) -> Result<RateQuote, FxError> {
        let from = normalize_currency(from)?;
        let to = normalize_currency(to)?;

        if from == to {
            return Ok(RateQuote {
                from,
                to,
                rate: 1.0,
                fetched_at: now,
                stale: false,
            });
        }

        let key = (from.clone(), to.clone());
        let cached = self.entries.read().await.get(&key).copied();

        if let Some(entry) = cached {
            if now - entry.fetched_at < self.fresh_for {
                return Ok(quote(&key, entry, false));
            }
        }

        match self.provider.fetch_rate(&from, &to).await {
            Ok(rate) => {
                let entry = CachedRate {
                    rate,
                    fetched_at: now,
                };
                self.entries.write().await.insert(key.clone(), entry);
                tracing::debug!(from = %from, to = %to, rate, "Fetched exchange rate");
                Ok(quote(&key, entry, false))
            }
            Err(e) => match cached {
                Some(entry) if now - entry.fetched_at <= self.stale_for => {
                    tracing::warn!(
                        from = %from,
                        to = %to,
                        age_secs = (now - entry.fetched_at).num_seconds(),
                        error = %e,
                        "Rate refresh failed, serving stale rate"
                    );
                    Ok(quote(&key, entry, true))
                }
                _ => Err(e),
            },
        }
    }

    /// Convert `amount` of `from` into `to`
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Result<(f64, RateQuote), FxError> {
        let quote = self.get_rate(from, to).await?;
        Ok((quote.convert(amount), quote))
    }

    /// Number of cached pairs
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn quote(key: &(String, String), entry: CachedRate, stale: bool) -> RateQuote {
    RateQuote {
        from: key.0.clone(),
        to: key.1.clone(),
        rate: entry.rate,
        fetched_at: entry.fetched_at,
        stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct MockProvider {
        rate: f64,
        failing: AtomicBool,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(rate: f64) -> Arc<Self> {
            Arc::new(Self {
                rate,
                failing: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateProvider for MockProvider {
        async fn fetch_rate(&self, _from: &str, _to: &str) -> Result<f64, FxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(FxError::Unavailable)
            } else {
                Ok(self.rate)
            }
        }
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_fetch() {
        let provider = MockProvider::new(0.9);
        let cache = RateCache::with_defaults(provider.clone());
        let t0 = Utc::now();

        let q = cache.get_rate_at("usd", "eur", t0).await.unwrap();
        assert_eq!(q.rate, 0.9);
        assert_eq!(provider.calls(), 1);

        let q = cache.get_rate_at("USD", "EUR", t0 + Duration::minutes(14)).await.unwrap();
        assert!(!q.stale);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let provider = MockProvider::new(0.9);
        let cache = RateCache::with_defaults(provider.clone());
        let t0 = Utc::now();

        cache.get_rate_at("USD", "EUR", t0).await.unwrap();
        let q = cache.get_rate_at("USD", "EUR", t0 + Duration::minutes(20)).await.unwrap();
        assert_eq!(provider.calls(), 2);
        assert_eq!(q.fetched_at, t0 + Duration::minutes(20));
    }

    #[tokio::test]
    async fn test_stale_fallback_within_an_hour() {
        let provider = MockProvider::new(0.9);
        let cache = RateCache::with_defaults(provider.clone());
        let t0 = Utc::now();
        cache.get_rate_at("USD", "EUR", t0).await.unwrap();

        provider.failing.store(true, Ordering::SeqCst);
        let q = cache.get_rate_at("USD", "EUR", t0 + Duration::minutes(45)).await.unwrap();
        assert!(q.stale);
        assert_eq!(q.rate, 0.9);

        let err = cache.get_rate_at("USD", "EUR", t0 + Duration::minutes(61)).await;
        assert!(matches!(err, Err(FxError::Unavailable)));
    }

    #[tokio::test]
    async fn test_no_entry_propagates_error() {
        let provider = MockProvider::new(0.9);
        provider.failing.store(true, Ordering::SeqCst);
        let cache = RateCache::with_defaults(provider.clone());
        assert!(cache.get_rate("USD", "EUR").await.is_err());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_same_currency_never_fetches() {
        let provider = MockProvider::new(0.9);
        let cache = RateCache::with_defaults(provider.clone());
        let (amount, q) = cache.convert(42.0, "usd", "USD").await.unwrap();
        assert_eq!(amount, 42.0);
        assert_eq!(q.rate, 1.0);
        assert_eq!(provider.calls(), 0);
    }
}
