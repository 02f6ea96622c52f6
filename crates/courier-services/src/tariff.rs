//! Tariff service
//!
//! Resolves the tariff version in effect, with the active version cached in
//! Redis. Every version is validated before it prices anything, whether it
//! came from the database, the cache or a seed file.

use chrono::{DateTime, Utc};
use courier_cache::{keys, RedisCache};
use courier_core::{
    models::{TariffTable, TariffVersion},
    traits::{CacheService, TariffRepository},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Active tariff lookup with caching
pub struct TariffService<T: TariffRepository + ?Sized> {
    repo: Arc<T>,
    cache: Option<Arc<RedisCache>>,
    cache_ttl_secs: u64,
}

impl<T: TariffRepository + ?Sized> TariffService<T> {
    /// Create a new tariff service; `cache` is optional
    pub fn new(repo: Arc<T>, cache: Option<Arc<RedisCache>>) -> Self {
        Self {
            repo,
            cache,
            cache_ttl_secs: keys::ACTIVE_TARIFF_TTL_SECS,
        }
    }

    /// Override the TTL of the cached active version
    pub fn with_cache_ttl(mut self, ttl_secs: u64) -> Self {
        self.cache_ttl_secs = ttl_secs;
        self
    }

    async fn get_from_cache(&self, now: DateTime<Utc>) -> Option<TariffVersion> {
        let cache = self.cache.as_ref()?;

        match cache.get::<TariffVersion>(&keys::active_tariff_key()).await {
            Ok(Some(version)) if version.effective_from <= now => {
                if let Err(e) = version.rates.validate() {
                    warn!("Ignoring invalid cached tariff {}: {}", version.id, e);
                    return None;
                }
                debug!("Tariff cache HIT: version {}", version.id);
                Some(version)
            }
            Ok(_) => None,
            Err(e) => {
                // Cache errors never fail pricing
                warn!("Tariff cache error: {}", e);
                None
            }
        }
    }

    async fn store_in_cache(&self, version: &TariffVersion, ttl_secs: u64) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache
                .set(&keys::active_tariff_key(), version, ttl_secs)
                .await
            {
                warn!("Failed to cache tariff {}: {}", version.id, e);
            }
        }
    }

    async fn invalidate_cache(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.delete(&keys::active_tariff_key()).await {
                warn!("Failed to invalidate cached tariff: {}", e);
            }
        }
    }

    /// Tariff version effective now
    ///
    /// # Errors
    ///
    /// `TariffConfigurationMissing` when no version is effective or the
    /// stored one is incomplete
    #[instrument(skip(self))]
    pub async fn active(&self) -> AppResult<TariffVersion> {
        let now = Utc::now();

        if let Some(version) = self.get_from_cache(now).await {
            return Ok(version);
        }

        let version = self.repo.find_active(now).await?.ok_or_else(|| {
            AppError::TariffConfigurationMissing("no tariff version is in effect".to_string())
        })?;
        version.rates.validate()?;

        if self.cache.is_some() {
            let next = self.repo.next_effective_from(now).await?;
            match cache_ttl(self.cache_ttl_secs, now, next) {
                Some(ttl) => self.store_in_cache(&version, ttl).await,
                None => debug!("Next tariff version is imminent, not caching"),
            }
        }
        Ok(version)
    }

    /// Store a new tariff version after validating it
    #[instrument(skip(self, rates))]
    pub async fn install(
        &self,
        rates: TariffTable,
        effective_from: DateTime<Utc>,
    ) -> AppResult<TariffVersion> {
        rates.validate()?;

        let created = self
            .repo
            .create(&TariffVersion::new(rates, effective_from))
            .await?;
        self.invalidate_cache().await;

        info!(
            id = created.id,
            effective_from = %created.effective_from,
            "Installed tariff version"
        );
        Ok(created)
    }

    /// Install the tariff in `path` when no version is in effect yet
    ///
    /// Returns the installed version, or `None` when one already exists.
    #[instrument(skip(self))]
    pub async fn seed_from_file(&self, path: &str) -> AppResult<Option<TariffVersion>> {
        if self.repo.find_active(Utc::now()).await?.is_some() {
            debug!("Tariff already present, skipping seed");
            return Ok(None);
        }

        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AppError::Config(format!("Failed to read tariff seed {}: {}", path, e)))?;
        let rates = parse_tariff_table(&json)?;

        self.install(rates, Utc::now()).await.map(Some)
    }
}

/// TTL for caching the version active at `now`
///
/// The entry must expire before the next version takes effect. `None` when
/// that is less than a second away.
pub fn cache_ttl(ttl_secs: u64, now: DateTime<Utc>, next: Option<DateTime<Utc>>) -> Option<u64> {
    let Some(next) = next else {
        return Some(ttl_secs);
    };
    let remaining = (next - now).num_seconds();
    if remaining < 1 {
        return None;
    }
    Some(ttl_secs.min(remaining as u64))
}

/// Parse a tariff table, rejecting unknown keys and incomplete tables
pub fn parse_tariff_table(json: &str) -> AppResult<TariffTable> {
    let rates: TariffTable = serde_json::from_str(json)
        .map_err(|e| AppError::Config(format!("Invalid tariff table: {}", e)))?;
    rates.validate()?;
    Ok(rates)
}
