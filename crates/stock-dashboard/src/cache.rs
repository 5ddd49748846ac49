//! Caching layer for the company directory.
//!
//! The listing changes rarely compared to a session, so one snapshot is kept
//! for the configured TTL and reused by every name lookup. The cache is an
//! ordinary value owned by the dashboard; tests build one around a mock
//! provider instead of touching shared state.

use cached::{Cached, TimedCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::model::CompanyDirectory;
use crate::providers::{ListingProvider, with_timeout};

/// Single-slot timed cache around a [`ListingProvider`]
pub struct DirectoryCache {
    provider: Arc<dyn ListingProvider>,
    cache: Arc<RwLock<TimedCache<(), Arc<CompanyDirectory>>>>,
    last_failure: Arc<RwLock<Option<String>>>,
    timeout: Duration,
}

impl DirectoryCache {
    /// Create a new cache with specified TTL
    pub fn new(provider: Arc<dyn ListingProvider>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            provider,
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
            last_failure: Arc::new(RwLock::new(None)),
            timeout,
        }
    }

    /// Cached directory, if one is loaded and still fresh
    pub async fn get(&self) -> Option<Arc<CompanyDirectory>> {
        let mut cache = self.cache.write().await;
        cache.cache_get(&()).cloned()
    }

    /// Get the directory, fetching it from the provider on a miss.
    ///
    /// A failed fetch is returned to the caller and is not cached, so the
    /// next lookup tries the provider again.
    pub async fn directory(&self) -> Result<Arc<CompanyDirectory>> {
        if let Some(directory) = self.get().await {
            tracing::debug!("Directory cache hit ({} listings)", directory.len());
            return Ok(directory);
        }

        tracing::debug!("Directory cache miss");

        let directory =
            match with_timeout("KRX listing", self.timeout, self.provider.fetch_listing()).await {
                Ok(directory) => Arc::new(directory),
                Err(e) => {
                    *self.last_failure.write().await = Some(e.to_string());
                    return Err(e);
                }
            };
        tracing::info!("Loaded company directory: {} listings", directory.len());
        *self.last_failure.write().await = None;

        let mut cache = self.cache.write().await;
        let _ = cache.cache_set((), Arc::clone(&directory));

        Ok(directory)
    }

    /// Drop the cached directory so the next lookup refetches it
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
        *self.last_failure.write().await = None;
        tracing::info!("Directory cache invalidated");
    }

    /// Reason the most recent load failed, until a later load succeeds
    pub async fn last_failure(&self) -> Option<String> {
        self.last_failure.read().await.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.get().await.is_some()
    }
}

impl Clone for DirectoryCache {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            cache: Arc::clone(&self.cache),
            last_failure: Arc::clone(&self.last_failure),
            timeout: self.timeout,
        }
    }
}
