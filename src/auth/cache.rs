//! In-memory access token reuse
//!
//! Holds the latest access token per resource and hands it back until it
//! enters the refresh window. A per-resource guard makes concurrent callers
//! wait on a single upstream fetch instead of each issuing their own.
//! Only access tokens live here; secret values are never stored.

use azure_core::auth::AccessToken;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::Result;

pub struct TokenCache {
    refresh_skew: Duration,
    entries: Mutex<HashMap<String, AccessToken>>,
    guards: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl TokenCache {
    pub fn new(refresh_skew: Duration) -> Self {
        Self {
            refresh_skew,
            entries: Mutex::new(HashMap::new()),
            guards: Mutex::new(HashMap::new()),
        }
    }

    /// Whether `token` is still usable at `now` given the refresh window
    pub fn is_fresh(&self, token: &AccessToken, now: OffsetDateTime) -> bool {
        let skew = i64::try_from(self.refresh_skew.as_secs()).unwrap_or(i64::MAX);

        token
            .expires_on
            .checked_sub(time::Duration::seconds(skew))
            .map_or(false, |refresh_at| refresh_at > now)
    }

    /// Cached token for `resource` if it is outside the refresh window
    pub fn get(&self, resource: &str) -> Option<AccessToken> {
        let now = OffsetDateTime::now_utc();
        self.entries
            .lock()
            .get(resource)
            .filter(|token| self.is_fresh(token, now))
            .cloned()
    }

    /// Store `token`, evicting entries that have entered the refresh window
    pub fn insert(&self, resource: &str, token: AccessToken) {
        let now = OffsetDateTime::now_utc();
        let mut entries = self.entries.lock();

        entries.retain(|_, cached| self.is_fresh(cached, now));
        entries.insert(resource.to_string(), token);
    }

    /// Drop every cached token
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Return a fresh cached token or run `fetch` once for all concurrent callers
    pub async fn get_or_fetch<F, Fut>(&self, resource: &str, fetch: F) -> Result<AccessToken>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken>>,
    {
        if let Some(token) = self.get(resource) {
            tracing::trace!(resource, "Reusing cached access token");
            return Ok(token);
        }

        // Declared before the lock so the lock is released first on drop.
        let lease = self.lease(resource);
        let _singleflight = lease.guard.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.get(resource) {
            return Ok(token);
        }

        let token = fetch().await?;
        self.insert(resource, token.clone());

        Ok(token)
    }

    fn lease<'a>(&'a self, resource: &'a str) -> FlightLease<'a> {
        let guard = self
            .guards
            .lock()
            .entry(resource.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();

        FlightLease {
            cache: self,
            resource,
            guard,
        }
    }
}

/// Holds a per-resource guard; the last holder removes it from the map,
/// including when the fetch fails or the caller is cancelled.
struct FlightLease<'a> {
    cache: &'a TokenCache,
    resource: &'a str,
    guard: Arc<AsyncMutex<()>>,
}

impl Drop for FlightLease<'_> {
    fn drop(&mut self) {
        let mut guards = self.cache.guards.lock();

        // One reference in the map plus ours means nobody else is waiting.
        let last_holder = guards
            .get(self.resource)
            .map_or(false, |held| Arc::ptr_eq(held, &self.guard))
            && Arc::strong_count(&self.guard) == 2;

        if last_holder {
            guards.remove(self.resource);
        }
    }
}
