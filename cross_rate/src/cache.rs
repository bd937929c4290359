//! Caching of fetched and derived series

use crate::instrument::PricingMode;
use crate::source::FetchWindow;
use chrono::{DateTime, Utc};
use forecast_rate::data::QuoteSeries;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

/// Default time-to-live of cached series
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Identifies a cached series.
///
/// Raw source fetches have no mode and no base; derived series carry the mode
/// and base symbol they were derived with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub mode: Option<PricingMode>,
    pub base: Option<String>,
    pub window: FetchWindow,
}

impl CacheKey {
    pub fn raw(symbol: impl Into<String>, window: &FetchWindow) -> Self {
        Self {
            symbol: symbol.into(),
            mode: None,
            base: None,
            window: window.clone(),
        }
    }

    pub fn derived(
        symbol: impl Into<String>,
        mode: PricingMode,
        base: impl Into<String>,
        window: &FetchWindow,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            mode: Some(mode),
            base: Some(base.into()),
            window: window.clone(),
        }
    }
}

/// A cached series and when it was fetched
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSeries {
    pub series: QuoteSeries,
    pub fetched_at: DateTime<Utc>,
}

/// Store of recently fetched series
pub trait SeriesCache: Debug + Send + Sync {
    /// A fresh entry for `key`, if any
    fn get(&self, key: &CacheKey) -> Option<CachedSeries>;

    fn put(&self, key: CacheKey, series: QuoteSeries);

    fn clear(&self);
}

/// Source of the current time
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if let Ok(by) = chrono::Duration::from_std(by) {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-memory cache whose entries expire after a fixed time-to-live
#[derive(Debug)]
pub struct TtlSeriesCache {
    entries: RwLock<HashMap<CacheKey, CachedSeries>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TtlSeriesCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries older than the time-to-live
    pub fn clear_expired(&self) {
        let now = self.clock.now();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, entry| self.is_fresh(entry, now));
    }

    fn is_fresh(&self, entry: &CachedSeries, now: DateTime<Utc>) -> bool {
        // A negative age means the clock went backwards; treat as fresh
        match (now - entry.fetched_at).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        }
    }
}

impl Default for TtlSeriesCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl SeriesCache for TtlSeriesCache {
    fn get(&self, key: &CacheKey) -> Option<CachedSeries> {
        let now = self.clock.now();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .cloned()
    }

    fn put(&self, key: CacheKey, series: QuoteSeries) {
        if self.ttl.is_zero() {
            return;
        }
        let entry = CachedSeries {
            series,
            fetched_at: self.clock.now(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Cache that stores nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl SeriesCache for NoCache {
    fn get(&self, _key: &CacheKey) -> Option<CachedSeries> {
        None
    }

    fn put(&self, _key: CacheKey, _series: QuoteSeries) {}

    fn clear(&self) {}
}
