use crate::error::ScoreError;
use crate::models::{Grade, MatchScoreResult, NeighborhoodScoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur with cache store operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),
}

impl From<CacheError> for ScoreError {
    fn from(err: CacheError) -> Self {
        ScoreError::CacheUnavailable(err.to_string())
    }
}

/// Score validity window shared by both score types
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Decimal places kept for cached coordinates
const COORDINATE_PRECISION: f64 = 10_000.0;
const RADIUS_PRECISION: f64 = 100.0;

/// Normalized cache key
///
/// Neighborhood keys round coordinates to 4 decimal places (about 11 m) and
/// the radius to 2, so nearby requests share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Neighborhood {
        lat_e4: i64,
        lng_e4: i64,
        radius_e2: i64,
    },
    Match {
        property_id: String,
        opportunity_id: String,
    },
}

impl CacheKey {
    pub fn neighborhood(lat: f64, lng: f64, radius_miles: f64) -> Self {
        CacheKey::Neighborhood {
            lat_e4: (lat * COORDINATE_PRECISION).round() as i64,
            lng_e4: (lng * COORDINATE_PRECISION).round() as i64,
            radius_e2: (radius_miles * RADIUS_PRECISION).round() as i64,
        }
    }

    pub fn pair(property_id: &str, opportunity_id: &str) -> Self {
        CacheKey::Match {
            property_id: property_id.to_string(),
            opportunity_id: opportunity_id.to_string(),
        }
    }

    /// Rounded `(lat, lng, radius)` for neighborhood keys
    pub fn coordinates(&self) -> Option<(f64, f64, f64)> {
        match self {
            CacheKey::Neighborhood { lat_e4, lng_e4, radius_e2 } => Some((
                *lat_e4 as f64 / COORDINATE_PRECISION,
                *lng_e4 as f64 / COORDINATE_PRECISION,
                *radius_e2 as f64 / RADIUS_PRECISION,
            )),
            CacheKey::Match { .. } => None,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Neighborhood { .. } => {
                let (lat, lng, radius) = self.coordinates().unwrap_or_default();
                write!(f, "neighborhood:{:.4}:{:.4}:{:.2}", lat, lng, radius)
            }
            CacheKey::Match { property_id, opportunity_id } => {
                write!(f, "match:{}:{}", property_id, opportunity_id)
            }
        }
    }
}

/// A stored score with expiry and hit bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: serde_json::Value,
    pub score: f64,
    pub grade: Grade,
    pub percentile: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub hit_count: i64,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Indexable columns projected out of a cached payload
pub trait ScoreProjection {
    fn projection(&self) -> (f64, Grade, Option<f64>);
}

impl ScoreProjection for NeighborhoodScoreResult {
    fn projection(&self) -> (f64, Grade, Option<f64>) {
        (self.score, self.grade, Some(self.percentile))
    }
}

impl ScoreProjection for MatchScoreResult {
    fn projection(&self) -> (f64, Grade, Option<f64>) {
        (self.overall_score, self.grade, None)
    }
}

/// Backing store for cached scores
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Return the unexpired entry for `key`, recording a hit at `now`
    async fn touch(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<CacheEntry>, CacheError>;

    /// Insert or replace the entry for `key`
    async fn upsert(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), CacheError>;

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError>;

    /// Delete every entry expired at `now`, returning how many were removed
    async fn sweep(&self, now: DateTime<Utc>) -> Result<u64, CacheError>;
}

/// In-process store on top of a moka cache
///
/// Moka bounds the entry count; expiry is tracked per entry so `touch`
/// reports a miss the moment `expires_at` passes, sweep or not.
pub struct MemoryCacheStore {
    entries: moka::future::Cache<CacheKey, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new(max_entries: u64) -> Self {
        Self {
            entries: moka::future::CacheBuilder::new(max_entries).build(),
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn touch(&self, key: &CacheKey, now: DateTime<Utc>) -> Result<Option<CacheEntry>, CacheError> {
        let Some(mut entry) = self.entries.get(key).await else {
            return Ok(None);
        };
        if entry.is_expired(now) {
            return Ok(None);
        }

        // Read-modify-write: concurrent hits on one key may lose increments
        entry.hit_count += 1;
        entry.last_accessed_at = Some(now);
        self.entries.insert(key.clone(), entry.clone()).await;

        Ok(Some(entry))
    }

    async fn upsert(&self, key: &CacheKey, entry: CacheEntry) -> Result<(), CacheError> {
        self.entries.insert(key.clone(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<u64, CacheError> {
        let expired: Vec<Arc<CacheKey>> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key)
            .collect();

        for key in &expired {
            self.entries.invalidate(key.as_ref()).await;
        }
        self.entries.run_pending_tasks().await;

        Ok(expired.len() as u64)
    }
}

/// A cache hit
#[derive(Debug, Clone)]
pub struct CachedScore<T> {
    pub value: T,
    pub hit_count: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub errors: u64,
    pub hit_rate: f64,
}

/// Advisory score cache shared by both engines
///
/// Store failures never fail a request: a failed read is a miss and a failed
/// write is logged and dropped.
pub struct ScoreCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
}

impl ScoreCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// In-memory cache with the standard 24h TTL
    pub fn in_memory(max_entries: u64) -> Self {
        Self::new(
            Arc::new(MemoryCacheStore::new(max_entries)),
            Duration::hours(DEFAULT_TTL_HOURS),
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a cached score
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CachedScore<T>> {
        let entry = match self.store.touch(key, Utc::now()).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Cache miss: {}", key);
                return None;
            }
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Cache read failed for {}, recomputing: {}", key, e);
                return None;
            }
        };

        match serde_json::from_value::<T>(entry.payload) {
            Ok(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!("Cache hit: {} (hits: {})", key, entry.hit_count);
                Some(CachedScore {
                    value,
                    hit_count: entry.hit_count,
                    created_at: entry.created_at,
                    expires_at: entry.expires_at,
                })
            }
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Store a score with the default TTL
    pub async fn put<T: Serialize + ScoreProjection>(&self, key: &CacheKey, value: &T) {
        self.put_with_ttl(key, value, self.ttl).await;
    }

    /// Store a score, replacing any existing entry and resetting its hits
    pub async fn put_with_ttl<T: Serialize + ScoreProjection>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if let Err(e) = self.try_put(key, value, ttl).await {
            self.errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Cache write failed for {}: {}", key, e);
            return;
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Cache set: {}", key);
    }

    async fn try_put<T: Serialize + ScoreProjection>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_value(value)?;
        let (score, grade, percentile) = value.projection();
        let now = Utc::now();

        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            score,
            grade,
            percentile,
            created_at: now,
            expires_at: now + ttl,
            hit_count: 0,
            last_accessed_at: None,
        };

        self.store.upsert(key, entry).await
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        if let Err(e) = self.store.delete(key).await {
            self.errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Cache delete failed for {}: {}", key, e);
        }
    }

    /// Remove expired entries. Run periodically by the host, never by the engines.
    pub async fn sweep(&self) -> Result<u64, ScoreError> {
        let removed = self.store.sweep(Utc::now()).await?;
        tracing::info!("Cache sweep removed {} expired entries", removed);
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            writes: self.writes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            hit_rate: if total == 0 { 0.0 } else { hits as f64 / total as f64 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryScores, MatchScoreResult};

    fn sample_result(score: f64) -> MatchScoreResult {
        MatchScoreResult {
            property_id: "p1".to_string(),
            opportunity_id: "o1".to_string(),
            overall_score: score,
            grade: Grade::B,
            qualified: true,
            competitive: false,
            category_scores: CategoryScores::default(),
            disqualifiers: vec![],
            strengths: vec![],
            weaknesses: vec![],
            recommendations: vec![],
            checks_evaluated: vec![],
            computed_at: Utc::now(),
        }
    }

    /// Store that fails every operation
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn touch(&self, _: &CacheKey, _: DateTime<Utc>) -> Result<Option<CacheEntry>, CacheError> {
            Err(CacheError::Corrupt("offline".into()))
        }
        async fn upsert(&self, _: &CacheKey, _: CacheEntry) -> Result<(), CacheError> {
            Err(CacheError::Corrupt("offline".into()))
        }
        async fn delete(&self, _: &CacheKey) -> Result<(), CacheError> {
            Err(CacheError::Corrupt("offline".into()))
        }
        async fn sweep(&self, _: DateTime<Utc>) -> Result<u64, CacheError> {
            Err(CacheError::Corrupt("offline".into()))
        }
    }

    #[test]
    fn test_cache_key_normalization() {
        let a = CacheKey::neighborhood(38.90721, -77.03689, 5.0);
        let b = CacheKey::neighborhood(38.907204, -77.036894, 5.001);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "neighborhood:38.9072:-77.0369:5.00");

        assert_ne!(CacheKey::pair("p1", "o1"), CacheKey::pair("o1", "p1"));
        assert_eq!(CacheKey::pair("p1", "o1").to_string(), "match:p1:o1");
    }

    #[tokio::test]
    async fn test_round_trip_increments_hits() {
        let cache = ScoreCache::in_memory(100);
        let key = CacheKey::pair("p1", "o1");

        assert!(cache.get::<MatchScoreResult>(&key).await.is_none());

        cache.put(&key, &sample_result(81.0)).await;
        let first = cache.get::<MatchScoreResult>(&key).await.unwrap();
        let second = cache.get::<MatchScoreResult>(&key).await.unwrap();

        assert_eq!(first.value.overall_score, 81.0);
        assert_eq!(first.hit_count, 1);
        assert_eq!(second.hit_count, 2);

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_miss_before_sweep() {
        let cache = ScoreCache::in_memory(100);
        let key = CacheKey::pair("p1", "o1");

        cache.put_with_ttl(&key, &sample_result(50.0), Duration::zero()).await;
        assert!(cache.get::<MatchScoreResult>(&key).await.is_none());

        assert_eq!(cache.sweep().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_overwrite_is_last_writer_wins() {
        let cache = ScoreCache::in_memory(100);
        let key = CacheKey::pair("p1", "o1");

        cache.put(&key, &sample_result(40.0)).await;
        cache.put(&key, &sample_result(90.0)).await;

        let hit = cache.get::<MatchScoreResult>(&key).await.unwrap();
        assert_eq!(hit.value.overall_score, 90.0);
    }

    #[tokio::test]
    async fn test_broken_store_degrades_to_miss() {
        let cache = ScoreCache::new(Arc::new(BrokenStore), Duration::hours(24));
        let key = CacheKey::pair("p1", "o1");

        cache.put(&key, &sample_result(70.0)).await;
        assert!(cache.get::<MatchScoreResult>(&key).await.is_none());
        assert!(matches!(cache.sweep().await, Err(ScoreError::CacheUnavailable(_))));
        assert_eq!(cache.stats().errors, 2);
    }
}
