// Service exports
pub mod cache;
pub mod normalize;
pub mod postgres;
pub mod scoring;
pub mod store;

pub use cache::{CacheEntry, CacheError, CacheKey, CacheStats, CacheStore, MemoryCacheStore, ScoreCache};
pub use normalize::NormalizeError;
pub use postgres::{PostgresCacheStore, PostgresClient, PostgresError};
pub use scoring::ScoringService;
pub use store::{InMemoryRecordStore, RecordStore, RestRecordStore, StoreCollections, StoreError};
