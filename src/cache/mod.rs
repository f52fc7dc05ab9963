//! Cache layer
//!
//! Process-local cache (moka) used for hot public reads. Running quiz
//! sessions live in their own `MemoryCache` owned by the quiz service.
//!
//! ```rust,ignore
//! let cache = create_cache(&config.cache);
//! cache.set("key", &"value", Duration::from_secs(60)).await?;
//! ```

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::CacheConfig;

pub use memory::MemoryCache;

/// Cache layer trait
///
/// The methods are generic, so this trait is not object safe. Use the
/// `Cache` enum for runtime polymorphism.
#[async_trait]
pub trait CacheLayer: Send + Sync {
    /// Get a value from cache
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Set a value in cache with its own TTL
    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()>;

    /// Remove a value and return it. Concurrent callers never both receive it.
    async fn take<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete all values whose key matches a glob pattern
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;

    /// Clear all cache entries
    async fn clear(&self) -> Result<()>;
}

/// Unified cache enum for runtime polymorphism
#[derive(Debug)]
pub enum Cache {
    /// In-memory cache using moka
    Memory(MemoryCache),
}

impl Cache {
    /// TTL for cached reads, from `cache.ttl_seconds`
    pub fn default_ttl(&self) -> Duration {
        match self {
            Cache::Memory(cache) => cache.default_ttl(),
        }
    }
}

#[async_trait]
impl CacheLayer for Cache {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self {
            Cache::Memory(cache) => cache.get(key).await,
        }
    }

    async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.set(key, value, ttl).await,
        }
    }

    async fn take<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self {
            Cache::Memory(cache) => cache.take(key).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete(key).await,
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.delete_pattern(pattern).await,
        }
    }

    async fn clear(&self) -> Result<()> {
        match self {
            Cache::Memory(cache) => cache.clear().await,
        }
    }
}

/// Create the cache described by configuration
pub fn create_cache(config: &CacheConfig) -> Arc<Cache> {
    let cache = MemoryCache::with_capacity_and_ttl(
        config.max_capacity,
        Duration::from_secs(config.ttl_seconds),
    );
    Arc::new(Cache::Memory(cache))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_cache_from_config() {
        let config = CacheConfig {
            ttl_seconds: 1800,
            max_capacity: 50,
        };
        let cache = create_cache(&config);
        assert_eq!(cache.default_ttl(), Duration::from_secs(1800));

        cache.set("key", &"value".to_string(), Duration::from_secs(60)).await.unwrap();
        let result: Option<String> = cache.get("key").await.unwrap();
        assert_eq!(result, Some("value".to_string()));
    }
}
