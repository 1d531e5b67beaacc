//! Process-wide memoization of upstream responses.
//!
//! Entries never expire and are never overwritten; the only way to refresh
//! data is [`ResponseCache::clear`]. Each key owns a [`OnceCell`], so
//! concurrent misses on the same key share a single upstream fetch.

use crate::error::AppError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Sentinel hashed in place of a missing GraphQL cursor.
const NO_CURSOR: &str = "null";

/// Cache key. The variants are separate namespaces, so a repository named
/// `repos` cannot shadow the repository listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The annotated organization repository list.
    Repos,
    /// Commit history of one repository, by name.
    Commits(String),
    /// A GraphQL page, by content hash of query and cursor.
    Graphql(String),
}

impl CacheKey {
    pub fn commits(repo: impl Into<String>) -> Self {
        Self::Commits(repo.into())
    }

    /// Key for one page of a GraphQL query.
    pub fn graphql(query: &str, cursor: Option<&str>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        hasher.update(cursor.unwrap_or(NO_CURSOR).as_bytes());
        Self::Graphql(STANDARD.encode(hasher.finalize()))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repos => write!(f, "repos"),
            Self::Commits(repo) => write!(f, "commits:{}", repo),
            Self::Graphql(hash) => write!(f, "graphql:{}", hash),
        }
    }
}

type Slot = Arc<OnceCell<Value>>;

#[derive(Debug, Default)]
pub struct ResponseCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &CacheKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(key.clone()).or_default().clone()
    }

    /// Cached value for `key`, if one has been stored.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Store `value` unless the key is already populated.
    ///
    /// Returns `false` when an existing entry was kept.
    pub fn insert(&self, key: CacheKey, value: Value) -> bool {
        self.slot(&key).set(value).is_ok()
    }

    /// Return the cached value, or run `fetch` and store its result.
    ///
    /// Concurrent callers for the same missing key wait on the first caller's
    /// fetch. A failed fetch stores nothing; the next waiter tries again.
    pub async fn get_or_fetch<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<Value, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, AppError>>,
    {
        let slot = self.slot(&key);
        if let Some(value) = slot.get() {
            log::debug!("[cache] hit {}", key);
            return Ok(value.clone());
        }

        let result = slot
            .get_or_try_init(|| async {
                log::debug!("[cache] miss {}", key);
                fetch().await
            })
            .await
            .cloned();

        if result.is_err() {
            self.discard_empty(&key, &slot);
        }
        result
    }

    /// Forget `slot` after a failed fetch. Kept when another caller still
    /// holds it or has filled it, or when a `clear` already replaced it.
    fn discard_empty(&self, key: &CacheKey, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one held by this caller.
        let stale = slots.get(key).is_some_and(|current| {
            Arc::ptr_eq(current, slot) && Arc::strong_count(current) == 2 && !current.initialized()
        });
        if stale {
            slots.remove(key);
        }
    }

    /// Number of keys with a slot, filled or not.
    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Typed variant of [`get_or_fetch`](Self::get_or_fetch); values are
    /// stored as JSON.
    pub async fn get_or_fetch_as<T, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let value = self
            .get_or_fetch(key, || async { Ok(serde_json::to_value(fetch().await?)?) })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Drop every entry. Fetches already in flight finish into detached
    /// slots and are not visible afterwards.
    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = slots.len();
        slots.clear();
        log::info!("[cache] cleared {} entries", dropped);
    }

    /// Number of populated entries.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_graphql_key_is_deterministic() {
        let a = CacheKey::graphql("{ viewer { login } }", None);
        let b = CacheKey::graphql("{ viewer { login } }", None);
        let c = CacheKey::graphql("{ viewer { login } }", Some("Y3Vyc29y"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        // Base64 of a 32-byte digest.
        assert!(matches!(&a, CacheKey::Graphql(h) if h.len() == 44));
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let cache = ResponseCache::new();
        assert!(cache.insert(CacheKey::Repos, json!(["listing"])));
        assert!(cache.insert(CacheKey::commits("repos"), json!(["commits"])));

        assert_eq!(cache.get(&CacheKey::Repos), Some(json!(["listing"])));
        assert_eq!(cache.get(&CacheKey::commits("repos")), Some(json!(["commits"])));
    }

    #[test]
    fn test_insert_never_overwrites() {
        let cache = ResponseCache::new();
        assert!(cache.insert(CacheKey::Repos, json!(1)));
        assert!(!cache.insert(CacheKey::Repos, json!(2)));
        assert_eq!(cache.get(&CacheKey::Repos), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let cache = ResponseCache::new();
        let calls = AtomicUsize::new(0);

        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "sha": "abc" }))
        };

        let first = cache.get_or_fetch(CacheKey::commits("api"), fetch).await.unwrap();
        let second = cache.get_or_fetch(CacheKey::commits("api"), fetch).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_forces_one_new_fetch() {
        let cache = ResponseCache::new();
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!([]))
        };

        cache.get_or_fetch(CacheKey::Repos, fetch).await.unwrap();
        cache.clear();
        assert!(cache.is_empty());

        cache.get_or_fetch(CacheKey::Repos, fetch).await.unwrap();
        cache.get_or_fetch(CacheKey::Repos, fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_stored() {
        let cache = ResponseCache::new();

        let err = cache
            .get_or_fetch(CacheKey::Repos, || async { Err(AppError::network("reset")) })
            .await;
        assert!(err.is_err());
        assert!(cache.get(&CacheKey::Repos).is_none());
        assert_eq!(cache.slot_count(), 0);

        let ok = cache
            .get_or_fetch(CacheKey::Repos, || async { Ok(json!("fresh")) })
            .await
            .unwrap();
        assert_eq!(ok, json!("fresh"));
    }

    #[tokio::test]
    async fn test_failed_distinct_keys_leave_no_slots() {
        let cache = ResponseCache::new();
        cache.insert(CacheKey::Repos, json!([]));

        for query in ["{ a }", "{ b }", "{ c }"] {
            let result = cache
                .get_or_fetch(CacheKey::graphql(query, None), || async {
                    Err(AppError::github_api("Something went wrong"))
                })
                .await;
            assert!(result.is_err());
        }

        assert_eq!(cache.slot_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_fetch() {
        let cache = Arc::new(ResponseCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_fetch(CacheKey::commits("slow"), || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(json!("history"))
                        })
                        .await
                })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            assert_eq!(task.unwrap().unwrap(), json!("history"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let cache = ResponseCache::new();
        let names: Vec<String> = cache
            .get_or_fetch_as(CacheKey::commits("x"), || async {
                Ok(vec!["a".to_string(), "b".to_string()])
            })
            .await
            .unwrap();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(cache.get(&CacheKey::commits("x")), Some(json!(["a", "b"])));
    }
}
