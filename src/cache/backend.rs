//! Injected storage for rendered responses.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// A fully rendered response plus its invalidation tags
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Bytes,
    pub content_type: Option<String>,
    pub tags: BTreeSet<String>,
    /// `None` keeps the entry until one of its tags is invalidated
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Key/value store for cache entries with tag-based invalidation
///
/// Implementations must be safe under concurrent access. Expired entries must
/// not be returned by [`CacheBackend::get`].
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Insert or replace an entry
    async fn set(&self, entry: CacheEntry) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every entry carrying any of the tags, returning how many
    async fn invalidate_tags(&self, tags: &[String]) -> Result<usize>;
}
