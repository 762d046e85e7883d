//! Response cache wrapping an injected backend.

use anyhow::Result;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::backend::{CacheBackend, CacheEntry};
use super::keys::{self, ROOT_TAG};
use crate::core::element::ElementIdentity;

/// A cached response body
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPayload {
    pub body: Bytes,
    pub content_type: Option<String>,
}

/// Lookup/store decisions over a [`CacheBackend`]
#[derive(Clone)]
pub struct ResponseCache {
    backend: Arc<dyn CacheBackend>,
}

impl ResponseCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub async fn lookup(&self, key: &str) -> Result<Option<CachedPayload>> {
        let entry = self.backend.get(key).await?;
        Ok(entry
            .filter(|e| !e.is_expired(Utc::now()))
            .map(|e| CachedPayload {
                body: e.payload,
                content_type: e.content_type,
            }))
    }

    /// Store a rendered response
    ///
    /// The entry always carries [`ROOT_TAG`] on top of `tags`. Without a
    /// `ttl`, or with one reaching past the representable date range, it
    /// lives until invalidated.
    pub async fn store(
        &self,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
        ttl: Option<Duration>,
        mut tags: BTreeSet<String>,
    ) -> Result<()> {
        tags.insert(ROOT_TAG.to_string());
        let expires_at = ttl.and_then(expiry);

        debug!(cache = "response", key, tags = tags.len(), ?expires_at, "store");
        self.backend
            .set(CacheEntry {
                key: key.to_string(),
                payload: body,
                content_type: content_type.map(str::to_string),
                tags,
                expires_at,
            })
            .await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        self.backend.delete(key).await
    }

    pub async fn invalidate_tags(&self, tags: &[String]) -> Result<usize> {
        let removed = self.backend.invalidate_tags(tags).await?;
        debug!(cache = "response", ?tags, removed, "invalidate");
        Ok(removed)
    }

    /// Purge responses that may contain this element
    ///
    /// Also purges lists rooted at its type, which a new or changed element
    /// may now belong to.
    pub async fn invalidate_element(&self, identity: &ElementIdentity) -> Result<usize> {
        self.invalidate_tags(&[
            keys::element_tag(identity),
            keys::query_tag(&identity.element_type),
        ])
        .await
    }

    /// Purge every cached response
    pub async fn invalidate_all(&self) -> Result<usize> {
        self.invalidate_tags(&[ROOT_TAG.to_string()]).await
    }
}

fn expiry(ttl: Duration) -> Option<DateTime<Utc>> {
    let delta = chrono::Duration::from_std(ttl).ok()?;
    Utc::now().checked_add_signed(delta)
}
