//! In-memory implementations of ElementService and CacheBackend for testing
//! and development

use crate::cache::{CacheBackend, CacheEntry};
use crate::core::{Element, ElementQuery, ElementService};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// In-memory element service
///
/// Elements are returned in insertion order. Criteria are matched exactly
/// against field values (`id` matches the element ID); an array criterion
/// matches any of its values.
#[derive(Clone, Default)]
pub struct InMemoryElementService {
    elements: Arc<RwLock<Vec<Element>>>,
}

impl InMemoryElementService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_elements(elements: Vec<Element>) -> Self {
        Self {
            elements: Arc::new(RwLock::new(elements)),
        }
    }

    /// Add or replace an element
    pub fn insert(&self, element: Element) -> Result<()> {
        let mut elements = self
            .elements
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        match elements
            .iter_mut()
            .find(|e| e.id == element.id && e.element_type == element.element_type)
        {
            Some(existing) => *existing = element,
            None => elements.push(element),
        }

        Ok(())
    }

    fn matching(&self, query: &ElementQuery) -> Result<Vec<Element>> {
        let elements = self
            .elements
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(elements
            .iter()
            .filter(|element| element.element_type == query.element_type)
            .filter(|element| {
                query
                    .criteria
                    .iter()
                    .all(|(name, expected)| criterion_matches(element, name, expected))
            })
            .cloned()
            .collect())
    }
}

fn criterion_matches(element: &Element, name: &str, expected: &Value) -> bool {
    let actual = if name == "id" {
        Value::String(element.id.to_string())
    } else {
        match element.field(name) {
            Some(value) => value.to_json(),
            None => return false,
        }
    };

    match expected {
        Value::Array(candidates) => candidates.contains(&actual),
        other => other == &actual,
    }
}

#[async_trait]
impl ElementService for InMemoryElementService {
    async fn count(&self, query: &ElementQuery) -> Result<u64> {
        Ok(self.matching(query)?.len() as u64)
    }

    async fn all(&self, query: &ElementQuery) -> Result<Vec<Element>> {
        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);

        Ok(self
            .matching(query)?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }
}

// =============================================================================
// Cache backend
// =============================================================================

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// tag -> keys carrying it
    tags: HashMap<String, HashSet<String>>,
}

impl CacheState {
    fn remove(&mut self, key: &str) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        for tag in &entry.tags {
            if let Some(keys) = self.tags.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }
        true
    }
}

/// In-memory cache backend with a tag index
///
/// Expired entries are dropped lazily on read.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    state: Arc<RwLock<CacheState>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> Result<usize> {
        let state = self
            .state
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(state.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let expired = {
            let state = self
                .state
                .read()
                .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

            match state.entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(Utc::now()) => return Ok(Some(entry.clone())),
                Some(_) => true,
            }
        };

        if expired {
            let mut state = self
                .state
                .write()
                .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
            state.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        state.remove(&entry.key);
        for tag in &entry.tags {
            state
                .tags
                .entry(tag.clone())
                .or_default()
                .insert(entry.key.clone());
        }
        state.entries.insert(entry.key.clone(), entry);

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        state.remove(key);

        Ok(())
    }

    async fn invalidate_tags(&self, tags: &[String]) -> Result<usize> {
        let mut state = self
            .state
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let keys: HashSet<String> = tags
            .iter()
            .filter_map(|tag| state.tags.get(tag))
            .flatten()
            .cloned()
            .collect();

        Ok(keys.iter().filter(|key| state.remove(key)).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::Duration;
    use serde_json::json;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn service() -> InMemoryElementService {
        let service = InMemoryElementService::new();
        for (i, section) in ["news", "blog", "news"].iter().enumerate() {
            service
                .insert(
                    Element::new("entry", Uuid::new_v4())
                        .with_field("section", *section)
                        .with_field("position", i as i64),
                )
                .unwrap();
        }
        service.insert(Element::new("user", Uuid::new_v4())).unwrap();
        service
    }

    #[tokio::test]
    async fn test_criteria_filtering() {
        let service = service();

        let all = ElementQuery::new("entry");
        assert_eq!(service.count(&all).await.unwrap(), 3);

        let news = ElementQuery::new("entry").with_criterion("section", "news");
        assert_eq!(service.count(&news).await.unwrap(), 2);

        let any_of = ElementQuery::new("entry").with_criterion("position", json!([0, 1]));
        assert_eq!(service.count(&any_of).await.unwrap(), 2);

        let missing = ElementQuery::new("entry").with_criterion("color", "red");
        assert_eq!(service.count(&missing).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_window_and_id_lookup() {
        let service = service();
        let page = service
            .all(&ElementQuery::new("entry").window(1, 1))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].field("position"), Some(&1_i64.into()));

        let id = page[0].id;
        let found = service
            .one(&ElementQuery::new("entry").with_criterion("id", id.to_string()))
            .await
            .unwrap();
        assert_eq!(found.map(|e| e.id), Some(id));
    }

    fn entry(key: &str, tags: &[&str]) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            payload: Bytes::from_static(b"{}"),
            content_type: None,
            tags: tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_cache_tag_invalidation() {
        let cache = InMemoryCache::new();
        cache.set(entry("a", &["x", "y"])).await.unwrap();
        cache.set(entry("b", &["y"])).await.unwrap();
        cache.set(entry("c", &["z"])).await.unwrap();

        let removed = cache.invalidate_tags(&["y".to_string()]).await.unwrap();
        assert_eq!(removed, 2);
        assert!(cache.get("a").await.unwrap().is_none());
        assert!(cache.get("c").await.unwrap().is_some());
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replacing_entry_drops_old_tags() {
        let cache = InMemoryCache::new();
        cache.set(entry("a", &["old"])).await.unwrap();
        cache.set(entry("a", &["new"])).await.unwrap();

        assert_eq!(cache.invalidate_tags(&["old".to_string()]).await.unwrap(), 0);
        assert_eq!(cache.invalidate_tags(&["new".to_string()]).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped_on_read() {
        let cache = InMemoryCache::new();
        let mut expired = entry("a", &[]);
        expired.expires_at = Some(Utc::now() - Duration::seconds(1));
        cache.set(expired).await.unwrap();

        assert!(cache.get("a").await.unwrap().is_none());
        assert!(cache.is_empty().unwrap());
    }
}
