//! Resources: what gets transformed and serialized
//!
//! A [`Resource`] wraps one element (an item) or an ordered list of elements
//! (a collection) together with the transformer that shapes them.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::core::context::RequestContext;
use crate::core::element::Element;
use crate::core::pagination::PaginationState;
use crate::transform::Transformer;

/// Payload of a resource
#[derive(Debug, Clone)]
pub enum ResourceData {
    Item(Element),
    Collection(Vec<Element>),
}

/// A root or nested resource descriptor
///
/// Immutable once handed to the transformation engine.
#[derive(Clone)]
pub struct Resource {
    pub data: ResourceData,
    pub transformer: Arc<dyn Transformer>,

    /// Naming hint for serializers (JSON:API type, feed collection key)
    pub resource_key: Option<String>,

    /// Custom metadata merged into the output
    pub meta: Map<String, Value>,

    /// Only meaningful on collections
    pub pagination: Option<PaginationState>,
}

impl Resource {
    pub fn item(element: Element, transformer: Arc<dyn Transformer>) -> Self {
        Self {
            data: ResourceData::Item(element),
            transformer,
            resource_key: None,
            meta: Map::new(),
            pagination: None,
        }
    }

    pub fn collection(elements: Vec<Element>, transformer: Arc<dyn Transformer>) -> Self {
        Self {
            data: ResourceData::Collection(elements),
            transformer,
            resource_key: None,
            meta: Map::new(),
            pagination: None,
        }
    }

    pub fn with_resource_key(mut self, key: impl Into<String>) -> Self {
        self.resource_key = Some(key.into());
        self
    }

    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationState) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.data, ResourceData::Collection(_))
    }

    /// Number of elements held
    pub fn len(&self) -> usize {
        match &self.data {
            ResourceData::Item(_) => 1,
            ResourceData::Collection(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("data", &self.data)
            .field("resource_key", &self.resource_key)
            .field("meta", &self.meta)
            .field("pagination", &self.pagination)
            .finish_non_exhaustive()
    }
}

/// Supplies a pre-built resource instead of an element query
///
/// Used by endpoints whose data does not come from a single element type.
#[async_trait]
pub trait ResourceAdapter: Send + Sync {
    async fn resource(&self, ctx: &RequestContext) -> anyhow::Result<Resource>;
}

/// Shareable handle on a [`ResourceAdapter`]
#[derive(Clone)]
pub struct AdapterHandle(pub Arc<dyn ResourceAdapter>);

impl AdapterHandle {
    pub fn new(adapter: impl ResourceAdapter + 'static) -> Self {
        Self(Arc::new(adapter))
    }
}

impl fmt::Debug for AdapterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdapterHandle(..)")
    }
}
