//! Query capability over elements

use crate::core::element::Element;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A query for elements of one type
///
/// The criteria are opaque to the pipeline; each [`ElementService`] decides
/// how to interpret them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementQuery {
    /// The element type to query (e.g., "entry")
    pub element_type: String,

    /// Filters, as configured on the endpoint
    pub criteria: Map<String, Value>,

    /// Number of matching elements to skip
    pub offset: Option<u64>,

    /// Maximum number of elements to return
    pub limit: Option<u64>,
}

impl ElementQuery {
    pub fn new(element_type: impl Into<String>) -> Self {
        Self {
            element_type: element_type.into(),
            ..Default::default()
        }
    }

    pub fn with_criteria(mut self, criteria: Map<String, Value>) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn with_criterion(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria.insert(name.into(), value.into());
        self
    }

    /// Restrict the query to a window of results
    pub fn window(mut self, offset: u64, limit: u64) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }
}

/// Service trait for querying elements
///
/// Implementations provide the three read operations the pipeline needs.
/// The pipeline is agnostic to the underlying storage mechanism.
#[async_trait]
pub trait ElementService: Send + Sync {
    /// Count the elements matching the query (offset/limit ignored)
    async fn count(&self, query: &ElementQuery) -> Result<u64>;

    /// Fetch the elements matching the query, honoring offset/limit
    async fn all(&self, query: &ElementQuery) -> Result<Vec<Element>>;

    /// Fetch the first element matching the query
    async fn one(&self, query: &ElementQuery) -> Result<Option<Element>> {
        let mut query = query.clone();
        query.limit = Some(1);
        Ok(self.all(&query).await?.into_iter().next())
    }
}
