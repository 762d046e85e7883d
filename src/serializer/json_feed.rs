//! JSON Feed version 1 serializer
//!
//! <https://jsonfeed.org/version/1>

use serde_json::{Map, Value};

use super::{FEED_CONTENT_TYPE, Serializer};
use crate::core::context::RequestContext;
use crate::core::pagination::PaginationState;
use crate::transform::transformer::Attributes;

pub const FEED_VERSION: &str = "https://jsonfeed.org/version/1";

/// Collection under `items`, feed-level defaults at the top level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonFeedSerializer {
    title: String,
    home_page_url: String,
    feed_url: String,
}

impl JsonFeedSerializer {
    pub fn new(
        title: impl Into<String>,
        home_page_url: impl Into<String>,
        feed_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            home_page_url: home_page_url.into(),
            feed_url: feed_url.into(),
        }
    }

    /// Defaults derived from the site and the requested path
    pub fn for_request(ctx: &RequestContext) -> Self {
        Self::new(
            ctx.site.name.clone(),
            format!("{}/", ctx.site.base_url),
            ctx.site.url(&ctx.path),
        )
    }
}

impl Serializer for JsonFeedSerializer {
    fn content_type(&self) -> &'static str {
        FEED_CONTENT_TYPE
    }

    fn item(&self, _resource_key: Option<&str>, attributes: Attributes) -> Value {
        Value::Object(attributes)
    }

    fn collection(&self, resource_key: Option<&str>, items: Vec<Value>) -> Value {
        let mut object = Map::new();
        object.insert(
            resource_key.unwrap_or("items").to_string(),
            Value::Array(items),
        );
        Value::Object(object)
    }

    fn meta(&self, meta: Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("version".to_string(), Value::from(FEED_VERSION));
        out.insert("title".to_string(), Value::from(self.title.clone()));
        out.insert(
            "home_page_url".to_string(),
            Value::from(self.home_page_url.clone()),
        );
        out.insert("feed_url".to_string(), Value::from(self.feed_url.clone()));
        out.extend(meta);
        out
    }

    fn paginator(&self, pagination: &PaginationState) -> Map<String, Value> {
        let mut out = Map::new();
        if let Some(next) = pagination.next_url() {
            out.insert("next_url".to_string(), Value::String(next));
        }
        out
    }
}
