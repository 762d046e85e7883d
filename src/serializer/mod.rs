//! Serializers: folding data trees into wire-format JSON
//!
//! A [`Serializer`] decides the envelope of items, collections, metadata and
//! pagination. The generic [`fold`] walks a [`DataTree`] through those hooks
//! and merges each relationship into its parent under the relationship name.
//! Variants that need a different document structure (JSON:API side-loading)
//! override [`Serializer::serialize`].

pub mod data_array;
pub mod encode;
pub mod json_api;
pub mod json_feed;
pub mod plain;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::core::context::RequestContext;
use crate::core::error::ApiError;
use crate::core::pagination::PaginationState;
use crate::transform::engine::{DataTree, Node, TreeData};
use crate::transform::transformer::Attributes;

pub use data_array::DataArraySerializer;
pub use encode::{JsonOptions, encode};
pub use json_api::JsonApiSerializer;
pub use json_feed::JsonFeedSerializer;
pub use plain::PlainSerializer;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FEED_CONTENT_TYPE: &str = "application/feed+json";

/// Output contract of one serializer variant
pub trait Serializer: Send + Sync {
    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    /// Envelope of a single transformed element
    fn item(&self, resource_key: Option<&str>, attributes: Attributes) -> Value;

    /// Envelope of an ordered list of already folded elements
    fn collection(&self, resource_key: Option<&str>, items: Vec<Value>) -> Value;

    /// Envelope of an empty to-one relationship
    fn null(&self) -> Value {
        Value::Null
    }

    /// Top-level entries produced by the custom metadata
    fn meta(&self, meta: Map<String, Value>) -> Map<String, Value>;

    /// Entries merged into the metadata for a paginated collection
    fn paginator(&self, pagination: &PaginationState) -> Map<String, Value>;

    /// Fold a complete tree into the response document
    fn serialize(&self, tree: &DataTree) -> Result<Value, ApiError> {
        Ok(fold(self, tree, true))
    }
}

/// Fold a tree through the serializer hooks
///
/// Metadata hooks only run for nested trees that carry metadata of their own.
pub fn fold<S: Serializer + ?Sized>(serializer: &S, tree: &DataTree, root: bool) -> Value {
    let key = tree.resource_key.as_deref();
    let data = match &tree.data {
        TreeData::Item(node) => serializer.item(key, embed(serializer, node)),
        TreeData::Collection(nodes) => serializer.collection(
            key,
            nodes
                .iter()
                .map(|node| Value::Object(embed(serializer, node)))
                .collect(),
        ),
        TreeData::Null => serializer.null(),
    };

    let mut meta = tree.meta.clone();
    if let Some(pagination) = &tree.pagination {
        meta.extend(serializer.paginator(pagination));
    }
    let meta = if root || !meta.is_empty() {
        serializer.meta(meta)
    } else {
        Map::new()
    };

    combine(data, meta)
}

fn embed<S: Serializer + ?Sized>(serializer: &S, node: &Node) -> Attributes {
    let mut attributes = node.attributes.clone();
    for (name, tree) in &node.relations {
        attributes.insert(name.clone(), fold(serializer, tree, false));
    }
    attributes
}

/// Merge top-level metadata entries into a folded document
///
/// Keys already present in the data win. Data that is not an object is
/// wrapped under `data` first, since a bare array cannot carry keys.
pub fn combine(data: Value, meta: Map<String, Value>) -> Value {
    if meta.is_empty() {
        return data;
    }

    let mut document = match data {
        Value::Object(object) => object,
        other => {
            let mut object = Map::new();
            object.insert("data".to_string(), other);
            object
        }
    };
    for (key, value) in meta {
        document.entry(key).or_insert(value);
    }
    Value::Object(document)
}

/// `pagination` block shared by the plain and enveloped variants
pub fn pagination_meta(pagination: &PaginationState) -> Value {
    let mut links = Map::new();
    if let Some(previous) = pagination.previous_url() {
        links.insert("previous".to_string(), Value::String(previous));
    }
    if let Some(next) = pagination.next_url() {
        links.insert("next".to_string(), Value::String(next));
    }

    json!({
        "total": pagination.total(),
        "count": pagination.count(),
        "per_page": pagination.per_page(),
        "current_page": pagination.current_page(),
        "total_pages": pagination.last_page(),
        "links": links,
    })
}

/// The serializer variants an endpoint can select
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SerializerKind {
    #[default]
    #[serde(alias = "array")]
    Plain,
    DataArray,
    JsonApi,
    JsonFeed,
}

impl SerializerKind {
    /// Build the serializer for one request
    pub fn build(self, ctx: &RequestContext) -> Box<dyn Serializer> {
        match self {
            SerializerKind::Plain => Box::new(PlainSerializer),
            SerializerKind::DataArray => Box::new(DataArraySerializer),
            SerializerKind::JsonApi => Box::new(JsonApiSerializer),
            SerializerKind::JsonFeed => Box::new(JsonFeedSerializer::for_request(ctx)),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_combine_keeps_data_keys() {
        let data = json!({"title": "a", "meta": "mine"});
        let mut meta = Map::new();
        meta.insert("meta".to_string(), json!({"x": 1}));
        meta.insert("extra".to_string(), json!(true));

        assert_eq!(
            combine(data, meta),
            json!({"title": "a", "meta": "mine", "extra": true})
        );
    }

    #[test]
    fn test_combine_wraps_arrays() {
        let mut meta = Map::new();
        meta.insert("meta".to_string(), json!({}));
        assert_eq!(combine(json!([1]), meta), json!({"data": [1], "meta": {}}));
        assert_eq!(combine(json!([1]), Map::new()), json!([1]));
    }

    #[test]
    fn test_pagination_meta_block() {
        let meta = pagination_meta(&first_of_three_pages());
        assert_eq!(meta["total"], 25);
        assert_eq!(meta["count"], 10);
        assert_eq!(meta["total_pages"], 3);
        assert_eq!(meta["links"]["next"], "https://example.com/news?page=2");
        assert!(meta["links"].get("previous").is_none());
    }

    #[test]
    fn test_serializer_kind_names() {
        let kind: SerializerKind = serde_yaml::from_str("jsonFeed").unwrap();
        assert_eq!(kind, SerializerKind::JsonFeed);
        let kind: SerializerKind = serde_yaml::from_str("array").unwrap();
        assert_eq!(kind, SerializerKind::Plain);
        let kind: SerializerKind = serde_yaml::from_str("dataArray").unwrap();
        assert_eq!(kind, SerializerKind::DataArray);
        assert!(serde_yaml::from_str::<SerializerKind>("xml").is_err());
    }

    #[test]
    fn test_nested_tree_without_meta_skips_meta_hook() {
        let mut parent = node("entry", json!({"title": "a"}));
        parent
            .relations
            .insert("tags".to_string(), tree(TreeData::Collection(vec![])));

        let value = JsonFeedSerializer::new("Blog", "https://example.com/", "https://example.com/feed")
            .serialize(&tree(TreeData::Item(parent)))
            .unwrap();

        assert_eq!(value["tags"], json!({"items": []}));
        assert_eq!(value["title"], "a");
        assert_eq!(value["version"], "https://jsonfeed.org/version/1");
    }
}
