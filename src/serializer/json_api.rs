//! JSON:API serializer
//!
//! Primary data goes under `data` as resource objects; related resources are
//! side-loaded once each under `included`, and referenced from their parent
//! through `relationships` linkage. Pagination links move to the top-level
//! `links` object.

use serde_json::{Map, Value, json};
use std::collections::HashSet;

use super::Serializer;
use crate::core::error::ApiError;
use crate::core::pagination::PaginationState;
use crate::transform::engine::{DataTree, Node, TreeData};
use crate::transform::transformer::Attributes;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonApiSerializer;

/// Side-loaded resources, unique by `(type, id)`
#[derive(Default)]
struct Included {
    seen: HashSet<(String, String)>,
    resources: Vec<Value>,
}

impl Included {
    fn push(&mut self, identity: (String, String), resource: Value) {
        if self.seen.insert(identity) {
            self.resources.push(resource);
        }
    }
}

/// Resolve the `(type, id)` of a node
fn identify(resource_key: Option<&str>, attributes: &Attributes) -> Result<(String, String), ApiError> {
    let resource_type = resource_key
        .map(str::to_string)
        .or_else(|| attributes.get("type").and_then(Value::as_str).map(str::to_string))
        .ok_or_else(|| ApiError::MissingIdentity {
            field: "type",
            resource: "<untyped>".to_string(),
        })?;

    let id = match attributes.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => {
            return Err(ApiError::MissingIdentity {
                field: "id",
                resource: resource_type,
            });
        }
    };

    Ok((resource_type, id))
}

fn linkage((resource_type, id): &(String, String)) -> Value {
    json!({ "type": resource_type, "id": id })
}

fn resource_object(
    resource_key: Option<&str>,
    node: &Node,
    included: &mut Included,
) -> Result<((String, String), Value), ApiError> {
    let identity = identify(resource_key, &node.attributes)?;

    let mut attributes = node.attributes.clone();
    attributes.remove("id");
    attributes.remove("type");

    let mut relationships = Map::new();
    for (name, tree) in &node.relations {
        let key = tree.resource_key.as_deref();
        let data = match &tree.data {
            TreeData::Item(child) => {
                let (child_identity, object) = resource_object(key, child, included)?;
                let link = linkage(&child_identity);
                included.push(child_identity, object);
                link
            }
            TreeData::Collection(children) => {
                let mut links = Vec::with_capacity(children.len());
                for child in children {
                    let (child_identity, object) = resource_object(key, child, included)?;
                    links.push(linkage(&child_identity));
                    included.push(child_identity, object);
                }
                Value::Array(links)
            }
            TreeData::Null => Value::Null,
        };
        relationships.insert(name.clone(), json!({ "data": data }));
    }

    let mut object = Map::new();
    object.insert("type".to_string(), Value::String(identity.0.clone()));
    object.insert("id".to_string(), Value::String(identity.1.clone()));
    object.insert("attributes".to_string(), Value::Object(attributes));
    if !relationships.is_empty() {
        object.insert("relationships".to_string(), Value::Object(relationships));
    }

    Ok((identity, Value::Object(object)))
}

fn pagination_links(pagination: &PaginationState) -> Map<String, Value> {
    let current = pagination.current_page();
    let mut links = Map::new();
    links.insert("self".to_string(), Value::String(pagination.url_for(current)));
    links.insert("first".to_string(), Value::String(pagination.url_for(1)));
    if let Some(prev) = pagination.previous_url() {
        links.insert("prev".to_string(), Value::String(prev));
    }
    if let Some(next) = pagination.next_url() {
        links.insert("next".to_string(), Value::String(next));
    }
    links.insert(
        "last".to_string(),
        Value::String(pagination.url_for(pagination.last_page().max(1))),
    );
    links
}

impl Serializer for JsonApiSerializer {
    fn item(&self, _resource_key: Option<&str>, attributes: Attributes) -> Value {
        json!({ "data": attributes })
    }

    fn collection(&self, _resource_key: Option<&str>, items: Vec<Value>) -> Value {
        json!({ "data": items })
    }

    fn meta(&self, meta: Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        if !meta.is_empty() {
            out.insert("meta".to_string(), Value::Object(meta));
        }
        out
    }

    fn paginator(&self, pagination: &PaginationState) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(
            "pagination".to_string(),
            json!({
                "total": pagination.total(),
                "count": pagination.count(),
                "per_page": pagination.per_page(),
                "current_page": pagination.current_page(),
                "total_pages": pagination.last_page(),
            }),
        );
        out
    }

    fn serialize(&self, tree: &DataTree) -> Result<Value, ApiError> {
        let key = tree.resource_key.as_deref();
        let mut included = Included::default();

        // primary resources are never repeated under `included`
        let primary: Vec<&Node> = match &tree.data {
            TreeData::Item(node) => vec![node],
            TreeData::Collection(nodes) => nodes.iter().collect(),
            TreeData::Null => Vec::new(),
        };
        for node in &primary {
            included.seen.insert(identify(key, &node.attributes)?);
        }

        let mut objects = Vec::with_capacity(primary.len());
        for node in primary {
            objects.push(resource_object(key, node, &mut included)?.1);
        }
        let data = match &tree.data {
            TreeData::Item(_) => objects.into_iter().next().unwrap_or(Value::Null),
            TreeData::Collection(_) => Value::Array(objects),
            TreeData::Null => Value::Null,
        };

        let mut document = Map::new();
        document.insert("data".to_string(), data);
        if !included.resources.is_empty() {
            document.insert("included".to_string(), Value::Array(included.resources));
        }

        let mut meta = tree.meta.clone();
        if let Some(pagination) = &tree.pagination {
            meta.extend(self.paginator(pagination));
        }
        document.extend(self.meta(meta));

        if let Some(pagination) = &tree.pagination {
            document.insert(
                "links".to_string(),
                Value::Object(pagination_links(pagination)),
            );
        }

        Ok(Value::Object(document))
    }
}
