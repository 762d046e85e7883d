//! The default serializer: attributes as-is, collections as bare arrays

use serde_json::{Map, Value};

use super::{Serializer, pagination_meta};
use crate::core::pagination::PaginationState;
use crate::transform::transformer::Attributes;

/// Items are their attribute mapping; collections are bare arrays, or an
/// object under the resource key when one is set
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSerializer;

impl Serializer for PlainSerializer {
    fn item(&self, _resource_key: Option<&str>, attributes: Attributes) -> Value {
        Value::Object(attributes)
    }

    fn collection(&self, resource_key: Option<&str>, items: Vec<Value>) -> Value {
        match resource_key {
            Some(key) => {
                let mut object = Map::new();
                object.insert(key.to_string(), Value::Array(items));
                Value::Object(object)
            }
            None => Value::Array(items),
        }
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
        out.insert("pagination".to_string(), pagination_meta(pagination));
        out
    }
}
