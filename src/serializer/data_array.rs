//! Enveloped serializer: every node under `data`

use serde_json::{Map, Value};

use super::{Serializer, pagination_meta};
use crate::core::pagination::PaginationState;
use crate::transform::transformer::Attributes;

#[derive(Debug, Clone, Copy, Default)]
pub struct DataArraySerializer;

fn envelope(data: Value) -> Value {
    let mut object = Map::new();
    object.insert("data".to_string(), data);
    Value::Object(object)
}

impl Serializer for DataArraySerializer {
    fn item(&self, _resource_key: Option<&str>, attributes: Attributes) -> Value {
        envelope(Value::Object(attributes))
    }

    fn collection(&self, _resource_key: Option<&str>, items: Vec<Value>) -> Value {
        envelope(Value::Array(items))
    }

    fn null(&self) -> Value {
        envelope(Value::Null)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::test_support::*;
    use crate::transform::engine::TreeData;
    use serde_json::json;

    #[test]
    fn test_nested_relationships_keep_their_envelope() {
        let mut entry = node("entry", json!({"title": "Hello"}));
        entry.relations.insert(
            "tags".to_string(),
            tree(TreeData::Collection(vec![node("tag", json!({"name": "rust"}))])),
        );
        entry
            .relations
            .insert("author".to_string(), tree(TreeData::Null));

        let value = DataArraySerializer
            .serialize(&tree(TreeData::Collection(vec![entry])))
            .unwrap();
        assert_eq!(
            value,
            json!({"data": [{
                "title": "Hello",
                "tags": {"data": [{"name": "rust"}]},
                "author": {"data": null},
            }]})
        );
    }

    #[test]
    fn test_pagination_under_meta() {
        let mut paged = tree(TreeData::Collection(vec![]));
        paged.pagination = Some(first_of_three_pages());

        let value = DataArraySerializer.serialize(&paged).unwrap();
        assert_eq!(value["data"], json!([]));
        assert_eq!(value["meta"]["pagination"]["per_page"], 10);
    }
}
