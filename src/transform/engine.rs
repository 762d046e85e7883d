//! The transformation engine
//!
//! Walks a root [`Resource`] through its transformer, resolving the requested
//! includes recursively, and produces a format-agnostic [`DataTree`] that the
//! serializers fold into their wire shape.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::cache::keys;
use crate::core::element::{Element, ElementIdentity};
use crate::core::error::ApiError;
use crate::core::include::IncludeSpec;
use crate::core::pagination::PaginationState;
use crate::core::resource::{Resource, ResourceData};
use crate::transform::transformer::{Attributes, Transformer};

/// One transformed element with its resolved relationships
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub identity: ElementIdentity,
    pub attributes: Attributes,
    /// Relationship name to nested tree, in resolution order
    pub relations: IndexMap<String, DataTree>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeData {
    Item(Node),
    Collection(Vec<Node>),
    /// An empty to-one relationship
    Null,
}

/// Transformed resource, mirroring the shape of its source
#[derive(Debug, Clone, PartialEq)]
pub struct DataTree {
    pub resource_key: Option<String>,
    pub data: TreeData,
    pub meta: Map<String, Value>,
    pub pagination: Option<PaginationState>,
}

impl DataTree {
    pub fn null() -> Self {
        Self {
            resource_key: None,
            data: TreeData::Null,
            meta: Map::new(),
            pagination: None,
        }
    }
}

/// Output of a transformation
#[derive(Debug, Clone)]
pub struct Transformed {
    pub tree: DataTree,
    /// Invalidation tags of every element touched
    pub tags: BTreeSet<String>,
}

/// Transform a root resource with the given include set
pub fn transform(resource: &Resource, spec: &IncludeSpec) -> Result<Transformed, ApiError> {
    let mut walker = Walker {
        spec,
        tags: BTreeSet::new(),
        path: Vec::new(),
    };
    let tree = walker.resource(resource, "", 0)?;
    Ok(Transformed {
        tree,
        tags: walker.tags,
    })
}

struct Walker<'a> {
    spec: &'a IncludeSpec,
    tags: BTreeSet<String>,
    /// Elements currently being resolved, root first
    path: Vec<ElementIdentity>,
}

impl Walker<'_> {
    fn resource(
        &mut self,
        resource: &Resource,
        scope: &str,
        depth: usize,
    ) -> Result<DataTree, ApiError> {
        let transformer = resource.transformer.as_ref();
        if depth < self.spec.recursion_limit() {
            self.check_requested(transformer, scope)?;
        }

        let data = match &resource.data {
            ResourceData::Item(element) => {
                TreeData::Item(self.node(element, transformer, scope, depth)?)
            }
            ResourceData::Collection(elements) => TreeData::Collection(
                elements
                    .iter()
                    .map(|element| self.node(element, transformer, scope, depth))
                    .collect::<Result<_, _>>()?,
            ),
        };

        Ok(DataTree {
            resource_key: resource.resource_key.clone(),
            data,
            meta: resource.meta.clone(),
            pagination: resource.pagination.clone(),
        })
    }

    /// Reject requested names the transformer does not expose at `scope`
    ///
    /// Runs once per resource so that empty collections fail like full ones.
    fn check_requested(&self, transformer: &dyn Transformer, scope: &str) -> Result<(), ApiError> {
        let available = transformer.available_includes();
        for name in self.spec.requested_at(scope) {
            let path = IncludeSpec::path(scope, &name);
            if !self.spec.is_excluded(&path) && !available.contains(&name) {
                return Err(ApiError::UnknownInclude { path, available });
            }
        }
        Ok(())
    }

    fn node(
        &mut self,
        element: &Element,
        transformer: &dyn Transformer,
        scope: &str,
        depth: usize,
    ) -> Result<Node, ApiError> {
        let identity = element.identity();
        if self.path.contains(&identity) {
            return Err(ApiError::CyclicInclude {
                path: scope.to_string(),
                element: identity,
            });
        }

        self.tags.insert(keys::type_tag(&identity.element_type));
        self.tags.insert(keys::element_tag(&identity));

        let attributes = transformer.transform(element);
        let mut relations = IndexMap::new();

        if depth < self.spec.recursion_limit() {
            let available = transformer.available_includes();
            let mut names = transformer.default_includes();
            for name in self.spec.requested_at(scope) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }

            self.path.push(identity.clone());
            for name in names {
                let path = IncludeSpec::path(scope, &name);
                if self.spec.is_excluded(&path) {
                    continue;
                }
                if !available.contains(&name) {
                    return Err(ApiError::UnknownInclude {
                        path,
                        available: available.clone(),
                    });
                }

                let tree = match transformer.include(&name, element)? {
                    Some(related) => self.resource(&related, &path, depth + 1)?,
                    None => DataTree::null(),
                };
                relations.insert(name, tree);
            }
            self.path.pop();
        }

        Ok(Node {
            identity,
            attributes,
            relations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::include::IncludeList;
    use crate::transform::transformer::ElementTransformer;
    use std::sync::Arc;
    use uuid::Uuid;

    fn spec(includes: &str, excludes: &str) -> IncludeSpec {
        IncludeSpec::parse(
            Some(&IncludeList::from(includes)),
            Some(&IncludeList::from(excludes)),
        )
    }

    fn transformer() -> Arc<dyn Transformer> {
        let user = Arc::new(ElementTransformer::new().with_relation("avatar"));
        Arc::new(
            ElementTransformer::new()
                .with_relation_using("author", user)
                .with_relation("tags"),
        )
    }

    fn entry() -> Element {
        let avatar = Element::new("asset", Uuid::new_v4()).with_field("url", "/a.png");
        let author = Element::new("user", Uuid::new_v4()).with_one("avatar", Some(avatar));
        Element::new("entry", Uuid::new_v4())
            .with_field("title", "Hello")
            .with_one("author", Some(author))
            .with_many("tags", vec![Element::new("tag", Uuid::new_v4())])
    }

    fn relations(tree: &DataTree) -> &IndexMap<String, DataTree> {
        match &tree.data {
            TreeData::Item(node) => &node.relations,
            other => panic!("expected item, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_includes_are_resolved() {
        let resource = Resource::item(entry(), transformer());
        let out = transform(&resource, &spec("author.avatar,tags", "")).unwrap();

        let rels = relations(&out.tree);
        assert_eq!(rels.keys().collect::<Vec<_>>(), vec!["author", "tags"]);
        assert!(relations(&rels["author"]).contains_key("avatar"));
        assert!(matches!(rels["tags"].data, TreeData::Collection(ref t) if t.len() == 1));
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let resource = Resource::item(entry(), transformer());
        let out = transform(&resource, &spec("author.avatar,tags", "author")).unwrap();

        let rels = relations(&out.tree);
        assert!(!rels.contains_key("author"));
        assert!(rels.contains_key("tags"));
    }

    #[test]
    fn test_unknown_include_reports_full_path() {
        let resource = Resource::item(entry(), transformer());
        let err = transform(&resource, &spec("author.friends", "")).unwrap_err();
        match err {
            ApiError::UnknownInclude { path, available } => {
                assert_eq!(path, "author.friends");
                assert_eq!(available, vec!["avatar".to_string()]);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_unknown_include_on_empty_collections() {
        let empty = Resource::collection(Vec::new(), transformer());
        let err = transform(&empty, &spec("bogus", "")).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_INCLUDE");

        // nested scope with no related elements
        let entry = Element::new("entry", Uuid::new_v4()).with_many("tags", Vec::new());
        let resource = Resource::item(entry, transformer());
        let err = transform(&resource, &spec("tags.color", "")).unwrap_err();
        match err {
            ApiError::UnknownInclude { path, .. } => assert_eq!(path, "tags.color"),
            other => panic!("unexpected error {:?}", other),
        }

        assert!(transform(&empty, &spec("bogus", "bogus")).is_ok());
        assert!(transform(&empty, &spec("author.avatar", "")).is_ok());
    }

    #[test]
    fn test_cycle_is_detected() {
        let id = Uuid::new_v4();
        let looped = Element::new("entry", id).with_one("parent", Some(Element::new("entry", id)));
        let resource = Resource::item(
            looped,
            Arc::new(ElementTransformer::new().with_relation("parent")),
        );

        let err = transform(&resource, &spec("parent", "")).unwrap_err();
        assert_eq!(err.error_code(), "CYCLIC_INCLUDE");
    }

    #[test]
    fn test_default_includes_and_tags() {
        let resource = Resource::collection(
            vec![entry()],
            Arc::new(ElementTransformer::new().with_relation("tags").with_default_include("tags")),
        );
        let out = transform(&resource, &IncludeSpec::default()).unwrap();

        assert!(out.tags.contains("element:entry"));
        assert!(out.tags.contains("element:tag"));
        assert_eq!(out.tags.iter().filter(|t| t.starts_with("element:tag:")).count(), 1);

        let excluded = transform(&resource, &spec("", "tags")).unwrap();
        assert!(!excluded.tags.contains("element:tag"));
    }

    #[test]
    fn test_transformation_is_idempotent() {
        let resource = Resource::item(entry(), transformer());
        let spec = spec("author.avatar", "");
        assert_eq!(
            transform(&resource, &spec).unwrap().tree,
            transform(&resource, &spec).unwrap().tree
        );
    }

    #[test]
    fn test_empty_to_one_is_null() {
        let element = Element::new("entry", Uuid::new_v4()).with_one("author", None);
        let resource = Resource::item(element, transformer());
        let out = transform(&resource, &spec("author", "")).unwrap();
        assert_eq!(relations(&out.tree)["author"].data, TreeData::Null);
    }
}
