//! Transformers: shaping elements into flat attribute mappings

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::element::{Element, Relation, format_date};
use crate::core::error::{ApiError, ConfigError};
use crate::core::resource::Resource;

/// Flat attribute mapping produced for one element
pub type Attributes = Map<String, Value>;

/// Shapes elements and exposes their relationships as includes
///
/// Transformers are stateless and shared across requests.
pub trait Transformer: Send + Sync {
    /// Produce the flat attribute mapping of an element
    fn transform(&self, element: &Element) -> Attributes;

    /// Relationship names this transformer can include
    fn available_includes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Relationship names included unless explicitly excluded
    fn default_includes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Resolve a relationship of `element`
    ///
    /// `Ok(None)` is an empty to-one relationship.
    fn include(&self, name: &str, element: &Element) -> Result<Option<Resource>, ApiError> {
        let _ = element;
        Err(ApiError::UnknownInclude {
            path: name.to_string(),
            available: self.available_includes(),
        })
    }
}

// =============================================================================
// Default element transformer
// =============================================================================

/// Flattens every public attribute of an element
///
/// Emits `id`, `type`, `dateCreated`, `dateUpdated` and the custom fields in
/// declaration order. Fields whose name starts with `_` are skipped. Relations
/// are only exposed once declared with [`ElementTransformer::with_relation`].
#[derive(Clone, Default)]
pub struct ElementTransformer {
    relations: IndexMap<String, Arc<dyn Transformer>>,
    defaults: Vec<String>,
}

impl ElementTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose a relation, shaping related elements with this same default
    /// transformer
    pub fn with_relation(self, name: impl Into<String>) -> Self {
        self.with_relation_using(name, Arc::new(ElementTransformer::new()))
    }

    /// Expose a relation, shaping related elements with `transformer`
    pub fn with_relation_using(
        mut self,
        name: impl Into<String>,
        transformer: Arc<dyn Transformer>,
    ) -> Self {
        self.relations.insert(name.into(), transformer);
        self
    }

    /// Always include a declared relation unless it is excluded
    pub fn with_default_include(mut self, name: impl Into<String>) -> Self {
        self.defaults.push(name.into());
        self
    }
}

impl Transformer for ElementTransformer {
    fn transform(&self, element: &Element) -> Attributes {
        let mut attributes = Map::new();
        attributes.insert("id".to_string(), Value::String(element.id.to_string()));
        attributes.insert(
            "type".to_string(),
            Value::String(element.element_type.clone()),
        );
        attributes.insert(
            "dateCreated".to_string(),
            Value::String(format_date(&element.date_created)),
        );
        attributes.insert(
            "dateUpdated".to_string(),
            Value::String(format_date(&element.date_updated)),
        );

        for (name, value) in &element.fields {
            if name.starts_with('_') {
                continue;
            }
            attributes.insert(name.clone(), value.to_json());
        }

        attributes
    }

    fn available_includes(&self) -> Vec<String> {
        self.relations.keys().cloned().collect()
    }

    fn default_includes(&self) -> Vec<String> {
        self.defaults.clone()
    }

    fn include(&self, name: &str, element: &Element) -> Result<Option<Resource>, ApiError> {
        let Some(transformer) = self.relations.get(name) else {
            return Err(ApiError::UnknownInclude {
                path: name.to_string(),
                available: self.available_includes(),
            });
        };

        Ok(match element.relation(name) {
            Some(Relation::One(Some(related))) => {
                Some(Resource::item((**related).clone(), transformer.clone()))
            }
            Some(Relation::One(None)) => None,
            Some(Relation::Many(related)) => {
                Some(Resource::collection(related.clone(), transformer.clone()))
            }
            // declared but not loaded on this element
            None => Some(Resource::collection(Vec::new(), transformer.clone())),
        })
    }
}

// =============================================================================
// Closure transformer
// =============================================================================

type TransformFn = dyn Fn(&Element) -> Attributes + Send + Sync;
type IncludeFn = dyn Fn(&Element) -> Result<Option<Resource>, ApiError> + Send + Sync;

/// A fully custom transformer built from closures
#[derive(Clone)]
pub struct FnTransformer {
    transform: Arc<TransformFn>,
    includes: IndexMap<String, Arc<IncludeFn>>,
    defaults: Vec<String>,
}

impl FnTransformer {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(&Element) -> Attributes + Send + Sync + 'static,
    {
        Self {
            transform: Arc::new(transform),
            includes: IndexMap::new(),
            defaults: Vec::new(),
        }
    }

    /// Expose an include resolved by a closure
    pub fn with_include<F>(mut self, name: impl Into<String>, resolve: F) -> Self
    where
        F: Fn(&Element) -> Result<Option<Resource>, ApiError> + Send + Sync + 'static,
    {
        self.includes.insert(name.into(), Arc::new(resolve));
        self
    }

    pub fn with_default_include(mut self, name: impl Into<String>) -> Self {
        self.defaults.push(name.into());
        self
    }
}

impl Transformer for FnTransformer {
    fn transform(&self, element: &Element) -> Attributes {
        (self.transform)(element)
    }

    fn available_includes(&self) -> Vec<String> {
        self.includes.keys().cloned().collect()
    }

    fn default_includes(&self) -> Vec<String> {
        self.defaults.clone()
    }

    fn include(&self, name: &str, element: &Element) -> Result<Option<Resource>, ApiError> {
        match self.includes.get(name) {
            Some(resolve) => resolve(element),
            None => Err(ApiError::UnknownInclude {
                path: name.to_string(),
                available: self.available_includes(),
            }),
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Constructor of a transformer
pub type TransformerFactory = Arc<dyn Fn() -> Arc<dyn Transformer> + Send + Sync>;

/// Name of the built-in default transformer
pub const DEFAULT_TRANSFORMER: &str = "element";

/// Maps configuration names to transformer constructors
#[derive(Clone)]
pub struct TransformerRegistry {
    factories: HashMap<String, TransformerFactory>,
}

impl TransformerRegistry {
    /// Create a registry holding only the built-in `element` transformer
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(DEFAULT_TRANSFORMER, || {
            Arc::new(ElementTransformer::new()) as Arc<dyn Transformer>
        });
        registry
    }

    /// Register a transformer constructor under a name
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Transformer> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Register a shared transformer instance under a name
    pub fn register_instance(&mut self, name: impl Into<String>, transformer: Arc<dyn Transformer>) {
        self.register(name, move || transformer.clone());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build the transformer registered under `name`
    pub fn get(&self, name: &str) -> Result<Arc<dyn Transformer>, ApiError> {
        let factory = self.factories.get(name).ok_or_else(|| {
            ConfigError::invalid("transformer", name, "no transformer registered under this name")
        })?;
        Ok(factory())
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
