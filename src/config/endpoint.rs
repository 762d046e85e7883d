//! Endpoint options and their resolution

use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::ApiSettings;
use crate::core::context::RequestContext;
use crate::core::error::{ApiError, ConfigError};
use crate::core::include::{IncludeList, IncludeSpec};
use crate::core::pagination::ensure_page_param;
use crate::core::resource::{AdapterHandle, ResourceAdapter};
use crate::serializer::{JsonOptions, SerializerKind};
use crate::transform::transformer::{DEFAULT_TRANSFORMER, Transformer, TransformerRegistry};

pub const DEFAULT_ELEMENTS_PER_PAGE: i64 = 100;
pub const DEFAULT_PAGE_PARAM: &str = "page";

/// `cache` option: a flag, a number of seconds, or a human duration (`"1h"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CacheSetting {
    Enabled(bool),
    Seconds(u64),
    Duration(#[serde(with = "humantime_serde")] Duration),
}

/// What the cache does for an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    Disabled,
    /// Until invalidated by tag
    Forever,
    /// Until invalidated, or until the duration elapsed
    For(Duration),
}

impl CachePolicy {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, CachePolicy::Disabled)
    }

    pub fn ttl(&self) -> Option<Duration> {
        match self {
            CachePolicy::For(ttl) => Some(*ttl),
            _ => None,
        }
    }
}

impl CacheSetting {
    /// A zero duration means no expiry
    pub fn policy(&self) -> CachePolicy {
        let ttl = match *self {
            CacheSetting::Enabled(false) => return CachePolicy::Disabled,
            CacheSetting::Enabled(true) => return CachePolicy::Forever,
            CacheSetting::Seconds(seconds) => Duration::from_secs(seconds),
            CacheSetting::Duration(ttl) => ttl,
        };
        if ttl.is_zero() {
            CachePolicy::Forever
        } else {
            CachePolicy::For(ttl)
        }
    }
}

/// Options of one endpoint
///
/// Every option is optional so that endpoint options can be merged over the
/// global defaults; [`EndpointConfig::resolve`] applies the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EndpointConfig {
    pub element_type: Option<String>,
    pub criteria: Option<Map<String, Value>>,
    pub one: Option<bool>,
    /// Deprecated alias of `one`
    pub first: Option<bool>,
    pub paginate: Option<bool>,
    pub elements_per_page: Option<i64>,
    pub page_param: Option<String>,
    pub transformer: Option<String>,
    pub serializer: Option<SerializerKind>,
    pub includes: Option<IncludeList>,
    pub excludes: Option<IncludeList>,
    /// Query parameter whose value is added to `includes`
    pub include_param: Option<String>,
    pub resource_key: Option<String>,
    pub meta: Option<Map<String, Value>>,
    pub cache: Option<CacheSetting>,
    pub cache_key: Option<String>,
    pub json_options: Option<JsonOptions>,

    /// Pre-built resource source, replaces the element query
    #[serde(skip)]
    pub resource: Option<AdapterHandle>,
}

impl EndpointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_element_type(element_type: impl Into<String>) -> Self {
        Self {
            element_type: Some(element_type.into()),
            ..Default::default()
        }
    }

    pub fn with_criterion(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.criteria
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_one(mut self, one: bool) -> Self {
        self.one = Some(one);
        self
    }

    pub fn with_paginate(mut self, paginate: bool) -> Self {
        self.paginate = Some(paginate);
        self
    }

    pub fn with_elements_per_page(mut self, per_page: i64) -> Self {
        self.elements_per_page = Some(per_page);
        self
    }

    pub fn with_page_param(mut self, page_param: impl Into<String>) -> Self {
        self.page_param = Some(page_param.into());
        self
    }

    pub fn with_transformer(mut self, name: impl Into<String>) -> Self {
        self.transformer = Some(name.into());
        self
    }

    pub fn with_serializer(mut self, serializer: SerializerKind) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn with_includes(mut self, includes: impl Into<IncludeList>) -> Self {
        self.includes = Some(includes.into());
        self
    }

    pub fn with_excludes(mut self, excludes: impl Into<IncludeList>) -> Self {
        self.excludes = Some(excludes.into());
        self
    }

    pub fn with_include_param(mut self, name: impl Into<String>) -> Self {
        self.include_param = Some(name.into());
        self
    }

    pub fn with_resource_key(mut self, key: impl Into<String>) -> Self {
        self.resource_key = Some(key.into());
        self
    }

    pub fn with_meta(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_cache(mut self, cache: CacheSetting) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn with_json_options(mut self, options: JsonOptions) -> Self {
        self.json_options = Some(options);
        self
    }

    pub fn with_resource(mut self, adapter: impl ResourceAdapter + 'static) -> Self {
        self.resource = Some(AdapterHandle::new(adapter));
        self
    }

    /// Merge these options over `defaults`; options set here win
    pub fn merged_over(&self, defaults: &EndpointConfig) -> EndpointConfig {
        EndpointConfig {
            element_type: self.element_type.clone().or_else(|| defaults.element_type.clone()),
            criteria: self.criteria.clone().or_else(|| defaults.criteria.clone()),
            one: self.one.or(defaults.one),
            first: self.first.or(defaults.first),
            paginate: self.paginate.or(defaults.paginate),
            elements_per_page: self.elements_per_page.or(defaults.elements_per_page),
            page_param: self.page_param.clone().or_else(|| defaults.page_param.clone()),
            transformer: self.transformer.clone().or_else(|| defaults.transformer.clone()),
            serializer: self.serializer.or(defaults.serializer),
            includes: self.includes.clone().or_else(|| defaults.includes.clone()),
            excludes: self.excludes.clone().or_else(|| defaults.excludes.clone()),
            include_param: self
                .include_param
                .clone()
                .or_else(|| defaults.include_param.clone()),
            resource_key: self.resource_key.clone().or_else(|| defaults.resource_key.clone()),
            meta: self.meta.clone().or_else(|| defaults.meta.clone()),
            cache: self.cache.or(defaults.cache),
            cache_key: self.cache_key.clone().or_else(|| defaults.cache_key.clone()),
            json_options: self.json_options.or(defaults.json_options),
            resource: self.resource.clone().or_else(|| defaults.resource.clone()),
        }
    }

    /// Validate the options and apply the built-in defaults
    ///
    /// Fails before any query is run.
    pub fn resolve(
        &self,
        settings: &ApiSettings,
        transformers: &TransformerRegistry,
        ctx: &RequestContext,
    ) -> Result<ResolvedEndpoint, ApiError> {
        if self.first.is_some() {
            warn!("The 'first' endpoint option is deprecated, use 'one' instead");
        }
        let one = self.one.or(self.first).unwrap_or(false);
        let paginate = !one && self.paginate.unwrap_or(true);

        let per_page = self.elements_per_page.unwrap_or(DEFAULT_ELEMENTS_PER_PAGE);
        if per_page < 1 {
            return Err(ConfigError::invalid(
                "elementsPerPage",
                per_page.to_string(),
                "must be a positive integer",
            )
            .into());
        }

        let page_param = self
            .page_param
            .clone()
            .unwrap_or_else(|| DEFAULT_PAGE_PARAM.to_string());
        if paginate {
            ensure_page_param(&page_param, &settings.path_param)?;
        }

        let source = match (&self.resource, &self.element_type) {
            (Some(adapter), _) => ElementSource::Adapter(adapter.clone()),
            (None, Some(element_type)) => ElementSource::Query {
                element_type: element_type.clone(),
                criteria: self.criteria.clone().unwrap_or_default(),
            },
            (None, None) => {
                return Err(ConfigError::MissingField {
                    field: "elementType".to_string(),
                    context: format!("endpoint '{}'", ctx.path),
                }
                .into());
            }
        };

        let transformer =
            transformers.get(self.transformer.as_deref().unwrap_or(DEFAULT_TRANSFORMER))?;

        let mut includes = self.includes.as_ref().map(IncludeList::entries).unwrap_or_default();
        if let Some(requested) = self
            .include_param
            .as_deref()
            .and_then(|name| ctx.query_param(name))
        {
            includes.extend(IncludeList::from(requested).entries());
        }
        let includes = IncludeSpec::parse(
            Some(&IncludeList::List(includes)),
            self.excludes.as_ref(),
        );

        Ok(ResolvedEndpoint {
            source,
            one,
            paginate,
            per_page: per_page as u64,
            page_param,
            transformer,
            serializer: self.serializer.unwrap_or_default(),
            includes,
            resource_key: self.resource_key.clone(),
            meta: self.meta.clone().unwrap_or_default(),
            cache: self
                .cache
                .map(|c| c.policy())
                .unwrap_or(CachePolicy::Disabled),
            cache_key: self.cache_key.clone(),
            json_options: self.json_options.unwrap_or_default(),
        })
    }
}

/// Where the root resource comes from
#[derive(Debug, Clone)]
pub enum ElementSource {
    Query {
        element_type: String,
        criteria: Map<String, Value>,
    },
    Adapter(AdapterHandle),
}

/// Fully validated endpoint options for one request
#[derive(Clone)]
pub struct ResolvedEndpoint {
    pub source: ElementSource,
    pub one: bool,
    /// Never set together with `one`
    pub paginate: bool,
    pub per_page: u64,
    pub page_param: String,
    pub transformer: Arc<dyn Transformer>,
    pub serializer: SerializerKind,
    pub includes: IncludeSpec,
    pub resource_key: Option<String>,
    pub meta: Map<String, Value>,
    pub cache: CachePolicy,
    pub cache_key: Option<String>,
    pub json_options: JsonOptions,
}
