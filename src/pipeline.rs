//! The endpoint pipeline
//!
//! One call to [`EndpointPipeline::handle`] answers one request:
//!
//! ```text
//! ResolveConfig -> CheckCache -(hit)-------------------------------> Respond
//!                             -(miss)-> BuildResource -> Transform
//!                                    -> Serialize -> Format -> MaybeStore -> Respond
//! ```
//!
//! Any step may fail; failures are turned into an error body with the
//! matching status and are never cached.

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;

use crate::cache::{CacheBackend, ResponseCache, keys};
use crate::config::{ApiSettings, ElementSource, EndpointDefinition, ResolvedEndpoint};
use crate::core::context::RequestContext;
use crate::core::error::ApiError;
use crate::core::pagination::PaginationState;
use crate::core::resource::Resource;
use crate::core::service::{ElementQuery, ElementService};
use crate::serializer::{JSON_CONTENT_TYPE, encode};
use crate::transform::engine::transform;
use crate::transform::transformer::TransformerRegistry;

/// Response header reporting what the cache did
pub const CACHE_STATUS_HEADER: &str = "x-element-api-cache";

/// Callback run on the serialized document before it is encoded
pub type BeforeSendHook = Arc<dyn Fn(&RequestContext, &mut Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    /// Cache enabled but skipped (preview request, failed request)
    Bypass,
    Disabled,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "hit",
            CacheStatus::Miss => "miss",
            CacheStatus::Bypass => "bypass",
            CacheStatus::Disabled => "disabled",
        }
    }
}

/// A rendered response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Bytes,
    pub cache: CacheStatus,
}

impl ApiResponse {
    /// Decode the body (mostly useful in tests)
    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.body)
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [
                (CONTENT_TYPE.as_str(), self.content_type),
                (CACHE_STATUS_HEADER, self.cache.as_str().to_string()),
            ],
            self.body,
        )
            .into_response()
    }
}

/// Orchestrates configuration, caching, querying, transformation and
/// serialization for every endpoint
#[derive(Clone)]
pub struct EndpointPipeline {
    settings: Arc<ApiSettings>,
    elements: Arc<dyn ElementService>,
    transformers: Arc<TransformerRegistry>,
    cache: Option<ResponseCache>,
    hooks: Vec<BeforeSendHook>,
}

impl EndpointPipeline {
    pub fn new(settings: ApiSettings, elements: Arc<dyn ElementService>) -> Self {
        Self {
            settings: Arc::new(settings),
            elements,
            transformers: Arc::new(TransformerRegistry::new()),
            cache: None,
            hooks: Vec::new(),
        }
    }

    pub fn with_transformers(mut self, transformers: TransformerRegistry) -> Self {
        self.transformers = Arc::new(transformers);
        self
    }

    /// Enable response caching on top of `backend`
    pub fn with_cache(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(ResponseCache::new(backend));
        self
    }

    /// Register a callback run on every document before encoding
    pub fn on_before_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestContext, &mut Value) + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    /// The response cache, for invalidation
    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// Computed cache key of a request
    pub fn cache_key(&self, ctx: &RequestContext) -> String {
        keys::response_key(
            &ctx.site.id,
            &ctx.path,
            &ctx.query_without(&self.settings.routing_params()),
        )
    }

    /// Answer one request
    #[instrument(skip_all, fields(path = %ctx.path, preview = ctx.preview))]
    pub async fn handle(&self, definition: &EndpointDefinition, ctx: RequestContext) -> ApiResponse {
        match self.run(definition, &ctx).await {
            Ok(response) => response,
            Err(err) => self.fail(err),
        }
    }

    async fn run(
        &self,
        definition: &EndpointDefinition,
        ctx: &RequestContext,
    ) -> Result<ApiResponse, ApiError> {
        // ResolveConfig
        let endpoint = definition
            .config(&ctx.route_params)?
            .merged_over(&self.settings.defaults)
            .resolve(&self.settings, &self.transformers, ctx)?;

        // CheckCache
        let mut cache_status = CacheStatus::Disabled;
        let mut cache_target = None;
        if let Some(cache) = self.cache.as_ref().filter(|_| endpoint.cache.is_enabled()) {
            if ctx.preview {
                tracing::debug!(cache = "response", outcome = "bypass", "preview request");
                cache_status = CacheStatus::Bypass;
            } else {
                let key = endpoint
                    .cache_key
                    .clone()
                    .unwrap_or_else(|| self.cache_key(ctx));

                match cache.lookup(&key).await {
                    Ok(Some(hit)) => {
                        tracing::debug!(cache = "response", outcome = "hit", %key, "serving cached response");
                        return Ok(ApiResponse {
                            status: StatusCode::OK,
                            content_type: hit
                                .content_type
                                .unwrap_or_else(|| JSON_CONTENT_TYPE.to_string()),
                            body: hit.body,
                            cache: CacheStatus::Hit,
                        });
                    }
                    Ok(None) => {
                        tracing::debug!(cache = "response", outcome = "miss", %key, "cache miss");
                    }
                    Err(e) => {
                        tracing::warn!(cache = "response", %key, error = %e, "cache lookup failed");
                    }
                }
                cache_status = CacheStatus::Miss;
                cache_target = Some((cache, key));
            }
        }

        // BuildResource
        let (resource, mut tags) = self.build_resource(&endpoint, ctx).await?;

        // Transform
        let transformed = transform(&resource, &endpoint.includes)?;
        tags.extend(transformed.tags);

        // Serialize
        let serializer = endpoint.serializer.build(ctx);
        let mut document = serializer.serialize(&transformed.tree)?;
        for hook in &self.hooks {
            hook(ctx, &mut document);
        }

        // Format
        let body = encode(&document, &endpoint.json_options)?;
        let content_type = serializer.content_type();

        // MaybeStore
        if let Some((cache, key)) = cache_target {
            let stored = cache
                .store(
                    &key,
                    body.clone(),
                    Some(content_type),
                    endpoint.cache.ttl(),
                    tags,
                )
                .await;
            if let Err(e) = stored {
                tracing::warn!(cache = "response", %key, error = %e, "failed to store response");
            }
        }

        Ok(ApiResponse {
            status: StatusCode::OK,
            content_type: content_type.to_string(),
            body,
            cache: cache_status,
        })
    }

    async fn build_resource(
        &self,
        endpoint: &ResolvedEndpoint,
        ctx: &RequestContext,
    ) -> Result<(Resource, BTreeSet<String>), ApiError> {
        let mut tags = BTreeSet::new();

        let mut resource = match &endpoint.source {
            ElementSource::Adapter(adapter) => {
                adapter.0.resource(ctx).await.map_err(ApiError::Backend)?
            }
            ElementSource::Query {
                element_type,
                criteria,
            } => {
                tags.insert(keys::query_tag(element_type));
                let query = ElementQuery::new(element_type.clone()).with_criteria(criteria.clone());
                self.query_resource(endpoint, ctx, query).await?
            }
        };

        if let Some(key) = &endpoint.resource_key {
            resource = resource.with_resource_key(key.clone());
        }
        if !endpoint.meta.is_empty() {
            resource = resource.with_meta(endpoint.meta.clone());
        }

        Ok((resource, tags))
    }

    async fn query_resource(
        &self,
        endpoint: &ResolvedEndpoint,
        ctx: &RequestContext,
        query: ElementQuery,
    ) -> Result<Resource, ApiError> {
        let transformer = endpoint.transformer.clone();

        if endpoint.one {
            let element = self
                .elements
                .one(&query)
                .await
                .map_err(ApiError::Backend)?
                .ok_or_else(ApiError::not_found)?;
            return Ok(Resource::item(element, transformer));
        }

        if !endpoint.paginate {
            let elements = self.elements.all(&query).await.map_err(ApiError::Backend)?;
            return Ok(Resource::collection(elements, transformer));
        }

        let total = self.elements.count(&query).await.map_err(ApiError::Backend)?;
        let mut pagination = PaginationState::new(
            endpoint.per_page,
            total,
            endpoint.page_param.clone(),
            ctx.query_param(&endpoint.page_param),
        )?
        .with_url(ctx.page_url(&self.settings.routing_params()));

        let elements = self
            .elements
            .all(&query.window(pagination.offset(), endpoint.per_page))
            .await
            .map_err(ApiError::Backend)?;
        pagination.set_count(elements.len() as u64);

        Ok(Resource::collection(elements, transformer).with_pagination(pagination))
    }

    fn fail(&self, err: ApiError) -> ApiResponse {
        if err.is_client_error() {
            tracing::warn!(code = err.error_code(), error = %err, "request failed");
        } else {
            tracing::error!(code = err.error_code(), error = %err, "request failed");
        }

        let body = match serde_json::to_vec(&err.to_response()) {
            Ok(body) => Bytes::from(body),
            Err(_) => Bytes::from_static(br#"{"error":{"code":500,"message":"Internal server error"}}"#),
        };

        ApiResponse {
            status: err.status_code(),
            content_type: JSON_CONTENT_TYPE.to_string(),
            body,
            cache: CacheStatus::Bypass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use crate::core::element::Element;
    use crate::storage::InMemoryElementService;
    use uuid::Uuid;

    fn pipeline() -> EndpointPipeline {
        let elements = InMemoryElementService::with_elements(vec![
            Element::new("entry", Uuid::new_v4()).with_field("title", "a"),
        ]);
        EndpointPipeline::new(ApiSettings::default(), Arc::new(elements))
    }

    #[tokio::test]
    async fn test_error_body_and_status() {
        let definition = EndpointDefinition::from(
            EndpointConfig::for_element_type("entry")
                .with_criterion("title", "missing")
                .with_one(true),
        );
        let response = pipeline().handle(&definition, RequestContext::new("news/x")).await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        let body = response.json().unwrap();
        assert_eq!(body["error"]["code"], 404);
    }

    #[tokio::test]
    async fn test_before_send_hook_edits_document() {
        let definition = EndpointDefinition::from(
            EndpointConfig::for_element_type("entry").with_paginate(false),
        );
        let pipeline = pipeline().on_before_send(|ctx, document| {
            if let Value::Array(items) = document {
                items.push(Value::String(ctx.path.clone()));
            }
        });

        let response = pipeline.handle(&definition, RequestContext::new("news")).await;
        let body = response.json().unwrap();
        assert_eq!(body[1], "news");
        assert_eq!(response.cache, CacheStatus::Disabled);
    }

    #[test]
    fn test_cache_key_strips_routing_params() {
        let pipeline = pipeline();
        let a = RequestContext::new("news").with_query_string("p=news&page=2");
        let b = RequestContext::new("news").with_query_string("page=2&pattern=news");
        assert_eq!(pipeline.cache_key(&a), "elementapi:1:news:page=2");
        assert_eq!(pipeline.cache_key(&a), pipeline.cache_key(&b));
    }
}
