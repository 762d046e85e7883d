//! Router builder utilities for element endpoints

use crate::config::EndpointDefinition;
use crate::core::context::{RequestContext, SiteContext};
use crate::pipeline::{ApiResponse, EndpointPipeline};
use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, Uri},
    routing::get,
};
use std::collections::HashMap;
use std::sync::Arc;

/// State shared by the handler of one endpoint route
#[derive(Clone)]
pub struct EndpointState {
    pub pipeline: EndpointPipeline,
    pub definition: Arc<EndpointDefinition>,
}

/// Build one route per endpoint pattern
///
/// Each pattern answers:
/// - GET - the rendered endpoint
/// - OPTIONS - 204 without a body
///
/// Patterns use axum path syntax (`news/{slug}`); captured segments become
/// the route parameters of the endpoint factory.
pub fn build_endpoint_routes(
    pipeline: &EndpointPipeline,
    endpoints: Vec<(String, EndpointDefinition)>,
) -> Router {
    endpoints
        .into_iter()
        .fold(Router::new(), |router, (pattern, definition)| {
            let state = EndpointState {
                pipeline: pipeline.clone(),
                definition: Arc::new(definition),
            };
            router.merge(
                Router::new()
                    .route(
                        &route_path(&pattern),
                        get(handle_endpoint).options(preflight),
                    )
                    .with_state(state),
            )
        })
}

/// Normalize a configured pattern into an axum route path
pub fn route_path(pattern: &str) -> String {
    format!("/{}", pattern.trim_matches('/'))
}

/// Build the request context handed to the pipeline
pub fn request_context(
    pipeline: &EndpointPipeline,
    uri: &Uri,
    headers: &HeaderMap,
    route_params: HashMap<String, String>,
) -> RequestContext {
    let settings = pipeline.settings();
    let mut ctx = RequestContext::new(uri.path())
        .with_query_string(uri.query().unwrap_or_default())
        .with_site(SiteContext::from(&settings.site));

    let preview = ctx.query_param(&settings.preview_param).is_some()
        || headers.contains_key(settings.preview_param.as_str());
    ctx.preview = preview;
    ctx.route_params = route_params;
    ctx
}

/// GET handler shared by all endpoints
pub async fn handle_endpoint(
    State(state): State<EndpointState>,
    params: Option<Path<HashMap<String, String>>>,
    uri: Uri,
    headers: HeaderMap,
) -> ApiResponse {
    let route_params = params.map(|Path(params)| params).unwrap_or_default();
    let ctx = request_context(&state.pipeline, &uri, &headers, route_params);
    state.pipeline.handle(&state.definition, ctx).await
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiSettings;
    use crate::storage::InMemoryElementService;

    #[test]
    fn test_route_path() {
        assert_eq!(route_path("news"), "/news");
        assert_eq!(route_path("/news/{slug}/"), "/news/{slug}");
    }

    #[test]
    fn test_preview_detection() {
        let pipeline = EndpointPipeline::new(
            ApiSettings::default(),
            Arc::new(InMemoryElementService::new()),
        );
        let uri: Uri = "/news?x-preview=1&page=2".parse().unwrap();
        let ctx = request_context(&pipeline, &uri, &HeaderMap::new(), HashMap::new());
        assert!(ctx.preview);
        assert_eq!(ctx.path, "news");
        assert_eq!(ctx.query_param("page"), Some("2"));

        let mut headers = HeaderMap::new();
        headers.insert("x-preview", "1".parse().unwrap());
        let uri: Uri = "/news".parse().unwrap();
        assert!(request_context(&pipeline, &uri, &headers, HashMap::new()).preview);
        assert!(!request_context(&pipeline, &uri, &HeaderMap::new(), HashMap::new()).preview);
    }
}
