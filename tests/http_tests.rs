//! HTTP tests for the generated router
//!
//! These tests drive the axum router built by `ServerBuilder` and verify that:
//! - GET routes render endpoints with the serializer's content type
//! - OPTIONS routes answer 204 without a body
//! - Route parameters reach endpoint factories
//! - The cache status header reflects hits, misses and previews

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use element_api::pipeline::CACHE_STATUS_HEADER;
use element_api::prelude::*;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

// =============================================================================
// Helpers
// =============================================================================

fn elements() -> InMemoryElementService {
    let service = InMemoryElementService::new();
    for (slug, title) in [("hello", "Hello"), ("world", "World")] {
        service
            .insert(
                Element::new("entry", Uuid::new_v4())
                    .with_field("slug", slug)
                    .with_field("title", title),
            )
            .unwrap();
    }
    service
}

fn app() -> Router {
    let settings = ApiSettings::from_yaml_str(
        r#"
site:
  name: Blog
  baseUrl: https://example.com
endpoints:
  news.json:
    elementType: entry
    serializer: jsonFeed
    cache: true
"#,
    )
    .unwrap();

    ServerBuilder::new()
        .with_settings(settings)
        .with_element_service(elements())
        .with_cache(InMemoryCache::new())
        .endpoint(
            "news",
            EndpointConfig::for_element_type("entry").with_cache(CacheSetting::Seconds(300)),
        )
        .endpoint(
            "news/{slug}",
            EndpointFactory::new(|params| {
                Ok(EndpointConfig::for_element_type("entry")
                    .with_criterion("slug", params.require("slug")?)
                    .with_one(true))
            })
            .param(ParamSpec::required("slug")),
        )
        .build()
        .unwrap()
}

async fn send(app: &Router, method: Method, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

fn header_value<'a>(response: &'a axum::response::Response, name: &str) -> &'a str {
    response.headers().get(name).unwrap().to_str().unwrap()
}

// =============================================================================
// Routing
// =============================================================================

mod routing_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_renders_endpoint() {
        let app = app();
        let response = send(&app, Method::GET, "/news").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, header::CONTENT_TYPE.as_str()), "application/json");

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["meta"]["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn test_options_is_empty_204() {
        let app = app();
        let response = send(&app, Method::OPTIONS, "/news").await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_configured_endpoint_uses_feed_content_type() {
        let app = app();
        let response = send(&app, Method::GET, "/news.json").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header_value(&response, header::CONTENT_TYPE.as_str()),
            "application/feed+json"
        );

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["version"], "https://jsonfeed.org/version/1");
        assert_eq!(body["feed_url"], "https://example.com/news.json");
    }

    #[tokio::test]
    async fn test_route_params_reach_factory() {
        let app = app();
        let response = send(&app, Method::GET, "/news/world").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["title"], "World");
    }

    #[tokio::test]
    async fn test_unknown_slug_is_404() {
        let app = app();
        let response = send(&app, Method::GET, "/news/missing").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"]["code"], 404);
    }

    #[tokio::test]
    async fn test_unregistered_path_is_router_404() {
        let app = app();
        let response = send(&app, Method::GET, "/nothing").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

// =============================================================================
// Cache header
// =============================================================================

mod cache_header_tests {
    use super::*;

    #[tokio::test]
    async fn test_miss_then_hit() {
        let app = app();

        let first = send(&app, Method::GET, "/news?page=1").await;
        assert_eq!(header_value(&first, CACHE_STATUS_HEADER), "miss");
        let first_body = body_bytes(first).await;

        let second = send(&app, Method::GET, "/news?page=1").await;
        assert_eq!(header_value(&second, CACHE_STATUS_HEADER), "hit");
        assert_eq!(body_bytes(second).await, first_body);
    }

    #[tokio::test]
    async fn test_preview_query_param_bypasses() {
        let app = app();
        let response = send(&app, Method::GET, "/news?x-preview=abc").await;
        assert_eq!(header_value(&response, CACHE_STATUS_HEADER), "bypass");
    }

    #[tokio::test]
    async fn test_uncached_endpoint_reports_disabled() {
        let app = app();
        let response = send(&app, Method::GET, "/news/hello").await;
        assert_eq!(header_value(&response, CACHE_STATUS_HEADER), "disabled");
    }

    #[tokio::test]
    async fn test_cached_hit_keeps_feed_content_type() {
        let app = app();
        send(&app, Method::GET, "/news.json").await;
        let response = send(&app, Method::GET, "/news.json").await;

        assert_eq!(header_value(&response, CACHE_STATUS_HEADER), "hit");
        assert_eq!(
            header_value(&response, header::CONTENT_TYPE.as_str()),
            "application/feed+json"
        );
    }
}
