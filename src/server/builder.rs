//! ServerBuilder for fluent API to build HTTP servers

use super::router::build_endpoint_routes;
use crate::cache::CacheBackend;
use crate::config::{ApiSettings, EndpointDefinition};
use crate::core::context::RequestContext;
use crate::core::service::ElementService;
use crate::pipeline::EndpointPipeline;
use crate::transform::TransformerRegistry;
use anyhow::{Result, anyhow};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

type Hook = Box<dyn Fn(&RequestContext, &mut Value) + Send + Sync>;

/// Builder for creating HTTP servers exposing element endpoints
///
/// Endpoints come from the settings (`endpoints` block) and from
/// [`ServerBuilder::endpoint`].
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_settings(ApiSettings::from_yaml_file("element-api.yaml")?)
///     .with_element_service(InMemoryElementService::new())
///     .with_cache(InMemoryCache::new())
///     .endpoint("news/{slug}", factory)
///     .build()?;
/// ```
pub struct ServerBuilder {
    settings: ApiSettings,
    element_service: Option<Arc<dyn ElementService>>,
    transformers: TransformerRegistry,
    cache: Option<Arc<dyn CacheBackend>>,
    hooks: Vec<Hook>,
    endpoints: Vec<(String, EndpointDefinition)>,
    custom_routes: Vec<Router>,
    cors: Option<CorsLayer>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            settings: ApiSettings::default(),
            element_service: None,
            transformers: TransformerRegistry::new(),
            cache: None,
            hooks: Vec::new(),
            endpoints: Vec::new(),
            custom_routes: Vec::new(),
            cors: None,
        }
    }

    pub fn with_settings(mut self, settings: ApiSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the element service (required)
    pub fn with_element_service(mut self, service: impl ElementService + 'static) -> Self {
        self.element_service = Some(Arc::new(service));
        self
    }

    pub fn with_transformers(mut self, transformers: TransformerRegistry) -> Self {
        self.transformers = transformers;
        self
    }

    /// Enable response caching
    pub fn with_cache(mut self, backend: impl CacheBackend + 'static) -> Self {
        self.cache = Some(Arc::new(backend));
        self
    }

    /// Use a cache backend shared with other components (e.g., an invalidation job)
    pub fn with_shared_cache(mut self, backend: Arc<dyn CacheBackend>) -> Self {
        self.cache = Some(backend);
        self
    }

    /// Register a callback run on every document before it is encoded
    pub fn on_before_send<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestContext, &mut Value) + Send + Sync + 'static,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Register an endpoint (static options or a factory)
    pub fn endpoint(
        mut self,
        pattern: impl Into<String>,
        definition: impl Into<EndpointDefinition>,
    ) -> Self {
        self.endpoints.push((pattern.into(), definition.into()));
        self
    }

    /// Add custom routes to the server
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    pub fn with_cors(mut self, cors: CorsLayer) -> Self {
        self.cors = Some(cors);
        self
    }

    /// Build the pipeline shared by all endpoints
    pub fn build_pipeline(&mut self) -> Result<EndpointPipeline> {
        let elements = self.element_service.clone().ok_or_else(|| {
            anyhow!("Element service is required. Call .with_element_service() before building.")
        })?;

        let mut pipeline = EndpointPipeline::new(self.settings.clone(), elements)
            .with_transformers(self.transformers.clone());
        if let Some(cache) = &self.cache {
            pipeline = pipeline.with_cache(cache.clone());
        }
        for hook in std::mem::take(&mut self.hooks) {
            pipeline = pipeline.on_before_send(hook);
        }
        Ok(pipeline)
    }

    /// Build the final router
    pub fn build(mut self) -> Result<Router> {
        let pipeline = self.build_pipeline()?;

        let mut endpoints = self.settings.endpoint_definitions();
        endpoints.append(&mut self.endpoints);
        for (pattern, _) in &endpoints {
            tracing::debug!(pattern = %pattern, "registering endpoint");
        }

        let mut app = build_endpoint_routes(&pipeline, endpoints);
        for routes in std::mem::take(&mut self.custom_routes) {
            app = app.merge(routes);
        }
        if let Some(cors) = self.cors.take() {
            app = app.layer(cors);
        }

        Ok(app.layer(TraceLayer::new_for_http()))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
