//! # Element API
//!
//! Read-only JSON endpoints over element queries.
//!
//! ## Features
//!
//! - **Declarative Endpoints**: element type, criteria and output options per route pattern
//! - **Pluggable Serializers**: plain, enveloped (`dataArray`), JSON:API and JSON Feed
//! - **Relationship Includes**: nested include/exclude paths resolved through transformers
//! - **Pagination**: clamped page state with navigation links
//! - **Response Caching**: rendered bytes cached under content-addressed keys,
//!   invalidated by element tags
//! - **Configuration-Based**: endpoints and defaults loaded from YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use element_api::prelude::*;
//!
//! let elements = InMemoryElementService::new();
//! elements.insert(Element::new("entry", Uuid::new_v4()).with_field("title", "Hello"))?;
//!
//! ServerBuilder::new()
//!     .with_element_service(elements)
//!     .with_cache(InMemoryCache::new())
//!     .endpoint(
//!         "news.json",
//!         EndpointConfig::for_element_type("entry")
//!             .with_serializer(SerializerKind::JsonFeed)
//!             .with_cache(CacheSetting::Enabled(true)),
//!     )
//!     .serve("127.0.0.1:3000")
//!     .await?;
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod serializer;
pub mod server;
pub mod storage;
pub mod telemetry;
pub mod transform;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        AdapterHandle, ApiError, ConfigError, Element, ElementIdentity, ElementQuery,
        ElementService, FieldValue, IncludeList, IncludeSpec, PaginationState, Relation,
        RequestContext, Resource, ResourceAdapter, SiteContext,
    };

    // === Transform ===
    pub use crate::transform::{
        Attributes, ElementTransformer, FnTransformer, Transformer, TransformerRegistry,
    };

    // === Serializers ===
    pub use crate::serializer::{JsonOptions, Serializer, SerializerKind};

    // === Cache ===
    pub use crate::cache::{CacheBackend, CacheEntry, ResponseCache};

    // === Storage ===
    pub use crate::storage::{InMemoryCache, InMemoryElementService};

    // === Config ===
    pub use crate::config::{
        ApiSettings, CacheSetting, EndpointConfig, EndpointDefinition, EndpointFactory,
        ParamSpec,
    };

    // === Pipeline & Server ===
    pub use crate::pipeline::{ApiResponse, CacheStatus, EndpointPipeline};
    pub use crate::server::ServerBuilder;

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
