//! Core module containing the fundamental types of the element API

pub mod context;
pub mod element;
pub mod error;
pub mod include;
pub mod pagination;
pub mod resource;
pub mod service;

pub use context::{RequestContext, SiteContext};
pub use element::{Element, ElementIdentity, FieldValue, Relation};
pub use error::{ApiError, ConfigError, ErrorResponse};
pub use include::{IncludeList, IncludeSpec};
pub use pagination::{PageUrl, PaginationState};
pub use resource::{AdapterHandle, Resource, ResourceAdapter, ResourceData};
pub use service::{ElementQuery, ElementService};
