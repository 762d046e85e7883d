//! Response caching with tag-based invalidation
//!
//! Rendered payloads are stored under a content-addressed key together with
//! the tags of every element that went into them. Changing an element purges
//! exactly the responses tagged with it.

pub mod backend;
pub mod keys;
pub mod response;

pub use backend::{CacheBackend, CacheEntry};
pub use response::{CachedPayload, ResponseCache};
