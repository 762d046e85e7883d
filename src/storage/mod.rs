//! Storage implementations for element queries and cached responses

pub mod in_memory;

pub use in_memory::{InMemoryCache, InMemoryElementService};
