//! Cache key and tag definitions.

use crate::core::element::ElementIdentity;

/// Prefix of every computed response key
pub const NAMESPACE: &str = "elementapi";

/// Tag carried by every cached response
pub const ROOT_TAG: &str = "element-api";

/// Key of a rendered response
///
/// Routing parameters must already be stripped from `query`, so requests
/// differing only in those parameters share an entry.
pub fn response_key(site_id: &str, path: &str, query: &str) -> String {
    format!("{}:{}:{}:{}", NAMESPACE, site_id, path, query)
}

/// Tag of every response that touched an element of this type
pub fn type_tag(element_type: &str) -> String {
    format!("element:{}", element_type)
}

/// Tag of every response that touched this element
pub fn element_tag(identity: &ElementIdentity) -> String {
    format!("element:{}:{}", identity.element_type, identity.id)
}

/// Tag of every response whose root query targeted this type
///
/// Lets new elements of the type invalidate lists they would appear in.
pub fn query_tag(element_type: &str) -> String {
    format!("query:{}", element_type)
}
