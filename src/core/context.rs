//! Explicit per-request context
//!
//! Everything the pipeline needs to know about the incoming request is passed
//! in a [`RequestContext`]: no ambient request object is consulted.

use std::collections::HashMap;
use url::form_urlencoded;

use crate::config::SiteConfig;

/// The site a request is served for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteContext {
    /// Site identifier used in cache keys
    pub id: String,

    /// Human readable site name (feed title default)
    pub name: String,

    /// Absolute base URL, without a trailing slash
    pub base_url: String,
}

impl SiteContext {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL for a site-relative path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for SiteContext {
    fn default() -> Self {
        Self::new("1", "Site", "http://localhost")
    }
}

impl From<&SiteConfig> for SiteContext {
    fn from(config: &SiteConfig) -> Self {
        Self::new(config.id.clone(), config.name.clone(), config.base_url.clone())
    }
}

/// Request data handed to the pipeline
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Request path without leading slash (e.g., "news/hello")
    pub path: String,

    /// Query parameters in request order
    pub query: Vec<(String, String)>,

    /// Site the request is served for
    pub site: SiteContext,

    /// Preview/draft requests are never cached
    pub preview: bool,

    /// Parameters captured by the matched route pattern
    pub route_params: HashMap<String, String>,
}

impl RequestContext {
    /// Create a context for a path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into().trim_matches('/').to_string(),
            ..Default::default()
        }
    }

    /// Parse and append a raw query string (`a=1&b=2`)
    pub fn with_query_string(mut self, raw: &str) -> Self {
        self.query.extend(
            form_urlencoded::parse(raw.trim_start_matches('?').as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
        self
    }

    /// Append a single query parameter
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_site(mut self, site: SiteContext) -> Self {
        self.site = site;
        self
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_route_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.insert(name.into(), value.into());
        self
    }

    /// First value of a query parameter
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Re-encoded query string without the given parameters
    pub fn query_without(&self, stripped: &[&str]) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.query {
            if !stripped.contains(&name.as_str()) {
                serializer.append_pair(name, value);
            }
        }
        serializer.finish()
    }

    /// Base for pagination links, with the routing parameters stripped
    pub fn page_url(&self, stripped: &[&str]) -> crate::core::pagination::PageUrl {
        crate::core::pagination::PageUrl {
            base_url: self.site.base_url.clone(),
            path: self.path.clone(),
            query: self
                .query
                .iter()
                .filter(|(k, _)| !stripped.contains(&k.as_str()))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string_parsing() {
        let ctx = RequestContext::new("/news/")
            .with_query_string("?page=2&search=hello%20world&page=3");

        assert_eq!(ctx.path, "news");
        assert_eq!(ctx.query_param("page"), Some("2"));
        assert_eq!(ctx.query_param("search"), Some("hello world"));
        assert_eq!(ctx.query_param("missing"), None);
    }

    #[test]
    fn test_query_without_strips_routing_params() {
        let ctx = RequestContext::new("news")
            .with_query_string("p=news&pattern=x&page=2&sort=asc");

        assert_eq!(ctx.query_without(&["p", "pattern"]), "page=2&sort=asc");
        assert_eq!(ctx.query_without(&["p", "pattern", "page", "sort"]), "");
    }

    #[test]
    fn test_site_url_joins_paths() {
        let site = SiteContext::new("1", "Blog", "https://example.com/");
        assert_eq!(site.url("/news"), "https://example.com/news");
        assert_eq!(site.url("news"), "https://example.com/news");
    }
}
