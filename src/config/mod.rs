//! Configuration module for element endpoints

pub mod endpoint;
pub mod factory;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::core::error::ConfigError;

pub use endpoint::{CachePolicy, CacheSetting, EndpointConfig, ElementSource, ResolvedEndpoint};
pub use factory::{BoundParams, EndpointDefinition, EndpointFactory, ParamSpec};

/// Query parameter carrying the matched path for rewritten requests
pub const DEFAULT_PATH_PARAM: &str = "p";

/// Query parameter or header marking preview requests
pub const DEFAULT_PREVIEW_PARAM: &str = "x-preview";

/// Query parameter always stripped from cache keys and page URLs
pub const PATTERN_PARAM: &str = "pattern";

/// Site an API is served for
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    #[serde(default = "default_site_id")]
    pub id: String,
    #[serde(default = "default_site_name")]
    pub name: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_site_id() -> String {
    "1".to_string()
}

fn default_site_name() -> String {
    "Site".to_string()
}

fn default_base_url() -> String {
    "http://localhost".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            id: default_site_id(),
            name: default_site_name(),
            base_url: default_base_url(),
        }
    }
}

/// Complete API configuration
///
/// ```yaml
/// pathParam: p
/// site:
///   name: Blog
///   baseUrl: https://example.com
/// defaults:
///   cache: 1h
/// endpoints:
///   news:
///     elementType: entry
///     criteria: { section: news }
///     elementsPerPage: 10
///     serializer: jsonFeed
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSettings {
    /// Reserved routing parameter, never usable as page parameter
    #[serde(default = "default_path_param")]
    pub path_param: String,

    #[serde(default = "default_preview_param")]
    pub preview_param: String,

    #[serde(default)]
    pub site: SiteConfig,

    /// Options merged under every endpoint
    #[serde(default)]
    pub defaults: EndpointConfig,

    /// Route pattern to endpoint options
    #[serde(default)]
    pub endpoints: IndexMap<String, EndpointConfig>,
}

fn default_path_param() -> String {
    DEFAULT_PATH_PARAM.to_string()
}

fn default_preview_param() -> String {
    DEFAULT_PREVIEW_PARAM.to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            path_param: default_path_param(),
            preview_param: default_preview_param(),
            site: SiteConfig::default(),
            defaults: EndpointConfig::default(),
            endpoints: IndexMap::new(),
        }
    }
}

impl ApiSettings {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })
    }

    /// Parameters stripped from cache keys and pagination URLs
    pub fn routing_params(&self) -> [&str; 2] {
        [self.path_param.as_str(), PATTERN_PARAM]
    }

    /// Statically configured endpoints, in declaration order
    pub fn endpoint_definitions(&self) -> Vec<(String, EndpointDefinition)> {
        self.endpoints
            .iter()
            .map(|(pattern, config)| (pattern.clone(), EndpointDefinition::Static(config.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::SerializerKind;
    use std::time::Duration;

    const YAML: &str = r#"
site:
  id: "2"
  name: Blog
  baseUrl: https://example.com
defaults:
  cache: 1h
  elementsPerPage: 20
endpoints:
  news:
    elementType: entry
    criteria:
      section: news
    elementsPerPage: 10
    serializer: jsonFeed
  news/{slug}:
    elementType: entry
    one: true
    cache: false
"#;

    #[test]
    fn test_load_settings() {
        let settings = ApiSettings::from_yaml_str(YAML).unwrap();

        assert_eq!(settings.path_param, "p");
        assert_eq!(settings.preview_param, "x-preview");
        assert_eq!(settings.site.name, "Blog");
        assert_eq!(settings.routing_params(), ["p", "pattern"]);

        let news = &settings.endpoints["news"];
        assert_eq!(news.element_type.as_deref(), Some("entry"));
        assert_eq!(news.serializer, Some(SerializerKind::JsonFeed));
        assert_eq!(
            settings.defaults.cache,
            Some(CacheSetting::Duration(Duration::from_secs(3600)))
        );

        let definitions = settings.endpoint_definitions();
        assert_eq!(definitions[1].0, "news/{slug}");
    }

    #[test]
    fn test_defaults_apply_without_config() {
        let settings = ApiSettings::from_yaml_str("{}").unwrap();
        assert_eq!(settings.site, SiteConfig::default());
        assert!(settings.endpoints.is_empty());
    }

    #[test]
    fn test_unknown_option_is_parse_error() {
        let err = ApiSettings::from_yaml_str("endpoints:\n  news:\n    elementTyp: entry\n")
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_PARSE_ERROR");
    }

    #[test]
    fn test_missing_file() {
        let err = ApiSettings::from_yaml_file("/nonexistent/element-api.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { file: Some(_), .. }));
    }
}
