//! Endpoint factories: endpoint options computed from route parameters

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::endpoint::EndpointConfig;
use crate::core::error::{ApiError, ConfigError};

/// A declared factory parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub default: Option<String>,
}

impl ParamSpec {
    /// A parameter that must be captured by the route
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// A parameter falling back to `default` when the route does not capture it
    pub fn optional(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

/// Parameters bound for one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundParams(HashMap<String, String>);

impl BoundParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Get a parameter the factory did not declare as a config error
    pub fn require(&self, name: &str) -> Result<&str, ConfigError> {
        self.get(name).ok_or_else(|| ConfigError::MissingParameter {
            name: name.to_string(),
        })
    }
}

type BuildFn = dyn Fn(&BoundParams) -> Result<EndpointConfig, ApiError> + Send + Sync;

/// Builds endpoint options from declared parameters
///
/// ```rust,ignore
/// let factory = EndpointFactory::new(|params| {
///     Ok(EndpointConfig::for_element_type("entry")
///         .with_criterion("slug", params.require("slug")?)
///         .with_one(true))
/// })
/// .param(ParamSpec::required("slug"));
/// ```
#[derive(Clone)]
pub struct EndpointFactory {
    params: Vec<ParamSpec>,
    build: Arc<BuildFn>,
}

impl EndpointFactory {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&BoundParams) -> Result<EndpointConfig, ApiError> + Send + Sync + 'static,
    {
        Self {
            params: Vec::new(),
            build: Arc::new(build),
        }
    }

    /// Declare a parameter
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Bind declared parameters from route parameters and defaults
    pub fn bind(&self, route_params: &HashMap<String, String>) -> Result<BoundParams, ConfigError> {
        let mut bound = HashMap::with_capacity(self.params.len());
        for spec in &self.params {
            let value = route_params
                .get(&spec.name)
                .or(spec.default.as_ref())
                .ok_or_else(|| ConfigError::MissingParameter {
                    name: spec.name.clone(),
                })?;
            bound.insert(spec.name.clone(), value.clone());
        }
        Ok(BoundParams(bound))
    }

    /// Bind the parameters and build the options
    pub fn config(&self, route_params: &HashMap<String, String>) -> Result<EndpointConfig, ApiError> {
        let params = self.bind(route_params)?;
        (self.build)(&params)
    }
}

impl fmt::Debug for EndpointFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointFactory")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// How an endpoint obtains its options
#[derive(Debug, Clone)]
pub enum EndpointDefinition {
    Static(EndpointConfig),
    Factory(Arc<EndpointFactory>),
}

impl EndpointDefinition {
    pub fn config(&self, route_params: &HashMap<String, String>) -> Result<EndpointConfig, ApiError> {
        match self {
            EndpointDefinition::Static(config) => Ok(config.clone()),
            EndpointDefinition::Factory(factory) => factory.config(route_params),
        }
    }
}

impl From<EndpointConfig> for EndpointDefinition {
    fn from(config: EndpointConfig) -> Self {
        EndpointDefinition::Static(config)
    }
}

impl From<EndpointFactory> for EndpointDefinition {
    fn from(factory: EndpointFactory) -> Self {
        EndpointDefinition::Factory(Arc::new(factory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> EndpointFactory {
        EndpointFactory::new(|params| {
            Ok(EndpointConfig::for_element_type("entry")
                .with_criterion("slug", params.require("slug")?)
                .with_criterion("section", params.require("section")?)
                .with_one(true))
        })
        .param(ParamSpec::required("slug"))
        .param(ParamSpec::optional("section", "news"))
    }

    #[test]
    fn test_binding_uses_route_params_then_defaults() {
        let route: HashMap<String, String> = [("slug".to_string(), "hello".to_string())].into();
        let config = factory().config(&route).unwrap();

        let criteria = config.criteria.unwrap();
        assert_eq!(criteria["slug"], "hello");
        assert_eq!(criteria["section"], "news");
    }

    #[test]
    fn test_missing_required_param() {
        let err = factory().config(&HashMap::new()).unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_MISSING_PARAMETER");
        assert_eq!(err.status_code().as_u16(), 500);
    }

    #[test]
    fn test_undeclared_param_is_not_bound() {
        let route: HashMap<String, String> = [
            ("slug".to_string(), "a".to_string()),
            ("extra".to_string(), "b".to_string()),
        ]
        .into();
        let bound = factory().bind(&route).unwrap();
        assert_eq!(bound.get("extra"), None);
        assert!(bound.require("extra").is_err());
    }

    #[test]
    fn test_static_definition_ignores_route() {
        let definition = EndpointDefinition::from(EndpointConfig::for_element_type("entry"));
        let config = definition.config(&HashMap::new()).unwrap();
        assert_eq!(config.element_type.as_deref(), Some("entry"));
    }
}
