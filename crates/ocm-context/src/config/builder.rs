//! Construction of configuration contexts

use super::context::ConfigContext;
use super::scheme::{default_scheme, ConfigTypeScheme};
use crate::context::{self, AttributesContext, Context, Delegates};
use std::sync::{Arc, LazyLock};

/// How much process-wide state a new context shares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuilderMode {
    /// Process-wide attributes and type registry
    Shared,
    /// Own attributes, process-wide type registry
    #[default]
    Defaulted,
    /// Own attributes, copy of the currently known types
    Configured,
    /// Own attributes, own registry falling back to the process-wide one
    Extended,
    /// Own attributes, empty registry
    Initial,
}

/// Builder for [`ConfigContext`]s
#[derive(Default)]
pub struct ConfigBuilder {
    shared: Option<AttributesContext>,
    types: Option<Arc<ConfigTypeScheme>>,
    delegates: Option<Delegates>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given shared attributes instead of the mode's choice
    pub fn with_shared_attributes(mut self, shared: AttributesContext) -> Self {
        self.shared = Some(shared);
        self
    }

    /// Use the given type registry instead of the mode's choice
    pub fn with_config_types(mut self, types: Arc<ConfigTypeScheme>) -> Self {
        self.types = Some(types);
        self
    }

    pub fn with_delegates(mut self, delegates: Delegates) -> Self {
        self.delegates = Some(delegates);
        self
    }

    pub fn build(self, mode: BuilderMode) -> ConfigContext {
        let shared = self.shared.unwrap_or_else(|| match mode {
            BuilderMode::Shared => context::default_context(),
            _ => AttributesContext::new(None),
        });
        let types = self.types.unwrap_or_else(|| match mode {
            BuilderMode::Shared | BuilderMode::Defaulted => default_scheme(),
            BuilderMode::Configured => Arc::new(default_scheme().snapshot()),
            BuilderMode::Extended => Arc::new(ConfigTypeScheme::extend(default_scheme())),
            BuilderMode::Initial => Arc::new(ConfigTypeScheme::empty()),
        });
        let delegates = self
            .delegates
            .unwrap_or_else(|| Delegates::derive(shared.base().delegates()));

        ConfigContext::create(shared, types, delegates)
    }
}

static DEFAULT_CONTEXT: LazyLock<ConfigContext> =
    LazyLock::new(|| ConfigBuilder::new().build(BuilderMode::Shared));

/// The process-wide configuration context
pub fn default_context() -> ConfigContext {
    DEFAULT_CONTEXT.clone()
}
