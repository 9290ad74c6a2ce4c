//! Log level settings carried in configuration documents

use crate::config::{
    Config, ConfigContext, ConfigTarget, ConfigType, ConfigTypeRegistration, TypedConfigType,
};
use crate::context::LogLevel;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;

pub const LOGGING_CONFIG_TYPE: &str = "logging.config.ocm.software";
pub const LOGGING_CONFIG_TYPE_V1: &str = "logging.config.ocm.software/v1";

const USAGE: &str = r#"
The config type logging.config.ocm.software sets the log level of the
logging delegate of contexts:

    type: logging.config.ocm.software/v1
    contextType: <optional context type, all contexts if omitted>
    level: error|warn|info|debug|trace
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(rename = "type")]
    config_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_type: Option<String>,
    pub level: LogLevel,
}

impl LoggingConfig {
    pub fn new(level: LogLevel) -> Self {
        Self {
            config_type: LOGGING_CONFIG_TYPE_V1.to_string(),
            context_type: None,
            level,
        }
    }

    /// Restrict to contexts of one species
    pub fn for_context_type(mut self, context_type: impl Into<String>) -> Self {
        self.context_type = Some(context_type.into());
        self
    }
}

impl Config for LoggingConfig {
    fn config_type(&self) -> &str {
        &self.config_type
    }

    fn apply_to(&self, _ctx: &ConfigContext, target: &dyn ConfigTarget) -> Result<()> {
        let Some(logging) = target.logging_context() else {
            return Err(Error::no_context(&self.config_type));
        };
        if let Some(wanted) = &self.context_type {
            if target.target_type() != Some(wanted.as_str()) {
                return Err(Error::no_context(&self.config_type));
            }
        }
        logging.set_level(Some(self.level));
        Ok(())
    }

    fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn logging_config_type() -> Arc<dyn ConfigType> {
    Arc::new(TypedConfigType::<LoggingConfig>::new(LOGGING_CONFIG_TYPE).with_usage(USAGE))
}

fn logging_config_type_v1() -> Arc<dyn ConfigType> {
    Arc::new(TypedConfigType::<LoggingConfig>::new(LOGGING_CONFIG_TYPE_V1).with_usage(USAGE))
}

inventory::submit! { ConfigTypeRegistration(logging_config_type) }
inventory::submit! { ConfigTypeRegistration(logging_config_type_v1) }
