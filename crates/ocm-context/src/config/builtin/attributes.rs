//! Attribute settings carried in configuration documents

use crate::config::{
    Config, ConfigContext, ConfigTarget, ConfigType, ConfigTypeRegistration, TypedConfigType,
};
use crate::context::{AttributesContext, Context};
use crate::error::{Error, ErrorList, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const ATTRIBUTES_CONFIG_TYPE: &str = "attributes.config.ocm.software";
pub const ATTRIBUTES_CONFIG_TYPE_V1: &str = "attributes.config.ocm.software/v1";

const USAGE: &str = r#"
The config type attributes.config.ocm.software can be used to define a list
of arbitrary attribute specifications:

    type: attributes.config.ocm.software/v1
    attributes:
      <name>: <yaml defining the attribute>
      ...

Attribute names may be given by their short alias.
"#;

/// Attribute values by name or alias, in their wire form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributesConfig {
    #[serde(rename = "type")]
    config_type: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl AttributesConfig {
    pub fn new() -> Self {
        Self {
            config_type: ATTRIBUTES_CONFIG_TYPE_V1.to_string(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn add_attribute(&mut self, name: &str, value: impl Serialize) -> Result<()> {
        self.attributes
            .insert(name.to_string(), serde_json::to_value(value)?);
        Ok(())
    }
}

impl Default for AttributesConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for AttributesConfig {
    fn config_type(&self) -> &str {
        &self.config_type
    }

    fn apply_to(&self, _ctx: &ConfigContext, target: &dyn ConfigTarget) -> Result<()> {
        let Some(target) = target.as_any().downcast_ref::<AttributesContext>() else {
            return Err(Error::no_context(&self.config_type));
        };
        let mut errors = ErrorList::new("applying attributes");
        for (name, value) in &self.attributes {
            let data = serde_json::to_vec(value)?;
            errors.add(target.attributes().set_encoded(name, &data));
        }
        errors.into_result()
    }

    fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn attributes_config_type() -> Arc<dyn ConfigType> {
    Arc::new(TypedConfigType::<AttributesConfig>::new(ATTRIBUTES_CONFIG_TYPE).with_usage(USAGE))
}

fn attributes_config_type_v1() -> Arc<dyn ConfigType> {
    Arc::new(TypedConfigType::<AttributesConfig>::new(ATTRIBUTES_CONFIG_TYPE_V1).with_usage(USAGE))
}

inventory::submit! { ConfigTypeRegistration(attributes_config_type) }
inventory::submit! { ConfigTypeRegistration(attributes_config_type_v1) }
