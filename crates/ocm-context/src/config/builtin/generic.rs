//! Bundles of configuration documents

use crate::config::{
    Config, ConfigContext, ConfigObject, ConfigSet, ConfigTarget, ConfigType,
    ConfigTypeRegistration, TypedConfigType,
};
use crate::error::{Error, ErrorList, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const GENERIC_CONFIG_TYPE: &str = "generic.config.ocm.software";
pub const GENERIC_CONFIG_TYPE_V1: &str = "generic.config.ocm.software/v1";

const USAGE: &str = r#"
The config type generic.config.ocm.software can be used to define a list
of arbitrary configuration specifications and named configuration sets:

    type: generic.config.ocm.software/v1
    configurations:
      - type: <any config type>
        ...
    sets:
      standard:
        description: my selectable standard config
        configurations:
          - ...

Configurations are applied directly. Sets are only made available and can
be applied later by name.
"#;

/// Nested configurations of a named set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigSetSpec {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub configurations: Vec<serde_json::Value>,
}

/// A document carrying other configuration documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigBundle {
    #[serde(rename = "type")]
    config_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configurations: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sets: BTreeMap<String, ConfigSetSpec>,
}

impl ConfigBundle {
    pub fn new() -> Self {
        Self {
            config_type: GENERIC_CONFIG_TYPE_V1.to_string(),
            configurations: Vec::new(),
            sets: BTreeMap::new(),
        }
    }

    pub fn add_config(&mut self, config: &ConfigObject) -> Result<()> {
        self.configurations.push(config.to_value()?);
        Ok(())
    }

    pub fn add_set_config(
        &mut self,
        set: &str,
        description: &str,
        config: &ConfigObject,
    ) -> Result<()> {
        let spec = self.sets.entry(set.to_string()).or_default();
        if !description.is_empty() {
            spec.description = description.to_string();
        }
        spec.configurations.push(config.to_value()?);
        Ok(())
    }
}

impl Default for ConfigBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for ConfigBundle {
    fn config_type(&self) -> &str {
        &self.config_type
    }

    fn apply_to(&self, ctx: &ConfigContext, target: &dyn ConfigTarget) -> Result<()> {
        let Some(target) = target.as_any().downcast_ref::<ConfigContext>() else {
            return Err(Error::no_context(&self.config_type));
        };
        let types = target.config_types();
        let mut errors = ErrorList::new("applying generic config");

        for (name, spec) in &self.sets {
            let mut set = ConfigSet::new(&spec.description);
            for value in &spec.configurations {
                match types.decode_value(value) {
                    Ok(config) => set.add(config),
                    Err(err) => {
                        errors.push(Error::apply(format!("config set {}", name), err));
                    }
                }
            }
            target.add_config_set(name, set);
        }

        let description = match ctx.info() {
            Some(info) => format!("{}--generic config", info),
            None => "generic config".to_string(),
        };
        for value in &self.configurations {
            match types.decode_value(value) {
                Ok(config) => errors.add(target.apply_config(config, &description)),
                Err(err) => errors.push(err),
            }
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

fn generic_config_type() -> Arc<dyn ConfigType> {
    Arc::new(TypedConfigType::<ConfigBundle>::new(GENERIC_CONFIG_TYPE).with_usage(USAGE))
}

fn generic_config_type_v1() -> Arc<dyn ConfigType> {
    Arc::new(TypedConfigType::<ConfigBundle>::new(GENERIC_CONFIG_TYPE_V1).with_usage(USAGE))
}

inventory::submit! { ConfigTypeRegistration(generic_config_type) }
inventory::submit! { ConfigTypeRegistration(generic_config_type_v1) }
