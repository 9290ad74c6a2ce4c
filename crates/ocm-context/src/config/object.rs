//! Configuration objects and targets

use super::context::ConfigContext;
use super::scheme::ConfigTypeScheme;
use crate::context::{Context, LoggingContext, View};
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A decoded configuration document of a registered type
pub trait Config: Send + Sync + 'static {
    /// The type discriminator the document was decoded from
    fn config_type(&self) -> &str;

    /// Optional name used for lookups by name
    fn name(&self) -> Option<&str> {
        None
    }

    /// Apply the configuration to one target.
    ///
    /// Targets the configuration does not handle are answered with
    /// [`Error::NoContext`].
    fn apply_to(&self, ctx: &ConfigContext, target: &dyn ConfigTarget) -> Result<()>;

    /// Wire representation
    fn to_value(&self) -> Result<serde_json::Value>;

    fn as_any(&self) -> &dyn Any;
}

/// Something a configuration can be applied to
pub trait ConfigTarget: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Species type of the target, if it is a context
    fn target_type(&self) -> Option<&str> {
        None
    }

    /// Logging delegate of the target, if it has one
    fn logging_context(&self) -> Option<&LoggingContext> {
        None
    }
}

impl<C: Context> ConfigTarget for View<C> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn target_type(&self) -> Option<&str> {
        Some(self.base().context_type())
    }

    fn logging_context(&self) -> Option<&LoggingContext> {
        Some(self.base().delegates().logging())
    }
}

/// The fields every configuration document carries
#[derive(Debug, Deserialize)]
pub(crate) struct TypeProbe {
    #[serde(rename = "type")]
    pub config_type: String,
    #[serde(default, deserialize_with = "string_name")]
    pub name: Option<String>,
}

/// Only a string `name` identifies a document; other shapes belong to the
/// type's own schema
fn string_name<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(name) => Ok(Some(name)),
        _ => Ok(None),
    }
}

impl TypeProbe {
    pub(crate) fn probe(data: &[u8]) -> Result<Self> {
        let probe: TypeProbe = serde_yaml_ng::from_slice(data)
            .map_err(|e| Error::decode(format!("cannot determine config type: {}", e)))?;
        if probe.config_type.is_empty() {
            return Err(Error::decode("config type must not be empty"));
        }
        Ok(probe)
    }
}

/// A configuration document of a type unknown when it was decoded.
///
/// The original bytes are kept untouched, so the document can be stored,
/// passed on and re-encoded without loss, and resolved once its type is
/// registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericConfig {
    config_type: String,
    name: Option<String>,
    raw: Vec<u8>,
}

impl GenericConfig {
    /// Wrap a document, reading its type discriminator
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let probe = TypeProbe::probe(data)?;
        Ok(Self::from_probe(probe, data))
    }

    pub(crate) fn from_probe(probe: TypeProbe, data: &[u8]) -> Self {
        Self {
            config_type: probe.config_type,
            name: probe.name,
            raw: data.to_vec(),
        }
    }

    pub fn config_type(&self) -> &str {
        &self.config_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The original document bytes
    pub fn encode(&self) -> Vec<u8> {
        self.raw.clone()
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_yaml_ng::from_slice(&self.raw)?)
    }

    /// Decode with `scheme` if the type is known there by now
    pub fn resolve(&self, scheme: &ConfigTypeScheme) -> Result<Option<Arc<dyn Config>>> {
        match scheme.lookup(&self.config_type) {
            Some(typ) => typ.decode(&self.raw).map(Some),
            None => Ok(None),
        }
    }
}

/// A configuration document, decoded or preserved
#[derive(Clone)]
pub enum ConfigObject {
    Known(Arc<dyn Config>),
    Unknown(GenericConfig),
}

impl ConfigObject {
    pub fn new(config: impl Config) -> Self {
        Self::Known(Arc::new(config))
    }

    pub fn config_type(&self) -> &str {
        match self {
            Self::Known(config) => config.config_type(),
            Self::Unknown(generic) => generic.config_type(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Known(config) => config.name(),
            Self::Unknown(generic) => generic.name(),
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn generic(&self) -> Option<&GenericConfig> {
        match self {
            Self::Unknown(generic) => Some(generic),
            Self::Known(_) => None,
        }
    }

    /// The decoded configuration, if it is of type `T`
    pub fn downcast_ref<T: Config>(&self) -> Option<&T> {
        match self {
            Self::Known(config) => config.as_any().downcast_ref::<T>(),
            Self::Unknown(_) => None,
        }
    }

    /// Resolve a preserved document against `scheme`.
    ///
    /// Fails with [`Error::UnknownConfigKind`] if the type is still unknown,
    /// or with a decode error if the now registered type rejects it.
    pub fn evaluate(&self, scheme: &ConfigTypeScheme) -> Result<ConfigObject> {
        match self {
            Self::Known(_) => Ok(self.clone()),
            Self::Unknown(generic) => match generic.resolve(scheme)? {
                Some(config) => Ok(Self::Known(config)),
                None => Err(Error::unknown_config_kind(generic.config_type())),
            },
        }
    }

    /// Apply to a target, resolving preserved documents first
    pub fn apply_to(&self, ctx: &ConfigContext, target: &dyn ConfigTarget) -> Result<()> {
        match self {
            Self::Known(config) => config.apply_to(ctx, target),
            Self::Unknown(_) => match self.evaluate(ctx.config_types())? {
                Self::Known(config) => config.apply_to(ctx, target),
                Self::Unknown(generic) => Err(Error::unknown_config_kind(generic.config_type())),
            },
        }
    }

    pub fn to_value(&self) -> Result<serde_json::Value> {
        match self {
            Self::Known(config) => config.to_value(),
            Self::Unknown(generic) => generic.to_value(),
        }
    }

    /// Serialized form; preserved documents yield their original bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Self::Known(config) => Ok(serde_json::to_vec(&config.to_value()?)?),
            Self::Unknown(generic) => Ok(generic.encode()),
        }
    }
}

impl From<Arc<dyn Config>> for ConfigObject {
    fn from(config: Arc<dyn Config>) -> Self {
        Self::Known(config)
    }
}

impl From<GenericConfig> for ConfigObject {
    fn from(generic: GenericConfig) -> Self {
        Self::Unknown(generic)
    }
}

impl fmt::Debug for ConfigObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(config) => f
                .debug_struct("Known")
                .field("type", &config.config_type())
                .field("name", &config.name())
                .finish(),
            Self::Unknown(generic) => f.debug_tuple("Unknown").field(generic).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_config_keeps_bytes() {
        let data = b"type: future.config.ocm.software/v3\nname: later\nweird:   [1, 2]\n";
        let generic = GenericConfig::from_bytes(data).unwrap();
        assert_eq!(generic.config_type(), "future.config.ocm.software/v3");
        assert_eq!(generic.name(), Some("later"));
        assert_eq!(generic.encode(), data.to_vec());
        assert_eq!(generic.to_value().unwrap()["weird"][1], 2);
    }

    #[test]
    fn test_structured_name_is_not_an_identifier() {
        let data = b"type: future.config.ocm.software/v3\nname:\n  first: a\n  last: b\n";
        let generic = GenericConfig::from_bytes(data).unwrap();
        assert_eq!(generic.name(), None);
        assert_eq!(generic.encode(), data.to_vec());
        assert_eq!(generic.to_value().unwrap()["name"]["last"], "b");
    }

    #[test]
    fn test_missing_type_is_a_decode_error() {
        let err = GenericConfig::from_bytes(b"value: 1").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));

        let err = GenericConfig::from_bytes(b"not: [closed").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_unknown_object_stays_unknown_in_empty_scheme() {
        let object = ConfigObject::from(GenericConfig::from_bytes(b"{\"type\":\"x.config/v1\"}").unwrap());
        let err = object.evaluate(&ConfigTypeScheme::empty()).unwrap_err();
        assert!(err.is_unknown_config_kind());
        assert_eq!(object.encode().unwrap(), b"{\"type\":\"x.config/v1\"}".to_vec());
    }
}
