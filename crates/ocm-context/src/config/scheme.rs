//! Configuration type registry
//!
//! Maps type discriminators (`kind/version`) to decoders. Documents of
//! unregistered types decode to [`GenericConfig`] instead of failing.

use super::object::{Config, ConfigObject, GenericConfig, TypeProbe};
use crate::error::Result;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock};

/// Decoder for one configuration type
pub trait ConfigType: Send + Sync {
    /// Type discriminator, `kind` or `kind/version`
    fn name(&self) -> &str;

    /// Human-readable description of the document format
    fn usage(&self) -> Option<&str> {
        None
    }

    fn decode(&self, data: &[u8]) -> Result<Arc<dyn Config>>;
}

/// Configuration type backed by a serde-deserializable [`Config`]
pub struct TypedConfigType<T> {
    name: String,
    usage: Option<String>,
    _config: PhantomData<fn() -> T>,
}

impl<T> TypedConfigType<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage: None,
            _config: PhantomData,
        }
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }
}

impl<T: Config + DeserializeOwned> ConfigType for TypedConfigType<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    fn decode(&self, data: &[u8]) -> Result<Arc<dyn Config>> {
        let config: T = serde_yaml_ng::from_slice(data)?;
        Ok(Arc::new(config))
    }
}

/// Start-up registration of a configuration type
pub struct ConfigTypeRegistration(pub fn() -> Arc<dyn ConfigType>);
inventory::collect!(ConfigTypeRegistration);

/// Split a type discriminator into kind and optional version
pub fn split_type(config_type: &str) -> (&str, Option<&str>) {
    match config_type.rsplit_once('/') {
        Some((kind, version)) => (kind, Some(version)),
        None => (config_type, None),
    }
}

/// Registry of configuration types, optionally chained to a base registry
#[derive(Default)]
pub struct ConfigTypeScheme {
    types: RwLock<BTreeMap<String, Arc<dyn ConfigType>>>,
    base: Option<Arc<ConfigTypeScheme>>,
}

impl ConfigTypeScheme {
    /// A registry without any types
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry falling back to `base` for types it does not know
    pub fn extend(base: Arc<ConfigTypeScheme>) -> Self {
        Self {
            types: RwLock::new(BTreeMap::new()),
            base: Some(base),
        }
    }

    /// An independent copy of the currently known types
    pub fn snapshot(&self) -> Self {
        let scheme = Self::empty();
        for typ in self.all_types() {
            scheme.register_arc(typ);
        }
        scheme
    }

    /// Register a type under its own name.
    ///
    /// A versionless name acts as the default for every version of its kind
    /// that has no registration of its own.
    pub fn register(&self, typ: impl ConfigType + 'static) {
        self.register_arc(Arc::new(typ));
    }

    pub fn register_arc(&self, typ: Arc<dyn ConfigType>) {
        self.types.write().insert(typ.name().to_string(), typ);
    }

    fn find(&self, name: &str) -> Option<Arc<dyn ConfigType>> {
        if let Some(typ) = self.types.read().get(name) {
            return Some(Arc::clone(typ));
        }
        self.base.as_ref().and_then(|base| base.find(name))
    }

    /// Find the decoder for a type: exact match anywhere in the chain, then
    /// the default registered for its kind
    pub fn lookup(&self, config_type: &str) -> Option<Arc<dyn ConfigType>> {
        if let Some(typ) = self.find(config_type) {
            return Some(typ);
        }
        match split_type(config_type) {
            (kind, Some(_)) => self.find(kind),
            (_, None) => None,
        }
    }

    pub fn is_known(&self, config_type: &str) -> bool {
        self.lookup(config_type).is_some()
    }

    /// Decode a document.
    ///
    /// Only the type discriminator is read first. Documents of unknown type
    /// come back as [`ConfigObject::Unknown`] with their bytes preserved.
    pub fn decode(&self, data: &[u8]) -> Result<ConfigObject> {
        let probe = TypeProbe::probe(data)?;
        match self.lookup(&probe.config_type) {
            Some(typ) => Ok(ConfigObject::Known(typ.decode(data)?)),
            None => Ok(ConfigObject::Unknown(GenericConfig::from_probe(probe, data))),
        }
    }

    /// Decode a document that is already parsed, e.g. nested in another one
    pub fn decode_value(&self, value: &serde_json::Value) -> Result<ConfigObject> {
        let data = serde_json::to_vec(value)?;
        self.decode(&data)
    }

    /// Names of all known types, including the base registry's
    pub fn known_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        if let Some(base) = &self.base {
            names.extend(base.known_types());
        }
        names.sort();
        names.dedup();
        names
    }

    fn all_types(&self) -> Vec<Arc<dyn ConfigType>> {
        let mut types: Vec<_> = match &self.base {
            Some(base) => base.all_types(),
            None => Vec::new(),
        };
        types.extend(self.types.read().values().cloned());
        types
    }

    /// Listing of the registered types and their usage
    pub fn usage(&self) -> String {
        let mut out = String::new();
        let mut seen = std::collections::BTreeSet::new();
        let mut types = self.all_types();
        types.sort_by(|a, b| a.name().cmp(b.name()));
        for typ in types {
            if !seen.insert(typ.name().to_string()) {
                continue;
            }
            let _ = writeln!(out, "- {}", typ.name());
            if let Some(usage) = typ.usage() {
                for line in usage.trim().lines() {
                    let _ = writeln!(out, "    {}", line);
                }
            }
        }
        out
    }
}

static DEFAULT_SCHEME: LazyLock<Arc<ConfigTypeScheme>> = LazyLock::new(|| {
    let scheme = ConfigTypeScheme::empty();
    for registration in inventory::iter::<ConfigTypeRegistration> {
        scheme.register_arc((registration.0)());
    }
    Arc::new(scheme)
});

/// The process-wide configuration type registry
pub fn default_scheme() -> Arc<ConfigTypeScheme> {
    Arc::clone(&DEFAULT_SCHEME)
}

/// Register a configuration type with the process-wide registry
pub fn register_config_type(typ: impl ConfigType + 'static) {
    DEFAULT_SCHEME.register(typ);
}
