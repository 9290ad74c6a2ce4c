//! Attribute type registry
//!
//! Every attribute key used in an [`Attributes`](super::Attributes) store
//! must be registered with a type that knows how to validate, encode and
//! decode its values. Types may additionally be addressed by a short alias.

use crate::error::{Error, Result};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock};

/// A decoded attribute value
pub type AttributeValue = Arc<dyn Any + Send + Sync>;

/// Codec and validator for the values of one attribute key
pub trait AttributeType: Send + Sync {
    /// Canonical attribute name
    fn name(&self) -> &str;

    /// Optional short alias accepted wherever the name is
    fn short_name(&self) -> Option<&str> {
        None
    }

    /// Human-readable description
    fn description(&self) -> &str;

    /// Reject values of the wrong type
    fn check(&self, value: &AttributeValue) -> Result<()>;

    fn encode(&self, value: &AttributeValue) -> Result<Vec<u8>>;

    fn decode(&self, data: &[u8]) -> Result<AttributeValue>;
}

/// Attribute type for serde-serializable values.
///
/// Values are encoded as JSON and decoded from JSON or YAML.
pub struct TypedAttribute<T> {
    name: String,
    short_name: Option<String>,
    description: String,
    _value: PhantomData<fn() -> T>,
}

impl<T> TypedAttribute<T> {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_name: None,
            description: description.into(),
            _value: PhantomData,
        }
    }

    /// Set the short alias
    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }
}

impl<T> AttributeType for TypedAttribute<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn short_name(&self) -> Option<&str> {
        self.short_name.as_deref()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn check(&self, value: &AttributeValue) -> Result<()> {
        if value.is::<T>() {
            Ok(())
        } else {
            Err(Error::invalid_attribute(
                &self.name,
                format!("expected a value of type {}", std::any::type_name::<T>()),
            ))
        }
    }

    fn encode(&self, value: &AttributeValue) -> Result<Vec<u8>> {
        let typed = value.downcast_ref::<T>().ok_or_else(|| {
            Error::invalid_attribute(
                &self.name,
                format!("expected a value of type {}", std::any::type_name::<T>()),
            )
        })?;
        Ok(serde_json::to_vec(typed)?)
    }

    fn decode(&self, data: &[u8]) -> Result<AttributeValue> {
        let value: T = serde_yaml_ng::from_slice(data).map_err(|e| {
            Error::invalid_attribute(&self.name, format!("cannot decode value: {}", e))
        })?;
        Ok(Arc::new(value))
    }
}

/// Attribute type for in-process values without a wire representation
pub struct OpaqueAttribute<T> {
    name: String,
    description: String,
    _value: PhantomData<fn() -> T>,
}

impl<T> OpaqueAttribute<T> {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            _value: PhantomData,
        }
    }
}

impl<T: Send + Sync + 'static> AttributeType for OpaqueAttribute<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn check(&self, value: &AttributeValue) -> Result<()> {
        if value.is::<T>() {
            Ok(())
        } else {
            Err(Error::invalid_attribute(
                &self.name,
                format!("expected a value of type {}", std::any::type_name::<T>()),
            ))
        }
    }

    fn encode(&self, _value: &AttributeValue) -> Result<Vec<u8>> {
        Err(Error::invalid_attribute(&self.name, "value is not encodable"))
    }

    fn decode(&self, _data: &[u8]) -> Result<AttributeValue> {
        Err(Error::invalid_attribute(&self.name, "value cannot be set from data"))
    }
}

/// Start-up registration of an attribute type
pub struct AttributeTypeRegistration(pub fn() -> Arc<dyn AttributeType>);
inventory::collect!(AttributeTypeRegistration);

/// Registry of attribute types
#[derive(Default)]
pub struct AttributeScheme {
    types: RwLock<HashMap<String, Arc<dyn AttributeType>>>,
    shortcuts: RwLock<HashMap<String, String>>,
}

impl AttributeScheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type.
    ///
    /// Registering a name that is already known keeps the existing type and
    /// returns it.
    pub fn register(&self, typ: impl AttributeType + 'static) -> Arc<dyn AttributeType> {
        self.register_arc(Arc::new(typ))
    }

    pub fn register_arc(&self, typ: Arc<dyn AttributeType>) -> Arc<dyn AttributeType> {
        let registered = {
            let mut types = self.types.write();
            Arc::clone(
                types
                    .entry(typ.name().to_string())
                    .or_insert_with(|| Arc::clone(&typ)),
            )
        };
        if let Some(short) = registered.short_name() {
            self.shortcuts
                .write()
                .insert(short.to_string(), registered.name().to_string());
        }
        registered
    }

    /// Map a short alias to its canonical name; other names map to themselves
    pub fn resolve_name(&self, name: &str) -> String {
        self.shortcuts
            .read()
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Look up a type by name or alias
    pub fn get(&self, name: &str) -> Option<Arc<dyn AttributeType>> {
        let name = self.resolve_name(name);
        self.types.read().get(&name).cloned()
    }

    pub fn encode(&self, name: &str, value: &AttributeValue) -> Result<Vec<u8>> {
        let typ = self
            .get(name)
            .ok_or_else(|| Error::unknown_attribute_type(name))?;
        typ.encode(value)
    }

    pub fn decode(&self, name: &str, data: &[u8]) -> Result<AttributeValue> {
        let typ = self
            .get(name)
            .ok_or_else(|| Error::unknown_attribute_type(name))?;
        typ.decode(data)
    }

    /// All registered types, sorted by name
    pub fn types(&self) -> Vec<Arc<dyn AttributeType>> {
        let mut types: Vec<_> = self.types.read().values().cloned().collect();
        types.sort_by(|a, b| a.name().cmp(b.name()));
        types
    }
}

static DEFAULT_SCHEME: LazyLock<AttributeScheme> = LazyLock::new(|| {
    let scheme = AttributeScheme::new();
    for registration in inventory::iter::<AttributeTypeRegistration> {
        scheme.register_arc((registration.0)());
    }
    scheme
});

/// The process-wide attribute type registry
pub fn default_scheme() -> &'static AttributeScheme {
    &DEFAULT_SCHEME
}

/// Register an attribute type with the process-wide registry
pub fn register_attribute_type(typ: impl AttributeType + 'static) -> Arc<dyn AttributeType> {
    default_scheme().register(typ)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_attribute_roundtrip() {
        let typ = TypedAttribute::<u32>::new("test.ocm.software/workers", "worker count");
        let value: AttributeValue = Arc::new(8u32);

        let data = typ.encode(&value).unwrap();
        let decoded = typ.decode(&data).unwrap();
        assert_eq!(decoded.downcast_ref::<u32>(), Some(&8));
    }

    #[test]
    fn test_typed_attribute_rejects_wrong_type() {
        let typ = TypedAttribute::<u32>::new("test.ocm.software/workers", "worker count");
        let value: AttributeValue = Arc::new("eight".to_string());
        assert!(matches!(
            typ.check(&value),
            Err(Error::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_registration_is_idempotent() {
        let scheme = AttributeScheme::new();
        scheme.register(TypedAttribute::<bool>::new("test.ocm.software/flag", "first"));
        let second =
            scheme.register(TypedAttribute::<String>::new("test.ocm.software/flag", "second"));

        assert_eq!(second.description(), "first");
        assert_eq!(scheme.types().len(), 1);
    }

    #[test]
    fn test_short_names() {
        let scheme = AttributeScheme::new();
        scheme.register(
            TypedAttribute::<bool>::new("test.ocm.software/keep-layers", "keep layers")
                .with_short_name("keeplayers"),
        );

        assert_eq!(
            scheme.resolve_name("keeplayers"),
            "test.ocm.software/keep-layers"
        );
        assert!(scheme.get("keeplayers").is_some());
        assert_eq!(scheme.resolve_name("other"), "other");
    }

    #[test]
    fn test_opaque_attribute_is_not_encodable() {
        let typ = OpaqueAttribute::<std::sync::Mutex<u8>>::new("test.ocm.software/lock", "lock");
        let value: AttributeValue = Arc::new(std::sync::Mutex::new(1u8));
        assert!(typ.check(&value).is_ok());
        assert!(typ.encode(&value).is_err());
        assert!(typ.decode(b"1").is_err());
    }
}
