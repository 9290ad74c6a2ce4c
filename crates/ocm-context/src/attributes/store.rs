//! Hierarchical attribute storage

use super::scheme::{default_scheme, AttributeScheme, AttributeValue};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Callback run before every attribute read, used to bring the owning
/// context up to date with its configuration source
pub trait UpdateHook: Send + Sync {
    fn run(&self);

    /// A detached hook has lost its source and will never update again
    fn is_detached(&self) -> bool {
        false
    }
}

struct Inner {
    values: RwLock<HashMap<String, AttributeValue>>,
    parent: Option<Weak<Inner>>,
    hook: RwLock<Option<Arc<dyn UpdateHook>>>,
}

/// Attribute store of one context.
///
/// Reads that miss locally fall through to the parent store, if it is still
/// alive. Writes always land locally. Cloning yields another handle to the
/// same store.
#[derive(Clone)]
pub struct Attributes {
    inner: Arc<Inner>,
}

impl Attributes {
    /// Create a store, optionally delegating reads to `parent`.
    ///
    /// The parent link does not keep the parent alive.
    pub fn new(parent: Option<&Attributes>) -> Self {
        Self {
            inner: Arc::new(Inner {
                values: RwLock::new(HashMap::new()),
                parent: parent.map(|p| Arc::downgrade(&p.inner)),
                hook: RwLock::new(None),
            }),
        }
    }

    fn scheme(&self) -> &'static AttributeScheme {
        default_scheme()
    }

    fn parent(&self) -> Option<Attributes> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Attributes { inner })
    }

    /// Install the read hook, replacing any previous one
    pub fn set_update_hook(&self, hook: Arc<dyn UpdateHook>) {
        *self.inner.hook.write() = Some(hook);
    }

    /// Install the read hook unless a live one is already installed.
    ///
    /// Returns whether `hook` was installed.
    pub fn assure_update_hook(&self, hook: Arc<dyn UpdateHook>) -> bool {
        let mut current = self.inner.hook.write();
        match current.as_ref() {
            Some(existing) if !existing.is_detached() => false,
            _ => {
                *current = Some(hook);
                true
            }
        }
    }

    pub fn has_update_hook(&self) -> bool {
        self.inner.hook.read().is_some()
    }

    /// Run the update hook, if any
    pub fn update(&self) {
        let hook = self.inner.hook.read().clone();
        if let Some(hook) = hook {
            hook.run();
        }
    }

    /// Look up a value without running the update hook
    pub fn lookup(&self, name: &str) -> Option<AttributeValue> {
        let name = self.scheme().resolve_name(name);
        if let Some(value) = self.inner.values.read().get(&name) {
            return Some(Arc::clone(value));
        }
        self.parent().and_then(|parent| parent.lookup(&name))
    }

    /// Get a raw value, falling back to the parent store
    pub fn get_raw(&self, name: &str) -> Option<AttributeValue> {
        self.update();
        let name = self.scheme().resolve_name(name);
        if let Some(value) = self.inner.values.read().get(&name) {
            return Some(Arc::clone(value));
        }
        self.parent().and_then(|parent| parent.get_raw(&name))
    }

    /// Get a typed value; `None` if unset or of another type
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get_raw(name)
            .and_then(|value| Arc::downcast::<T>(value).ok())
    }

    /// Set a value for a registered attribute
    pub fn set<T: Any + Send + Sync>(&self, name: &str, value: T) -> Result<()> {
        self.set_raw(name, Arc::new(value))
    }

    pub fn set_raw(&self, name: &str, value: AttributeValue) -> Result<()> {
        let typ = self
            .scheme()
            .get(name)
            .ok_or_else(|| Error::unknown_attribute_type(name))?;
        typ.check(&value)?;
        let replaced = self
            .inner
            .values
            .write()
            .insert(typ.name().to_string(), value);
        // old values may run arbitrary drop logic, so they go away unlocked
        drop(replaced);
        Ok(())
    }

    /// Decode and set a value given in its wire form
    pub fn set_encoded(&self, name: &str, data: &[u8]) -> Result<()> {
        let typ = self
            .scheme()
            .get(name)
            .ok_or_else(|| Error::unknown_attribute_type(name))?;
        let value = typ.decode(data)?;
        self.set_raw(typ.name(), value)
    }

    /// Get a value or atomically create it locally.
    ///
    /// The factory runs without holding the store lock. If another caller
    /// stored a value in the meantime, that value wins.
    pub fn get_or_create<T, F>(&self, name: &str, factory: F) -> Result<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let typ = self
            .scheme()
            .get(name)
            .ok_or_else(|| Error::unknown_attribute_type(name))?;
        let name = typ.name().to_string();
        let mismatch = || {
            Error::invalid_attribute(
                &name,
                format!("stored value is not of type {}", std::any::type_name::<T>()),
            )
        };

        if let Some(existing) = self.get_raw(&name) {
            return Arc::downcast::<T>(existing).map_err(|_| mismatch());
        }

        let created: AttributeValue = Arc::new(factory());
        typ.check(&created)?;
        let stored = Arc::clone(
            self.inner
                .values
                .write()
                .entry(name.clone())
                .or_insert(created),
        );
        Arc::downcast::<T>(stored).map_err(|_| mismatch())
    }

    /// Remove a local value
    pub fn remove(&self, name: &str) -> Option<AttributeValue> {
        let name = self.scheme().resolve_name(name);
        self.inner.values.write().remove(&name)
    }

    /// Encode a value using its registered type
    pub fn encode(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match self.get_raw(name) {
            Some(value) => self.scheme().encode(name, &value).map(Some),
            None => Ok(None),
        }
    }

    /// Names of the locally set attributes, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.inner.values.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Drop all local values
    pub fn clear(&self) {
        let values = std::mem::take(&mut *self.inner.values.write());
        drop(values);
    }

    /// Whether both handles refer to the same store
    pub fn ptr_eq(&self, other: &Attributes) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attributes")
            .field("keys", &self.keys())
            .field("has_parent", &self.inner.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::scheme::{register_attribute_type, TypedAttribute};
    use std::sync::atomic::{AtomicU32, Ordering};

    const WORKERS: &str = "test.ocm.software/store/workers";
    const LABEL: &str = "test.ocm.software/store/label";

    fn register() {
        register_attribute_type(
            TypedAttribute::<u32>::new(WORKERS, "worker count").with_short_name("store-workers"),
        );
        register_attribute_type(TypedAttribute::<String>::new(LABEL, "label"));
    }

    #[test]
    fn test_set_and_get() {
        register();
        let attrs = Attributes::new(None);
        attrs.set(WORKERS, 4u32).unwrap();
        assert_eq!(attrs.get::<u32>(WORKERS).as_deref(), Some(&4));
        assert_eq!(attrs.get::<u32>("store-workers").as_deref(), Some(&4));
        assert!(attrs.get::<String>(WORKERS).is_none());
    }

    #[test]
    fn test_unregistered_key_is_rejected() {
        let attrs = Attributes::new(None);
        let err = attrs.set("test.ocm.software/store/unknown", 1u8).unwrap_err();
        assert!(matches!(err, Error::UnknownAttributeType { .. }));
    }

    #[test]
    fn test_wrong_value_type_is_rejected() {
        register();
        let attrs = Attributes::new(None);
        let err = attrs.set(WORKERS, "four".to_string()).unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { .. }));
    }

    #[test]
    fn test_reads_fall_through_to_parent_without_copy() {
        register();
        let parent = Attributes::new(None);
        let child = Attributes::new(Some(&parent));

        parent.set(LABEL, "shared".to_string()).unwrap();
        assert_eq!(child.get::<String>(LABEL).as_deref().map(String::as_str), Some("shared"));
        assert!(child.keys().is_empty());

        child.set(LABEL, "local".to_string()).unwrap();
        assert_eq!(child.get::<String>(LABEL).as_deref().map(String::as_str), Some("local"));
        assert_eq!(parent.get::<String>(LABEL).as_deref().map(String::as_str), Some("shared"));
    }

    #[test]
    fn test_parent_link_is_not_owning() {
        register();
        let parent = Attributes::new(None);
        parent.set(LABEL, "gone".to_string()).unwrap();
        let child = Attributes::new(Some(&parent));
        drop(parent);
        assert!(child.get::<String>(LABEL).is_none());
    }

    #[test]
    fn test_set_encoded_with_alias() {
        register();
        let attrs = Attributes::new(None);
        attrs.set_encoded("store-workers", b"12").unwrap();
        assert_eq!(attrs.get::<u32>(WORKERS).as_deref(), Some(&12));
        assert_eq!(attrs.encode(WORKERS).unwrap(), Some(b"12".to_vec()));
    }

    #[test]
    fn test_get_or_create_runs_factory_once() {
        register();
        let attrs = Attributes::new(None);
        let calls = AtomicU32::new(0);

        let first = attrs
            .get_or_create(WORKERS, || {
                calls.fetch_add(1, Ordering::SeqCst);
                2u32
            })
            .unwrap();
        let second = attrs
            .get_or_create(WORKERS, || {
                calls.fetch_add(1, Ordering::SeqCst);
                3u32
            })
            .unwrap();

        assert_eq!(*first, 2);
        assert_eq!(*second, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_factory_may_reenter_the_store() {
        register();
        let attrs = Attributes::new(None);
        let label = attrs
            .get_or_create(LABEL, || {
                attrs.set(WORKERS, 1u32).unwrap();
                format!("workers={}", attrs.get::<u32>(WORKERS).map_or(0, |w| *w))
            })
            .unwrap();
        assert_eq!(label.as_str(), "workers=1");
    }

    #[test]
    fn test_hook_runs_before_reads() {
        struct Counting(AtomicU32);
        impl UpdateHook for Counting {
            fn run(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        register();
        let attrs = Attributes::new(None);
        let hook = Arc::new(Counting(AtomicU32::new(0)));
        attrs.set_update_hook(hook.clone());

        attrs.get_raw(LABEL);
        attrs.get::<u32>(WORKERS);
        assert_eq!(hook.0.load(Ordering::SeqCst), 2);

        attrs.lookup(LABEL);
        assert_eq!(hook.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_assure_hook_keeps_live_hook() {
        struct Fixed(bool);
        impl UpdateHook for Fixed {
            fn run(&self) {}
            fn is_detached(&self) -> bool {
                self.0
            }
        }

        let attrs = Attributes::new(None);
        assert!(attrs.assure_update_hook(Arc::new(Fixed(false))));
        assert!(!attrs.assure_update_hook(Arc::new(Fixed(false))));

        attrs.set_update_hook(Arc::new(Fixed(true)));
        assert!(attrs.assure_update_hook(Arc::new(Fixed(false))));
    }
}
