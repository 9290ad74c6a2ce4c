//! Persistent and transient views on a context

use super::Context;
use crate::error::Result;
use crate::refmgmt::Pin;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A handle on a context.
///
/// A persistent view owns one reference on the context's handle and
/// releases it when dropped or closed; the last release runs the context's
/// cleanup. A transient view owns nothing and is meant for values handed
/// out by traversals, which must not extend the context's lifetime.
pub struct View<C: Context> {
    core: Arc<C>,
    pin: Option<Pin>,
}

impl<C: Context> View<C> {
    /// First view of a freshly built context, taking over the initial
    /// reference of its handle
    pub fn adopt(core: Arc<C>) -> Self {
        let pin = Pin::adopt(Arc::clone(core.base().allocatable()));
        Self {
            core,
            pin: Some(pin),
        }
    }

    /// A new persistent view, failing if the context is already cleaned up
    pub fn persistent(core: Arc<C>) -> Result<Self> {
        let pin = Pin::acquire(core.base().allocatable())?;
        Ok(Self {
            core,
            pin: Some(pin),
        })
    }

    pub fn transient(core: Arc<C>) -> Self {
        Self { core, pin: None }
    }

    /// A new transient view on the same context
    pub fn create_view(&self) -> Self {
        Self::transient(Arc::clone(&self.core))
    }

    /// A new persistent view on the same context
    pub fn pin(&self) -> Result<Self> {
        Self::persistent(Arc::clone(&self.core))
    }

    pub fn core(&self) -> &Arc<C> {
        &self.core
    }

    pub fn is_persistent(&self) -> bool {
        self.pin.is_some()
    }

    /// Number of persistent views currently alive
    pub fn ref_count(&self) -> usize {
        self.core.base().allocatable().ref_count()
    }

    pub fn is_closed(&self) -> bool {
        self.core.base().allocatable().is_closed()
    }

    /// Release this view's reference, reporting cleanup failures.
    ///
    /// Closing a transient view does nothing.
    pub fn close(mut self) -> Result<()> {
        match self.pin.take() {
            Some(pin) => pin.release(),
            None => Ok(()),
        }
    }
}

impl<C: Context> Clone for View<C> {
    fn clone(&self) -> Self {
        if !self.is_persistent() {
            return self.create_view();
        }
        match self.pin() {
            Ok(view) => view,
            Err(err) => {
                tracing::warn!(id = %self.core.id(), error = %err, "cloning a closed context");
                self.create_view()
            }
        }
    }
}

impl<C: Context> Deref for View<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.core
    }
}

impl<C: Context> fmt::Debug for View<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", self.core.id())
            .field("persistent", &self.is_persistent())
            .finish()
    }
}

/// Wrappers that can name the context they ultimately stand for
pub trait InnerContextProvider {
    type Inner: Context;

    fn inner_view(&self) -> &View<Self::Inner>;
}

impl<C: Context> InnerContextProvider for View<C> {
    type Inner = C;

    fn inner_view(&self) -> &View<C> {
        self
    }
}

/// Resolve a wrapper to exactly one persistent view of the innermost context
pub fn persistent_context_ref<P>(provider: &P) -> Result<View<P::Inner>>
where
    P: InnerContextProvider + ?Sized,
{
    provider.inner_view().pin()
}
