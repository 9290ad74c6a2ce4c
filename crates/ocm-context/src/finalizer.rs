//! Scoped resource finalization
//!
//! Resources registered during a context's lifetime are released in reverse
//! registration order when the context is cleaned up.

use crate::error::{ErrorList, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

type Action = Box<dyn FnOnce() -> Result<()> + Send>;

/// Something that can be closed exactly once
pub trait Closer: Send {
    fn close(self: Box<Self>) -> Result<()>;
}

/// Ordered list of pending cleanup actions
#[derive(Default)]
pub struct Finalizer {
    actions: Mutex<Vec<Action>>,
}

impl Finalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cleanup action
    pub fn with(&self, action: impl FnOnce() -> Result<()> + Send + 'static) {
        self.actions.lock().push(Box::new(action));
    }

    /// Register a resource to be closed
    pub fn close<C: Closer + 'static>(&self, resource: C) {
        let resource: Box<C> = Box::new(resource);
        self.with(move || resource.close());
    }

    /// Create a child finalizer.
    ///
    /// The child can be finalized on its own; whatever is still pending in
    /// it runs as a single entry of this finalizer.
    pub fn nested(&self) -> Arc<Finalizer> {
        let child = Arc::new(Finalizer::new());
        let pending = Arc::clone(&child);
        self.with(move || pending.finalize());
        child
    }

    /// Number of pending actions
    pub fn len(&self) -> usize {
        self.actions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.lock().is_empty()
    }

    /// Run all pending actions, most recent first.
    ///
    /// Every action runs even if earlier ones fail; the list is empty and
    /// reusable afterwards.
    pub fn finalize(&self) -> Result<()> {
        let actions = std::mem::take(&mut *self.actions.lock());
        let mut errors = ErrorList::new("finalize");
        for action in actions.into_iter().rev() {
            errors.add(action());
        }
        errors.into_result()
    }
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finalizer")
            .field("pending", &self.len())
            .finish()
    }
}
